#![forbid(unsafe_code)]

pub mod escalation;
pub mod outcomes;
pub mod policy;
pub mod router;
pub mod routing;
pub mod state;
pub mod workflow;

pub use router::DecisionRouter;
