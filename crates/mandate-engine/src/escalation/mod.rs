pub mod escalate;
pub mod planner;
