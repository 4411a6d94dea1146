pub mod approvals;
pub mod builder;
