pub mod classifier;
pub mod precedence;
