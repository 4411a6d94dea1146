#![forbid(unsafe_code)]

pub mod decision;
pub mod defaults;
pub mod errors;
pub mod matrix;
pub mod route;
pub mod schema;
pub mod state;
pub mod traits;
pub mod types;
