pub mod atomic;
pub mod audit_log;
pub mod ledger;
pub mod sink;
