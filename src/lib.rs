pub mod application;
pub mod cli;
pub mod domain;
pub mod storage;

pub use application::{LedgerEngine, LedgerError};
pub use domain::*;
