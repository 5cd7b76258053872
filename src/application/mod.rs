// Application layer - the ledger engine and everything it is configured with.
// Transport, sessions and presentation live outside and only call in here.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod keys;

pub use config::*;
pub use dispatch::*;
pub use engine::*;
pub use error::*;
pub use keys::*;
