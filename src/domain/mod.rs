mod account;
mod money;
mod request;
mod statement;
mod transaction;

pub use account::*;
pub use money::*;
pub use request::*;
pub use statement::*;
pub use transaction::*;
