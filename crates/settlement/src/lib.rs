pub mod error;
pub mod factory;
pub mod ledger;
pub mod queue;
pub mod sqlite_store;
pub mod store;
pub mod window;

pub use error::*;
pub use factory::*;
pub use ledger::*;
pub use queue::*;
pub use sqlite_store::*;
pub use store::*;
pub use window::*;
