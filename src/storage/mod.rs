//! Record storage: the transactional backend boundary and the versioned
//! record store built on top of it.

mod adaptors;
mod backend;
mod record_store;
pub(crate) mod row_lock;
pub(crate) mod staged_transaction;


pub use adaptors::*;
pub use backend::*;
pub use record_store::*;
