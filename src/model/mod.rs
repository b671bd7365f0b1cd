//! Table catalog: declarative table definitions, validation, and the resolved runtime model.

mod catalog;
mod resolved;
mod types;
mod validator;

pub use catalog::*;
pub use resolved::*;
pub use types::*;
pub use validator::*;
