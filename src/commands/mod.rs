//! CLI commands implementation

pub mod index;
pub mod query;
pub mod status;

pub use index::*;
pub use query::*;
pub use status::*;
