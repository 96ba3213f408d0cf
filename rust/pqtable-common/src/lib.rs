//! Core definitions shared by all pqtable-* crates: the error type, the `Result`
//! alias and a few verification macros.

pub mod error;
pub mod macros;
pub mod result;

pub use error::{Error, ErrorKind};
pub use result::Result;
