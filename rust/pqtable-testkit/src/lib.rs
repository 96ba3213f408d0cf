//! Test utilities for the pqtable crates.
//!
//! - [`data_gen`]: seeded synthetic tables covering every column kind;
//! - [`source`]: parquet sources with injected failures.

pub mod data_gen;
pub mod source;
