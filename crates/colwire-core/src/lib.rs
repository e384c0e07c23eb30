#![forbid(unsafe_code)]
//! colwire-core: shared kernel for the colwire client.
//!
//! This crate contains only *pure* types and small helpers that the other
//! crates build on. There is **no I/O** and **no threading** here.
//!
//! Crates that use this:
//! - colwire-mem: pools batches whose shape is derived from a `Schema`.
//! - colwire-io: reads text into batches and writes `Block`s back out as text.
//! - colwire-exec: converts batches into `Block`s and wires the pipelines.

pub mod block;
pub mod config;
pub mod error;
pub mod exception;
pub mod literal;
pub mod prelude;
pub mod schema;
pub mod temporal;
pub mod types;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
