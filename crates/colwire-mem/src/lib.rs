#![forbid(unsafe_code)]
//! colwire-mem: reusable containers for the streaming engine.
//!
//! - `arena`: `FrameBuffer`, the append-only byte arena codecs parse into.
//! - `batch`: `TextBatch`, `ValueBatch` and `RowTexts` containers.
//! - `pool`: shape-keyed `Pool<T>` and the `PoolRegistry` a pipeline owns.
//!
//! Pooled entries are plain memory. Nothing semantic survives a round trip
//! through a pool, and callers must not rely on getting a particular instance
//! back.

pub mod arena;
pub mod batch;
pub mod error;
pub mod pool;

pub use arena::FrameBuffer;
pub use batch::{RowTexts, TextBatch, ValueBatch};
pub use error::{Error, Result};
pub use pool::{Pool, PoolRegistry, PoolStats, Recycle, Shape};
