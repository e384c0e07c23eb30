#![forbid(unsafe_code)]
//! colwire-exec: the streaming pipelines.
//!
//! - `cancel`: cancellation tokens with child scopes and deadlines.
//! - `scheduler`: the sequence gate and the ordered parallel stage.
//! - `streamer`: the producer stage and its text / native-value sources.
//! - `converter`: the consumer stage (chunk -> `Block`).
//! - `reader`: the text -> block orchestrator with row reconciliation.
//! - `writer`: the block -> text path.
//! - `native`: the typed-value insert path.

pub mod cancel;
pub mod converter;
pub mod error;
pub mod native;
pub mod reader;
pub mod scheduler;
pub mod streamer;
pub mod writer;

pub use cancel::CancelToken;
pub use error::{ExecError, Result};
pub use native::value_stream_read;
pub use reader::{block_stream_read, StreamHandle};
pub use scheduler::SequenceGate;
pub use streamer::{Chunk, ChunkSource, StageState, Streamer};
pub use writer::{block_stream_write, join_read_write, WriteHandle};
