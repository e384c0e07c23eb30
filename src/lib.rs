//! colwire: streaming conversion between text formats and column blocks.
//!
//! Re-exports the entry points of the workspace crates.

pub use colwire_core::prelude::*;
pub use colwire_exec::{block_stream_read, block_stream_write, value_stream_read, CancelToken, ExecError};
pub use colwire_io::Format;
pub use colwire_mem::PoolRegistry;
