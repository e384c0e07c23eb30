#![forbid(unsafe_code)]
//! colwire-io: format codecs for the streaming engine.
//!
//! - `source`: buffered byte source with one-byte lookahead.
//! - `elem`: the shared element grammar (quotes, escapes, bracketed values).
//! - `traits`: the `ElemReader` / `RowReader` / `TableReader` contract.
//! - `readers`: CSV / JSON / VALUES readers that fill a `FrameBuffer`.
//! - `writers`: CSV / JSON / VALUES / Pretty frame writers.
//! - `format`: name-based factory for readers and writers.

pub mod elem;
pub mod error;
pub mod format;
pub mod readers;
pub mod source;
pub mod traits;
pub mod width;
pub mod writers;

pub use error::{Error, Result};
pub use format::Format;
pub use traits::{ElemEnd, ElemReader, ReadOutcome, RowReader, RowStatus, TableReader};
pub use writers::{CellEncoder, FrameWriter};
