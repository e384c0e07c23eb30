//! Typed-value insert path: the read pipeline fed with native rows.

use std::sync::Arc;

use crossbeam_channel::Receiver;

use colwire_core::block::Block;
use colwire_core::config::PipelineConfig;
use colwire_core::types::Scalar;
use colwire_mem::PoolRegistry;

use crate::cancel::CancelToken;
use crate::converter::convert_value_chunk;
use crate::error::Result;
use crate::reader::{start_pipeline, StreamHandle};
use crate::streamer::ValueChunkSource;

/// Stream rows of native values into blocks shaped like `sample`.
///
/// Every row must have one value per column; values are coerced to the
/// column types and rejected when out of range.
pub fn value_stream_read<I>(
    rows: I,
    sample: &Block,
    cfg: &PipelineConfig,
    pools: Arc<PoolRegistry>,
    cancel: &CancelToken,
) -> Result<(Receiver<Block>, StreamHandle)>
where
    I: IntoIterator<Item = Vec<Scalar>>,
    I::IntoIter: Send + 'static,
{
    let source = ValueChunkSource::new(rows, sample.num_columns(), Arc::clone(&pools));
    start_pipeline(source, sample, cfg, pools, cancel, convert_value_chunk)
}
