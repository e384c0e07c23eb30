//! Orchestrator for the text -> block direction.
//!
//! Wires a producer ([`Streamer`]) to a consumer (the converter stage) and
//! hands back the block receiver plus one [`StreamHandle`]. Waiting on the
//! handle joins both stages and checks that every row the producer read came
//! out of the consumer.

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver};

use colwire_core::block::Block;
use colwire_core::config::PipelineConfig;
use colwire_io::TableReader;
use colwire_mem::PoolRegistry;

use crate::cancel::CancelToken;
use crate::converter::{convert_text_chunk, spawn_converter};
use crate::error::{ExecError, Result};
use crate::scheduler::StageHandle;
use crate::streamer::{Chunk, ChunkSource, ProducerHandle, StageState, Streamer, TextChunkSource};

/// Completion handle of a read pipeline.
pub struct StreamHandle {
    producer: ProducerHandle,
    consumer: StageHandle,
    scope: CancelToken,
}

impl StreamHandle {
    pub fn producer_state(&self) -> StageState {
        self.producer.state()
    }

    /// Cancel this pipeline only.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.scope.cancel(reason);
    }

    /// Block until both stages stop; returns the number of rows delivered.
    ///
    /// The block receiver must be drained (or dropped) for this to return.
    /// Blocks delivered before a failure stay valid. A stage error wins over
    /// the other stage's cancellation; the row totals are compared only when
    /// both stages succeeded.
    pub fn wait(self) -> Result<u64> {
        let produced = self.producer.wait();
        let emitted = self.consumer.join();
        reconcile(produced, emitted)
    }
}

pub(crate) fn reconcile(produced: Result<u64>, emitted: Result<u64>) -> Result<u64> {
    match (produced, emitted) {
        (Ok(read), Ok(out)) if read == out => {
            tracing::info!(rows = read, "stream complete");
            Ok(read)
        }
        (Ok(read), Ok(out)) => {
            tracing::error!(read, emitted = out, "row count mismatch");
            Err(ExecError::RowCountMismatch {
                read,
                emitted: out,
            })
        }
        (Err(p), Err(c)) => {
            if p.is_secondary() && !c.is_secondary() {
                Err(c)
            } else {
                Err(p)
            }
        }
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
    }
}

/// Start producer and consumer over `source`.
pub(crate) fn start_pipeline<S, F>(
    source: S,
    sample: &Block,
    cfg: &PipelineConfig,
    pools: Arc<PoolRegistry>,
    cancel: &CancelToken,
    convert: F,
) -> Result<(Receiver<Block>, StreamHandle)>
where
    S: ChunkSource,
    F: Fn(Chunk<S::Payload>, &Block, &PoolRegistry) -> Result<(Block, usize)>
        + Send
        + Sync
        + 'static,
{
    cfg.validate()?;
    if sample.num_columns() == 0 {
        return Err(ExecError::SchemaMismatch("sample block has no columns".into()));
    }
    let scope = cancel.child();
    let (producer, chunks) =
        Streamer::new(source, cfg.batch_size, cfg.channel_capacity).start(scope.clone())?;
    let (blocks_tx, blocks_rx) = bounded(cfg.channel_capacity);
    let consumer = spawn_converter(
        chunks,
        blocks_tx,
        sample.structural_copy(0),
        pools,
        cfg.workers,
        scope.clone(),
        convert,
    )?;
    tracing::debug!(
        batch_size = cfg.batch_size,
        workers = cfg.workers,
        columns = sample.num_columns(),
        "read pipeline started"
    );
    Ok((
        blocks_rx,
        StreamHandle {
            producer,
            consumer,
            scope,
        },
    ))
}

/// Stream text from `reader` into blocks shaped like `sample`.
pub fn block_stream_read(
    reader: Box<dyn TableReader + Send>,
    sample: &Block,
    cfg: &PipelineConfig,
    pools: Arc<PoolRegistry>,
    cancel: &CancelToken,
) -> Result<(Receiver<Block>, StreamHandle)> {
    let source = TextChunkSource::new(reader, sample.fields(), Arc::clone(&pools));
    start_pipeline(source, sample, cfg, pools, cancel, convert_text_chunk)
}
