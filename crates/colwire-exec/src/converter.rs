//! Consumer stage: turns published chunks into typed blocks, in order.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use colwire_core::block::Block;
use colwire_mem::{FrameBuffer, PoolRegistry, ValueBatch};

use crate::cancel::CancelToken;
use crate::error::{ExecError, Result};
use crate::scheduler::{spawn_ordered, StageHandle};
use crate::streamer::Chunk;

/// Parse a text chunk into a block shaped like `sample`.
///
/// Cells are trimmed first. Conversion errors carry the absolute row, the
/// column, and the offending text. The arena and text batch go back to their
/// pools whether or not conversion succeeds.
pub fn convert_text_chunk(
    chunk: Chunk<FrameBuffer>,
    sample: &Block,
    pools: &PoolRegistry,
) -> Result<(Block, usize)> {
    let Chunk {
        first_row,
        rows,
        payload: arena,
        ..
    } = chunk;
    if arena.columns() != sample.num_columns() {
        let found = arena.columns();
        pools.arenas.put(arena);
        return Err(ExecError::SchemaMismatch(format!(
            "batch has {found} columns, block expects {}",
            sample.num_columns()
        )));
    }

    let mut batch = pools.text_batches.get(arena.columns(), rows);
    let filled = arena.fill_text_batch(&mut batch);
    pools.arenas.put(arena);
    if let Err(e) = filled {
        pools.text_batches.put(batch);
        return Err(e.into());
    }
    batch.trim_cells();

    let result = (|| -> Result<(Block, usize)> {
        let mut block = sample.structural_copy(batch.num_rows());
        for col in 0..block.num_columns() {
            let column = block
                .column_mut(col)
                .ok_or_else(|| ExecError::Internal(format!("block lost column {col}")))?;
            for (row, text) in batch.column(col).iter().enumerate() {
                if let Err(source) = column.push_text(text) {
                    return Err(ExecError::Convert {
                        row: first_row + row as u64,
                        column: col,
                        name: column.name.clone(),
                        text: text.clone(),
                        source,
                    });
                }
            }
        }
        let sealed = block.seal()?;
        Ok((block, sealed))
    })();
    pools.text_batches.put(batch);
    result
}

/// Typed-value counterpart of [`convert_text_chunk`].
pub fn convert_value_chunk(
    chunk: Chunk<ValueBatch>,
    sample: &Block,
    pools: &PoolRegistry,
) -> Result<(Block, usize)> {
    let Chunk {
        first_row,
        payload: mut batch,
        ..
    } = chunk;
    if batch.num_columns() != sample.num_columns() {
        let found = batch.num_columns();
        pools.value_batches.put(batch);
        return Err(ExecError::SchemaMismatch(format!(
            "batch has {found} columns, block expects {}",
            sample.num_columns()
        )));
    }

    let result = (|| -> Result<(Block, usize)> {
        let mut block = sample.structural_copy(batch.num_rows());
        for col in 0..block.num_columns() {
            let values = batch.take_column(col);
            let column = block
                .column_mut(col)
                .ok_or_else(|| ExecError::Internal(format!("block lost column {col}")))?;
            for (row, value) in values.into_iter().enumerate() {
                if let Err(source) = column.push_value(value) {
                    return Err(ExecError::Value {
                        row: first_row + row as u64,
                        column: col,
                        name: column.name.clone(),
                        source,
                    });
                }
            }
        }
        let sealed = block.seal()?;
        Ok((block, sealed))
    })();
    pools.value_batches.put(batch);
    result
}

/// Start the consumer stage over `chunks`.
pub(crate) fn spawn_converter<P, F>(
    chunks: Receiver<Chunk<P>>,
    blocks: Sender<Block>,
    sample: Block,
    pools: Arc<PoolRegistry>,
    workers: usize,
    cancel: CancelToken,
    convert: F,
) -> Result<StageHandle>
where
    P: Send + 'static,
    F: Fn(Chunk<P>, &Block, &PoolRegistry) -> Result<(Block, usize)> + Send + Sync + 'static,
{
    spawn_ordered("converter", chunks, blocks, workers, cancel, move |chunk| {
        convert(chunk, &sample, &pools)
    })
}
