//! Shared fixtures for the colwire test suite.
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use colwire_core::block::Block;
use colwire_core::config::{PipelineConfig, Settings};
use colwire_core::schema::{Field, Schema};
use colwire_core::types::Scalar;
use colwire_exec::{block_stream_read, block_stream_write, CancelToken, ExecError};
use colwire_io::Format;
use colwire_mem::{FrameBuffer, PoolRegistry, TextBatch};

/// In-memory sink that stays readable after the writer thread has taken it.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn sample(schema: &str) -> Block {
    Block::from_schema(&Schema::parse(schema).unwrap())
}

pub fn fields(schema: &str) -> Vec<Field> {
    Schema::parse(schema).unwrap().fields
}

pub fn cfg(batch_size: usize, workers: usize) -> PipelineConfig {
    PipelineConfig::default()
        .with_batch_size(batch_size)
        .with_workers(workers)
}

/// `n` CSV lines of `id,name`.
pub fn csv_rows(n: usize) -> String {
    (0..n).map(|i| format!("{i},name_{i}\n")).collect()
}

/// A block of `n` rows for `id UInt64, name String`.
pub fn id_name_block(start: u64, n: usize) -> Block {
    let mut block = sample("id UInt64, name String");
    for i in start..start + n as u64 {
        block
            .append_row(vec![Scalar::UInt(i), Scalar::Str(format!("name_{i}"))])
            .unwrap();
    }
    block
}

/// Read up to `max_rows` rows with a bare reader and return them row-major.
pub fn read_cells(
    format: Format,
    input: &str,
    schema: &str,
    settings: &Settings,
    max_rows: usize,
) -> colwire_io::Result<Vec<Vec<String>>> {
    let columns = fields(schema);
    let mut reader = format.reader(Cursor::new(input.as_bytes().to_vec()), settings)?;
    let mut arena = FrameBuffer::new(columns.len(), max_rows);
    reader.read_first_column_texts(&mut arena, &columns, max_rows)?;
    Ok(arena_rows(&arena))
}

pub fn arena_rows(arena: &FrameBuffer) -> Vec<Vec<String>> {
    let mut batch = TextBatch::new(arena.columns(), arena.rows());
    arena.fill_text_batch(&mut batch).unwrap();
    (0..batch.num_rows())
        .map(|r| {
            (0..batch.num_columns())
                .map(|c| batch.cell(c, r).to_string())
                .collect()
        })
        .collect()
}

/// Run the read pipeline to completion, collecting every delivered block.
pub fn read_blocks(
    format: Format,
    input: &str,
    schema: &str,
    settings: &Settings,
    cfg: &PipelineConfig,
) -> (Vec<Block>, Result<u64, ExecError>) {
    let reader = format
        .reader(Cursor::new(input.as_bytes().to_vec()), settings)
        .unwrap();
    let pools = Arc::new(PoolRegistry::new());
    let (rx, handle) =
        block_stream_read(reader, &sample(schema), cfg, pools, &CancelToken::new()).unwrap();
    let blocks: Vec<Block> = rx.iter().collect();
    (blocks, handle.wait())
}

/// Run the write pipeline over `blocks` and return the rendered text.
pub fn render(
    format: Format,
    blocks: Vec<Block>,
    settings: &Settings,
    cfg: &PipelineConfig,
) -> (String, Result<u64, ExecError>) {
    let out = SharedBuf::new();
    let writer = format.writer(out.clone(), settings).unwrap();
    let (tx, rx) = crossbeam_channel::unbounded::<Block>();
    for block in blocks {
        tx.send(block).unwrap();
    }
    drop(tx);
    let pools = Arc::new(PoolRegistry::new());
    let handle = block_stream_write(rx, writer, cfg, pools, &CancelToken::new()).unwrap();
    let result = handle.wait();
    (out.contents(), result)
}

/// Every value of a column, top to bottom, across blocks.
pub fn column_values(blocks: &[Block], col: usize) -> Vec<Scalar> {
    blocks
        .iter()
        .flat_map(|b| (0..b.num_rows()).map(move |r| b.value(r, col)))
        .collect()
}
