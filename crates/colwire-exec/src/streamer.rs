//! Producer stage: fills bounded batches from a source and publishes them.
//!
//! Each published [`Chunk`] carries its sequence number and the absolute index
//! of its first row. The output channel is bounded (capacity 1 by default), so
//! reading stalls until the previous chunk is taken.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, Receiver, Select, Sender};

use colwire_core::schema::Field;
use colwire_core::types::Scalar;
use colwire_io::TableReader;
use colwire_mem::{FrameBuffer, PoolRegistry, ValueBatch};

use crate::cancel::CancelToken;
use crate::error::{ExecError, Result};
use crate::scheduler::panic_message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Idle,
    Running,
    Completed,
    Canceled,
    Failed,
}

impl StageState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => StageState::Idle,
            1 => StageState::Running,
            2 => StageState::Completed,
            3 => StageState::Canceled,
            _ => StageState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, StageState::Idle | StageState::Running)
    }
}

/// Stage state shared between the production thread, the cancellation
/// watcher and observers. Terminal states are never overwritten.
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn get(&self) -> StageState {
        StageState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set_running(&self) {
        self.0.store(StageState::Running as u8, Ordering::SeqCst);
    }

    /// Move from `Running` to `state`; `false` if another state won.
    fn finish(&self, state: StageState) -> bool {
        self.0
            .compare_exchange(
                StageState::Running as u8,
                state as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

/// One published batch.
#[derive(Debug)]
pub struct Chunk<P> {
    pub seq: u64,
    /// Absolute index of the first row in the stream.
    pub first_row: u64,
    pub rows: usize,
    pub payload: P,
}

/// Result of one fill call.
pub struct Filled<P> {
    pub payload: P,
    pub rows: usize,
    /// `Ok(true)` at end of input, `Ok(false)` when more may follow.
    pub end: Result<bool>,
}

/// Something the producer can pull batches from.
pub trait ChunkSource: Send + 'static {
    type Payload: Send + 'static;

    /// Fill one payload with up to `max_rows` rows. `rows_before` is the
    /// number of rows already published, for error positions.
    fn fill(&mut self, first: bool, max_rows: usize, rows_before: u64) -> Filled<Self::Payload>;

    /// Take back a payload that was not published.
    fn recycle(&self, payload: Self::Payload);
}

/// Text source: a format reader writing into pooled arenas.
pub struct TextChunkSource {
    reader: Box<dyn TableReader + Send>,
    fields: Vec<Field>,
    pools: Arc<PoolRegistry>,
}

impl TextChunkSource {
    pub fn new(reader: Box<dyn TableReader + Send>, fields: Vec<Field>, pools: Arc<PoolRegistry>) -> Self {
        Self {
            reader,
            fields,
            pools,
        }
    }
}

impl ChunkSource for TextChunkSource {
    type Payload = FrameBuffer;

    fn fill(&mut self, first: bool, max_rows: usize, rows_before: u64) -> Filled<FrameBuffer> {
        let mut arena = self.pools.arenas.get(self.fields.len(), max_rows);
        let read = if first {
            self.reader
                .read_first_column_texts(&mut arena, &self.fields, max_rows)
        } else {
            self.reader
                .read_column_texts_cont(&mut arena, &self.fields, max_rows)
        };
        let rows = arena.rows();
        let end = match read {
            Ok(outcome) => Ok(outcome.eof),
            Err(e) => {
                let (_, source) = e.split_row();
                Err(ExecError::Read {
                    row: rows_before + rows as u64,
                    source,
                })
            }
        };
        Filled {
            payload: arena,
            rows,
            end,
        }
    }

    fn recycle(&self, payload: FrameBuffer) {
        self.pools.arenas.put(payload);
    }
}

/// Typed source: rows of native values.
pub struct ValueChunkSource {
    rows: Box<dyn Iterator<Item = Vec<Scalar>> + Send>,
    columns: usize,
    pools: Arc<PoolRegistry>,
}

impl ValueChunkSource {
    pub fn new<I>(rows: I, columns: usize, pools: Arc<PoolRegistry>) -> Self
    where
        I: IntoIterator<Item = Vec<Scalar>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            rows: Box::new(rows.into_iter()),
            columns,
            pools,
        }
    }
}

impl ChunkSource for ValueChunkSource {
    type Payload = ValueBatch;

    fn fill(&mut self, _first: bool, max_rows: usize, rows_before: u64) -> Filled<ValueBatch> {
        let mut batch = self.pools.value_batches.get(self.columns, max_rows);
        while batch.num_rows() < max_rows {
            let Some(row) = self.rows.next() else {
                let rows = batch.num_rows();
                return Filled {
                    payload: batch,
                    rows,
                    end: Ok(true),
                };
            };
            if let Err(row) = batch.push_row(row) {
                let rows = batch.num_rows();
                return Filled {
                    payload: batch,
                    rows,
                    end: Err(ExecError::SchemaMismatch(format!(
                        "row {} has {} values, expected {}",
                        rows_before + rows as u64,
                        row.len(),
                        self.columns
                    ))),
                };
            }
        }
        let rows = batch.num_rows();
        Filled {
            payload: batch,
            rows,
            end: Ok(false),
        }
    }

    fn recycle(&self, payload: ValueBatch) {
        self.pools.value_batches.put(payload);
    }
}

/// Producer stage before it is started.
pub struct Streamer<S: ChunkSource> {
    source: S,
    batch_size: usize,
    capacity: usize,
    state: Arc<StateCell>,
}

impl<S: ChunkSource> Streamer<S> {
    pub fn new(source: S, batch_size: usize, capacity: usize) -> Self {
        Self {
            source,
            batch_size: batch_size.max(1),
            capacity: capacity.max(1),
            state: Arc::new(StateCell(AtomicU8::new(StageState::Idle as u8))),
        }
    }

    pub fn state(&self) -> StageState {
        self.state.get()
    }

    /// Start producing. Chunks arrive on the returned receiver; the handle
    /// reports the total rows published.
    pub fn start(self, cancel: CancelToken) -> Result<(ProducerHandle, Receiver<Chunk<S::Payload>>)> {
        let (tx, rx) = bounded(self.capacity);
        let (finished_tx, finished_rx) = bounded::<()>(0);
        let state = Arc::clone(&self.state);
        let reason = Arc::new(Mutex::new(None));
        state.set_running();

        let watcher = {
            let cancel = cancel.clone();
            let state = Arc::clone(&state);
            let reason = Arc::clone(&reason);
            thread::Builder::new()
                .name("producer-watch".into())
                .spawn(move || {
                    select! {
                        recv(cancel.done()) -> _ => {
                            // The producer may have recorded the cancel first.
                            let won = state.finish(StageState::Canceled);
                            if won || state.get() == StageState::Canceled {
                                let why = cancel.reason().unwrap_or_default();
                                if won {
                                    tracing::warn!(reason = %why, "producer canceled");
                                }
                                *reason.lock().unwrap_or_else(|e| e.into_inner()) = Some(why);
                            }
                        }
                        recv(finished_rx) -> _ => {}
                    }
                })
                .map_err(|e| ExecError::Internal(format!("cannot spawn producer watcher: {e}")))?
        };

        let Streamer {
            source,
            batch_size,
            ..
        } = self;
        let producer = {
            let state = Arc::clone(&state);
            thread::Builder::new()
                .name("producer".into())
                .spawn(move || {
                    let result = produce(source, batch_size, &tx, &cancel);
                    let terminal = match &result {
                        Ok(_) => StageState::Completed,
                        Err(e) if e.is_canceled() => StageState::Canceled,
                        Err(_) => StageState::Failed,
                    };
                    state.finish(terminal);
                    drop(finished_tx);
                    result
                })
                .map_err(|e| ExecError::Internal(format!("cannot spawn producer: {e}")))?
        };

        Ok((
            ProducerHandle {
                producer,
                watcher,
                state,
                reason,
            },
            rx,
        ))
    }
}

fn produce<S: ChunkSource>(
    mut source: S,
    batch_size: usize,
    tx: &Sender<Chunk<S::Payload>>,
    cancel: &CancelToken,
) -> Result<u64> {
    let done = cancel.done();
    let mut total = 0u64;
    let mut seq = 0u64;
    let mut first = true;
    loop {
        cancel.check()?;
        let filled = source.fill(first, batch_size, total);
        first = false;
        if filled.rows > 0 {
            let chunk = Chunk {
                seq,
                first_row: total,
                rows: filled.rows,
                payload: filled.payload,
            };
            // The chunk is handed over only once the send is selected, so a
            // chunk that never left can go back to its pool.
            let mut sel = Select::new();
            let send_op = sel.send(tx);
            sel.recv(&done);
            let oper = sel.select();
            if oper.index() == send_op {
                if let Err(unsent) = oper.send(tx, chunk) {
                    source.recycle(unsent.into_inner().payload);
                    cancel.check()?;
                    return Err(ExecError::Disconnected);
                }
            } else {
                let _ = oper.recv(&done);
                source.recycle(chunk.payload);
                return Err(cancel.error());
            }
            tracing::debug!(seq, rows = filled.rows, first_row = total, "published batch");
            total += filled.rows as u64;
            seq += 1;
        } else {
            source.recycle(filled.payload);
        }
        match filled.end {
            Ok(true) => return Ok(total),
            Ok(false) => {}
            Err(e) => {
                tracing::debug!(rows = total, error = %e, "producer stopped on error");
                return Err(e);
            }
        }
    }
}

/// Running producer stage.
pub struct ProducerHandle {
    producer: JoinHandle<Result<u64>>,
    watcher: JoinHandle<()>,
    state: Arc<StateCell>,
    reason: Arc<Mutex<Option<String>>>,
}

impl ProducerHandle {
    pub fn state(&self) -> StageState {
        self.state.get()
    }

    /// Cancellation reason recorded by the watcher, if the stage was canceled.
    pub fn cancel_reason(&self) -> Option<String> {
        self.reason.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Block until production stops; returns rows published.
    pub fn wait(self) -> Result<u64> {
        let result = self.producer.join().unwrap_or_else(|payload| {
            self.state.finish(StageState::Failed);
            let msg = panic_message(payload.as_ref());
            tracing::error!(panic = %msg, "producer panicked");
            Err(ExecError::Internal(format!("producer panicked: {msg}")))
        });
        if self.watcher.join().is_err() {
            return Err(ExecError::Internal("producer watcher panicked".into()));
        }
        result
    }
}
