//! Reverse path: blocks -> rendered frames -> formatted text.
//!
//! An ordered stage renders every block into a pooled [`RowTexts`] with the
//! writer's cell encoder; a single frame-writer thread then writes the frames
//! in order. `end_of_stream` runs only when both sides succeeded and the row
//! totals agree; `flush` runs on every exit path.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver};

use colwire_core::config::PipelineConfig;
use colwire_core::exception::Packet;
use colwire_core::schema::Field;
use colwire_io::{CellEncoder, FrameWriter};
use colwire_mem::{PoolRegistry, RowTexts};

use crate::cancel::CancelToken;
use crate::error::{ExecError, Result};
use crate::scheduler::{panic_message, spawn_ordered, StageHandle};

/// One rendered block.
pub struct Frame {
    pub fields: Vec<Field>,
    pub rows: RowTexts,
}

/// Render a packet's block into text cells. An exception packet ends the
/// stream with [`ExecError::Upstream`].
pub fn stringify_packet(
    packet: Packet,
    encoder: CellEncoder,
    pools: &PoolRegistry,
) -> Result<(Frame, usize)> {
    let block = match packet {
        Packet::Data(block) => block,
        Packet::Exception(ex) => {
            tracing::warn!(code = ex.code, name = %ex.name, "server exception in stream");
            return Err(ExecError::Upstream(ex));
        }
    };
    let fields = block.fields();
    let n = block.num_rows();
    let mut rows = pools.row_texts.get(fields.len(), n);
    rows.set_rows(n);
    for (c, (field, column)) in fields.iter().zip(block.columns()).enumerate() {
        for r in 0..n {
            let cell = rows.cell_mut(r, c);
            cell.clear();
            encoder.encode(field, &column.data.get(r), cell);
        }
    }
    Ok((Frame { fields, rows }, n))
}

type WriterOutcome = (Box<dyn FrameWriter>, Result<(u64, Vec<Field>)>);

/// Frames already in the channel precede any failed item, so they are written
/// even after the scope is cancelled; the loop ends when the stringify stage
/// stops and drops its sender.
fn write_frames(
    writer: &mut dyn FrameWriter,
    frames: &Receiver<Frame>,
    pools: &PoolRegistry,
) -> Result<(u64, Vec<Field>)> {
    let mut total = 0u64;
    let mut fields = Vec::new();
    let mut first = true;
    for frame in frames.iter() {
        let n = frame.rows.num_rows();
        let written = if first {
            writer.write_first_frame(&frame.fields, &frame.rows)
        } else {
            writer.write_frame_cont(&frame.fields, &frame.rows)
        };
        first = false;
        pools.row_texts.put(frame.rows);
        written.map_err(ExecError::Write)?;
        fields = frame.fields;
        total += n as u64;
        tracing::trace!(rows = n, total, "frame written");
    }
    Ok((total, fields))
}

/// Completion handle of a write pipeline.
pub struct WriteHandle {
    stringify: StageHandle,
    writer: JoinHandle<WriterOutcome>,
    scope: CancelToken,
}

impl WriteHandle {
    /// Cancel this pipeline only.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.scope.cancel(reason);
    }

    /// Block until everything is written; returns rows written.
    pub fn wait(self) -> Result<u64> {
        let stringified = self.stringify.join();
        let (mut writer, written) = self.writer.join().map_err(|payload| {
            ExecError::Internal(format!(
                "frame writer thread panicked: {}",
                panic_message(payload.as_ref())
            ))
        })?;

        let result = match (stringified, written) {
            (Ok(rendered), Ok((rows, fields))) if rendered == rows => writer
                .end_of_stream(&fields, rows)
                .map(|_| rows)
                .map_err(ExecError::Write),
            (Ok(rendered), Ok((rows, _))) => {
                tracing::error!(rendered, written = rows, "row count mismatch on write path");
                Err(ExecError::RowCountMismatch {
                    read: rendered,
                    emitted: rows,
                })
            }
            (Err(s), Err(w)) => {
                if s.is_secondary() && !w.is_secondary() {
                    Err(w)
                } else {
                    Err(s)
                }
            }
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
        };

        let flushed = writer.flush().map_err(ExecError::Write);
        match (result, flushed) {
            (Ok(rows), Ok(())) => {
                tracing::info!(rows, "write stream complete");
                Ok(rows)
            }
            (Err(e), _) | (Ok(_), Err(e)) => Err(e),
        }
    }
}

/// Start writing `packets` with `writer`. Returns immediately; the handle
/// reports the outcome.
pub fn block_stream_write<T>(
    packets: Receiver<T>,
    writer: Box<dyn FrameWriter>,
    cfg: &PipelineConfig,
    pools: Arc<PoolRegistry>,
    cancel: &CancelToken,
) -> Result<WriteHandle>
where
    T: Into<Packet> + Send + 'static,
{
    cfg.validate()?;
    let scope = cancel.child();
    let encoder = writer.encoder();
    let (frames_tx, frames_rx) = bounded::<Frame>(cfg.channel_capacity);

    let stringify = {
        let pools = Arc::clone(&pools);
        spawn_ordered(
            "stringify",
            packets,
            frames_tx,
            cfg.workers,
            scope.clone(),
            move |packet: T| stringify_packet(packet.into(), encoder, &pools),
        )?
    };

    let writer = {
        let scope = scope.clone();
        thread::Builder::new()
            .name("frame-writer".into())
            .spawn(move || {
                let mut writer = writer;
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    write_frames(writer.as_mut(), &frames_rx, &pools)
                }))
                .unwrap_or_else(|payload| {
                    let msg = panic_message(payload.as_ref());
                    tracing::error!(panic = %msg, "frame writer panicked");
                    Err(ExecError::Internal(format!("frame writer panicked: {msg}")))
                });
                if let Err(e) = &outcome {
                    if !e.is_canceled() {
                        scope.cancel(e.to_string());
                    }
                }
                (writer, outcome)
            })
            .map_err(|e| ExecError::Internal(format!("cannot spawn frame writer: {e}")))?
    };

    Ok(WriteHandle {
        stringify,
        writer,
        scope,
    })
}

/// Outcome of a read pipeline feeding a write pipeline: `(read, written)`.
///
/// When both sides fail, the side that stopped first wins; a `Disconnected`
/// or canceled read caused by a failed writer reports the writer's error.
pub fn join_read_write(read: Result<u64>, written: Result<u64>) -> Result<(u64, u64)> {
    match (read, written) {
        (Ok(r), Ok(w)) => Ok((r, w)),
        (Err(r), Err(w)) => {
            if r.is_secondary() && !w.is_secondary() {
                Err(w)
            } else {
                Err(r)
            }
        }
        (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
    }
}
