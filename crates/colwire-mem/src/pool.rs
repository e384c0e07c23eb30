//! Shape-keyed container pools.
//!
//! `Pool::get` hands out a recycled container whose capacity covers the
//! requested rows, or a fresh one. `Pool::put` offers a container back to a
//! bounded queue for its column count and silently drops it when that queue
//! is full.
//! A `PoolRegistry` groups the pools one pipeline uses; it is owned by the
//! pipeline and passed down explicitly rather than living in a global.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::arena::FrameBuffer;
use crate::batch::{RowTexts, TextBatch, ValueBatch};

/// Default number of idle containers kept per column count.
pub const DEFAULT_PER_SHAPE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    pub columns: usize,
    pub rows: usize,
}

impl Shape {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self { columns, rows }
    }
}

/// A container that can live in a [`Pool`].
pub trait Recycle: Send + Sized + 'static {
    fn alloc(shape: Shape) -> Self;

    /// Shape this container is filed under when returned.
    fn shape(&self) -> Shape;

    /// Reset visible content to empty. Allocations are kept.
    fn reset(&mut self);
}

impl Recycle for TextBatch {
    fn alloc(shape: Shape) -> Self {
        TextBatch::new(shape.columns, shape.rows)
    }

    fn shape(&self) -> Shape {
        Shape::new(self.num_columns(), self.row_capacity())
    }

    fn reset(&mut self) {
        self.clear();
    }
}

impl Recycle for ValueBatch {
    fn alloc(shape: Shape) -> Self {
        ValueBatch::new(shape.columns, shape.rows)
    }

    fn shape(&self) -> Shape {
        Shape::new(self.num_columns(), self.row_capacity())
    }

    fn reset(&mut self) {
        self.clear();
    }
}

impl Recycle for RowTexts {
    fn alloc(shape: Shape) -> Self {
        RowTexts::new(shape.columns, shape.rows)
    }

    fn shape(&self) -> Shape {
        Shape::new(self.num_columns(), self.row_capacity())
    }

    fn reset(&mut self) {
        self.clear();
    }
}

impl Recycle for FrameBuffer {
    fn alloc(shape: Shape) -> Self {
        FrameBuffer::new(shape.columns, shape.rows)
    }

    fn shape(&self) -> Shape {
        Shape::new(self.columns(), self.row_capacity())
    }

    fn reset(&mut self) {
        self.clear();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub hits: u64,
    pub misses: u64,
    pub dropped: u64,
}

pub struct Pool<T: Recycle> {
    /// One bounded queue per column count; row capacities within a queue vary.
    queues: Mutex<HashMap<usize, (Sender<T>, Receiver<T>)>>,
    per_shape: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    dropped: AtomicU64,
}

impl<T: Recycle> Default for Pool<T> {
    fn default() -> Self {
        Self::new(DEFAULT_PER_SHAPE)
    }
}

impl<T: Recycle> Pool<T> {
    pub fn new(per_shape: usize) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            per_shape: per_shape.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    fn queue(&self, columns: usize) -> (Sender<T>, Receiver<T>) {
        // Entries carry no semantic state, so a poisoned map is still usable.
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        queues
            .entry(columns)
            .or_insert_with(|| bounded(self.per_shape))
            .clone()
    }

    /// A container for `columns` x `rows`: a recycled one whose capacity
    /// covers `rows` when available, otherwise a fresh allocation.
    pub fn get(&self, columns: usize, rows: usize) -> T {
        let (tx, rx) = self.queue(columns);
        let mut too_small = Vec::new();
        let mut found = None;
        for _ in 0..rx.len() {
            match rx.try_recv() {
                Ok(item) if item.shape().rows >= rows => {
                    found = Some(item);
                    break;
                }
                Ok(item) => too_small.push(item),
                Err(_) => break,
            }
        }
        for item in too_small {
            self.offer(&tx, item);
        }
        match found {
            Some(mut item) => {
                item.reset();
                self.hits.fetch_add(1, Ordering::Relaxed);
                item
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                T::alloc(Shape::new(columns, rows))
            }
        }
    }

    /// Offer a container back; dropped if the queue for its width is full.
    pub fn put(&self, mut item: T) {
        item.reset();
        let (tx, _) = self.queue(item.shape().columns);
        self.offer(&tx, item);
    }

    fn offer(&self, tx: &Sender<T>, item: T) {
        let shape = item.shape();
        match tx.try_send(item) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(columns = shape.columns, rows = shape.rows, "pool full, dropping");
            }
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// The pools one pipeline instance draws from.
#[derive(Default)]
pub struct PoolRegistry {
    pub arenas: Pool<FrameBuffer>,
    pub text_batches: Pool<TextBatch>,
    pub value_batches: Pool<ValueBatch>,
    pub row_texts: Pool<RowTexts>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(per_shape: usize) -> Self {
        Self {
            arenas: Pool::new(per_shape),
            text_batches: Pool::new(per_shape),
            value_batches: Pool::new(per_shape),
            row_texts: Pool::new(per_shape),
        }
    }
}
