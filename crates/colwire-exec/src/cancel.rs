//! Cancellation tokens.
//!
//! A token is cancelled at most once; the first reason sticks. Every stage
//! holds a clone and checks it at its suspension points, either by polling
//! `is_canceled` or by selecting on `done()`, a channel that disconnects when
//! the token fires.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{after, bounded, select, Receiver, Sender};

use crate::error::ExecError;

type Callback = Box<dyn FnOnce(&str) + Send>;

struct Inner {
    canceled: AtomicBool,
    reason: Mutex<Option<String>>,
    /// Dropped on cancel so that every `done` receiver disconnects.
    done_tx: Mutex<Option<Sender<()>>>,
    done_rx: Receiver<()>,
    callbacks: Mutex<Vec<(u64, Callback)>>,
    next_id: AtomicU64,
    /// Parent token and the id of the callback this token registered there.
    parent: Mutex<Option<(Weak<Inner>, u64)>>,
}

impl Inner {
    fn remove_callback(&self, id: u64) {
        self.callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(cb_id, _)| *cb_id != id);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let link = self.parent.get_mut().unwrap_or_else(|e| e.into_inner()).take();
        if let Some((parent, id)) = link {
            if let Some(parent) = parent.upgrade() {
                parent.remove_callback(id);
            }
        }
    }
}

#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("canceled", &self.is_canceled())
            .field("reason", &self.reason())
            .finish()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                canceled: AtomicBool::new(false),
                reason: Mutex::new(None),
                done_tx: Mutex::new(Some(tx)),
                done_rx: rx,
                callbacks: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                parent: Mutex::new(None),
            }),
        }
    }

    /// Cancel with `reason`. Returns `false` if the token had already fired.
    pub fn cancel(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        {
            let mut slot = self.inner.reason.lock().unwrap_or_else(|e| e.into_inner());
            if self.inner.canceled.load(Ordering::SeqCst) {
                return false;
            }
            *slot = Some(reason.clone());
            self.inner.canceled.store(true, Ordering::SeqCst);
        }
        self.inner
            .done_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let callbacks =
            std::mem::take(&mut *self.inner.callbacks.lock().unwrap_or_else(|e| e.into_inner()));
        for (_, cb) in callbacks {
            cb(&reason);
        }
        true
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<String> {
        self.inner
            .reason
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Disconnects when the token fires; never yields a message.
    pub fn done(&self) -> Receiver<()> {
        self.inner.done_rx.clone()
    }

    /// `Err(Canceled)` once the token has fired.
    pub fn check(&self) -> Result<(), ExecError> {
        if self.is_canceled() {
            Err(self.error())
        } else {
            Ok(())
        }
    }

    /// The error a stage reports when it stops because of this token.
    pub fn error(&self) -> ExecError {
        ExecError::Canceled(self.reason().unwrap_or_else(|| "canceled".into()))
    }

    /// Run `f` with the reason when the token fires, or right away if it
    /// already has.
    pub fn register(&self, f: impl FnOnce(&str) + Send + 'static) {
        self.register_id(f);
    }

    /// Like `register`; returns the callback id while it is pending.
    fn register_id(&self, f: impl FnOnce(&str) + Send + 'static) -> Option<u64> {
        {
            let mut callbacks = self.inner.callbacks.lock().unwrap_or_else(|e| e.into_inner());
            if !self.is_canceled() {
                let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                callbacks.push((id, Box::new(f)));
                return Some(id);
            }
        }
        f(&self.reason().unwrap_or_default());
        None
    }

    /// Callbacks waiting for this token to fire.
    pub fn listeners(&self) -> usize {
        self.inner
            .callbacks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// A token that fires when this one does, but can also be cancelled on
    /// its own without affecting the parent. Dropping the last clone of the
    /// child removes its callback from the parent.
    pub fn child(&self) -> CancelToken {
        let child = CancelToken::new();
        let weak: Weak<Inner> = Arc::downgrade(&child.inner);
        let id = self.register_id(move |reason| {
            if let Some(inner) = weak.upgrade() {
                CancelToken { inner }.cancel(reason.to_string());
            }
        });
        if let Some(id) = id {
            *child.inner.parent.lock().unwrap_or_else(|e| e.into_inner()) =
                Some((Arc::downgrade(&self.inner), id));
        }
        child
    }

    /// A child token that also fires after `timeout` with reason
    /// `deadline exceeded`. The timer stops early once the child fires or
    /// every clone of it is dropped.
    pub fn with_timeout(&self, timeout: Duration) -> CancelToken {
        let child = self.child();
        let timer = Arc::downgrade(&child.inner);
        // Disconnects on cancel and when the child's state is dropped.
        let done = child.done();
        let spawned = thread::Builder::new()
            .name("colwire-deadline".into())
            .spawn(move || {
                select! {
                    recv(done) -> _ => {}
                    recv(after(timeout)) -> _ => {
                        if let Some(inner) = timer.upgrade() {
                            if (CancelToken { inner }).cancel("deadline exceeded") {
                                tracing::warn!(?timeout, "pipeline deadline exceeded");
                            }
                        }
                    }
                }
            });
        if let Err(e) = spawned {
            child.cancel(format!("cannot start deadline timer: {e}"));
        }
        child
    }
}
