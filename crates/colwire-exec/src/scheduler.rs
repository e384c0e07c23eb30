//! Ordered parallel stages.
//!
//! A dispatcher numbers incoming items, a pool of workers transforms them in
//! parallel, and a [`SequenceGate`] makes every worker wait for its turn
//! before publishing, so the output channel sees items in input order.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, Receiver, Sender};

use crate::cancel::CancelToken;
use crate::error::{ExecError, Result};

/// Lets sequence number `n` through only after `n - 1` has advanced it.
#[derive(Debug, Default)]
pub struct SequenceGate {
    state: Mutex<GateState>,
    turn: Condvar,
}

#[derive(Debug, Default)]
struct GateState {
    next: u64,
    aborted: bool,
}

impl SequenceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `seq` is next. Returns `false` if the gate was aborted.
    pub fn wait_turn(&self, seq: u64) -> bool {
        let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        while !st.aborted && st.next != seq {
            st = self.turn.wait(st).unwrap_or_else(|e| e.into_inner());
        }
        !st.aborted
    }

    pub fn advance(&self) {
        let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        st.next += 1;
        self.turn.notify_all();
    }

    /// Release every waiter; `wait_turn` returns `false` from now on.
    pub fn abort(&self) {
        let mut st = self.state.lock().unwrap_or_else(|e| e.into_inner());
        st.aborted = true;
        self.turn.notify_all();
    }

    /// Next sequence number allowed through.
    pub fn next(&self) -> u64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).next
    }
}

/// First error wins; a real error cancels the scope's token.
///
/// A cancellation error is replaced by a later real error, so the cause is
/// reported rather than the resulting cancellation.
pub(crate) struct ErrorScope {
    first: Mutex<Option<ExecError>>,
    cancel: CancelToken,
}

impl ErrorScope {
    pub(crate) fn new(cancel: CancelToken) -> Self {
        Self {
            first: Mutex::new(None),
            cancel,
        }
    }

    pub(crate) fn fail(&self, err: ExecError) {
        let canceled = err.is_canceled();
        let reason = (!canceled).then(|| err.to_string());
        {
            let mut slot = self.first.lock().unwrap_or_else(|e| e.into_inner());
            let replace = match &*slot {
                None => true,
                Some(prev) => prev.is_canceled() && !canceled,
            };
            if replace {
                *slot = Some(err);
            }
        }
        if let Some(reason) = reason {
            self.cancel.cancel(reason);
        }
    }

    pub(crate) fn take(&self) -> Option<ExecError> {
        self.first.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Running ordered stage.
pub(crate) struct StageHandle {
    name: &'static str,
    threads: Vec<JoinHandle<()>>,
    rows: Arc<AtomicU64>,
    scope: Arc<ErrorScope>,
}

impl StageHandle {
    /// Wait for every thread of the stage; returns rows published.
    pub(crate) fn join(self) -> Result<u64> {
        for t in self.threads {
            if let Err(payload) = t.join() {
                self.scope.fail(ExecError::Internal(format!(
                    "{} thread panicked: {}",
                    self.name,
                    panic_message(payload.as_ref())
                )));
            }
        }
        match self.scope.take() {
            Some(e) => Err(e),
            None => Ok(self.rows.load(Ordering::SeqCst)),
        }
    }
}

/// Spawn a dispatcher and `workers` worker threads that apply `transform`
/// to every item of `input` and publish results to `output` in input order.
///
/// `transform` returns the output item and the number of rows it carries.
/// A failing item is reported only once every earlier item has been
/// published, so the error always refers to the first bad item in order.
pub(crate) fn spawn_ordered<In, Out, F>(
    name: &'static str,
    input: Receiver<In>,
    output: Sender<Out>,
    workers: usize,
    cancel: CancelToken,
    transform: F,
) -> Result<StageHandle>
where
    In: Send + 'static,
    Out: Send + 'static,
    F: Fn(In) -> Result<(Out, usize)> + Send + Sync + 'static,
{
    let workers = workers.max(1);
    let gate = Arc::new(SequenceGate::new());
    let scope = Arc::new(ErrorScope::new(cancel.clone()));
    let rows = Arc::new(AtomicU64::new(0));
    let transform = Arc::new(transform);

    {
        let gate = Arc::clone(&gate);
        cancel.register(move |_| gate.abort());
    }

    let (work_tx, work_rx) = bounded::<(u64, In)>(workers);
    let mut threads = Vec::with_capacity(workers + 1);

    let dispatcher = {
        let cancel = cancel.clone();
        let scope = Arc::clone(&scope);
        thread::Builder::new()
            .name(format!("{name}-dispatch"))
            .spawn(move || {
                let done = cancel.done();
                let mut seq = 0u64;
                loop {
                    let item = select! {
                        recv(input) -> msg => match msg {
                            Ok(item) => item,
                            Err(_) => break,
                        },
                        recv(done) -> _ => {
                            scope.fail(cancel.error());
                            break;
                        }
                    };
                    select! {
                        send(work_tx, (seq, item)) -> res => {
                            if res.is_err() {
                                break;
                            }
                        }
                        recv(done) -> _ => {
                            scope.fail(cancel.error());
                            break;
                        }
                    }
                    seq += 1;
                }
                tracing::debug!(stage = name, items = seq, "dispatcher finished");
            })
            .map_err(|e| ExecError::Internal(format!("cannot spawn {name} dispatcher: {e}")))?
    };
    threads.push(dispatcher);

    let stage_scope = Arc::clone(&scope);
    for worker in 0..workers {
        let work_rx = work_rx.clone();
        let output = output.clone();
        let cancel = cancel.clone();
        let gate = Arc::clone(&gate);
        let scope = Arc::clone(&scope);
        let rows = Arc::clone(&rows);
        let transform = Arc::clone(&transform);
        let spawned = thread::Builder::new()
            .name(format!("{name}-{worker}"))
            .spawn(move || {
                let done = cancel.done();
                loop {
                    let (seq, item) = select! {
                        recv(work_rx) -> msg => match msg {
                            Ok(work) => work,
                            Err(_) => break,
                        },
                        recv(done) -> _ => {
                            scope.fail(cancel.error());
                            break;
                        }
                    };

                    let result = catch_unwind(AssertUnwindSafe(|| (*transform)(item)))
                        .unwrap_or_else(|payload| {
                            let msg = panic_message(payload.as_ref());
                            tracing::error!(stage = name, seq, panic = %msg, "worker panicked");
                            Err(ExecError::Internal(format!("{name} worker panicked: {msg}")))
                        });

                    if !gate.wait_turn(seq) {
                        scope.fail(match result {
                            Err(e) => e,
                            Ok(_) => cancel.error(),
                        });
                        break;
                    }

                    let (out, n) = match result {
                        Ok(done_item) => done_item,
                        Err(e) => {
                            tracing::debug!(stage = name, seq, error = %e, "item failed");
                            scope.fail(e);
                            gate.abort();
                            break;
                        }
                    };

                    select! {
                        send(output, out) -> res => {
                            if res.is_err() {
                                scope.fail(ExecError::Disconnected);
                                gate.abort();
                                break;
                            }
                        }
                        recv(done) -> _ => {
                            scope.fail(cancel.error());
                            break;
                        }
                    }
                    rows.fetch_add(n as u64, Ordering::SeqCst);
                    gate.advance();
                    tracing::trace!(stage = name, seq, rows = n, "published");
                }
            });
        match spawned {
            Ok(t) => threads.push(t),
            Err(e) => {
                stage_scope.fail(ExecError::Internal(format!("cannot spawn {name} worker: {e}")));
                break;
            }
        }
    }

    Ok(StageHandle {
        name,
        threads,
        rows,
        scope,
    })
}
