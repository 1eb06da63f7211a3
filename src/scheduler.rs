//! Periodic task scheduling
//!
//! A `PeriodicTask` owns at most one worker thread that invokes a callback at a
//! fixed rate. Stopping is synchronous: the worker is signalled over a channel
//! and joined before `stop` returns, so no callback runs afterwards.

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// When the first tick fires after `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstTick {
    /// Fire as soon as the worker starts
    Immediate,
    /// Fire after one full period
    AfterPeriod,
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
    thread_id: ThreadId,
}

/// Restartable fixed-rate timer backed by a worker thread
pub struct PeriodicTask {
    name: &'static str,
    period: Duration,
    first_tick: FirstTick,
    worker: Option<Worker>,
}

impl PeriodicTask {
    pub fn new(name: &'static str, period: Duration, first_tick: FirstTick) -> Self {
        Self {
            name,
            period,
            first_tick,
            worker: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Start ticking, replacing any worker that is already running.
    ///
    /// The replaced worker is signalled but not joined; join the returned
    /// handle, after releasing any lock held around the task, to wait for it.
    pub fn start<F>(&mut self, mut tick: F) -> Option<Stopping>
    where
        F: FnMut() + Send + 'static,
    {
        let replaced = self.signal_stop();

        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let period = self.period;
        let first_tick = self.first_tick;
        let name = self.name;

        let spawned = thread::Builder::new()
            .name(format!("motion-{name}"))
            .spawn(move || {
                let mut deadline = Instant::now();
                if first_tick == FirstTick::AfterPeriod {
                    deadline += period;
                }
                loop {
                    match stop_rx.recv_deadline(deadline) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    tick();
                    deadline += period;
                    // Skip missed ticks rather than bursting to catch up
                    let now = Instant::now();
                    while deadline < now {
                        deadline += period;
                    }
                }
                debug!(target: "synheart_motion", task = name, "periodic task exited");
            });

        match spawned {
            Ok(handle) => {
                let thread_id = handle.thread().id();
                self.worker = Some(Worker {
                    stop_tx,
                    handle,
                    thread_id,
                });
                debug!(
                    target: "synheart_motion",
                    task = name,
                    period_ms = period.as_millis() as u64,
                    "periodic task started"
                );
            }
            Err(err) => {
                warn!(
                    target: "synheart_motion",
                    task = name,
                    error = %err,
                    "failed to spawn periodic task"
                );
            }
        }

        replaced
    }

    /// Stop ticking. Safe to call when already stopped.
    ///
    /// When called from inside the tick callback the worker is signalled but not
    /// joined; it exits after the current tick returns.
    pub fn stop(&mut self) {
        if let Some(stopping) = self.signal_stop() {
            stopping.join();
        }
    }

    /// Signal the worker to exit without waiting for it.
    ///
    /// The returned handle joins the worker; callers holding a lock around the
    /// task can release it before joining.
    pub fn signal_stop(&mut self) -> Option<Stopping> {
        let worker = self.worker.take()?;
        let _ = worker.stop_tx.try_send(());

        Some(Stopping {
            name: self.name,
            handle: worker.handle,
            thread_id: worker.thread_id,
        })
    }
}

/// A signalled worker that has not been joined yet
pub struct Stopping {
    name: &'static str,
    handle: JoinHandle<()>,
    thread_id: ThreadId,
}

impl Stopping {
    /// Wait for the worker to exit; a no-op on the worker thread itself
    pub fn join(self) {
        if self.thread_id == thread::current().id() {
            return;
        }
        if self.handle.join().is_err() {
            warn!(target: "synheart_motion", task = self.name, "periodic task panicked");
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}
