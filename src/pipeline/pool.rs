//! Bounded worker pool: N threads fed by a bounded queue, with a completion barrier.
//!
//! `dispatch` blocks while the queue is full, which is what keeps memory flat on huge containers.
//! `wait_idle` returns once every dispatched task has finished (not merely been dequeued).

use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, error, warn};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Count of dispatched-but-unfinished tasks; waiters wake when it reaches zero.
#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn add(&self) {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn done(&self) {
        let mut n = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *n = n.saturating_sub(1);
        if *n == 0 {
            self.idle.notify_all();
        }
    }

    fn get(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_zero(&self) {
        let mut n = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *n > 0 {
            n = self.idle.wait(n).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Marks one task finished when dropped, including when the handler panics.
struct TaskGuard<'a>(&'a Pending);

impl Drop for TaskGuard<'_> {
    fn drop(&mut self) {
        self.0.done();
    }
}

/// Reports worker exit to the pool when dropped, including on panic.
struct ExitGuard {
    id: usize,
    done_tx: Sender<usize>,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("worker {} exited after a panic", self.id);
        }
        let _ = self.done_tx.send(self.id);
    }
}

pub struct WorkerPool<T> {
    task_tx: Option<Sender<T>>,
    done_rx: Receiver<usize>,
    handles: Vec<JoinHandle<()>>,
    pending: Arc<Pending>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Spawn `workers` threads (at least one) sharing a queue of `queue_capacity` slots.
    pub fn new<F>(workers: usize, queue_capacity: usize, handler: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let workers = workers.max(1);
        let (task_tx, task_rx) = bounded::<T>(queue_capacity.max(1));
        let (done_tx, done_rx) = bounded::<usize>(workers);
        let pending = Arc::new(Pending::default());
        let handler = Arc::new(handler);

        let handles = (0..workers)
            .map(|id| {
                let task_rx = task_rx.clone();
                let pending = Arc::clone(&pending);
                let handler = Arc::clone(&handler);
                let exit = ExitGuard {
                    id,
                    done_tx: done_tx.clone(),
                };
                thread::spawn(move || {
                    let _exit = exit;
                    while let Ok(task) = task_rx.recv() {
                        let _task = TaskGuard(&pending);
                        (*handler)(task);
                    }
                })
            })
            .collect();
        debug!("worker pool up: {workers} workers, queue {queue_capacity}");

        WorkerPool {
            task_tx: Some(task_tx),
            done_rx,
            handles,
            pending,
        }
    }

    /// Queue a task, blocking while the queue is full. Returns the task if no worker is left to run it.
    pub fn dispatch(&self, task: T) -> Result<(), T> {
        let Some(tx) = &self.task_tx else {
            return Err(task);
        };
        self.pending.add();
        tx.send(task).map_err(|e| {
            self.pending.done();
            e.into_inner()
        })
    }

    /// Tasks dispatched and not yet finished (queued or running).
    pub fn pending(&self) -> usize {
        self.pending.get()
    }

    /// Block until every dispatched task has finished.
    pub fn wait_idle(&self) {
        self.pending.wait_zero();
    }

    /// Close the queue and wait up to `timeout` for workers to drain it and exit.
    /// Returns false if some workers were still running at the deadline; those are left detached.
    pub fn shutdown(mut self, timeout: Duration) -> bool {
        drop(self.task_tx.take());
        let deadline = Instant::now() + timeout;
        let total = self.handles.len();
        let mut exited = 0;
        while exited < total {
            match self.done_rx.recv_deadline(deadline) {
                Ok(_) => exited += 1,
                Err(_) => break,
            }
        }
        if exited < total {
            warn!(
                "{} of {} workers still running after {:?}; continuing without them",
                total - exited,
                total,
                timeout
            );
            return false;
        }
        for h in self.handles.drain(..) {
            let _ = h.join();
        }
        true
    }
}
