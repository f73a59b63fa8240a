//! The two handoff queues of the bridge.
//!
//! - The main-thread queue accepts closures from the scripting thread and runs
//!   them on a small pool of worker threads.
//! - The scripting-thread queue accepts closures from any thread; the
//!   [`EventLoop`](crate::EventLoop) runs them on the scripting thread.
//!
//! A closure posted to either queue runs at most once and entirely on its
//! target thread. Both queues are unbounded FIFO channels, so posting never
//! blocks.

use crate::SchedulerConfig;
use core_types::BridgeError;
use crossbeam::channel::{self, Receiver, Sender};
use script_engine::Env;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

/// Work destined for a main/worker thread.
pub type MainJob = Box<dyn FnOnce() + Send + 'static>;

/// Work destined for the scripting thread. It receives the engine there.
pub type ScriptJob = Box<dyn FnOnce(&Env) + Send + 'static>;

/// Producer side of the main-thread queue.
#[derive(Clone)]
pub struct MainThreadHandle {
    sender: Sender<MainJob>,
}

impl MainThreadHandle {
    /// Posts a job to run on a worker thread.
    ///
    /// Fails with [`BridgeError::HostUnavailable`] once the pool has shut down.
    pub fn post(&self, job: MainJob) -> Result<(), BridgeError> {
        self.sender
            .send(job)
            .map_err(|_| BridgeError::HostUnavailable("main-thread queue is closed".to_string()))
    }
}

impl std::fmt::Debug for MainThreadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MainThreadHandle {{ queued: {} }}", self.sender.len())
    }
}

/// The worker threads draining the main-thread queue.
///
/// Dropping the pool closes the queue and joins every worker once the jobs
/// already queued have run.
pub struct MainThreadPool {
    sender: Option<Sender<MainJob>>,
    workers: Vec<JoinHandle<()>>,
}

impl MainThreadPool {
    /// Spawns `config.worker_threads` workers (at least one).
    pub fn new(config: &SchedulerConfig) -> Result<Self, BridgeError> {
        let (sender, receiver) = channel::unbounded::<MainJob>();
        let count = config.worker_threads.max(1);
        let mut workers = Vec::with_capacity(count);

        for index in 0..count {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, index))
                .spawn(move || worker_loop(index, receiver))
                .map_err(|e| {
                    BridgeError::HostUnavailable(format!("failed to spawn worker thread: {}", e))
                })?;
            workers.push(handle);
        }

        tracing::debug!(workers = count, "main-thread pool started");
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    /// Returns a producer for this pool's queue.
    pub fn handle(&self) -> Option<MainThreadHandle> {
        self.sender.as_ref().map(|sender| MainThreadHandle {
            sender: sender.clone(),
        })
    }

    /// Returns the number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Closes the queue and waits for every worker to exit.
    ///
    /// Workers only exit once every [`MainThreadHandle`] has been dropped too.
    pub fn shutdown(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("main-thread worker exited abnormally");
            }
        }
    }
}

impl Drop for MainThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(index: usize, receiver: Receiver<MainJob>) {
    for job in receiver.iter() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            let error = BridgeError::from_panic(payload);
            tracing::error!(worker = index, %error, "main-thread job panicked");
        }
    }
    tracing::trace!(worker = index, "main-thread worker exiting");
}

/// Producer side of the scripting-thread queue. `Send` and cheap to clone.
#[derive(Clone)]
pub struct ScriptSender {
    sender: Sender<ScriptJob>,
}

impl ScriptSender {
    /// Posts a job to run on the scripting thread.
    ///
    /// Fails with [`BridgeError::HostUnavailable`] once the event loop is gone.
    pub fn post(&self, job: ScriptJob) -> Result<(), BridgeError> {
        self.sender.send(job).map_err(|_| {
            BridgeError::HostUnavailable("scripting-thread queue is closed".to_string())
        })
    }
}

impl std::fmt::Debug for ScriptSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScriptSender {{ queued: {} }}", self.sender.len())
    }
}

/// Creates the scripting-thread queue.
pub fn script_queue() -> (ScriptSender, Receiver<ScriptJob>) {
    let (sender, receiver) = channel::unbounded();
    (ScriptSender { sender }, receiver)
}
