//! The scripting-thread event loop.
//!
//! The loop owns the engine environment, the receiving end of the
//! scripting-thread queue and the main-thread worker pool. Tasks find the
//! queues through the environment's instance data, so anything holding an
//! [`Env`] can schedule work without a reference to the loop itself.

use crate::task_queue::{script_queue, MainThreadHandle, MainThreadPool, ScriptJob, ScriptSender};
use crate::SchedulerConfig;
use core_types::BridgeError;
use crossbeam::channel::{Receiver, RecvTimeoutError};
use script_engine::Env;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// The queues a task needs, stored in the environment's instance data.
pub(crate) struct Scheduler {
    pub(crate) main: MainThreadHandle,
    pub(crate) script: ScriptSender,
    pub(crate) outstanding: Arc<AtomicUsize>,
}

/// Drives delivery of task results on the scripting thread.
///
/// The loop is bound to the thread that created it: it holds an [`Env`],
/// which cannot leave that thread.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, SchedulerConfig, Task};
/// use core_types::Value;
/// use script_engine::{EngineConfig, Env};
///
/// let event_loop = EventLoop::new(Env::new(EngineConfig::default()), SchedulerConfig::default()).unwrap();
/// let promise = Task::spawn(event_loop.env(), |_| Ok(Value::from("done"))).unwrap();
/// assert_eq!(event_loop.outstanding(), 1);
///
/// event_loop.run_until_idle().unwrap();
/// assert_eq!(event_loop.outstanding(), 0);
/// assert!(!event_loop.env().promise_state(promise).unwrap().is_pending());
/// ```
pub struct EventLoop {
    env: Env,
    receiver: Receiver<ScriptJob>,
    script: ScriptSender,
    pool: MainThreadPool,
    outstanding: Arc<AtomicUsize>,
    config: SchedulerConfig,
}

impl EventLoop {
    /// Starts the main-thread pool and attaches the scheduler to `env`.
    ///
    /// Fails with [`BridgeError::ContractViolation`] if `env` already has an
    /// event loop attached.
    pub fn new(env: Env, config: SchedulerConfig) -> Result<Self, BridgeError> {
        if env.instance_data::<Scheduler>().is_some() {
            return Err(BridgeError::ContractViolation(
                "environment already has an event loop".to_string(),
            ));
        }

        let pool = MainThreadPool::new(&config)?;
        let main = pool
            .handle()
            .ok_or_else(|| BridgeError::HostUnavailable("main-thread pool is closed".to_string()))?;
        let (script, receiver) = script_queue();
        let outstanding = Arc::new(AtomicUsize::new(0));

        env.set_instance_data(std::rc::Rc::new(Scheduler {
            main,
            script: script.clone(),
            outstanding: Arc::clone(&outstanding),
        }));

        tracing::info!(
            workers = pool.worker_count(),
            idle_timeout_ms = config.idle_timeout_ms,
            "event loop started"
        );
        Ok(Self {
            env,
            receiver,
            script,
            pool,
            outstanding,
            config,
        })
    }

    /// Returns the engine environment.
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Returns the configuration the loop was started with.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Returns a producer for the scripting-thread queue.
    pub fn script_sender(&self) -> ScriptSender {
        self.script.clone()
    }

    /// Number of tasks scheduled whose promise has not settled yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Runs every job already queued for the scripting thread without
    /// blocking. Returns the number of jobs run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            self.run_job(job);
            ran += 1;
        }
        ran
    }

    /// Runs scripting-thread jobs until no task is outstanding.
    ///
    /// Blocks while waiting for main-thread handlers. Fails with
    /// [`BridgeError::HostUnavailable`] if no job arrives within the
    /// configured idle timeout while tasks are still outstanding.
    pub fn run_until_idle(&self) -> Result<usize, BridgeError> {
        let mut ran = self.run_pending();
        let timeout = self.config.idle_timeout();

        while self.outstanding() > 0 {
            match self.receiver.recv_timeout(timeout) {
                Ok(job) => {
                    self.run_job(job);
                    ran += 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    let pending = self.outstanding();
                    tracing::warn!(pending, ?timeout, "event loop timed out waiting for tasks");
                    return Err(BridgeError::HostUnavailable(format!(
                        "{} task(s) still outstanding after {:?}",
                        pending, timeout
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        ran += self.run_pending();
        tracing::trace!(jobs = ran, "event loop idle");
        Ok(ran)
    }

    fn run_job(&self, job: ScriptJob) {
        let _scope = self.env.open_scope();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| job(&self.env))) {
            let error = BridgeError::from_panic(payload);
            tracing::error!(%error, "scripting-thread job panicked");
        }
        if self.env.is_exception_pending() {
            if let Some(exception) = self.env.take_exception() {
                tracing::warn!(exception = exception.index(), "uncaught exception cleared by event loop");
            }
        }
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        let pending = self.outstanding();
        if pending > 0 {
            tracing::warn!(pending, "event loop dropped with outstanding tasks");
        }
        self.env.clear_instance_data();
        self.pool.shutdown();
        tracing::debug!("event loop stopped");
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("workers", &self.pool.worker_count())
            .field("outstanding", &self.outstanding())
            .field("queued", &self.receiver.len())
            .finish()
    }
}
