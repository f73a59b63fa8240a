//! Cross-thread tasks.
//!
//! A [`Task`] carries one unit of work from the scripting thread to a main
//! thread and its result back:
//!
//! ```text
//! Created --schedule_on_main_thread--> MainScheduled --set_result--> ResultSet
//!   --schedule_on_scripting_thread--> ScriptScheduled --get_result--> Delivered
//! ```
//!
//! Each transition is a compare-and-swap on the task state, so calling an
//! operation out of order fails with [`BridgeError::ContractViolation`]
//! instead of corrupting the result. The result itself is handed over through
//! a one-slot channel: the main thread sends it, the scripting thread receives
//! it, and the two never touch it at the same time.
//!
//! The runtime guarantees that every promise returned by
//! [`Task::schedule_on_main_thread`] settles, even when a handler panics,
//! drops the task without finishing the handoff or produces a result that
//! cannot be converted.

use crate::event_loop::Scheduler;
use crate::task_queue::ScriptSender;
use crate::{CancellationToken, PromiseAdapter};
use core_types::{BridgeError, Value};
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use script_engine::{Deferred, Env, Handle};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of a [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TaskState {
    /// Created on the scripting thread, not yet scheduled
    Created = 0,
    /// Main-thread handler queued or running
    MainScheduled = 1,
    /// Result stored, scripting-thread continuation not yet queued
    ResultSet = 2,
    /// Scripting-thread continuation queued or running
    ScriptScheduled = 3,
    /// Result read on the scripting thread
    Delivered = 4,
}

impl TaskState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => TaskState::Created,
            1 => TaskState::MainScheduled,
            2 => TaskState::ResultSet,
            3 => TaskState::ScriptScheduled,
            _ => TaskState::Delivered,
        }
    }
}

/// The value a main-thread handler produced, and whether it is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    /// The stored value
    pub value: Value,
    /// True if the value should reject rather than resolve the promise
    pub is_error: bool,
}

/// Connection to the event loop, fixed when the task is scheduled.
struct Link {
    script: ScriptSender,
    outstanding: Arc<AtomicUsize>,
}

/// One in-flight asynchronous operation.
///
/// Tasks are shared through `Arc`: the scripting thread creates one, the
/// main-thread queue keeps it alive while the handler runs, and the
/// scripting-thread queue keeps it alive until the promise has settled.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, SchedulerConfig, Task};
/// use core_types::Value;
/// use script_engine::{EngineConfig, Env, PromiseState};
///
/// let event_loop = EventLoop::new(Env::new(EngineConfig::default()), SchedulerConfig::default()).unwrap();
/// let env = event_loop.env();
///
/// let task = Task::create();
/// let promise = task
///     .schedule_on_main_thread(env, |task| {
///         task.set_result(Value::from(42), false).unwrap();
///         task.schedule_on_scripting_thread(Task::deliver).unwrap();
///     })
///     .unwrap();
/// assert_eq!(env.promise_state(promise).unwrap(), PromiseState::Pending);
///
/// event_loop.run_until_idle().unwrap();
/// let PromiseState::Fulfilled(answer) = env.promise_state(promise).unwrap() else {
///     panic!("promise did not resolve");
/// };
/// assert_eq!(Value::from_handle(env, answer).unwrap(), Value::from(42));
/// ```
pub struct Task {
    id: u64,
    state: AtomicU8,
    result_tx: Sender<TaskResult>,
    result_rx: Receiver<TaskResult>,
    deferred: Mutex<Option<Deferred>>,
    fallback: OnceLock<Handle>,
    link: OnceLock<Link>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Task {
    /// Creates a task in the [`TaskState::Created`] state.
    pub fn create() -> Arc<Task> {
        let (result_tx, result_rx) = channel::bounded(1);
        Arc::new(Task {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            state: AtomicU8::new(TaskState::Created as u8),
            result_tx,
            result_rx,
            deferred: Mutex::new(None),
            fallback: OnceLock::new(),
            link: OnceLock::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Creates a task and runs `work` on the main thread, settling the
    /// returned promise with its outcome.
    ///
    /// This is the common case of [`schedule_on_main_thread`](Self::schedule_on_main_thread):
    /// `Ok` resolves, `Err` rejects with [`BridgeError::to_value`].
    pub fn spawn<F>(env: &Env, work: F) -> Result<Handle, BridgeError>
    where
        F: FnOnce(&CancellationToken) -> Result<Value, BridgeError> + Send + 'static,
    {
        Task::create().run_on_main_thread(env, work)
    }

    /// Like [`spawn`](Self::spawn), on an existing task so callers can keep
    /// it for cancellation.
    pub fn run_on_main_thread<F>(self: &Arc<Self>, env: &Env, work: F) -> Result<Handle, BridgeError>
    where
        F: FnOnce(&CancellationToken) -> Result<Value, BridgeError> + Send + 'static,
    {
        self.schedule_on_main_thread(env, move |task| {
            let (value, is_error) = match work(&task.cancel) {
                Ok(value) => (value, false),
                Err(error) => (error.to_value(), true),
            };
            if let Err(error) = task.set_result(value, is_error) {
                tracing::error!(task_id = task.id, %error, "failed to store task result");
                return;
            }
            if let Err(error) = task.schedule_on_scripting_thread(Task::deliver) {
                tracing::error!(task_id = task.id, %error, "failed to queue task delivery");
            }
        })
    }

    /// Returns the process-unique id of this task.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns a token observing this task's cancellation.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Requests cancellation.
    ///
    /// If the main-thread handler has not started yet it is skipped and the
    /// promise rejects with [`BridgeError::Cancelled`]. A handler already
    /// running only sees the request through its token.
    pub fn cancel(&self) {
        tracing::debug!(task_id = self.id, state = ?self.state(), "task cancellation requested");
        self.cancel.cancel();
    }

    /// Returns true once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn transition(&self, from: TaskState, to: TaskState) -> Result<(), BridgeError> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| {
                tracing::trace!(task_id = self.id, ?from, ?to, "task transition");
            })
            .map_err(|actual| {
                let actual = TaskState::from_u8(actual);
                tracing::warn!(task_id = self.id, expected = ?from, ?actual, "task contract violation");
                BridgeError::ContractViolation(format!(
                    "task {} is {:?}, expected {:?} before moving to {:?}",
                    self.id, actual, from, to
                ))
            })
    }

    /// Queues `handler` on the main thread and returns a pending promise.
    ///
    /// Must be called on the scripting thread: the `env` it takes cannot
    /// leave that thread. Returns immediately; the handler runs later on a
    /// worker. The handler is expected to call [`set_result`](Self::set_result)
    /// and then [`schedule_on_scripting_thread`](Self::schedule_on_scripting_thread),
    /// either itself or from any thread it hands the task to. If it panics,
    /// or the last reference to the task is released before delivery was
    /// queued, the runtime completes the handoff itself.
    ///
    /// Fails with [`BridgeError::ContractViolation`] if the task was already
    /// scheduled and with [`BridgeError::HostUnavailable`] if `env` has no
    /// [`EventLoop`](crate::EventLoop) attached.
    pub fn schedule_on_main_thread<F>(self: &Arc<Self>, env: &Env, handler: F) -> Result<Handle, BridgeError>
    where
        F: FnOnce(&Arc<Task>) + Send + 'static,
    {
        let scheduler = env.instance_data::<Scheduler>().ok_or_else(|| {
            BridgeError::HostUnavailable("no event loop is attached to this environment".to_string())
        })?;
        self.transition(TaskState::Created, TaskState::MainScheduled)?;

        // The fallback reason is allocated up front so the promise can still
        // be rejected once the heap is full.
        let allocated = env.create_deferred().and_then(|pair| {
            if self.fallback.get().is_none() {
                let reason = env.create_error("InternalError", "task result could not be delivered")?;
                let _ = self.fallback.set(reason);
            }
            Ok(pair)
        });
        let (deferred, promise) = match allocated {
            Ok(pair) => pair,
            Err(error) => {
                self.state.store(TaskState::Created as u8, Ordering::Release);
                return Err(error.into());
            }
        };
        *self.deferred.lock() = Some(deferred);
        let _ = self.link.set(Link {
            script: scheduler.script.clone(),
            outstanding: Arc::clone(&scheduler.outstanding),
        });

        scheduler.outstanding.fetch_add(1, Ordering::AcqRel);
        let task = Arc::clone(self);
        if let Err(error) = scheduler.main.post(Box::new(move || task.run_main(handler))) {
            scheduler.outstanding.fetch_sub(1, Ordering::AcqRel);
            self.deferred.lock().take();
            self.state.store(TaskState::Created as u8, Ordering::Release);
            return Err(error);
        }

        tracing::debug!(task_id = self.id, promise = promise.index(), "task scheduled on main thread");
        Ok(promise)
    }

    /// Stores the result. Called once, from the main-thread handler or any
    /// thread it hands the task to.
    ///
    /// A second call, or a call after the continuation was queued, fails
    /// with [`BridgeError::ContractViolation`] and leaves the stored result
    /// untouched.
    pub fn set_result(&self, value: Value, is_error: bool) -> Result<(), BridgeError> {
        // The value is in the slot before the state says so.
        self.result_tx
            .try_send(TaskResult { value, is_error })
            .map_err(|_| {
                tracing::warn!(task_id = self.id, state = ?self.state(), "task result already set");
                BridgeError::ContractViolation(format!("task {} result is already set", self.id))
            })?;
        if let Err(error) = self.transition(TaskState::MainScheduled, TaskState::ResultSet) {
            // The slot was empty before the send, so this only takes our own value back.
            let _ = self.result_rx.try_recv();
            return Err(error);
        }
        Ok(())
    }

    /// Queues `handler` on the scripting thread. Called from the main-thread
    /// handler after [`set_result`](Self::set_result).
    ///
    /// The handler receives the task, the engine and the promise adapter. If
    /// it returns an error, panics or returns without settling the promise,
    /// the promise is rejected with an error value.
    pub fn schedule_on_scripting_thread<F>(self: &Arc<Self>, handler: F) -> Result<(), BridgeError>
    where
        F: FnOnce(&Task, &Env, &PromiseAdapter) -> Result<(), BridgeError> + Send + 'static,
    {
        self.transition(TaskState::ResultSet, TaskState::ScriptScheduled)?;
        let link = self.link.get().ok_or_else(|| {
            BridgeError::ContractViolation(format!("task {} has no event loop", self.id))
        })?;
        let task = Arc::clone(self);
        link.script
            .post(Box::new(move |env: &Env| task.run_script(env, handler)))?;
        tracing::trace!(task_id = self.id, "task delivery queued on scripting thread");
        Ok(())
    }

    /// Takes the stored result. Called from the scripting-thread handler.
    ///
    /// Requiring `env` keeps this on the scripting thread. A second call
    /// fails with [`BridgeError::ContractViolation`].
    pub fn get_result(&self, _env: &Env) -> Result<TaskResult, BridgeError> {
        self.transition(TaskState::ScriptScheduled, TaskState::Delivered)?;
        self.result_rx.try_recv().map_err(|_| {
            BridgeError::ContractViolation(format!("task {} has no stored result", self.id))
        })
    }

    /// The standard scripting-thread handler: resolves the promise with the
    /// stored value, or rejects it if the value is an error.
    pub fn deliver(task: &Task, env: &Env, promise: &PromiseAdapter) -> Result<(), BridgeError> {
        let result = task.get_result(env)?;
        promise.settle(env, &result.value, result.is_error)
    }

    fn run_main<F>(self: &Arc<Self>, handler: F)
    where
        F: FnOnce(&Arc<Task>),
    {
        if self.is_cancelled() {
            tracing::debug!(task_id = self.id, "task cancelled before main-thread handler ran");
            self.complete_with_error(BridgeError::Cancelled);
            return;
        }

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(self))) {
            let error = BridgeError::from_panic(payload);
            tracing::error!(task_id = self.id, %error, "main-thread handler panicked");
            self.complete_with_error(error);
        }
    }

    /// Finishes whatever part of the handoff the main-thread handler left
    /// undone. A result already stored takes precedence over `error`.
    fn complete_with_error(self: &Arc<Self>, error: BridgeError) {
        if self.state() == TaskState::MainScheduled {
            if let Err(e) = self.set_result(error.to_value(), true) {
                tracing::error!(task_id = self.id, error = %e, "failed to store error result");
                return;
            }
        }
        if self.state() == TaskState::ResultSet {
            if let Err(e) = self.schedule_on_scripting_thread(Task::deliver) {
                tracing::error!(task_id = self.id, error = %e, "failed to queue task delivery");
            }
        }
    }

    fn run_script<F>(&self, env: &Env, handler: F)
    where
        F: FnOnce(&Task, &Env, &PromiseAdapter) -> Result<(), BridgeError>,
    {
        let _scope = env.open_scope();
        let Some(deferred) = self.deferred.lock().take() else {
            tracing::error!(task_id = self.id, "task delivered twice");
            return;
        };
        let promise = PromiseAdapter::new(deferred);

        let failure = match panic::catch_unwind(AssertUnwindSafe(|| handler(self, env, &promise))) {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(error),
            Err(payload) => Some(BridgeError::from_panic(payload)),
        };
        if let Some(error) = &failure {
            tracing::warn!(task_id = self.id, %error, "scripting-thread handler failed");
        }

        if !promise.is_settled() {
            let error = failure.unwrap_or_else(|| {
                BridgeError::ContractViolation(format!(
                    "task {} handler returned without settling its promise",
                    self.id
                ))
            });
            reject_with(env, &promise, &error, self.fallback.get().copied());
        }

        // A handler that never read the result still completes the task.
        let _ = self.state.compare_exchange(
            TaskState::ScriptScheduled as u8,
            TaskState::Delivered as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if let Some(link) = self.link.get() {
            link.outstanding.fetch_sub(1, Ordering::AcqRel);
        }
        tracing::debug!(task_id = self.id, "task delivered");
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        let state = self.state();
        if !matches!(state, TaskState::MainScheduled | TaskState::ResultSet) {
            return;
        }
        let (Some(link), Some(deferred)) = (self.link.get(), self.deferred.get_mut().take()) else {
            return;
        };
        let result = self.result_rx.try_recv().unwrap_or_else(|_| TaskResult {
            value: BridgeError::ContractViolation(format!(
                "task {} released without a result",
                self.id
            ))
            .to_value(),
            is_error: true,
        });
        tracing::warn!(task_id = self.id, ?state, "task released before delivery");

        let outstanding = Arc::clone(&link.outstanding);
        let fallback = self.fallback.get().copied();
        let settle = move |env: &Env| {
            let promise = PromiseAdapter::new(deferred);
            if let Err(error) = promise.settle(env, &result.value, result.is_error) {
                reject_with(env, &promise, &error, fallback);
            }
            outstanding.fetch_sub(1, Ordering::AcqRel);
        };
        if let Err(error) = link.script.post(Box::new(settle)) {
            tracing::error!(task_id = self.id, %error, "released task could not be settled");
        }
    }
}

/// Rejects `promise` with `error`, falling back to a plain error object if
/// the full error value cannot be built, and to the task's pre-allocated
/// `fallback` reason if the heap has no room for either.
fn reject_with(env: &Env, promise: &PromiseAdapter, error: &BridgeError, fallback: Option<Handle>) {
    let settled = promise
        .settle(env, &error.to_value(), true)
        .or_else(|_| {
            let reason = env.create_error("Error", &error.to_string())?;
            promise.reject(env, reason)
        })
        .or_else(|e| match fallback {
            Some(reason) => {
                tracing::warn!(promise = promise.id(), error = %e, "rejecting with fallback reason");
                promise.reject(env, reason)
            }
            None => Err(e),
        });
    if let Err(e) = settled {
        tracing::error!(promise = promise.id(), error = %e, "promise could not be settled");
    }
}
