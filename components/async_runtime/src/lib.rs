//! Cross-thread task bridge for a single-threaded script engine.
//!
//! Scripts run on one thread. Blocking or CPU-heavy native work runs on a
//! pool of main/worker threads. This crate moves work between the two and
//! hands scripts a promise for every piece of work:
//!
//! - [`Task`] - one asynchronous operation and its state machine
//! - [`EventLoop`] - owns the engine and delivers results on the scripting thread
//! - [`PromiseAdapter`] - settles the promise a task returned
//! - [`MainThreadPool`] / [`ScriptSender`] - the two handoff queues
//!
//! # Overview
//!
//! The scripting thread creates a task and schedules a handler on a worker;
//! it gets a pending promise back right away. The handler computes an
//! engine-independent [`Value`](core_types::Value), stores it with
//! [`Task::set_result`] and queues a continuation with
//! [`Task::schedule_on_scripting_thread`]. The event loop runs that
//! continuation on the scripting thread, which converts the value into the
//! engine and settles the promise.
//!
//! # Examples
//!
//! ```
//! use async_runtime::{EventLoop, SchedulerConfig, Task};
//! use core_types::{BridgeError, Value};
//! use script_engine::{EngineConfig, Env, PromiseState};
//!
//! let event_loop = EventLoop::new(Env::new(EngineConfig::default()), SchedulerConfig::default()).unwrap();
//! let env = event_loop.env();
//!
//! let ok = Task::spawn(env, |_| Ok(Value::from("hello world"))).unwrap();
//! let failed = Task::spawn(env, |_| Err(BridgeError::Operation("disk full".into()))).unwrap();
//! event_loop.run_until_idle().unwrap();
//!
//! assert!(matches!(env.promise_state(ok).unwrap(), PromiseState::Fulfilled(_)));
//! assert!(matches!(env.promise_state(failed).unwrap(), PromiseState::Rejected(_)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod cancel;
pub mod config;
pub mod event_loop;
pub mod promise;
pub mod task;
pub mod task_queue;

// Re-export main types at crate root
pub use cancel::CancellationToken;
pub use config::SchedulerConfig;
pub use event_loop::EventLoop;
pub use promise::PromiseAdapter;
pub use task::{Task, TaskResult, TaskState};
pub use task_queue::{script_queue, MainJob, MainThreadHandle, MainThreadPool, ScriptJob, ScriptSender};
