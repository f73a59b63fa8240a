//! Contract tests for async_runtime
//!
//! These pin the public surface native add-ons build on.

use async_runtime::{
    CancellationToken, EventLoop, MainThreadHandle, PromiseAdapter, SchedulerConfig, ScriptSender,
    Task, TaskResult, TaskState,
};
use core_types::{BridgeError, Value};
use script_engine::{EngineConfig, Env};
use std::sync::Arc;

fn assert_send<T: Send>() {}
fn assert_sync<T: Sync>() {}

#[test]
fn cross_thread_types_are_send() {
    assert_send::<Arc<Task>>();
    assert_sync::<Task>();
    assert_send::<TaskResult>();
    assert_send::<CancellationToken>();
    assert_send::<MainThreadHandle>();
    assert_send::<ScriptSender>();
}

#[test]
fn task_create_starts_in_created() {
    assert_eq!(Task::create().state(), TaskState::Created);
}

#[test]
fn schedule_returns_promise_handle() {
    let el = EventLoop::new(Env::new(EngineConfig::default()), SchedulerConfig::default()).unwrap();
    let promise = Task::spawn(el.env(), |_| Ok(Value::Null)).unwrap();
    assert_eq!(el.env().type_of(promise).unwrap().type_of(), "object");
    el.run_until_idle().unwrap();
}

#[test]
fn deliver_matches_scripting_handler_signature() {
    fn takes_handler<F>(_f: F)
    where
        F: FnOnce(&Task, &Env, &PromiseAdapter) -> Result<(), BridgeError> + Send + 'static,
    {
    }
    takes_handler(Task::deliver);
}

#[test]
fn scheduler_config_defaults() {
    let config = SchedulerConfig::default();
    assert_eq!(config.worker_threads, 1);
    assert!(config.idle_timeout_ms > 0);
}

#[test]
fn cancelled_error_value_is_stable() {
    assert_eq!(
        BridgeError::Cancelled.to_value(),
        Value::Error {
            name: "CancelledError".into(),
            message: "task cancelled".into()
        }
    );
}
