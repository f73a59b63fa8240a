//! Unit tests for async_runtime

mod task_test;

use async_runtime::{EventLoop, SchedulerConfig};
use core_types::Value;
use script_engine::{EngineConfig, Env, Handle, PromiseState};

pub(crate) fn event_loop() -> EventLoop {
    EventLoop::new(Env::new(EngineConfig::default()), SchedulerConfig::default()).unwrap()
}

/// Returns the captured fulfilment value, or the rejection reason as `Err`.
pub(crate) fn outcome(env: &Env, promise: Handle) -> Result<Value, Value> {
    match env.promise_state(promise).unwrap() {
        PromiseState::Fulfilled(v) => Ok(Value::from_handle(env, v).unwrap()),
        PromiseState::Rejected(r) => Err(Value::from_handle(env, r).unwrap()),
        PromiseState::Pending => panic!("promise is still pending"),
    }
}
