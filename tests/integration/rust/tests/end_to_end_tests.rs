//! End-to-end task bridge scenarios
//!
//! Each test drives the whole path: scripting thread -> main-thread queue ->
//! worker -> scripting-thread queue -> promise settlement.

use async_runtime::{Task, TaskState};
use core_types::{BridgeError, ErrorKind, Value};
use crossbeam::channel;
use integration_tests::{settled, start_loop};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

fn sample() -> Value {
    Value::from_json(json!({"a": 1, "b": [true, null, "s"]}))
}

#[test]
fn echo_task_resolves_with_deep_copy() {
    let el = start_loop(1);
    let env = el.env();
    let arg = sample().convert(env).unwrap();

    // Capture on the scripting thread, move into the handler.
    let captured = Value::from_handle(env, arg).unwrap();
    let promise = Task::spawn(env, move |_| Ok(captured)).unwrap();
    el.run_until_idle().unwrap();

    let result = settled(env, promise).unwrap();
    assert_eq!(result, sample());
    assert_eq!(result.to_json().unwrap(), json!({"a": 1, "b": [true, null, "s"]}));
}

#[test]
fn throwing_handler_rejects_without_crash() {
    let el = start_loop(1);
    let promise = Task::create()
        .schedule_on_main_thread(el.env(), |_task| panic!("handler threw"))
        .unwrap();
    el.run_until_idle().unwrap();

    let reason = settled(el.env(), promise).unwrap_err();
    assert_ne!(reason, Value::Null);
    assert!(matches!(reason, Value::Error { .. }));

    // The worker survived the panic.
    let promise = Task::spawn(el.env(), |_| Ok(Value::from("still alive"))).unwrap();
    el.run_until_idle().unwrap();
    assert_eq!(settled(el.env(), promise), Ok(Value::from("still alive")));
}

#[test]
fn schedule_returns_pending_before_handler_runs() {
    let el = start_loop(1);
    let (entered_tx, entered_rx) = channel::bounded::<()>(1);
    let (release_tx, release_rx) = channel::bounded::<()>(1);
    let promise = Task::spawn(el.env(), move |_| {
        entered_tx.send(()).unwrap();
        release_rx.recv().unwrap();
        Ok(Value::from(7))
    })
    .unwrap();

    assert!(el.env().promise_state(promise).unwrap().is_pending());
    entered_rx.recv().unwrap();
    assert_eq!(el.run_pending(), 0);
    assert!(el.env().promise_state(promise).unwrap().is_pending());

    release_tx.send(()).unwrap();
    el.run_until_idle().unwrap();
    assert_eq!(settled(el.env(), promise), Ok(Value::from(7)));
}

#[test]
fn result_round_trips_value_and_flag() {
    let el = start_loop(1);
    for is_error in [false, true] {
        let stored = sample();
        let (tx, rx) = channel::bounded(1);
        let promise = Task::create()
            .schedule_on_main_thread(el.env(), move |task| {
                task.set_result(stored, is_error).unwrap();
                task.schedule_on_scripting_thread(move |task, env, promise| {
                    let result = task.get_result(env)?;
                    tx.send((result.value.clone(), result.is_error)).unwrap();
                    promise.settle(env, &result.value, result.is_error)
                })
                .unwrap();
            })
            .unwrap();
        el.run_until_idle().unwrap();

        assert_eq!(rx.recv().unwrap(), (sample(), is_error));
        let outcome = settled(el.env(), promise);
        if is_error {
            assert_eq!(outcome, Err(sample()));
        } else {
            assert_eq!(outcome, Ok(sample()));
        }
    }
}

#[test]
fn set_result_from_another_thread() {
    let el = start_loop(1);
    let promise = Task::create()
        .schedule_on_main_thread(el.env(), move |task| {
            let task = Arc::clone(task);
            let worker = thread::current().id();
            thread::spawn(move || {
                assert_ne!(thread::current().id(), worker);
                task.set_result(Value::from("from helper"), false).unwrap();
                task.schedule_on_scripting_thread(Task::deliver).unwrap();
            });
        })
        .unwrap();
    el.run_until_idle().unwrap();
    assert_eq!(settled(el.env(), promise), Ok(Value::from("from helper")));
}

#[test]
fn continuation_runs_once_and_second_set_result_is_flagged() {
    let el = start_loop(1);
    let (tx, rx) = channel::unbounded();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let promise = Task::create()
        .schedule_on_main_thread(el.env(), move |task| {
            task.set_result(Value::from("first"), false).unwrap();
            tx.send(task.set_result(Value::from("second"), false)).unwrap();
            let deliver = move |task: &Task, env: &script_engine::Env, promise: &async_runtime::PromiseAdapter| {
                counter.fetch_add(1, Ordering::SeqCst);
                Task::deliver(task, env, promise)
            };
            task.schedule_on_scripting_thread(deliver).unwrap();
            tx.send(task.schedule_on_scripting_thread(Task::deliver)).unwrap();
        })
        .unwrap();
    el.run_until_idle().unwrap();

    for outcome in rx.try_iter() {
        assert_eq!(outcome.unwrap_err().kind(), ErrorKind::ContractViolation);
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(settled(el.env(), promise), Ok(Value::from("first")));
}

#[test]
fn concurrent_tasks_settle_with_own_results() {
    let el = start_loop(4);
    let n = 64i32;
    let promises: Vec<_> = (0..n)
        .map(|i| {
            Task::spawn(el.env(), move |_| {
                thread::sleep(std::time::Duration::from_millis(((i * 7) % 5) as u64));
                Ok(Value::Array(vec![Value::from(i), Value::from(format!("task-{}", i))]))
            })
            .unwrap()
        })
        .collect();
    el.run_until_idle().unwrap();

    assert_eq!(el.outstanding(), 0);
    for (i, promise) in (0..n).zip(promises) {
        assert_eq!(
            settled(el.env(), promise),
            Ok(Value::Array(vec![Value::from(i), Value::from(format!("task-{}", i))]))
        );
    }
}

#[test]
fn cancelled_task_rejects_with_cancelled_error() {
    let el = start_loop(1);
    let (release_tx, release_rx) = channel::bounded::<()>(1);
    let blocker = Task::spawn(el.env(), move |_| {
        release_rx.recv().unwrap();
        Ok(Value::Null)
    })
    .unwrap();

    let task = Task::create();
    let promise = task
        .run_on_main_thread(el.env(), |_| Ok(Value::from("should not run")))
        .unwrap();
    task.cancel();
    release_tx.send(()).unwrap();
    el.run_until_idle().unwrap();

    assert_eq!(settled(el.env(), blocker), Ok(Value::Null));
    assert_eq!(settled(el.env(), promise), Err(BridgeError::Cancelled.to_value()));
    assert_eq!(task.state(), TaskState::Delivered);
}

#[test]
fn released_task_without_result_still_rejects() {
    let el = start_loop(1);
    let promise = Task::create()
        .schedule_on_main_thread(el.env(), |_task| {})
        .unwrap();
    el.run_until_idle().unwrap();
    match settled(el.env(), promise) {
        Err(Value::Error { name, .. }) => assert_eq!(name, "ContractViolation"),
        other => panic!("expected rejection, got {:?}", other),
    }
}
