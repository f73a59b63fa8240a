//! Unit tests for Task

use super::{event_loop, outcome};
use async_runtime::{EventLoop, SchedulerConfig, Task, TaskState};
use core_types::{BridgeError, ErrorKind, Value};
use crossbeam::channel;
use script_engine::{EngineConfig, Env};
use std::sync::Arc;
use std::thread;

#[test]
fn spawn_resolves_with_work_result() {
    let el = event_loop();
    let promise = Task::spawn(el.env(), |_| Ok(Value::from("hello world"))).unwrap();
    el.run_until_idle().unwrap();
    assert_eq!(outcome(el.env(), promise), Ok(Value::from("hello world")));
}

#[test]
fn spawn_error_rejects_with_error_value() {
    let el = event_loop();
    let promise =
        Task::spawn(el.env(), |_| Err(BridgeError::Operation("disk full".into()))).unwrap();
    el.run_until_idle().unwrap();
    assert_eq!(
        outcome(el.env(), promise),
        Err(Value::Error {
            name: "Error".into(),
            message: "disk full".into()
        })
    );
}

#[test]
fn promise_is_pending_until_handler_finishes() {
    let el = event_loop();
    let (go_tx, go_rx) = channel::bounded::<()>(1);
    let promise = Task::spawn(el.env(), move |_| {
        go_rx.recv().unwrap();
        Ok(Value::Boolean(true))
    })
    .unwrap();

    el.run_pending();
    assert!(el.env().promise_state(promise).unwrap().is_pending());

    go_tx.send(()).unwrap();
    el.run_until_idle().unwrap();
    assert_eq!(outcome(el.env(), promise), Ok(Value::Boolean(true)));
}

#[test]
fn main_handler_runs_off_the_scripting_thread() {
    let el = event_loop();
    let scripting = std::thread::current().id();
    let promise = Task::spawn(el.env(), move |_| {
        Ok(Value::Boolean(std::thread::current().id() != scripting))
    })
    .unwrap();
    el.run_until_idle().unwrap();
    assert_eq!(outcome(el.env(), promise), Ok(Value::Boolean(true)));
}

#[test]
fn panicking_handler_rejects_promise() {
    let el = event_loop();
    let promise = Task::create()
        .schedule_on_main_thread(el.env(), |_task| panic!("native crash"))
        .unwrap();
    el.run_until_idle().unwrap();
    let reason = outcome(el.env(), promise).unwrap_err();
    assert_eq!(
        reason,
        Value::Error {
            name: "InternalError".into(),
            message: "native handler panicked: native crash".into()
        }
    );
}

#[test]
fn is_error_result_rejects_with_equal_value() {
    let el = event_loop();
    let reason = Value::from("plain rejection");
    let stored = reason.clone();
    let promise = Task::create()
        .schedule_on_main_thread(el.env(), move |task| {
            task.set_result(stored, true).unwrap();
            task.schedule_on_scripting_thread(Task::deliver).unwrap();
        })
        .unwrap();
    el.run_until_idle().unwrap();
    assert_eq!(outcome(el.env(), promise), Err(reason));
}

#[test]
fn second_set_result_is_contract_violation() {
    let el = event_loop();
    let (tx, rx) = channel::bounded(1);
    let promise = Task::create()
        .schedule_on_main_thread(el.env(), move |task| {
            task.set_result(Value::from(1), false).unwrap();
            tx.send(task.set_result(Value::from(2), false)).unwrap();
            task.schedule_on_scripting_thread(Task::deliver).unwrap();
        })
        .unwrap();
    el.run_until_idle().unwrap();

    let second = rx.recv().unwrap().unwrap_err();
    assert_eq!(second.kind(), ErrorKind::ContractViolation);
    assert_eq!(outcome(el.env(), promise), Ok(Value::from(1)));
}

#[test]
fn second_schedule_on_scripting_thread_is_rejected() {
    let el = event_loop();
    let (tx, rx) = channel::bounded(1);
    let promise = Task::create()
        .schedule_on_main_thread(el.env(), move |task| {
            task.set_result(Value::Null, false).unwrap();
            task.schedule_on_scripting_thread(Task::deliver).unwrap();
            tx.send(task.schedule_on_scripting_thread(Task::deliver)).unwrap();
        })
        .unwrap();
    el.run_until_idle().unwrap();

    assert_eq!(rx.recv().unwrap().unwrap_err().kind(), ErrorKind::ContractViolation);
    assert_eq!(outcome(el.env(), promise), Ok(Value::Null));
}

#[test]
fn scripting_handler_that_does_not_settle_rejects() {
    let el = event_loop();
    let promise = Task::create()
        .schedule_on_main_thread(el.env(), |task| {
            task.set_result(Value::Null, false).unwrap();
            task.schedule_on_scripting_thread(|_task, _env, _promise| Ok(()))
                .unwrap();
        })
        .unwrap();
    el.run_until_idle().unwrap();
    match outcome(el.env(), promise) {
        Err(Value::Error { name, .. }) => assert_eq!(name, "ContractViolation"),
        other => panic!("expected contract violation, got {:?}", other),
    }
}

#[test]
fn scripting_handler_error_rejects_with_it() {
    let el = event_loop();
    let promise = Task::create()
        .schedule_on_main_thread(el.env(), |task| {
            task.set_result(Value::Null, false).unwrap();
            task.schedule_on_scripting_thread(|_task, _env, _promise| {
                Err(BridgeError::Operation("late failure".into()))
            })
            .unwrap();
        })
        .unwrap();
    el.run_until_idle().unwrap();
    assert_eq!(
        outcome(el.env(), promise),
        Err(BridgeError::Operation("late failure".into()).to_value())
    );
}

#[test]
fn unsupported_result_rejects_with_conversion_error() {
    let el = event_loop();
    let promise = Task::spawn(el.env(), |_| {
        Ok(Value::Unsupported(script_engine::HandleKind::Function))
    })
    .unwrap();
    el.run_until_idle().unwrap();
    match outcome(el.env(), promise) {
        Err(Value::Error { name, .. }) => assert_eq!(name, "ConversionError"),
        other => panic!("expected conversion error, got {:?}", other),
    }
}

#[test]
fn get_result_twice_is_rejected() {
    let el = event_loop();
    let (tx, rx) = channel::bounded(1);
    let promise = Task::create()
        .schedule_on_main_thread(el.env(), move |task| {
            task.set_result(Value::from(5), false).unwrap();
            task.schedule_on_scripting_thread(move |task, env, promise| {
                let first = task.get_result(env)?;
                tx.send(task.get_result(env)).unwrap();
                promise.settle(env, &first.value, first.is_error)
            })
            .unwrap();
        })
        .unwrap();
    el.run_until_idle().unwrap();
    assert_eq!(rx.recv().unwrap().unwrap_err().kind(), ErrorKind::ContractViolation);
    assert_eq!(outcome(el.env(), promise), Ok(Value::from(5)));
}

#[test]
fn state_advances_through_lifecycle() {
    let el = event_loop();
    let task = Task::create();
    let (tx, rx) = channel::unbounded();
    let promise = task
        .schedule_on_main_thread(el.env(), move |task| {
            tx.send(task.state()).unwrap();
            task.set_result(Value::Undefined, false).unwrap();
            tx.send(task.state()).unwrap();
            task.schedule_on_scripting_thread(Task::deliver).unwrap();
        })
        .unwrap();
    el.run_until_idle().unwrap();

    let seen: Vec<TaskState> = rx.try_iter().collect();
    assert_eq!(seen, vec![TaskState::MainScheduled, TaskState::ResultSet]);
    assert_eq!(task.state(), TaskState::Delivered);
    assert_eq!(outcome(el.env(), promise), Ok(Value::Undefined));
}

#[test]
fn concurrent_tasks_keep_their_own_results() {
    let el = event_loop();
    let promises: Vec<_> = (0..32i32)
        .map(|i| Task::spawn(el.env(), move |_| Ok(Value::from(i))).unwrap())
        .collect();
    el.run_until_idle().unwrap();
    for (i, promise) in promises.into_iter().enumerate() {
        assert_eq!(outcome(el.env(), promise), Ok(Value::from(i as i32)));
    }
}

#[test]
fn work_observes_cancellation_token() {
    let el = event_loop();
    let task = Task::create();
    let (started_tx, started_rx) = channel::bounded(1);
    let (go_tx, go_rx) = channel::bounded::<()>(1);
    let promise = task
        .run_on_main_thread(el.env(), move |token| {
            started_tx.send(()).unwrap();
            go_rx.recv().unwrap();
            if token.is_cancelled() {
                return Err(BridgeError::Cancelled);
            }
            Ok(Value::Null)
        })
        .unwrap();

    started_rx.recv().unwrap();
    task.cancel();
    go_tx.send(()).unwrap();
    el.run_until_idle().unwrap();
    assert_eq!(outcome(el.env(), promise), Err(BridgeError::Cancelled.to_value()));
}

#[test]
fn full_heap_rejects_with_preallocated_reason() {
    let env = Env::new(EngineConfig {
        max_heap_slots: 4,
        ..EngineConfig::default()
    });
    let el = EventLoop::new(env, SchedulerConfig::default()).unwrap();
    let promise = Task::spawn(el.env(), |_| Ok(Value::from("x"))).unwrap();

    // Nothing the delivery allocates fits any more.
    while el.env().create_null().is_ok() {}
    el.run_until_idle().unwrap();

    assert_eq!(el.outstanding(), 0);
    assert_eq!(
        outcome(el.env(), promise),
        Err(Value::Error {
            name: "InternalError".into(),
            message: "task result could not be delivered".into()
        })
    );
}

#[test]
fn schedule_fails_cleanly_without_room_for_fallback() {
    let env = Env::new(EngineConfig {
        max_heap_slots: 1,
        ..EngineConfig::default()
    });
    let el = EventLoop::new(env, SchedulerConfig::default()).unwrap();
    let task = Task::create();

    let err = task.run_on_main_thread(el.env(), |_| Ok(Value::Null)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HostApi);
    assert_eq!(task.state(), TaskState::Created);
    assert_eq!(el.outstanding(), 0);
}

#[test]
fn refused_set_result_leaves_slot_empty() {
    let el = event_loop();
    let task = Task::create();
    let early = task.set_result(Value::from("early"), false).unwrap_err();
    assert_eq!(early.kind(), ErrorKind::ContractViolation);

    let promise = task
        .schedule_on_main_thread(el.env(), |task| {
            task.set_result(Value::from("on time"), false).unwrap();
            task.schedule_on_scripting_thread(Task::deliver).unwrap();
        })
        .unwrap();
    el.run_until_idle().unwrap();
    assert_eq!(outcome(el.env(), promise), Ok(Value::from("on time")));
}

#[test]
fn result_set_by_helper_thread_survives_handler_panic() {
    let el = event_loop();
    let promise = Task::create()
        .schedule_on_main_thread(el.env(), |task| {
            let helper = Arc::clone(task);
            thread::spawn(move || {
                helper.set_result(Value::from("from helper"), false).unwrap();
            })
            .join()
            .unwrap();
            panic!("handler failed");
        })
        .unwrap();
    el.run_until_idle().unwrap();
    assert_eq!(outcome(el.env(), promise), Ok(Value::from("from helper")));
}

#[test]
fn helper_thread_racing_panicking_handler_never_loses_result() {
    let el = event_loop();
    let mut helpers = Vec::new();
    let mut promises = Vec::new();
    for _ in 0..64 {
        let (helper_tx, helper_rx) = channel::bounded(1);
        let promise = Task::create()
            .schedule_on_main_thread(el.env(), move |task| {
                let helper = Arc::clone(task);
                let (ready_tx, ready_rx) = channel::bounded::<()>(0);
                helper_tx
                    .send(thread::spawn(move || {
                        ready_rx.recv().unwrap();
                        if helper.set_result(Value::from("from helper"), false).is_ok() {
                            let _ = helper.schedule_on_scripting_thread(Task::deliver);
                        }
                    }))
                    .unwrap();
                ready_tx.send(()).unwrap();
                panic!("handler failed");
            })
            .unwrap();
        helpers.push(helper_rx);
        promises.push(promise);
    }
    el.run_until_idle().unwrap();

    for helper in helpers {
        helper.recv().unwrap().join().unwrap();
    }
    let panicked = Value::Error {
        name: "InternalError".into(),
        message: "native handler panicked: handler failed".into(),
    };
    for promise in promises {
        match outcome(el.env(), promise) {
            Ok(value) => assert_eq!(value, Value::from("from helper")),
            Err(reason) => assert_eq!(reason, panicked),
        }
    }
    assert_eq!(el.outstanding(), 0);
}

#[test]
fn task_is_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Arc<Task>>();
}
