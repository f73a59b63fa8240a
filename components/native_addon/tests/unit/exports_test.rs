//! Calls through installed exports, the way scripts reach the add-on.

use async_runtime::{EventLoop, SchedulerConfig};
use core_types::Value;
use native_addon::{install, standard_registry, Registry};
use script_engine::{EngineConfig, Env, Handle, HandleKind, PromiseState};
use serde_json::json;

fn setup() -> (EventLoop, Handle) {
    let el = EventLoop::new(Env::new(EngineConfig::default()), SchedulerConfig::default()).unwrap();
    let exports = install(el.env(), &standard_registry().unwrap()).unwrap();
    (el, exports)
}

fn export(env: &Env, exports: Handle, name: &str) -> Handle {
    env.get_named_property(exports, name).unwrap().unwrap()
}

#[test]
fn exports_hold_one_function_per_entry() {
    let (el, exports) = setup();
    let env = el.env();
    let names: Vec<_> = env
        .object_entries(exports)
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["hello", "echo", "echo_async"]);
    for name in names {
        let f = export(env, exports, &name);
        assert_eq!(env.type_of(f).unwrap(), HandleKind::Function);
        assert_eq!(env.function_name(f).unwrap(), name);
    }
}

#[test]
fn hello_through_exports() {
    let (el, exports) = setup();
    let env = el.env();
    let result = env.call_function(export(env, exports, "hello"), &[]).unwrap();
    assert_eq!(env.get_string(result).unwrap(), "hello world");
}

#[test]
fn echo_round_trips_nested_object() {
    let (el, exports) = setup();
    let env = el.env();
    let input = Value::from_json(json!({"a": 1, "b": [true, null, "s"]}));
    let arg = input.convert(env).unwrap();
    let result = env.call_function(export(env, exports, "echo"), &[arg]).unwrap();
    assert!(!env.is_exception_pending());
    assert_eq!(Value::from_handle(env, result).unwrap(), input);
}

#[test]
fn echo_async_resolves_after_loop_runs() {
    let (el, exports) = setup();
    let env = el.env();
    let arg = Value::from_json(json!({"a": 1, "b": [true, null, "s"]}))
        .convert(env)
        .unwrap();
    let promise = env
        .call_function(export(env, exports, "echo_async"), &[arg])
        .unwrap();
    assert_eq!(env.promise_state(promise).unwrap(), PromiseState::Pending);

    el.run_until_idle().unwrap();
    let PromiseState::Fulfilled(result) = env.promise_state(promise).unwrap() else {
        panic!("expected fulfilment");
    };
    assert_eq!(
        Value::from_handle(env, result).unwrap().to_json().unwrap(),
        json!({"a": 1, "b": [true, null, "s"]})
    );
}

#[test]
fn echo_of_function_raises_conversion_error() {
    let (el, exports) = setup();
    let env = el.env();
    let hello = export(env, exports, "hello");
    let result = env.call_function(export(env, exports, "echo"), &[hello]).unwrap();
    assert_eq!(env.take_exception(), Some(result));
    assert_eq!(env.error_parts(result).unwrap().0, "ConversionError");
}

#[test]
fn missing_argument_raises_exception() {
    let (el, exports) = setup();
    let env = el.env();
    let result = env.call_function(export(env, exports, "echo_async"), &[]).unwrap();
    assert!(env.is_exception_pending());
    assert_eq!(env.error_parts(result).unwrap().0, "HostApiError");
    env.take_exception();
}

#[test]
fn empty_registry_installs_empty_exports() {
    let env = Env::new(EngineConfig::default());
    let exports = install(&env, &Registry::builder().build()).unwrap();
    assert!(env.object_entries(exports).unwrap().is_empty());
}
