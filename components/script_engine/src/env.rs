//! The execution environment handed to native code.
//!
//! An [`Env`] is the only way to create, inspect or mutate engine values. It
//! owns `Rc` state and is therefore `!Send`: the compiler keeps it on the
//! thread that created it, which is by definition the scripting thread.

use crate::heap::{Heap, Slot};
use crate::{Deferred, EngineConfig, Handle, HandleKind, HostError, HostResult, PromiseState};
use num_bigint::BigInt;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Signature of a native function callable from scripts.
///
/// Native functions never fail at the engine boundary: they return a handle,
/// and report failure by raising an exception through [`Env::throw`].
pub type NativeCallback = Rc<dyn Fn(&Env, &[Handle]) -> Handle>;

struct EnvInner {
    config: EngineConfig,
    heap: RefCell<Heap>,
    exception: Cell<Option<Handle>>,
    scope_depth: Cell<usize>,
    instance_data: RefCell<Option<Rc<dyn Any>>>,
}

/// A scripting engine instance.
///
/// Cloning an `Env` yields another reference to the same engine.
///
/// # Examples
///
/// ```
/// use script_engine::{EngineConfig, Env, HandleKind};
///
/// let env = Env::new(EngineConfig::default());
/// let s = env.create_string("hello").unwrap();
/// assert_eq!(env.type_of(s).unwrap(), HandleKind::String);
/// assert_eq!(env.get_string(s).unwrap(), "hello");
/// ```
#[derive(Clone)]
pub struct Env {
    inner: Rc<EnvInner>,
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("live_slots", &self.live_slots())
            .field("scope_depth", &self.scope_depth())
            .finish()
    }
}

impl Env {
    /// Creates an empty engine with the given limits.
    pub fn new(config: EngineConfig) -> Self {
        let heap = Heap::new(config.max_heap_slots);
        Self {
            inner: Rc::new(EnvInner {
                config,
                heap: RefCell::new(heap),
                exception: Cell::new(None),
                scope_depth: Cell::new(0),
                instance_data: RefCell::new(None),
            }),
        }
    }

    /// Returns the limits this engine was created with.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Returns the number of allocated heap slots.
    pub fn live_slots(&self) -> usize {
        self.inner.heap.borrow().len()
    }

    fn alloc(&self, slot: Slot) -> HostResult<Handle> {
        self.inner.heap.borrow_mut().alloc(slot)
    }

    fn with_slot<R>(&self, handle: Handle, f: impl FnOnce(&Slot) -> HostResult<R>) -> HostResult<R> {
        let heap = self.inner.heap.borrow();
        f(heap.get(handle)?)
    }

    fn mismatch(expected: HandleKind, slot: &Slot) -> HostError {
        HostError::TypeMismatch {
            expected,
            found: slot.kind(),
        }
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Creates `undefined`.
    pub fn create_undefined(&self) -> HostResult<Handle> {
        self.alloc(Slot::Undefined)
    }

    /// Creates `null`.
    pub fn create_null(&self) -> HostResult<Handle> {
        self.alloc(Slot::Null)
    }

    /// Creates a boolean.
    pub fn create_boolean(&self, value: bool) -> HostResult<Handle> {
        self.alloc(Slot::Boolean(value))
    }

    /// Creates a number.
    pub fn create_number(&self, value: f64) -> HostResult<Handle> {
        self.alloc(Slot::Number(value))
    }

    /// Creates a string, copying `value` into the heap.
    ///
    /// Fails with [`HostError::StringTooLong`] above `max_string_len`.
    pub fn create_string(&self, value: &str) -> HostResult<Handle> {
        let limit = self.inner.config.max_string_len;
        if value.len() > limit {
            return Err(HostError::StringTooLong {
                len: value.len(),
                limit,
            });
        }
        self.alloc(Slot::String(value.to_owned()))
    }

    /// Creates a BigInt.
    pub fn create_bigint(&self, value: BigInt) -> HostResult<Handle> {
        self.alloc(Slot::BigInt(value))
    }

    /// Creates an empty array.
    pub fn create_array(&self) -> HostResult<Handle> {
        self.alloc(Slot::Array(Vec::new()))
    }

    /// Creates an empty object.
    pub fn create_object(&self) -> HostResult<Handle> {
        self.alloc(Slot::Object(Vec::new()))
    }

    /// Creates an error object.
    pub fn create_error(&self, name: &str, message: &str) -> HostResult<Handle> {
        self.alloc(Slot::Error {
            name: name.to_owned(),
            message: message.to_owned(),
        })
    }

    /// Wraps an opaque native resource id.
    pub fn create_external(&self, id: u64) -> HostResult<Handle> {
        self.alloc(Slot::External(id))
    }

    /// Wraps a native callback as a script-visible function.
    pub fn create_function(&self, name: &str, callback: NativeCallback) -> HostResult<Handle> {
        self.alloc(Slot::Function {
            name: name.to_owned(),
            callback,
        })
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Returns the runtime type tag of a handle.
    pub fn type_of(&self, handle: Handle) -> HostResult<HandleKind> {
        self.with_slot(handle, |slot| Ok(slot.kind()))
    }

    /// Reads a boolean.
    pub fn get_boolean(&self, handle: Handle) -> HostResult<bool> {
        self.with_slot(handle, |slot| match slot {
            Slot::Boolean(b) => Ok(*b),
            other => Err(Self::mismatch(HandleKind::Boolean, other)),
        })
    }

    /// Reads a number.
    pub fn get_number(&self, handle: Handle) -> HostResult<f64> {
        self.with_slot(handle, |slot| match slot {
            Slot::Number(n) => Ok(*n),
            other => Err(Self::mismatch(HandleKind::Number, other)),
        })
    }

    /// Copies a string out of the heap.
    pub fn get_string(&self, handle: Handle) -> HostResult<String> {
        self.with_slot(handle, |slot| match slot {
            Slot::String(s) => Ok(s.clone()),
            other => Err(Self::mismatch(HandleKind::String, other)),
        })
    }

    /// Copies a BigInt out of the heap.
    pub fn get_bigint(&self, handle: Handle) -> HostResult<BigInt> {
        self.with_slot(handle, |slot| match slot {
            Slot::BigInt(n) => Ok(n.clone()),
            other => Err(Self::mismatch(HandleKind::BigInt, other)),
        })
    }

    /// Returns the element handles of an array, in order.
    pub fn array_elements(&self, handle: Handle) -> HostResult<Vec<Handle>> {
        self.with_slot(handle, |slot| match slot {
            Slot::Array(items) => Ok(items.clone()),
            other => Err(Self::mismatch(HandleKind::Array, other)),
        })
    }

    /// Appends an element to an array.
    pub fn array_push(&self, array: Handle, value: Handle) -> HostResult<()> {
        let mut heap = self.inner.heap.borrow_mut();
        heap.get(value)?;
        match heap.get_mut(array)? {
            Slot::Array(items) => {
                items.push(value);
                Ok(())
            }
            other => Err(Self::mismatch(HandleKind::Array, other)),
        }
    }

    /// Stores an element at `index`, filling any gap with `undefined`.
    pub fn set_element(&self, array: Handle, index: usize, value: Handle) -> HostResult<()> {
        let len = self.array_elements(array)?.len();
        let filler = if index > len {
            Some(self.create_undefined()?)
        } else {
            None
        };
        let mut heap = self.inner.heap.borrow_mut();
        heap.get(value)?;
        match heap.get_mut(array)? {
            Slot::Array(items) => {
                if let Some(filler) = filler {
                    items.resize(index, filler);
                }
                if index == items.len() {
                    items.push(value);
                } else {
                    items[index] = value;
                }
                Ok(())
            }
            other => Err(Self::mismatch(HandleKind::Array, other)),
        }
    }

    /// Returns the own properties of an object in insertion order.
    pub fn object_entries(&self, handle: Handle) -> HostResult<Vec<(String, Handle)>> {
        self.with_slot(handle, |slot| match slot {
            Slot::Object(props) => Ok(props.clone()),
            other => Err(Self::mismatch(HandleKind::Object, other)),
        })
    }

    /// Sets a named property, replacing an existing one in place.
    pub fn set_named_property(&self, object: Handle, name: &str, value: Handle) -> HostResult<()> {
        let mut heap = self.inner.heap.borrow_mut();
        heap.get(value)?;
        match heap.get_mut(object)? {
            Slot::Object(props) => {
                match props.iter_mut().find(|(key, _)| key == name) {
                    Some(entry) => entry.1 = value,
                    None => props.push((name.to_owned(), value)),
                }
                Ok(())
            }
            other => Err(Self::mismatch(HandleKind::Object, other)),
        }
    }

    /// Looks up a named property.
    pub fn get_named_property(&self, object: Handle, name: &str) -> HostResult<Option<Handle>> {
        self.with_slot(object, |slot| match slot {
            Slot::Object(props) => Ok(props
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| *value)),
            other => Err(Self::mismatch(HandleKind::Object, other)),
        })
    }

    /// Returns the `(name, message)` pair of an error object.
    pub fn error_parts(&self, handle: Handle) -> HostResult<(String, String)> {
        self.with_slot(handle, |slot| match slot {
            Slot::Error { name, message } => Ok((name.clone(), message.clone())),
            other => Err(Self::mismatch(HandleKind::Error, other)),
        })
    }

    /// Returns the name a native function was created with.
    pub fn function_name(&self, handle: Handle) -> HostResult<String> {
        self.with_slot(handle, |slot| match slot {
            Slot::Function { name, .. } => Ok(name.clone()),
            other => Err(Self::mismatch(HandleKind::Function, other)),
        })
    }

    /// Returns the resource id behind an external handle.
    pub fn get_external(&self, handle: Handle) -> HostResult<u64> {
        self.with_slot(handle, |slot| match slot {
            Slot::External(id) => Ok(*id),
            other => Err(Self::mismatch(HandleKind::External, other)),
        })
    }

    // ------------------------------------------------------------------
    // Promises
    // ------------------------------------------------------------------

    /// Creates a pending promise together with the token that settles it.
    pub fn create_deferred(&self) -> HostResult<(Deferred, Handle)> {
        let mut heap = self.inner.heap.borrow_mut();
        let id = heap.new_deferred();
        let promise = heap.alloc(Slot::Promise { deferred: id })?;
        Ok((Deferred(id), promise))
    }

    /// Fulfils the promise behind `deferred`.
    ///
    /// Fails with [`HostError::AlreadySettled`] if the promise has settled.
    pub fn resolve_deferred(&self, deferred: &Deferred, value: Handle) -> HostResult<()> {
        self.settle(deferred, PromiseState::Fulfilled(value))
    }

    /// Rejects the promise behind `deferred`.
    pub fn reject_deferred(&self, deferred: &Deferred, reason: Handle) -> HostResult<()> {
        self.settle(deferred, PromiseState::Rejected(reason))
    }

    fn settle(&self, deferred: &Deferred, state: PromiseState) -> HostResult<()> {
        let mut heap = self.inner.heap.borrow_mut();
        match state {
            PromiseState::Fulfilled(h) | PromiseState::Rejected(h) => {
                heap.get(h)?;
            }
            PromiseState::Pending => {}
        }
        heap.settle(deferred.0, state)?;
        tracing::trace!(deferred = deferred.0, ?state, "deferred settled");
        Ok(())
    }

    /// Returns true while the promise behind deferred `id` is unsettled.
    pub fn is_deferred_pending(&self, id: u32) -> HostResult<bool> {
        Ok(self.inner.heap.borrow().deferred_state(id)?.is_pending())
    }

    /// Returns the state of a promise handle.
    pub fn promise_state(&self, promise: Handle) -> HostResult<PromiseState> {
        let heap = self.inner.heap.borrow();
        match heap.get(promise)? {
            Slot::Promise { deferred } => heap.deferred_state(*deferred),
            other => Err(Self::mismatch(HandleKind::Promise, other)),
        }
    }

    // ------------------------------------------------------------------
    // Exceptions and calls
    // ------------------------------------------------------------------

    /// Raises `value` as the pending exception, replacing any earlier one.
    pub fn throw(&self, value: Handle) {
        self.inner.exception.set(Some(value));
    }

    /// Returns true if an exception is waiting to be taken.
    pub fn is_exception_pending(&self) -> bool {
        self.inner.exception.get().is_some()
    }

    /// Takes the pending exception, clearing it.
    pub fn take_exception(&self) -> Option<Handle> {
        self.inner.exception.take()
    }

    /// Calls a native function with the given arguments.
    ///
    /// The callback may raise an exception; callers check
    /// [`is_exception_pending`](Self::is_exception_pending) afterwards.
    pub fn call_function(&self, function: Handle, args: &[Handle]) -> HostResult<Handle> {
        if self.is_exception_pending() {
            return Err(HostError::PendingException);
        }
        let callback = self.with_slot(function, |slot| match slot {
            Slot::Function { callback, .. } => Ok(Rc::clone(callback)),
            _ => Err(HostError::NotAFunction),
        })?;
        Ok(callback(self, args))
    }

    // ------------------------------------------------------------------
    // Scopes and instance data
    // ------------------------------------------------------------------

    /// Opens a handle scope for the duration of a native callback.
    ///
    /// Closing the scope does not free the handles allocated inside it.
    pub fn open_scope(&self) -> HandleScope<'_> {
        let depth = self.inner.scope_depth.get() + 1;
        self.inner.scope_depth.set(depth);
        HandleScope {
            env: self,
            depth,
            first_slot: self.live_slots(),
        }
    }

    /// Returns the number of currently open handle scopes.
    pub fn scope_depth(&self) -> usize {
        self.inner.scope_depth.get()
    }

    /// Attaches per-instance native data, replacing any previous value.
    pub fn set_instance_data<T: 'static>(&self, data: Rc<T>) {
        let data: Rc<dyn Any> = data;
        *self.inner.instance_data.borrow_mut() = Some(data);
    }

    /// Returns the instance data if it is of type `T`.
    pub fn instance_data<T: 'static>(&self) -> Option<Rc<T>> {
        let data = self.inner.instance_data.borrow().clone()?;
        data.downcast::<T>().ok()
    }

    /// Removes the instance data, returning true if any was attached.
    pub fn clear_instance_data(&self) -> bool {
        self.inner.instance_data.borrow_mut().take().is_some()
    }
}

/// RAII guard bracketing one native callback's handle allocations.
///
/// The heap is append-only, so slots are not reclaimed when the scope closes
/// and handles created inside it stay valid. The scope only tracks nesting and
/// records how many handles the callback allocated. Long-running embedders
/// should replace the engine before it reaches
/// [`EngineConfig::max_heap_slots`](crate::EngineConfig::max_heap_slots).
pub struct HandleScope<'a> {
    env: &'a Env,
    depth: usize,
    first_slot: usize,
}

impl HandleScope<'_> {
    /// Returns the nesting depth of this scope (1 for the outermost).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns how many handles were allocated since the scope opened.
    pub fn handles_created(&self) -> usize {
        self.env.live_slots() - self.first_slot
    }
}

impl Drop for HandleScope<'_> {
    fn drop(&mut self) {
        self.env.inner.scope_depth.set(self.depth - 1);
    }
}
