//! Slot storage backing an engine instance.
//!
//! Values live in a flat vector of slots addressed by [`Handle`]. The heap is
//! append-only: slots are never freed or reused while the engine is alive, so
//! a handle stays valid for the lifetime of its [`Env`](crate::Env) and the
//! heap only grows until it reaches
//! [`EngineConfig::max_heap_slots`](crate::EngineConfig::max_heap_slots).

use crate::env::NativeCallback;
use crate::{Handle, HandleKind, HostError, HostResult, PromiseState};
use num_bigint::BigInt;

/// One engine value.
pub(crate) enum Slot {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    BigInt(BigInt),
    Array(Vec<Handle>),
    /// Properties in insertion order
    Object(Vec<(String, Handle)>),
    Error {
        name: String,
        message: String,
    },
    Function {
        name: String,
        callback: NativeCallback,
    },
    External(u64),
    Promise {
        deferred: u32,
    },
}

impl Slot {
    pub(crate) fn kind(&self) -> HandleKind {
        match self {
            Slot::Undefined => HandleKind::Undefined,
            Slot::Null => HandleKind::Null,
            Slot::Boolean(_) => HandleKind::Boolean,
            Slot::Number(_) => HandleKind::Number,
            Slot::String(_) => HandleKind::String,
            Slot::BigInt(_) => HandleKind::BigInt,
            Slot::Array(_) => HandleKind::Array,
            Slot::Object(_) => HandleKind::Object,
            Slot::Error { .. } => HandleKind::Error,
            Slot::Function { .. } => HandleKind::Function,
            Slot::External(_) => HandleKind::External,
            Slot::Promise { .. } => HandleKind::Promise,
        }
    }
}

pub(crate) struct Heap {
    slots: Vec<Slot>,
    /// Settlement state per deferred id
    deferreds: Vec<PromiseState>,
    max_slots: usize,
}

impl Heap {
    pub(crate) fn new(max_slots: usize) -> Self {
        Self {
            slots: Vec::new(),
            deferreds: Vec::new(),
            max_slots,
        }
    }

    pub(crate) fn alloc(&mut self, slot: Slot) -> HostResult<Handle> {
        if self.slots.len() >= self.max_slots {
            return Err(HostError::HeapExhausted {
                limit: self.max_slots,
            });
        }
        let index = u32::try_from(self.slots.len()).map_err(|_| HostError::HeapExhausted {
            limit: self.max_slots,
        })?;
        self.slots.push(slot);
        Ok(Handle(index))
    }

    pub(crate) fn get(&self, handle: Handle) -> HostResult<&Slot> {
        self.slots
            .get(handle.0 as usize)
            .ok_or(HostError::InvalidHandle(handle.0))
    }

    pub(crate) fn get_mut(&mut self, handle: Handle) -> HostResult<&mut Slot> {
        self.slots
            .get_mut(handle.0 as usize)
            .ok_or(HostError::InvalidHandle(handle.0))
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn new_deferred(&mut self) -> u32 {
        self.deferreds.push(PromiseState::Pending);
        (self.deferreds.len() - 1) as u32
    }

    pub(crate) fn deferred_state(&self, id: u32) -> HostResult<PromiseState> {
        self.deferreds
            .get(id as usize)
            .copied()
            .ok_or(HostError::UnknownDeferred(id))
    }

    pub(crate) fn settle(&mut self, id: u32, state: PromiseState) -> HostResult<()> {
        let entry = self
            .deferreds
            .get_mut(id as usize)
            .ok_or(HostError::UnknownDeferred(id))?;
        if !entry.is_pending() {
            return Err(HostError::AlreadySettled(id));
        }
        *entry = state;
        Ok(())
    }
}
