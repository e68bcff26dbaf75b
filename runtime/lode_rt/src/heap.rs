//! The allocation authority and tracing collector.
//!
//! # Design
//!
//! The heap is a slot arena: every [`Cell`] lives in a `Vec` slot addressed
//! by a [`Handle`] carrying the slot index and the slot's generation at
//! allocation time. Freeing a slot bumps its generation, so a stale handle
//! can never resolve to a recycled cell — it resolves to nothing, and the
//! checked accessors treat that as an internal fault.
//!
//! Collection is stop-the-world mark-and-sweep, run synchronously from
//! [`Heap::allocate`] when the approximate live byte count passes a
//! doubling threshold. Roots are:
//!
//! - the scope stack registered by the interpreter (`push_scope_root`),
//! - pinned handles (`pin`) for process-lifetime entities like the exports
//!   object,
//! - the scratch registry (`protect`) holding values the evaluator has in
//!   flight in host stack frames.
//!
//! The mark phase is a worklist walk over [`Cell::visit_graph`], so deep
//! object graphs cannot overflow the host stack.

use std::fmt;

use tracing::debug;

use crate::cell::{ArrayCell, ObjectCell, ScopeCell};
use crate::{Cell, ExceptionCell, ExceptionKind, Value};

/// Generation-checked index of a heap cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

struct Entry {
    marked: bool,
    cell: Cell,
}

struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// The garbage-collected heap. Owns every runtime object.
pub struct Heap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    bytes_live: usize,
    threshold: usize,
    scope_roots: Vec<Handle>,
    pinned: Vec<Handle>,
    temps: Vec<Value>,
    reclaimed: u64,
    collections: u64,
}

impl Heap {
    /// Collection threshold for a fresh heap, in approximate bytes.
    const INITIAL_THRESHOLD: usize = 128 * 1024;

    pub fn new() -> Self {
        Heap {
            slots: Vec::new(),
            free: Vec::new(),
            bytes_live: 0,
            threshold: Self::INITIAL_THRESHOLD,
            scope_roots: Vec::new(),
            pinned: Vec::new(),
            temps: Vec::new(),
            reclaimed: 0,
            collections: 0,
        }
    }

    // Allocation

    /// Allocate a cell, returning a tracked handle.
    ///
    /// Runs a collection first if the heap is past its pressure threshold,
    /// which is why every value the caller still needs must be reachable
    /// from a root (scope, pin, or [`Heap::protect`]) at this point.
    pub fn allocate(&mut self, cell: Cell) -> Handle {
        if self.bytes_live >= self.threshold {
            self.collect_now();
        }
        self.bytes_live += cell.approximate_size();
        let entry = Entry {
            marked: false,
            cell,
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            return Handle {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len())
            .unwrap_or_else(|_| panic!("heap exhausted: more than u32::MAX slots"));
        self.slots.push(Slot {
            generation: 0,
            entry: Some(entry),
        });
        Handle {
            index,
            generation: 0,
        }
    }

    /// Allocate a string cell.
    pub fn alloc_string(&mut self, s: impl Into<Box<str>>) -> Handle {
        self.allocate(Cell::Str(s.into()))
    }

    /// Allocate an exception cell.
    pub fn alloc_exception(&mut self, kind: ExceptionKind, message: impl Into<String>) -> Handle {
        self.allocate(Cell::Exception(ExceptionCell::new(kind, message)))
    }

    // Access

    /// Resolve a handle, or `None` if it is stale or free.
    #[inline]
    pub fn get(&self, handle: Handle) -> Option<&Cell> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_ref().map(|e| &e.cell)
    }

    /// Resolve a handle mutably, or `None` if it is stale or free.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Cell> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_mut().map(|e| &mut e.cell)
    }

    /// Resolve a handle that is known to be live.
    ///
    /// A stale handle here is heap-use-after-free inside the runtime itself
    /// — an implementation fault, so it fails loudly instead of becoming a
    /// catchable language error.
    #[inline]
    pub fn cell(&self, handle: Handle) -> &Cell {
        match self.get(handle) {
            Some(cell) => cell,
            None => panic!("heap handle {handle:?} used after free"),
        }
    }

    /// Mutable variant of [`Heap::cell`].
    #[inline]
    pub fn cell_mut(&mut self, handle: Handle) -> &mut Cell {
        match self.get_mut(handle) {
            Some(cell) => cell,
            None => panic!("heap handle {handle:?} used after free"),
        }
    }

    #[inline]
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// String contents behind a handle, if it is a string cell.
    pub fn string(&self, handle: Handle) -> Option<&str> {
        self.get(handle).and_then(Cell::as_str)
    }

    /// Scope frame behind a handle. Scope handles are produced only by the
    /// interpreter, so anything else is an internal fault.
    pub fn scope(&self, handle: Handle) -> &ScopeCell {
        match self.cell(handle) {
            Cell::Scope(scope) => scope,
            other => panic!("expected scope cell, found {}", other.kind_name()),
        }
    }

    /// Mutable variant of [`Heap::scope`].
    pub fn scope_mut(&mut self, handle: Handle) -> &mut ScopeCell {
        match self.cell_mut(handle) {
            Cell::Scope(scope) => scope,
            other => panic!("expected scope cell, found {}", other.kind_name()),
        }
    }

    /// Runtime kind name of a value, for error messages.
    pub fn value_kind(&self, value: Value) -> &'static str {
        match value {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::Object(h) => self.get(h).map_or("object", Cell::kind_name),
        }
    }

    // Roots

    /// Register a scope frame as a root. The interpreter mirrors its scope
    /// stack here; the bottom entry is the global scope.
    pub fn push_scope_root(&mut self, handle: Handle) {
        self.scope_roots.push(handle);
    }

    pub fn pop_scope_root(&mut self) -> Option<Handle> {
        self.scope_roots.pop()
    }

    pub fn current_scope_root(&self) -> Option<Handle> {
        self.scope_roots.last().copied()
    }

    pub fn scope_depth(&self) -> usize {
        self.scope_roots.len()
    }

    /// Root a handle for the lifetime of the heap.
    pub fn pin(&mut self, handle: Handle) {
        self.pinned.push(handle);
    }

    /// Current depth of the scratch registry; pair with
    /// [`Heap::release_to`].
    pub fn temp_mark(&self) -> usize {
        self.temps.len()
    }

    /// Root a value held in a host stack frame across upcoming allocation
    /// points.
    pub fn protect(&mut self, value: Value) {
        self.temps.push(value);
    }

    /// Drop scratch roots registered since `mark` was taken.
    pub fn release_to(&mut self, mark: usize) {
        self.temps.truncate(mark);
    }

    // Collection

    /// Run a full mark-and-sweep pass immediately.
    pub fn collect_now(&mut self) {
        self.mark();
        self.sweep();
        self.threshold = (self.bytes_live * 2).max(Self::INITIAL_THRESHOLD);
        self.collections += 1;
        debug!(
            live_cells = self.live_cells(),
            bytes_live = self.bytes_live,
            next_threshold = self.threshold,
            total_reclaimed = self.reclaimed,
            "garbage collection finished"
        );
    }

    fn mark(&mut self) {
        let mut worklist: Vec<Handle> =
            Vec::with_capacity(self.scope_roots.len() + self.pinned.len() + self.temps.len());
        worklist.extend_from_slice(&self.scope_roots);
        worklist.extend_from_slice(&self.pinned);
        worklist.extend(self.temps.iter().filter_map(|v| v.as_handle()));

        while let Some(handle) = worklist.pop() {
            let Some(slot) = self.slots.get_mut(handle.index as usize) else {
                continue;
            };
            if slot.generation != handle.generation {
                continue;
            }
            let Some(entry) = slot.entry.as_mut() else {
                continue;
            };
            if entry.marked {
                continue;
            }
            entry.marked = true;
            entry.cell.visit_graph(&mut |child| worklist.push(child));
        }
    }

    fn sweep(&mut self) {
        let mut bytes_live = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            match slot.entry.as_mut() {
                Some(entry) if entry.marked => {
                    entry.marked = false;
                    bytes_live += entry.cell.approximate_size();
                }
                Some(_) => {
                    slot.entry = None;
                    slot.generation = slot.generation.wrapping_add(1);
                    self.free.push(index as u32);
                    self.reclaimed += 1;
                }
                None => {}
            }
        }
        self.bytes_live = bytes_live;
    }

    // Statistics

    /// Number of live cells currently tracked.
    pub fn live_cells(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Monotonic count of cells reclaimed over the heap's lifetime — the
    /// finalization counter the GC round-trip tests observe.
    pub fn cells_reclaimed(&self) -> u64 {
        self.reclaimed
    }

    /// Number of completed collection passes.
    pub fn collections(&self) -> u64 {
        self.collections
    }

    /// Approximate live bytes, as accounted by the pressure heuristic.
    pub fn approximate_bytes(&self) -> usize {
        self.bytes_live
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("live_cells", &self.live_cells())
            .field("bytes_live", &self.bytes_live)
            .field("threshold", &self.threshold)
            .field("collections", &self.collections)
            .finish()
    }
}

// Convenience constructors used across the evaluator.
impl Heap {
    /// Allocate an empty object.
    pub fn alloc_object(&mut self) -> Handle {
        self.allocate(Cell::Object(ObjectCell::new()))
    }

    /// Allocate an array from evaluated elements.
    pub fn alloc_array(&mut self, elements: Vec<Value>) -> Handle {
        self.allocate(Cell::Array(ArrayCell::new(elements)))
    }
}
