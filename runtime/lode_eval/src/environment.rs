//! Scope-chain operations over heap-resident scope frames.
//!
//! Frames live in the garbage-collected heap (closures keep them alive past
//! their dynamic extent), so the environment holds handles, not frames. The
//! interpreter mirrors its scope stack into the heap's root registry: the
//! frame pushed last is the current scope, and the bottom entry — never
//! popped — is the global scope.

use lode_ir::Name;
use lode_rt::{Cell, Handle, Heap, ScopeCell, ScopeKind, Value};

/// The interpreter's view of the scope chain.
pub struct Environment {
    global: Handle,
}

impl Environment {
    /// Create the global scope and root it.
    pub fn new(heap: &mut Heap) -> Self {
        let global = heap.allocate(Cell::Scope(ScopeCell::new(ScopeKind::Global, None)));
        heap.push_scope_root(global);
        Environment { global }
    }

    /// The root scope.
    #[inline]
    pub fn global(&self) -> Handle {
        self.global
    }

    /// The innermost live scope.
    #[inline]
    pub fn current(&self, heap: &Heap) -> Handle {
        heap.current_scope_root().unwrap_or(self.global)
    }

    /// Push a fresh scope with the given parent and make it current.
    ///
    /// The parent is the *lexical* parent: the current scope for blocks,
    /// the callee's captured scope for function calls.
    pub fn push_scope(&self, heap: &mut Heap, kind: ScopeKind, parent: Handle) -> Handle {
        let scope = heap.allocate(Cell::Scope(ScopeCell::new(kind, Some(parent))));
        heap.push_scope_root(scope);
        scope
    }

    /// Pop the current scope. The global scope is never popped.
    pub fn pop_scope(&self, heap: &mut Heap) {
        if heap.scope_depth() > 1 {
            heap.pop_scope_root();
        }
    }

    /// Walk the chain innermost-to-global and return the first binding.
    pub fn lookup(&self, heap: &Heap, name: Name) -> Option<Value> {
        let mut next = Some(self.current(heap));
        while let Some(handle) = next {
            let scope = heap.scope(handle);
            if let Some(value) = scope.lookup_local(name) {
                return Some(value);
            }
            next = scope.parent();
        }
        None
    }

    /// Rebind in the nearest scope that already binds `name`, or create a
    /// binding in the current scope — assignment creates a local by
    /// default; only the `global` statement forces the root scope.
    pub fn assign(&self, heap: &mut Heap, name: Name, value: Value) {
        let mut handle = self.current(heap);
        loop {
            if heap.scope_mut(handle).assign_local(name, value) {
                return;
            }
            match heap.scope(handle).parent() {
                Some(parent) => handle = parent,
                None => break,
            }
        }
        heap.scope_mut(self.current(heap)).define(name, value);
    }

    /// Create or overwrite a binding in the current scope.
    pub fn define(&self, heap: &mut Heap, name: Name, value: Value) {
        let current = self.current(heap);
        heap.scope_mut(current).define(name, value);
    }

    /// Create or overwrite a binding in the global scope, regardless of
    /// shadowing anywhere down the chain.
    pub fn define_global(&self, heap: &mut Heap, name: Name, value: Value) {
        heap.scope_mut(self.global).define(name, value);
    }
}
