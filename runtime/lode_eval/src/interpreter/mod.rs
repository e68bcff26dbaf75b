//! The interpreter: scope machinery, the call protocol, and `run`.
//!
//! Evaluation rules are split across two impl blocks:
//! - `exec_stmt` — statements and the control-flow protocol,
//! - `exec_expr` — expressions, member access, assignment, and calls.
//!
//! # Rooting discipline
//!
//! Collection happens inside `Heap::allocate`, so any value a rule still
//! needs across a possible allocation must be reachable. Scope frames are
//! rooted by the mirrored scope stack; everything else in flight is pushed
//! into the heap's scratch registry through [`Interpreter::with_temps`],
//! which releases the scratch entries however the enclosed evaluation
//! completes.

mod exec_expr;
mod exec_stmt;

use lode_ir::{Name, Program, SharedInterner};
use lode_rt::{Cell, Completion, Handle, Heap, ObjectCell, ScopeKind, Signal, Value};
use tracing::trace;

use crate::environment::Environment;
use crate::format::display_value;

/// A thrown value no `try` intercepted, reported at the embedding
/// boundary.
#[derive(Debug, thiserror::Error)]
#[error("uncaught exception: {message}")]
pub struct UncaughtException {
    /// Rendered form of the thrown value.
    pub message: String,
}

/// The tree-walking interpreter.
///
/// Owns the heap and the scope stack; exactly one evaluation is ever in
/// flight, and no external mutation is permitted while it runs.
pub struct Interpreter {
    interner: SharedInterner,
    heap: Heap,
    env: Environment,
    exports: Handle,
}

impl Interpreter {
    /// Create an interpreter with a fresh global scope.
    ///
    /// The interner is shared with the parser so identifiers agree across
    /// the boundary.
    pub fn new(interner: SharedInterner) -> Self {
        let mut heap = Heap::new();
        let env = Environment::new(&mut heap);
        let exports = heap.alloc_object();
        heap.pin(exports);
        Interpreter {
            interner,
            heap,
            env,
            exports,
        }
    }

    /// Evaluate a program in the global scope.
    ///
    /// Returns the last normally-completed value; a top-level `return`
    /// completes the program with its argument. An uncaught thrown value is
    /// reported as an [`UncaughtException`]. The returned value is live
    /// until the next evaluation or collection on this interpreter.
    pub fn run(&mut self, program: &Program) -> Result<Value, UncaughtException> {
        match self.eval_block_stmts(&program.body) {
            Ok(value) | Err(Signal::Return(value)) => Ok(value),
            Err(Signal::Break | Signal::Continue) => Err(UncaughtException {
                message: "SyntaxError: break or continue outside of a loop".to_owned(),
            }),
            Err(Signal::Thrown(value)) => Err(UncaughtException {
                message: display_value(&self.heap, value),
            }),
        }
    }

    // Accessors

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    /// The exports recorded by `export` statements, for the host's module
    /// system to read back after a run.
    pub fn exports(&self) -> &ObjectCell {
        match self.heap.cell(self.exports) {
            Cell::Object(object) => object,
            other => panic!("exports cell degenerated into {}", other.kind_name()),
        }
    }

    /// Bind a value in the global scope under `name`.
    pub fn define_global(&mut self, name: Name, value: Value) {
        self.env.define_global(&mut self.heap, name, value);
    }

    // Scope and scratch helpers

    /// Run `f` inside a fresh scope; the scope is popped however `f`
    /// completes, keeping the mirrored root stack symmetric even when a
    /// signal propagates out.
    pub(crate) fn with_scope<R>(
        &mut self,
        kind: ScopeKind,
        parent: Handle,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.env.push_scope(&mut self.heap, kind, parent);
        let result = f(self);
        self.env.pop_scope(&mut self.heap);
        result
    }

    /// Run `f` with a scratch-root frame; everything protected inside is
    /// released when `f` completes, normally or not.
    pub(crate) fn with_temps<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let mark = self.heap.temp_mark();
        let result = f(self);
        self.heap.release_to(mark);
        result
    }

    // Variables

    pub(crate) fn lookup_variable(&mut self, name: Name) -> Completion {
        match self.env.lookup(&self.heap, name) {
            Some(value) => Ok(value),
            None => {
                let text = self.interner.lookup(name);
                Err(crate::errors::undefined_variable(&mut self.heap, text))
            }
        }
    }

    pub(crate) fn exports_handle(&self) -> Handle {
        self.exports
    }

    pub(crate) fn trace_call(&self, callee: &str, arg_count: usize) {
        trace!(callee, arg_count, depth = self.heap.scope_depth(), "call");
    }
}
