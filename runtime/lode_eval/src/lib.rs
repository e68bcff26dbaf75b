//! Lode Eval - the tree-walking interpreter.
//!
//! # Architecture
//!
//! - [`Interpreter`] owns the heap, the scope stack, and the shared
//!   interner; `run` evaluates a program in the interpreter's global scope
//!   and hands the host the last normally-completed value.
//! - Evaluation rules live in the `interpreter::exec_stmt` and
//!   `interpreter::exec_expr` impl blocks — one exhaustive `match` arm per
//!   node type.
//! - Every rule yields a `Completion`: `Ok` for normal completion, or a
//!   `Signal` (`Return`/`Break`/`Continue`/`Thrown`) that `?` propagates
//!   until the construct it addresses intercepts it.
//! - Operator semantics are direct enum dispatch in [`operators`]; the type
//!   set is fixed, so pattern matching keeps every coercion rule visible
//!   and exhaustive.
//! - Throw-site constructors in [`errors`] allocate exception objects on
//!   the heap and wrap them as `Signal::Thrown` — runtime faults and
//!   user-level `throw` travel the same channel.
//! - Native extension modules register callables through the narrow
//!   [`native`] bridge; the dynamic-library loading that produces them is
//!   the host's business.

mod coerce;
mod environment;
pub mod errors;
mod format;
mod interpreter;
mod native;
mod operators;
mod stack;

#[cfg(test)]
mod tests;

pub use environment::Environment;
pub use format::display_value;
pub use interpreter::{Interpreter, UncaughtException};
pub use native::{NativeModule, NativeRegistry};
pub use operators::{evaluate_binary, evaluate_unary, values_equal};
pub use stack::ensure_sufficient_stack;

// Re-export the value and control-flow types evaluator clients touch.
pub use lode_rt::{
    Cell, Completion, ExceptionKind, Handle, Heap, NativeError, NativeFn, PropertyKey, Signal,
    Value,
};
