//! Lode RT - the runtime value model and garbage-collected heap.
//!
//! # Architecture
//!
//! - [`Value`] is a four-variant `Copy` union: nil, boolean, IEEE-754
//!   number, or a [`Handle`] into the heap. Values are freely copied and
//!   never independently owned.
//! - Every heap entity — strings, objects, arrays, function closures,
//!   native functions, exceptions, and scope frames — is a variant of the
//!   closed [`Cell`] union, owned exclusively by the [`Heap`].
//! - The heap is a slot arena addressed by generation-checked handles and
//!   swept by a stop-the-world mark-and-sweep pass. Roots are the scope
//!   stack, pinned handles, and the scratch registry the evaluator uses to
//!   protect in-flight values across allocation points.
//! - [`Signal`]/[`Completion`] encode the control-flow protocol: every node
//!   evaluation completes normally with a value or diverts with
//!   return/break/continue/thrown, threaded through `Result` so `?`
//!   propagates non-normal outcomes.

mod cell;
mod heap;
mod signal;
mod value;

pub use cell::{
    ArrayCell, Cell, ExceptionCell, ExceptionKind, FunctionCell, NativeCell, NativeError,
    NativeFn, ObjectCell, ScopeCell, ScopeKind,
};
pub use heap::{Handle, Heap};
pub use signal::{Completion, Signal};
pub use value::{PropertyKey, Value};
