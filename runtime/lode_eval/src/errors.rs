//! Throw-site constructors.
//!
//! One small factory per error shape: each allocates an exception object on
//! the heap and wraps it as `Signal::Thrown`, so runtime faults travel the
//! same control-flow channel as user-level `throw`. Centralizing the
//! constructors keeps messages consistent and gives every operand-kind
//! mismatch an explicit `TypeError` — there are no unreachable fallthroughs
//! for "impossible" combinations.

use lode_ir::{BinaryOp, UnaryOp};
use lode_rt::{ExceptionKind, Heap, NativeError, Signal, Value};

/// Allocate an exception and wrap it as a thrown signal.
pub fn throw(heap: &mut Heap, kind: ExceptionKind, message: impl Into<String>) -> Signal {
    Signal::Thrown(Value::Object(heap.alloc_exception(kind, message)))
}

pub fn type_error(heap: &mut Heap, message: impl Into<String>) -> Signal {
    throw(heap, ExceptionKind::Type, message)
}

pub fn undefined_variable(heap: &mut Heap, name: &str) -> Signal {
    throw(
        heap,
        ExceptionKind::Reference,
        format!("undefined variable: {name}"),
    )
}

pub fn not_callable(heap: &mut Heap, kind: &str) -> Signal {
    type_error(heap, format!("{kind} is not callable"))
}

pub fn arity_mismatch(heap: &mut Heap, required: usize, total: usize, got: usize) -> Signal {
    let expected = if required == total {
        format!("{total}")
    } else {
        format!("{required} to {total}")
    };
    let word = if total == 1 { "argument" } else { "arguments" };
    throw(
        heap,
        ExceptionKind::Arity,
        format!("expected {expected} {word}, got {got}"),
    )
}

pub fn missing_argument(heap: &mut Heap, parameter: &str) -> Signal {
    throw(
        heap,
        ExceptionKind::Arity,
        format!("missing argument for parameter {parameter}"),
    )
}

pub fn invalid_operands(
    heap: &mut Heap,
    op: BinaryOp,
    left_kind: &str,
    right_kind: &str,
) -> Signal {
    type_error(
        heap,
        format!(
            "operator `{}` cannot be applied to {left_kind} and {right_kind}",
            op.as_symbol()
        ),
    )
}

pub fn invalid_unary_operand(heap: &mut Heap, op: UnaryOp, kind: &str) -> Signal {
    type_error(
        heap,
        format!("operator `{}` cannot be applied to {kind}", op.as_symbol()),
    )
}

pub fn invalid_array_index(heap: &mut Heap, index: f64) -> Signal {
    type_error(
        heap,
        format!("array index must be a non-negative integer, got {index}"),
    )
}

pub fn invalid_property_key(heap: &mut Heap, kind: &str) -> Signal {
    type_error(heap, format!("{kind} cannot be used as a property key"))
}

pub fn numeric_key_on_object(heap: &mut Heap) -> Signal {
    type_error(heap, "object properties are string-keyed")
}

pub fn string_key_on_array(heap: &mut Heap) -> Signal {
    type_error(heap, "arrays are indexed by numbers")
}

pub fn member_of_nil(heap: &mut Heap) -> Signal {
    type_error(heap, "cannot access a member of nil")
}

pub fn invalid_assignment_target(heap: &mut Heap) -> Signal {
    type_error(heap, "invalid assignment target")
}

/// `break`/`continue` reached a function or program boundary with no
/// enclosing loop. The parser rejects the syntactic form, so hitting this
/// means the tree was assembled by hand — report it, never ignore it.
pub fn stray_loop_control(heap: &mut Heap, signal: Signal) -> Signal {
    throw(
        heap,
        ExceptionKind::Syntax,
        format!("{} outside of a loop", signal.description()),
    )
}

/// Surface a native callable's failure as a language-level exception.
pub fn native_failure(heap: &mut Heap, name: &str, error: NativeError) -> Signal {
    throw(
        heap,
        error.kind,
        format!("{name}: {message}", message = error.message),
    )
}
