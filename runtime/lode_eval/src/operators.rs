//! Binary and unary operator semantics.
//!
//! Direct enum dispatch: the value kind set is fixed, so pattern matching
//! keeps every coercion rule explicit and exhaustively checked. Any operand
//! kind an operator does not define is a `TypeError` — malformed input must
//! never become undefined behavior.

use lode_ir::{BinaryOp, UnaryOp};
use lode_rt::{Cell, Completion, Heap, Signal, Value};

use crate::errors;
use crate::format::display_value;

/// Evaluate a binary operation on two already-evaluated operands.
pub fn evaluate_binary(heap: &mut Heap, op: BinaryOp, lhs: Value, rhs: Value) -> Completion {
    match op {
        BinaryOp::Add
        | BinaryOp::Sub
        | BinaryOp::Mul
        | BinaryOp::Div
        | BinaryOp::Mod
        | BinaryOp::Pow => numeric_binary(heap, op, lhs, rhs),
        BinaryOp::Shl | BinaryOp::Shr => shift_binary(heap, op, lhs, rhs),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            ordering_binary(heap, op, lhs, rhs)
        }
        BinaryOp::Eq => Ok(Value::Boolean(values_equal(heap, lhs, rhs))),
        BinaryOp::NotEq => Ok(Value::Boolean(!values_equal(heap, lhs, rhs))),
        // Logical operators are eager and Boolean-valued: both operands
        // were already evaluated by the time dispatch happens.
        BinaryOp::And => Ok(Value::Boolean(lhs.is_truthy() && rhs.is_truthy())),
        BinaryOp::Or => Ok(Value::Boolean(lhs.is_truthy() || rhs.is_truthy())),
        BinaryOp::Xor => Ok(Value::Boolean(lhs.is_truthy() ^ rhs.is_truthy())),
        BinaryOp::Concat => concat(heap, lhs, rhs),
    }
}

/// Evaluate a unary operation.
pub fn evaluate_unary(heap: &mut Heap, op: UnaryOp, operand: Value) -> Completion {
    match op {
        UnaryOp::Not => Ok(Value::Boolean(!operand.is_truthy())),
        UnaryOp::Negate => match operand.as_number() {
            Some(n) => Ok(Value::Number(-n)),
            None => {
                let kind = heap.value_kind(operand);
                Err(errors::invalid_unary_operand(heap, op, kind))
            }
        },
        UnaryOp::Length => length(heap, operand),
    }
}

/// Language-level equality.
///
/// Nil, booleans, and numbers compare by value (IEEE-754 for numbers, so
/// `NaN != NaN`). Strings compare by character content. Every other object
/// kind compares by heap identity.
pub fn values_equal(heap: &Heap, lhs: Value, rhs: Value) -> bool {
    match (lhs, rhs) {
        (Value::Nil, Value::Nil) => true,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Object(a), Value::Object(b)) => {
            if a == b {
                return true;
            }
            match (heap.string(a), heap.string(b)) {
                (Some(sa), Some(sb)) => sa == sb,
                _ => false,
            }
        }
        _ => false,
    }
}

fn numeric_operands(
    heap: &mut Heap,
    op: BinaryOp,
    lhs: Value,
    rhs: Value,
) -> Result<(f64, f64), Signal> {
    match (lhs.as_number(), rhs.as_number()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => {
            let left_kind = heap.value_kind(lhs);
            let right_kind = heap.value_kind(rhs);
            Err(errors::invalid_operands(heap, op, left_kind, right_kind))
        }
    }
}

/// Arithmetic on numbers follows IEEE-754 double semantics throughout:
/// division by zero produces an infinity, not an error.
fn numeric_binary(heap: &mut Heap, op: BinaryOp, lhs: Value, rhs: Value) -> Completion {
    let (a, b) = numeric_operands(heap, op, lhs, rhs)?;
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        BinaryOp::Pow => a.powf(b),
        _ => {
            let left_kind = heap.value_kind(lhs);
            let right_kind = heap.value_kind(rhs);
            return Err(errors::invalid_operands(heap, op, left_kind, right_kind));
        }
    };
    Ok(Value::Number(result))
}

/// Shifts truncate both operands toward zero to 64-bit integers and mask
/// the shift count to 0..=63.
fn shift_binary(heap: &mut Heap, op: BinaryOp, lhs: Value, rhs: Value) -> Completion {
    let (a, b) = numeric_operands(heap, op, lhs, rhs)?;
    let value = a as i64;
    let count = (b as i64 & 0x3f) as u32;
    let shifted = match op {
        BinaryOp::Shl => value.wrapping_shl(count),
        _ => value.wrapping_shr(count),
    };
    Ok(Value::Number(shifted as f64))
}

fn ordering_binary(heap: &mut Heap, op: BinaryOp, lhs: Value, rhs: Value) -> Completion {
    let (a, b) = numeric_operands(heap, op, lhs, rhs)?;
    let result = match op {
        BinaryOp::Lt => a < b,
        BinaryOp::LtEq => a <= b,
        BinaryOp::Gt => a > b,
        _ => a >= b,
    };
    Ok(Value::Boolean(result))
}

/// `..` coerces both operands to text; it never invokes `+`.
fn concat(heap: &mut Heap, lhs: Value, rhs: Value) -> Completion {
    let mut text = display_value(heap, lhs);
    text.push_str(&display_value(heap, rhs));
    Ok(Value::Object(heap.alloc_string(text)))
}

/// `#` is defined for strings (character count) and arrays (element
/// count); everything else is a `TypeError`.
fn length(heap: &mut Heap, operand: Value) -> Completion {
    if let Value::Object(handle) = operand {
        match heap.cell(handle) {
            Cell::Str(s) => return Ok(Value::Number(s.chars().count() as f64)),
            Cell::Array(array) => return Ok(Value::Number(array.len() as f64)),
            _ => {}
        }
    }
    let kind = heap.value_kind(operand);
    Err(errors::invalid_unary_operand(heap, UnaryOp::Length, kind))
}
