//! Textual rendering of values.
//!
//! Used by `..` concatenation and by host-side exception reports. Rendering
//! is depth-limited so cyclic object graphs terminate.

use lode_rt::{Cell, Heap, Value};
use std::fmt::Write;

/// Nesting depth after which collections render as `...`.
const MAX_DEPTH: usize = 4;

/// Render a value to its textual representation.
pub fn display_value(heap: &Heap, value: Value) -> String {
    let mut out = String::new();
    render(heap, value, 0, &mut out);
    out
}

/// Render a number without a trailing `.0` when it is integral.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn render(heap: &Heap, value: Value, depth: usize, out: &mut String) {
    match value {
        Value::Nil => out.push_str("nil"),
        Value::Boolean(true) => out.push_str("true"),
        Value::Boolean(false) => out.push_str("false"),
        Value::Number(n) => out.push_str(&format_number(n)),
        Value::Object(handle) => match heap.get(handle) {
            Some(Cell::Str(s)) => out.push_str(s),
            Some(Cell::Array(array)) => {
                if depth >= MAX_DEPTH {
                    out.push_str("[...]");
                    return;
                }
                out.push('[');
                for (i, &element) in array.elements().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    render(heap, element, depth + 1, out);
                }
                out.push(']');
            }
            Some(Cell::Object(object)) => {
                if depth >= MAX_DEPTH {
                    out.push_str("{...}");
                    return;
                }
                out.push('{');
                for (i, (key, property)) in object.entries().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, " \"{key}\": ");
                    render(heap, property, depth + 1, out);
                }
                out.push_str(" }");
            }
            Some(Cell::Function(_)) => out.push_str("<function>"),
            Some(Cell::Native(native)) => {
                let _ = write!(out, "<native function {}>", native.name);
            }
            Some(Cell::Exception(exception)) => out.push_str(&exception.render()),
            Some(Cell::Scope(_)) => out.push_str("<scope>"),
            None => out.push_str("<invalid reference>"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn integral_numbers_render_without_decimals() {
        assert_eq!(format_number(120.0), "120");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(f64::INFINITY), "inf");
    }

    #[test]
    fn scalars_render() {
        let heap = Heap::new();
        assert_eq!(display_value(&heap, Value::Nil), "nil");
        assert_eq!(display_value(&heap, Value::Boolean(true)), "true");
        assert_eq!(display_value(&heap, Value::Number(1.5)), "1.5");
    }

    #[test]
    fn arrays_render_recursively() {
        let mut heap = Heap::new();
        let s = heap.alloc_string("hi");
        let array = heap.alloc_array(vec![Value::Number(1.0), Value::Object(s)]);
        assert_eq!(display_value(&heap, Value::Object(array)), "[1, hi]");
    }

    #[test]
    fn cyclic_arrays_terminate() {
        let mut heap = Heap::new();
        let array = heap.alloc_array(vec![Value::Nil]);
        if let Cell::Array(cells) = heap.cell_mut(array) {
            cells.set_element(0, Value::Object(array));
        }
        // Must terminate; exact cutoff rendering is unimportant.
        let rendered = display_value(&heap, Value::Object(array));
        assert!(rendered.starts_with('['));
    }
}
