//! The closed set of heap-managed object types.
//!
//! Every heap entity is a variant of [`Cell`]. The set is fixed, so the
//! collector's graph-visitation and the evaluator's capability checks are
//! exhaustive matches rather than downcasts.

use std::fmt;
use std::rc::Rc;

use lode_ir::{Block, Name, Parameter};
use rustc_hash::FxHashMap;

use crate::{Handle, Heap, Value};

/// Exception category carried by an [`ExceptionCell`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExceptionKind {
    /// Operator/operand kind mismatch, calling a non-callable, bad index.
    Type,
    /// Unbound identifier, or a missing symbol surfaced by the FFI loader.
    Reference,
    /// Argument count mismatch with no defaults to cover it.
    Arity,
    /// `break`/`continue` reaching a function or program boundary.
    Syntax,
    /// Native module file missing (surfaced by the FFI collaborator).
    FileNotFound,
    /// Native module load failure (surfaced by the FFI collaborator).
    Load,
    /// Explicit `throw` of an exception object.
    User,
}

impl ExceptionKind {
    /// The name shown in rendered exceptions, e.g. `TypeError: ...`.
    pub const fn as_str(self) -> &'static str {
        match self {
            ExceptionKind::Type => "TypeError",
            ExceptionKind::Reference => "ReferenceError",
            ExceptionKind::Arity => "ArityError",
            ExceptionKind::Syntax => "SyntaxError",
            ExceptionKind::FileNotFound => "FileNotFoundError",
            ExceptionKind::Load => "LoadError",
            ExceptionKind::User => "Exception",
        }
    }
}

/// A generic object: a string-keyed property map.
#[derive(Debug, Default)]
pub struct ObjectCell {
    properties: FxHashMap<String, Value>,
}

impl ObjectCell {
    pub fn new() -> Self {
        ObjectCell::default()
    }

    /// Look up a property. Absence is `None`, never a fault — the language
    /// level mapping of a missing key to `nil` happens at the access site.
    #[inline]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.properties.get(key).copied()
    }

    /// Insert or overwrite a property.
    #[inline]
    pub fn put(&mut self, key: impl Into<String>, value: Value) {
        self.properties.insert(key.into(), value);
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Iterate over `(key, value)` pairs in unspecified order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// A mutable index-addressed sequence of values.
#[derive(Debug, Default)]
pub struct ArrayCell {
    elements: Vec<Value>,
}

impl ArrayCell {
    pub fn new(elements: Vec<Value>) -> Self {
        ArrayCell { elements }
    }

    /// Read an element. Out-of-range reads are `None`; the language maps
    /// them to `nil`.
    #[inline]
    pub fn element(&self, index: usize) -> Option<Value> {
        self.elements.get(index).copied()
    }

    /// Write an element. Writing at the length appends; writing past the
    /// length grows the array, filling the gap with `nil`.
    pub fn set_element(&mut self, index: usize, value: Value) {
        if index >= self.elements.len() {
            self.elements.resize(index + 1, Value::Nil);
        }
        self.elements[index] = value;
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[Value] {
        &self.elements
    }
}

/// A function closure: parameters and body shared with the syntax tree,
/// plus the scope captured at the point of definition.
///
/// Immutable after creation; the captured scope handle is what makes scope
/// frames require liveness tracing rather than stack-only lifetime.
#[derive(Debug)]
pub struct FunctionCell {
    pub name: Option<Name>,
    pub parameters: Rc<Vec<Parameter>>,
    pub body: Rc<Block>,
    pub scope: Handle,
}

impl FunctionCell {
    /// Number of leading parameters with no default value.
    pub fn required_parameter_count(&self) -> usize {
        self.parameters
            .iter()
            .take_while(|p| p.default.is_none())
            .count()
    }
}

/// Error returned by a native callable; the evaluator rethrows it as a
/// language-level exception of the carried kind.
#[derive(Clone, Debug)]
pub struct NativeError {
    pub kind: ExceptionKind,
    pub message: String,
}

impl NativeError {
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        NativeError {
            kind,
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        NativeError::new(ExceptionKind::Type, message)
    }
}

/// An externally supplied callable.
///
/// Receives the heap (so it can allocate its return value) and the already
/// evaluated argument values. The evaluator keeps the arguments rooted for
/// the duration of the call; a native that allocates in several steps must
/// protect its own intermediates via [`Heap::protect`], and must not retain
/// handles beyond the call — nothing keeps them alive afterwards.
pub type NativeFn = Rc<dyn Fn(&mut Heap, &[Value]) -> Result<Value, NativeError>>;

/// A native function wrapped as a heap value.
pub struct NativeCell {
    pub name: String,
    pub function: NativeFn,
}

impl fmt::Debug for NativeCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeCell")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A runtime exception: a kind tag and a message.
///
/// Used both for runtime faults (type errors, missing references) and for
/// `throw` of a constructed exception; `throw` of an arbitrary non-exception
/// value carries that value directly in `Signal::Thrown` without a cell.
#[derive(Clone, Debug)]
pub struct ExceptionCell {
    pub kind: ExceptionKind,
    pub message: String,
}

impl ExceptionCell {
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        ExceptionCell {
            kind,
            message: message.into(),
        }
    }

    /// The `Kind: message` rendering used by hosts and `..` coercion.
    pub fn render(&self) -> String {
        format!("{}: {}", self.kind.as_str(), self.message)
    }
}

/// Which construct introduced a scope frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
}

/// A lexical frame of name bindings with an optional parent link.
///
/// Frames form a tree at creation time; any live frame sees a linear chain
/// up to the global frame. Closures keep their defining frame alive through
/// the collector, not through the interpreter's stack.
#[derive(Debug)]
pub struct ScopeCell {
    kind: ScopeKind,
    bindings: FxHashMap<Name, Value>,
    parent: Option<Handle>,
}

impl ScopeCell {
    pub fn new(kind: ScopeKind, parent: Option<Handle>) -> Self {
        ScopeCell {
            kind,
            bindings: FxHashMap::default(),
            parent,
        }
    }

    #[inline]
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    #[inline]
    pub fn parent(&self) -> Option<Handle> {
        self.parent
    }

    /// Create or overwrite a binding in this frame.
    #[inline]
    pub fn define(&mut self, name: Name, value: Value) {
        self.bindings.insert(name, value);
    }

    /// Look up a binding in this frame only (no chain walk).
    #[inline]
    pub fn lookup_local(&self, name: Name) -> Option<Value> {
        self.bindings.get(&name).copied()
    }

    /// Rebind in this frame only. Returns `false` if the name is not bound
    /// here; the caller continues up the chain.
    #[inline]
    pub fn assign_local(&mut self, name: Name, value: Value) -> bool {
        match self.bindings.get_mut(&name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn bindings(&self) -> impl Iterator<Item = (Name, Value)> + '_ {
        self.bindings.iter().map(|(n, v)| (*n, *v))
    }
}

/// A heap-managed runtime entity.
#[derive(Debug)]
pub enum Cell {
    Str(Box<str>),
    Object(ObjectCell),
    Array(ArrayCell),
    Function(FunctionCell),
    Native(NativeCell),
    Exception(ExceptionCell),
    Scope(ScopeCell),
}

impl Cell {
    /// Visit every handle this cell owns that might keep another cell
    /// alive. Missing a child here is the collector's worst defect class
    /// (premature reclamation of a live object); the reachability property
    /// tests in `heap` exercise each variant.
    pub fn visit_graph(&self, visit: &mut dyn FnMut(Handle)) {
        fn visit_value(value: Value, visit: &mut dyn FnMut(Handle)) {
            if let Value::Object(h) = value {
                visit(h);
            }
        }

        match self {
            Cell::Str(_) | Cell::Native(_) | Cell::Exception(_) => {}
            Cell::Object(object) => {
                for (_, value) in object.entries() {
                    visit_value(value, visit);
                }
            }
            Cell::Array(array) => {
                for &value in array.elements() {
                    visit_value(value, visit);
                }
            }
            Cell::Function(function) => visit(function.scope),
            Cell::Scope(scope) => {
                for (_, value) in scope.bindings() {
                    visit_value(value, visit);
                }
                if let Some(parent) = scope.parent() {
                    visit(parent);
                }
            }
        }
    }

    /// Approximate payload size in bytes, used only for the collector's
    /// pressure heuristic.
    pub fn approximate_size(&self) -> usize {
        let payload = match self {
            Cell::Str(s) => s.len(),
            Cell::Object(object) => object.len() * 48,
            Cell::Array(array) => array.len() * std::mem::size_of::<Value>(),
            Cell::Function(_) | Cell::Native(_) => 0,
            Cell::Exception(e) => e.message.len(),
            Cell::Scope(scope) => scope.bindings.len() * 24,
        };
        std::mem::size_of::<Cell>() + payload
    }

    /// Runtime kind name used in error messages.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Cell::Str(_) => "string",
            Cell::Object(_) => "object",
            Cell::Array(_) => "array",
            Cell::Function(_) => "function",
            Cell::Native(_) => "native function",
            Cell::Exception(_) => "exception",
            Cell::Scope(_) => "scope",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectCell> {
        match self {
            Cell::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectCell> {
        match self {
            Cell::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayCell> {
        match self {
            Cell::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayCell> {
        match self {
            Cell::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionCell> {
        match self {
            Cell::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_exception(&self) -> Option<&ExceptionCell> {
        match self {
            Cell::Exception(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Cell::Function(_) | Cell::Native(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn object_get_of_missing_key_is_none() {
        let mut object = ObjectCell::new();
        object.put("x", Value::Number(1.0));
        assert_eq!(object.get("x"), Some(Value::Number(1.0)));
        assert_eq!(object.get("y"), None);
    }

    #[test]
    fn array_write_past_length_fills_with_nil() {
        let mut array = ArrayCell::new(vec![Value::Number(1.0)]);
        array.set_element(3, Value::Number(4.0));
        assert_eq!(array.len(), 4);
        assert_eq!(array.element(1), Some(Value::Nil));
        assert_eq!(array.element(2), Some(Value::Nil));
        assert_eq!(array.element(3), Some(Value::Number(4.0)));
    }

    #[test]
    fn array_read_out_of_range_is_none() {
        let array = ArrayCell::new(vec![]);
        assert_eq!(array.element(0), None);
    }

    #[test]
    fn scope_assign_local_reports_absence() {
        let x = Name::from_raw(1);
        let y = Name::from_raw(2);
        let mut scope = ScopeCell::new(ScopeKind::Block, None);
        scope.define(x, Value::Number(1.0));
        assert!(scope.assign_local(x, Value::Number(2.0)));
        assert!(!scope.assign_local(y, Value::Number(3.0)));
        assert_eq!(scope.lookup_local(x), Some(Value::Number(2.0)));
    }

    #[test]
    fn exception_renders_kind_and_message() {
        let e = ExceptionCell::new(ExceptionKind::Type, "cannot add string and nil");
        assert_eq!(e.render(), "TypeError: cannot add string and nil");
    }
}
