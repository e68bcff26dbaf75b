//! Expression evaluation: literals, operators, member access, assignment,
//! and the call protocol.
//!
//! Assignment targets resolve exactly once (identifier, or evaluated object
//! plus resolved key) before the right-hand side runs, so a computed member
//! target's side effects fire a single time for both plain and compound
//! forms.

use std::rc::Rc;

use lode_ir::{AssignOp, Expr, FunctionExpr, MemberKey, Name};
use lode_rt::{Cell, Completion, FunctionCell, Handle, PropertyKey, ScopeKind, Signal, Value};
use smallvec::SmallVec;

use crate::coerce::{array_index, to_addressable};
use crate::errors;
use crate::operators::{evaluate_binary, evaluate_unary};
use crate::stack::ensure_sufficient_stack;

use super::Interpreter;

/// An assignment target, resolved once.
enum Place {
    Variable(Name),
    Member { object: Handle, key: PropertyKey },
}

impl Interpreter {
    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> Completion {
        ensure_sufficient_stack(|| self.eval_expr_inner(expr))
    }

    fn eval_expr_inner(&mut self, expr: &Expr) -> Completion {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),
            Expr::Nil => Ok(Value::Nil),
            Expr::Str(s) => Ok(Value::Object(self.heap.alloc_string(s.as_str()))),
            Expr::Identifier(name) => self.lookup_variable(*name),
            Expr::Function(function) => self.eval_function(function),
            Expr::Call { callee, arguments } => self.eval_call(callee, arguments),
            Expr::Unary { op, operand } => {
                let operand = self.eval_expr(operand)?;
                evaluate_unary(&mut self.heap, *op, operand)
            }
            Expr::Binary { lhs, op, rhs } => self.with_temps(|it| {
                let lhs = it.eval_expr(lhs)?;
                // The left operand must survive allocations made while the
                // right operand evaluates.
                it.heap.protect(lhs);
                let rhs = it.eval_expr(rhs)?;
                it.heap.protect(rhs);
                evaluate_binary(&mut it.heap, *op, lhs, rhs)
            }),
            Expr::Member { object, key } => self.with_temps(|it| {
                let object = it.eval_expr(object)?;
                it.heap.protect(object);
                let key = it.resolve_key(key)?;
                let handle = to_addressable(&mut it.heap, object)?;
                it.read_member(handle, &key)
            }),
            Expr::Assign { target, op, value } => self.eval_assignment(target, *op, value),
            Expr::Object(entries) => self.eval_object_literal(entries),
            Expr::Array(elements) => self.eval_array_literal(elements),
        }
    }

    /// A function literal captures the scope it is evaluated in. A named
    /// function is also bound under its name in the current scope, which is
    /// what lets a declaration call itself recursively.
    fn eval_function(&mut self, function: &FunctionExpr) -> Completion {
        let scope = self.env.current(&self.heap);
        let handle = self.heap.allocate(Cell::Function(FunctionCell {
            name: function.name,
            parameters: Rc::clone(&function.parameters),
            body: Rc::clone(&function.body),
            scope,
        }));
        let value = Value::Object(handle);
        if let Some(name) = function.name {
            self.env.define(&mut self.heap, name, value);
        }
        Ok(value)
    }

    fn eval_object_literal(&mut self, entries: &[(Name, Expr)]) -> Completion {
        self.with_temps(|it| {
            let object = it.heap.alloc_object();
            // Protecting the cell also keeps every value stored into it.
            it.heap.protect(Value::Object(object));
            for (name, expr) in entries {
                let value = it.eval_expr(expr)?;
                let key = it.interner.lookup(*name);
                if let Cell::Object(cell) = it.heap.cell_mut(object) {
                    cell.put(key, value);
                }
            }
            Ok(Value::Object(object))
        })
    }

    fn eval_array_literal(&mut self, elements: &[Expr]) -> Completion {
        self.with_temps(|it| {
            let array = it.heap.alloc_array(Vec::with_capacity(elements.len()));
            it.heap.protect(Value::Object(array));
            for element in elements {
                let value = it.eval_expr(element)?;
                if let Cell::Array(cell) = it.heap.cell_mut(array) {
                    let index = cell.len();
                    cell.set_element(index, value);
                }
            }
            Ok(Value::Object(array))
        })
    }

    // Member access

    /// Resolve a member expression's key: a static identifier, or a
    /// computed expression that must evaluate to a number or a string.
    fn resolve_key(&mut self, key: &MemberKey) -> Result<PropertyKey, Signal> {
        match key {
            MemberKey::Named(name) => {
                Ok(PropertyKey::String(self.interner.lookup(*name).to_owned()))
            }
            MemberKey::Computed(expr) => {
                let value = self.eval_expr(expr)?;
                if let Value::Number(n) = value {
                    return Ok(PropertyKey::Number(n));
                }
                if let Value::Object(handle) = value {
                    if let Some(text) = self.heap.string(handle) {
                        return Ok(PropertyKey::String(text.to_owned()));
                    }
                }
                let kind = self.heap.value_kind(value);
                Err(errors::invalid_property_key(&mut self.heap, kind))
            }
        }
    }

    /// Read through a resolved target. Missing properties and out-of-range
    /// array reads yield nil, never a fault; a key of the wrong kind for the
    /// addressed cell is a `TypeError`.
    fn read_member(&mut self, handle: Handle, key: &PropertyKey) -> Completion {
        let is_array = matches!(self.heap.cell(handle), Cell::Array(_));
        match (key, is_array) {
            (PropertyKey::String(name), false) => {
                let value = self
                    .heap
                    .cell(handle)
                    .as_object()
                    .and_then(|object| object.get(name));
                Ok(value.unwrap_or(Value::Nil))
            }
            (PropertyKey::String(_), true) => Err(errors::string_key_on_array(&mut self.heap)),
            (PropertyKey::Number(_), false) => Err(errors::numeric_key_on_object(&mut self.heap)),
            (PropertyKey::Number(n), true) => {
                let index = array_index(&mut self.heap, *n)?;
                let value = self
                    .heap
                    .cell(handle)
                    .as_array()
                    .and_then(|array| array.element(index));
                Ok(value.unwrap_or(Value::Nil))
            }
        }
    }

    /// Upsert through a resolved target.
    fn write_member(
        &mut self,
        handle: Handle,
        key: &PropertyKey,
        value: Value,
    ) -> Result<(), Signal> {
        let is_array = matches!(self.heap.cell(handle), Cell::Array(_));
        match (key, is_array) {
            (PropertyKey::String(name), false) => {
                if let Some(object) = self.heap.cell_mut(handle).as_object_mut() {
                    object.put(name.clone(), value);
                }
                Ok(())
            }
            (PropertyKey::String(_), true) => Err(errors::string_key_on_array(&mut self.heap)),
            (PropertyKey::Number(_), false) => Err(errors::numeric_key_on_object(&mut self.heap)),
            (PropertyKey::Number(n), true) => {
                let index = array_index(&mut self.heap, *n)?;
                if let Some(array) = self.heap.cell_mut(handle).as_array_mut() {
                    array.set_element(index, value);
                }
                Ok(())
            }
        }
    }

    // Assignment

    fn eval_assignment(&mut self, target: &Expr, op: AssignOp, value: &Expr) -> Completion {
        self.with_temps(|it| {
            let place = it.resolve_place(target)?;
            let result = match op.binary_op() {
                None => it.eval_expr(value)?,
                Some(binary) => {
                    let current = it.read_place(&place)?;
                    it.heap.protect(current);
                    let rhs = it.eval_expr(value)?;
                    it.heap.protect(rhs);
                    evaluate_binary(&mut it.heap, binary, current, rhs)?
                }
            };
            it.heap.protect(result);
            it.write_place(&place, result)?;
            Ok(result)
        })
    }

    /// Resolve the left-hand side of an assignment. Evaluates the object
    /// and key sub-expressions of a member target; the caller's scratch
    /// frame keeps the resolved object alive until the write.
    fn resolve_place(&mut self, target: &Expr) -> Result<Place, Signal> {
        match target {
            Expr::Identifier(name) => Ok(Place::Variable(*name)),
            Expr::Member { object, key } => {
                let object = self.eval_expr(object)?;
                self.heap.protect(object);
                let key = self.resolve_key(key)?;
                let handle = to_addressable(&mut self.heap, object)?;
                self.heap.protect(Value::Object(handle));
                Ok(Place::Member {
                    object: handle,
                    key,
                })
            }
            _ => Err(errors::invalid_assignment_target(&mut self.heap)),
        }
    }

    fn read_place(&mut self, place: &Place) -> Completion {
        match place {
            Place::Variable(name) => self.lookup_variable(*name),
            Place::Member { object, key } => self.read_member(*object, key),
        }
    }

    fn write_place(&mut self, place: &Place, value: Value) -> Result<(), Signal> {
        match place {
            Place::Variable(name) => {
                self.env.assign(&mut self.heap, *name, value);
                Ok(())
            }
            Place::Member { object, key } => self.write_member(*object, key, value),
        }
    }

    // Calls

    /// Evaluate the callee, then each argument left to right in the
    /// caller's scope, then dispatch on what the callee holds.
    fn eval_call(&mut self, callee: &Expr, arguments: &[Expr]) -> Completion {
        self.with_temps(|it| {
            let callee = it.eval_expr(callee)?;
            it.heap.protect(callee);

            let mut args: SmallVec<[Value; 8]> = SmallVec::with_capacity(arguments.len());
            for argument in arguments {
                let value = it.eval_expr(argument)?;
                // Earlier arguments must survive allocations made by later
                // ones.
                it.heap.protect(value);
                args.push(value);
            }

            let Some(handle) = callee.as_handle() else {
                let kind = it.heap.value_kind(callee);
                return Err(errors::not_callable(&mut it.heap, kind));
            };
            match it.heap.cell(handle) {
                Cell::Function(_) => it.call_function(handle, &args),
                Cell::Native(_) => it.call_native(handle, &args),
                _ => {
                    let kind = it.heap.value_kind(callee);
                    Err(errors::not_callable(&mut it.heap, kind))
                }
            }
        })
    }

    /// Invoke a closure: arity check, a fresh Function scope parented to
    /// the *captured* defining scope, positional binding with defaults
    /// evaluated in the new scope, then the body. Falling off the end
    /// yields nil.
    fn call_function(&mut self, handle: Handle, args: &[Value]) -> Completion {
        let (name, parameters, body, captured, required) = match self.heap.cell(handle) {
            Cell::Function(function) => (
                function.name,
                Rc::clone(&function.parameters),
                Rc::clone(&function.body),
                function.scope,
                function.required_parameter_count(),
            ),
            other => panic!("call_function on a {} cell", other.kind_name()),
        };

        if args.len() < required || args.len() > parameters.len() {
            return Err(errors::arity_mismatch(
                &mut self.heap,
                required,
                parameters.len(),
                args.len(),
            ));
        }

        let label = name.map_or("<anonymous>", |n| self.interner.lookup(n));
        self.trace_call(label, args.len());

        let outcome = self.with_scope(ScopeKind::Function, captured, |it| {
            for (index, parameter) in parameters.iter().enumerate() {
                let value = match args.get(index) {
                    Some(value) => *value,
                    None => match &parameter.default {
                        Some(default) => it.eval_expr(default)?,
                        None => {
                            let text = it.interner.lookup(parameter.name);
                            return Err(errors::missing_argument(&mut it.heap, text));
                        }
                    },
                };
                it.env.define(&mut it.heap, parameter.name, value);
            }
            it.eval_block_stmts(&body)
        });

        match outcome {
            Ok(_) => Ok(Value::Nil),
            Err(Signal::Return(value)) => Ok(value),
            Err(signal @ (Signal::Break | Signal::Continue)) => {
                Err(errors::stray_loop_control(&mut self.heap, signal))
            }
            Err(thrown @ Signal::Thrown(_)) => Err(thrown),
        }
    }

    /// Invoke a native callable. The arguments stay rooted in the caller's
    /// scratch frame for the duration of the call; a failure surfaces as a
    /// thrown exception of the kind the native reported.
    fn call_native(&mut self, handle: Handle, args: &[Value]) -> Completion {
        let (name, function) = match self.heap.cell(handle) {
            Cell::Native(native) => (native.name.clone(), Rc::clone(&native.function)),
            other => panic!("call_native on a {} cell", other.kind_name()),
        };
        self.trace_call(&name, args.len());
        match function(&mut self.heap, args) {
            Ok(value) => Ok(value),
            Err(error) => Err(errors::native_failure(&mut self.heap, &name, error)),
        }
    }
}
