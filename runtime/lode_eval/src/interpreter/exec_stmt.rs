//! Statement evaluation and the control-flow protocol.
//!
//! Blocks short-circuit via `?`; loops intercept `Break`/`Continue` and
//! re-propagate everything else; `try` handles `Thrown` and lets a
//! non-normal `finally` outcome override whatever was in flight.

use lode_ir::{Block, CatchClause, Expr, Stmt};
use lode_rt::{Cell, Completion, ScopeKind, Signal, Value};

use super::Interpreter;

impl Interpreter {
    /// Evaluate the statements of a block in the *current* scope,
    /// yielding the last statement's value (nil for an empty block).
    pub(crate) fn eval_block_stmts(&mut self, block: &Block) -> Completion {
        let mut last = Value::Nil;
        for stmt in &block.statements {
            last = self.eval_stmt(stmt)?;
        }
        Ok(last)
    }

    /// Evaluate a block in a fresh Block-kind scope.
    pub(crate) fn eval_block_scoped(&mut self, block: &Block) -> Completion {
        let parent = self.env.current(&self.heap);
        self.with_scope(ScopeKind::Block, parent, |it| it.eval_block_stmts(block))
    }

    pub(crate) fn eval_stmt(&mut self, stmt: &Stmt) -> Completion {
        match stmt {
            Stmt::Expr(expr) => self.eval_expr(expr),
            Stmt::Block(block) => self.eval_block_scoped(block),
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval_expr(test)?.is_truthy() {
                    self.eval_block_scoped(consequent)
                } else if let Some(alternate) = alternate {
                    self.eval_block_scoped(alternate)
                } else {
                    Ok(Value::Nil)
                }
            }
            Stmt::While { test, body } => self.eval_while(test, body),
            Stmt::DoWhile { body, test } => self.eval_do_while(body, test),
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.eval_for(init.as_ref(), test.as_ref(), update.as_ref(), body),
            Stmt::Return(argument) => {
                let value = match argument {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Nil,
                };
                Err(Signal::Return(value))
            }
            Stmt::Break => Err(Signal::Break),
            Stmt::Continue => Err(Signal::Continue),
            Stmt::Global { name, value } => {
                let value = self.eval_expr(value)?;
                self.env.define_global(&mut self.heap, *name, value);
                Ok(value)
            }
            Stmt::Export { name, value } => self.eval_export(*name, value),
            Stmt::Throw(expr) => {
                let value = self.eval_expr(expr)?;
                Err(Signal::Thrown(value))
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => self.eval_try(block, handler.as_ref(), finalizer.as_ref()),
        }
    }

    /// Loops complete with nil whether or not a `break` fired; `Return`
    /// and `Thrown` pass through untouched.
    fn eval_while(&mut self, test: &Expr, body: &Block) -> Completion {
        while self.eval_expr(test)?.is_truthy() {
            match self.eval_block_scoped(body) {
                Ok(_) | Err(Signal::Continue) => {}
                Err(Signal::Break) => break,
                Err(other) => return Err(other),
            }
        }
        Ok(Value::Nil)
    }

    /// The body runs at least once; the test is evaluated afterwards.
    fn eval_do_while(&mut self, body: &Block, test: &Expr) -> Completion {
        loop {
            match self.eval_block_scoped(body) {
                Ok(_) | Err(Signal::Continue) => {}
                Err(Signal::Break) => break,
                Err(other) => return Err(other),
            }
            if !self.eval_expr(test)?.is_truthy() {
                break;
            }
        }
        Ok(Value::Nil)
    }

    /// The whole statement gets one scope (so the init binding is
    /// loop-local), the body a fresh scope per iteration. `continue` skips
    /// to the update expression, then the test.
    fn eval_for(
        &mut self,
        init: Option<&Expr>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Block,
    ) -> Completion {
        let parent = self.env.current(&self.heap);
        self.with_scope(ScopeKind::Block, parent, |it| {
            if let Some(init) = init {
                it.eval_expr(init)?;
            }
            loop {
                if let Some(test) = test {
                    if !it.eval_expr(test)?.is_truthy() {
                        break;
                    }
                }
                match it.eval_block_scoped(body) {
                    Ok(_) | Err(Signal::Continue) => {}
                    Err(Signal::Break) => break,
                    Err(other) => return Err(other),
                }
                if let Some(update) = update {
                    it.eval_expr(update)?;
                }
            }
            Ok(Value::Nil)
        })
    }

    /// `export name = value`: bind like an assignment and record the value
    /// in the pinned exports object.
    fn eval_export(&mut self, name: lode_ir::Name, value: &Expr) -> Completion {
        let value = self.eval_expr(value)?;
        self.env.assign(&mut self.heap, name, value);
        let key = self.interner.lookup(name);
        let exports = self.exports_handle();
        if let Cell::Object(object) = self.heap.cell_mut(exports) {
            object.put(key, value);
        }
        Ok(value)
    }

    fn eval_try(
        &mut self,
        block: &Block,
        handler: Option<&CatchClause>,
        finalizer: Option<&Block>,
    ) -> Completion {
        let mut outcome = self.eval_block_scoped(block);

        if let Err(Signal::Thrown(thrown)) = outcome {
            if let Some(handler) = handler {
                outcome = self.with_temps(|it| {
                    // The thrown value is unrooted while the catch scope is
                    // allocated.
                    it.heap.protect(thrown);
                    let parent = it.env.current(&it.heap);
                    it.with_scope(ScopeKind::Block, parent, |it| {
                        it.env.define(&mut it.heap, handler.parameter, thrown);
                        it.eval_block_stmts(&handler.body)
                    })
                });
            }
        }

        if let Some(finalizer) = finalizer {
            let fin = self.with_temps(|it| {
                // Keep the pending result's payload alive while the
                // finalizer runs arbitrary code.
                match outcome {
                    Ok(value) | Err(Signal::Return(value) | Signal::Thrown(value)) => {
                        it.heap.protect(value);
                    }
                    Err(Signal::Break | Signal::Continue) => {}
                }
                it.eval_block_scoped(finalizer)
            });
            // A non-normal finalizer outcome supersedes the in-flight one.
            if let Err(signal) = fin {
                return Err(signal);
            }
        }

        outcome
    }
}
