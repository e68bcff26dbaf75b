//! The native-extension registration bridge.
//!
//! The dynamic-library loader lives outside the core: it produces a
//! [`NativeModule`] whose single entry point receives a registration sink
//! and supplies exported-name → callable pairs. The core wraps each
//! callable as a native-function value bound in the global scope.

use lode_rt::{Cell, NativeCell, NativeFn, Value};

use crate::Interpreter;

/// Registration sink handed to a module's entry point.
pub trait NativeRegistry {
    /// Bind `function` in the global scope under `name`.
    fn register(&mut self, name: &str, function: NativeFn);
}

/// An external extension module.
///
/// # Handle retention hazard
///
/// Native callables receive already-evaluated values and must return
/// exactly one value. The evaluator keeps the arguments rooted for the
/// duration of the call, and nothing longer: a callable that stows a heap
/// handle somewhere and uses it on a later call will observe it dangling
/// after a collection. A callable that allocates in several steps must
/// protect its own intermediates with `Heap::protect`/`release_to`.
pub trait NativeModule {
    /// Supply the module's exports to the registration sink.
    fn initialize(&self, registry: &mut dyn NativeRegistry);
}

impl NativeRegistry for Interpreter {
    fn register(&mut self, name: &str, function: NativeFn) {
        self.register_native(name, function);
    }
}

impl Interpreter {
    /// Bind a single native callable in the global scope.
    pub fn register_native(&mut self, name: &str, function: NativeFn) {
        let cell = Cell::Native(NativeCell {
            name: name.to_owned(),
            function,
        });
        let handle = self.heap_mut().allocate(cell);
        let binding = self.interner().intern(name);
        self.define_global(binding, Value::Object(handle));
    }

    /// Run a module's entry point against this interpreter.
    pub fn load_module(&mut self, module: &dyn NativeModule) {
        module.initialize(self);
    }
}
