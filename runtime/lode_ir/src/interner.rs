//! String interner shared between the parser and the runtime.
//!
//! Interned strings live for the lifetime of the process (they are leaked
//! on first interning), which is what lets `lookup` hand out `&'static str`
//! without holding the lock across the call site.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::ops::Deref;
use std::sync::Arc;

use crate::Name;

struct Inner {
    /// Map from string content to index.
    map: FxHashMap<&'static str, u32>,
    /// Storage for string contents, indexed by `Name::raw`.
    strings: Vec<&'static str>,
}

/// Interner mapping strings to compact [`Name`] ids.
///
/// Interning the same string twice yields the same `Name`. Interior locking
/// keeps `intern` usable through a shared reference so the interner can sit
/// behind an [`Arc`].
pub struct StringInterner {
    inner: RwLock<Inner>,
}

impl StringInterner {
    /// Create a new interner with the empty string pre-interned as
    /// [`Name::EMPTY`].
    pub fn new() -> Self {
        let mut map = FxHashMap::default();
        map.insert("", 0);
        StringInterner {
            inner: RwLock::new(Inner {
                map,
                strings: vec![""],
            }),
        }
    }

    /// Intern a string, returning its `Name`.
    pub fn intern(&self, s: &str) -> Name {
        if let Some(&idx) = self.inner.read().map.get(s) {
            return Name::from_raw(idx);
        }

        let mut inner = self.inner.write();
        // Re-check under the write lock: another caller may have interned
        // `s` between the read and write acquisitions.
        if let Some(&idx) = inner.map.get(s) {
            return Name::from_raw(idx);
        }

        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let idx = u32::try_from(inner.strings.len()).unwrap_or_else(|_| {
            panic!("interner exhausted: more than u32::MAX distinct strings")
        });
        inner.strings.push(leaked);
        inner.map.insert(leaked, idx);
        Name::from_raw(idx)
    }

    /// Resolve a `Name` back to its string content.
    ///
    /// Panics if `name` was not produced by this interner; that is an
    /// internal invariant violation, not a recoverable condition.
    pub fn lookup(&self, name: Name) -> &'static str {
        let inner = self.inner.read();
        match inner.strings.get(name.raw() as usize) {
            Some(s) => s,
            None => panic!("Name({}) does not belong to this interner", name.raw()),
        }
    }

    /// Number of distinct interned strings.
    pub fn len(&self) -> usize {
        self.inner.read().strings.len()
    }

    /// Returns `true` if only the pre-interned empty string is present.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

/// Shareable handle to a [`StringInterner`].
#[derive(Clone)]
pub struct SharedInterner(Arc<StringInterner>);

impl SharedInterner {
    pub fn new() -> Self {
        SharedInterner(Arc::new(StringInterner::new()))
    }
}

impl Default for SharedInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for SharedInterner {
    type Target = StringInterner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn intern_is_idempotent() {
        let interner = StringInterner::new();
        let a = interner.intern("count");
        let b = interner.intern("count");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_strings_get_distinct_names() {
        let interner = StringInterner::new();
        let a = interner.intern("x");
        let b = interner.intern("y");
        assert_ne!(a, b);
    }

    #[test]
    fn lookup_round_trips() {
        let interner = StringInterner::new();
        let name = interner.intern("factorial");
        assert_eq!(interner.lookup(name), "factorial");
    }

    #[test]
    fn empty_string_is_pre_interned() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert_eq!(interner.lookup(Name::EMPTY), "");
    }

    #[test]
    fn shared_interner_shares_state() {
        let shared = SharedInterner::new();
        let clone = shared.clone();
        let a = shared.intern("shared");
        let b = clone.intern("shared");
        assert_eq!(a, b);
    }
}
