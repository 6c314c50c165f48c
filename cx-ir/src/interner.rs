//! Global string interning.
//!
//! Every identifier, mangled name, and synthesized label is interned once
//! and referenced by a stable `StringHandle`; equality and hashing are
//! handle-based rather than string-based (§3, Handles & Interning).

use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringHandle(u32);

/// Concurrent interner — mirrors the teacher's `dashmap`-backed `TypeInterner`,
/// generalized from types to every interned string the core produces.
pub struct StringInterner {
    by_text: DashMap<Arc<str>, StringHandle>,
    by_handle: DashMap<StringHandle, Arc<str>>,
    next: AtomicU32,
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl StringInterner {
    pub fn new() -> Self {
        Self {
            by_text: DashMap::new(),
            by_handle: DashMap::new(),
            next: AtomicU32::new(0),
        }
    }

    pub fn intern(&self, text: &str) -> StringHandle {
        if let Some(existing) = self.by_text.get(text) {
            return *existing;
        }
        // Racing inserts are harmless: the loser's handle is simply discarded,
        // and the entry_or_insert pattern below keeps `by_text` authoritative.
        let handle = StringHandle(self.next.fetch_add(1, Ordering::Relaxed));
        let arc: Arc<str> = Arc::from(text);
        match self.by_text.entry(arc.clone()) {
            dashmap::mapref::entry::Entry::Occupied(existing) => *existing.get(),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(handle);
                self.by_handle.insert(handle, arc);
                handle
            }
        }
    }

    pub fn resolve(&self, handle: StringHandle) -> Option<Arc<str>> {
        self.by_handle.get(&handle).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let interner = StringInterner::new();
        let a = interner.intern("Widget::draw");
        let b = interner.intern("Widget::draw");
        assert_eq!(a, b);
        assert_eq!(interner.resolve(a).as_deref(), Some("Widget::draw"));
    }

    #[test]
    fn distinct_strings_get_distinct_handles() {
        let interner = StringInterner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        assert_ne!(a, b);
    }
}
