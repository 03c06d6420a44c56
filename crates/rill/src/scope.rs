//! The identifier table: a stack of lexical scope levels.
//!
//! A level is pushed at function entry and popped on return; the bottom level
//! is the top-level scope, where function bookmarks live alongside global
//! variables. Name lookup checks the innermost level first and then falls
//! back to the top level only, so a callee never sees its caller's locals.

use indexmap::IndexMap;

use crate::{
    heap::{DropWithHeap, Heap},
    value::Value,
};

/// One scope level: names to their (possibly unbound) values, in declaration
/// order.
type Level = IndexMap<String, Option<Value>>;

/// The scope stack.
#[derive(Debug)]
pub(crate) struct Scopes {
    levels: Vec<Level>,
}

impl Scopes {
    /// Creates the stack with just the top level.
    pub(crate) fn new() -> Self {
        Self {
            levels: vec![Level::new()],
        }
    }

    /// Pushes a fresh level for a function call.
    pub(crate) fn append_level(&mut self) {
        self.levels.push(Level::new());
    }

    /// Pops the innermost level, releasing everything bound in it.
    pub(crate) fn remove_level(&mut self, heap: &mut Heap) {
        debug_assert!(self.levels.len() > 1, "the top level is never removed");
        if let Some(level) = self.levels.pop() {
            for (_, slot) in level {
                slot.drop_with_heap(heap);
            }
        }
    }

    /// The level a name resolves to: innermost first, then the top level.
    fn find_level(&self, name: &str) -> Option<usize> {
        let innermost = self.levels.len() - 1;
        if self.levels[innermost].contains_key(name) {
            return Some(innermost);
        }
        if innermost > 0 && self.levels[0].contains_key(name) {
            return Some(0);
        }
        None
    }

    /// Declares a name at the innermost level, unbound. Returns `false` when
    /// the name already exists at that level.
    pub(crate) fn add(&mut self, name: &str) -> bool {
        let level = self.levels.last_mut().expect("scope stack is never empty");
        if level.contains_key(name) {
            false
        } else {
            level.insert(name.to_owned(), None);
            true
        }
    }

    /// Looks a name up; `None` means undeclared, `Some(None)` declared but
    /// currently unbound.
    pub(crate) fn lookup(&self, name: &str) -> Option<&Option<Value>> {
        self.find_level(name).map(|level| &self.levels[level][name])
    }

    /// Binds a value to a declared name, taking over the caller's reference
    /// and releasing whatever was bound before.
    ///
    /// # Panics
    /// Panics if the name was never declared; callers check first.
    pub(crate) fn bind(&mut self, name: &str, value: Value, heap: &mut Heap) {
        let level = self.find_level(name).expect("Scopes::bind: identifier missing");
        let slot = self.levels[level].get_mut(name).expect("Scopes::bind: slot missing");
        let previous = slot.replace(value);
        previous.drop_with_heap(heap);
    }

    /// Releases a name's binding, leaving the declaration in place.
    pub(crate) fn unbind(&mut self, name: &str, heap: &mut Heap) {
        if let Some(level) = self.find_level(name)
            && let Some(slot) = self.levels[level].get_mut(name)
        {
            slot.take().drop_with_heap(heap);
        }
    }

    /// Releases every binding on every level, leaving one empty top level.
    pub(crate) fn clear(&mut self, heap: &mut Heap) {
        while self.levels.len() > 1 {
            self.remove_level(heap);
        }
        let top = std::mem::take(&mut self.levels[0]);
        for (_, slot) in top {
            slot.drop_with_heap(heap);
        }
    }
}
