use std::{collections::BTreeMap, fmt::Write as _};

use crate::{
    error::{ErrorKind, RunResult},
    reader::Position,
    types::{List, ListNode, Str},
    value::Value,
};

/// Index of a value on the heap.
///
/// Slots are reused after the value they hold is freed, so a `HeapId` is only
/// meaningful while the holder owns a reference to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct HeapId(usize);

impl HeapId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// Payload of a heap-allocated value.
///
/// The immediate kinds (`char`, `int`, `float`, `none`) are stored inline in
/// [`Value`] and never reach the heap; everything that owns memory or is
/// shared by reference lives here.
#[derive(Debug)]
pub(crate) enum HeapData {
    Str(Str),
    List(List),
    Node(ListNode),
    Position(Position),
}

impl HeapData {
    /// The kind name used in heap statistics and the object dump.
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Node(_) => "listnode",
            Self::Position(_) => "position",
        }
    }

    /// Collects the heap ids this value owns a reference to.
    fn push_child_ids(&self, out: &mut Vec<HeapId>) {
        match self {
            Self::Str(_) | Self::Position(_) => {}
            Self::List(list) => out.extend(list.node_ids()),
            Self::Node(node) => {
                if let Value::Ref(id) = node.inner() {
                    out.push(*id);
                }
            }
        }
    }
}

/// One heap slot: the reference count plus the stored data.
#[derive(Debug)]
struct HeapValue {
    refcount: usize,
    data: HeapData,
}

/// Snapshot of heap state at a point in time.
///
/// The `objects_by_kind` map uses `BTreeMap` for deterministic iteration
/// order, making snapshots suitable for display and comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    /// Total number of live objects on the heap.
    pub live_objects: usize,
    /// Number of free (recycled) slots available for reuse.
    pub free_slots: usize,
    /// Total heap capacity (live + free).
    pub total_slots: usize,
    /// Breakdown of live objects by kind name (e.g. "str", "list").
    pub objects_by_kind: BTreeMap<&'static str, usize>,
}

impl std::fmt::Display for HeapStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} live objects, {} free slots, {} total",
            self.live_objects, self.free_slots, self.total_slots
        )?;
        for (kind, count) in &self.objects_by_kind {
            write!(f, "\n  {kind}: {count}")?;
        }
        Ok(())
    }
}

/// Arena of reference-counted interpreter values.
///
/// Every allocation starts with a refcount of 1 owned by the caller. Binding
/// a value to an identifier, storing it in a list node, or sharing it as an
/// operation result adds a reference; releasing goes through [`Heap::dec_ref`],
/// which frees the slot (and the children it owns) when the count hits zero.
/// Freed slots are recycled through a free list.
#[derive(Debug, Default)]
pub(crate) struct Heap {
    entries: Vec<Option<HeapValue>>,
    free_list: Vec<HeapId>,
    /// Optional ceiling on live objects; exceeding it raises `OutOfMemoryError`.
    max_live: Option<usize>,
    live: usize,
}

impl Heap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Creates a heap that refuses allocations past `max_live` live objects.
    pub(crate) fn with_limit(max_live: usize) -> Self {
        Self {
            max_live: Some(max_live),
            ..Self::default()
        }
    }

    /// Allocates a new heap entry with an initial refcount of 1.
    pub(crate) fn allocate(&mut self, data: HeapData) -> RunResult<Value> {
        if let Some(max) = self.max_live
            && self.live >= max
        {
            return Err(ErrorKind::out_of_memory(max));
        }
        let new_entry = HeapValue { refcount: 1, data };
        let id = if let Some(id) = self.free_list.pop() {
            self.entries[id.index()] = Some(new_entry);
            id
        } else {
            let id = HeapId(self.entries.len());
            self.entries.push(Some(new_entry));
            id
        };
        self.live += 1;
        Ok(Value::Ref(id))
    }

    /// Increments the reference count for an existing heap entry.
    ///
    /// # Panics
    /// Panics if the id is invalid or the value has already been freed.
    pub(crate) fn inc_ref(&mut self, id: HeapId) {
        let entry = self
            .entries
            .get_mut(id.index())
            .expect("Heap::inc_ref: slot missing")
            .as_mut()
            .expect("Heap::inc_ref: object already freed");
        entry.refcount += 1;
    }

    /// Decrements the reference count and frees the value (plus the children
    /// it owns) once the count hits zero.
    ///
    /// Freed slot ids are pushed on the free list for reuse. Child cleanup
    /// recurses, matching the ownership chain list -> node -> inner value.
    ///
    /// # Panics
    /// Panics if the id is invalid or the value has already been freed.
    pub(crate) fn dec_ref(&mut self, id: HeapId) {
        let value = {
            let slot = self.entries.get_mut(id.index()).expect("Heap::dec_ref: slot missing");
            let entry = slot.as_mut().expect("Heap::dec_ref: object already freed");
            if entry.refcount > 1 {
                entry.refcount -= 1;
                return;
            }
            slot.take().expect("Heap::dec_ref: object already freed")
        };

        self.free_list.push(id);
        self.live -= 1;

        let mut child_ids = Vec::new();
        value.data.push_child_ids(&mut child_ids);
        drop(value);
        for child_id in child_ids {
            self.dec_ref(child_id);
        }
    }

    /// Returns an immutable reference to the data stored at the given id.
    ///
    /// # Panics
    /// Panics if the id is invalid or the value has already been freed.
    #[must_use]
    pub(crate) fn get(&self, id: HeapId) -> &HeapData {
        &self
            .entries
            .get(id.index())
            .expect("Heap::get: slot missing")
            .as_ref()
            .expect("Heap::get: object already freed")
            .data
    }

    /// Returns a mutable reference to the data stored at the given id.
    ///
    /// # Panics
    /// Panics if the id is invalid or the value has already been freed.
    pub(crate) fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        &mut self
            .entries
            .get_mut(id.index())
            .expect("Heap::get_mut: slot missing")
            .as_mut()
            .expect("Heap::get_mut: object already freed")
            .data
    }

    /// The current refcount of a live heap value.
    ///
    /// # Panics
    /// Panics if the id is invalid or the value has already been freed.
    #[must_use]
    pub(crate) fn refcount(&self, id: HeapId) -> usize {
        self.entries
            .get(id.index())
            .expect("Heap::refcount: slot missing")
            .as_ref()
            .expect("Heap::refcount: object already freed")
            .refcount
    }

    /// Number of currently live objects.
    #[must_use]
    pub(crate) fn live_objects(&self) -> usize {
        self.live
    }

    /// Captures a snapshot of the heap state.
    #[must_use]
    pub(crate) fn stats(&self) -> HeapStats {
        let mut objects_by_kind = BTreeMap::new();
        for entry in self.entries.iter().flatten() {
            *objects_by_kind.entry(entry.data.kind_name()).or_insert(0) += 1;
        }
        HeapStats {
            live_objects: self.live,
            free_slots: self.free_list.len(),
            total_slots: self.entries.len(),
            objects_by_kind,
        }
    }

    /// Renders all live objects as a semicolon-separated listing, one object
    /// per line: `object;refcount;kind;value`.
    ///
    /// Run after execution this is a leak detector: a cleanly finished program
    /// leaves nothing behind.
    #[must_use]
    pub(crate) fn dump_dsv(&self) -> String {
        let mut out = String::from("object;refcount;kind;value\n");
        for (index, entry) in self.entries.iter().enumerate() {
            let Some(entry) = entry else { continue };
            let _ = write!(out, "{index};{};{};", entry.refcount, entry.data.kind_name());
            Value::Ref(HeapId(index)).write_display(self, &mut out);
            out.push('\n');
        }
        out
    }
}

/// Releases a value's heap reference when the holder is done with it.
///
/// Implemented for the containers the interpreter passes around so cleanup
/// stays a one-liner at every call site.
pub(crate) trait DropWithHeap {
    fn drop_with_heap(self, heap: &mut Heap);
}

impl DropWithHeap for Value {
    #[inline]
    fn drop_with_heap(self, heap: &mut Heap) {
        if let Self::Ref(id) = self {
            heap.dec_ref(id);
        }
    }
}

impl<T: DropWithHeap> DropWithHeap for Option<T> {
    #[inline]
    fn drop_with_heap(self, heap: &mut Heap) {
        if let Some(value) = self {
            value.drop_with_heap(heap);
        }
    }
}

impl<T: DropWithHeap> DropWithHeap for Vec<T> {
    fn drop_with_heap(self, heap: &mut Heap) {
        for value in self {
            value.drop_with_heap(heap);
        }
    }
}
