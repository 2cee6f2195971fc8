//! Record: the minimal row type operators read and write slots on.
//!
//! The production record carries arbitrary scalar/property values per
//! slot; this crate only needs node and path slots, so `Slot` is kept to
//! those two variants.

use crate::model::NodeId;
use crate::path::Path;

/// A single bound value in a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// A bound node.
    Node(NodeId),
    /// A bound path (the edge-alias slot of a variable-length traversal).
    Path(Path),
}

/// A row of positionally-indexed slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    slots: Vec<Option<Slot>>,
}

impl Record {
    /// Creates a record with `width` empty slots.
    pub fn new(width: usize) -> Self {
        Self {
            slots: vec![None; width],
        }
    }

    /// Grows the record if needed so that `index` is addressable.
    fn ensure_width(&mut self, index: usize) {
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
    }

    /// Reads the node bound at `index`, or `None` if the slot is empty or
    /// holds a different variant.
    pub fn get_node(&self, index: usize) -> Option<NodeId> {
        match self.slots.get(index)?.as_ref()? {
            Slot::Node(id) => Some(*id),
            Slot::Path(_) => None,
        }
    }

    /// Binds `node` at `index`.
    pub fn set_node(&mut self, index: usize, node: NodeId) {
        self.ensure_width(index);
        self.slots[index] = Some(Slot::Node(node));
    }

    /// Binds `path` at `index`.
    pub fn set_path(&mut self, index: usize, path: Path) {
        self.ensure_width(index);
        self.slots[index] = Some(Slot::Path(path));
    }

    /// Reads the path bound at `index`, if any.
    pub fn get_path(&self, index: usize) -> Option<&Path> {
        match self.slots.get(index)?.as_ref()? {
            Slot::Path(p) => Some(p),
            Slot::Node(_) => None,
        }
    }
}
