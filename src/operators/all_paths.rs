//! All-paths enumerator: the external contract the traversal operator
//! assumes, plus a reference implementation backed by a minimal in-memory
//! adjacency graph.

use std::collections::HashMap;

use crate::filter_tree::FilterTree;
use crate::model::{EdgeId, NodeId};
use crate::path::Path;
use crate::query_graph::{TraversalDirection, NO_RELATION};
use crate::record::Record;

/// The graph adjacency collaborator the enumerator reads from.
///
/// The production adjacency engine (mmap'd pages, degree caches, etc.) is
/// out of scope; this crate only needs the iteration shape below.
pub trait GraphAdjacency {
    /// Returns `(edge_id, neighbor_node, relation_type_id)` triples
    /// reachable from `node` in `direction`, restricted to
    /// `relation_types` unless it contains `NO_RELATION`.
    fn neighbors(
        &self,
        node: NodeId,
        direction: TraversalDirection,
        relation_types: &[i64],
    ) -> Vec<(EdgeId, NodeId, i64)>;
}

/// A plain adjacency-list graph used by tests and as a reference
/// implementation of [`GraphAdjacency`].
#[derive(Debug, Clone, Default)]
pub struct SimpleGraph {
    // (edge_id, source, target, relation_type_id)
    edges: Vec<(EdgeId, NodeId, NodeId, i64)>,
}

impl SimpleGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directed edge `src -> dst` of the given relation type.
    pub fn add_edge(&mut self, edge_id: EdgeId, src: NodeId, dst: NodeId, relation_type: i64) -> &mut Self {
        self.edges.push((edge_id, src, dst, relation_type));
        self
    }
}

impl GraphAdjacency for SimpleGraph {
    fn neighbors(
        &self,
        node: NodeId,
        direction: TraversalDirection,
        relation_types: &[i64],
    ) -> Vec<(EdgeId, NodeId, i64)> {
        let any_relation = relation_types.contains(&NO_RELATION);
        let matches_relation = |rel: i64| any_relation || relation_types.contains(&rel);

        let mut out = Vec::new();
        for &(edge_id, src, dst, rel) in &self.edges {
            if !matches_relation(rel) {
                continue;
            }
            let outgoing_hit = matches!(direction, TraversalDirection::Outgoing | TraversalDirection::Both) && src == node;
            let incoming_hit = matches!(direction, TraversalDirection::Incoming | TraversalDirection::Both) && dst == node;
            if outgoing_hit {
                out.push((edge_id, dst, rel));
            }
            if incoming_hit {
                out.push((edge_id, src, rel));
            }
        }
        out
    }
}

struct Frame {
    neighbors: Vec<(EdgeId, NodeId, i64)>,
    idx: usize,
}

/// Enumerates simple paths between a resolved source and an optional fixed
/// destination, within `[min_hops, max_hops]` edges, applying an optional
/// per-edge filter.
///
/// `next()` yields one path per call; re-entering after it returns `None`
/// continues to return `None` until the context is rebuilt, matching the
/// contract §4.2 places on this collaborator.
pub struct AllPathsCtx<'a> {
    graph: &'a dyn GraphAdjacency,
    dst: Option<NodeId>,
    relation_types: Vec<i64>,
    direction: TraversalDirection,
    min_hops: u32,
    max_hops: u32,
    row: Record,
    filter: Option<&'a FilterTree>,
    edges_slot: Option<usize>,

    path_nodes: Vec<NodeId>,
    path_edges: Vec<EdgeId>,
    // Reference-counted rather than a plain set: closing a cycle back onto
    // the root (dst == src) revisits a node that is also still on the
    // stack, so a straight remove-on-backtrack would unmark it too early.
    visited: HashMap<NodeId, u32>,
    stack: Vec<Frame>,
    emitted_root: bool,
    exhausted: bool,
}

impl<'a> AllPathsCtx<'a> {
    /// Constructs a new enumerator rooted at `src`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        src: NodeId,
        dst: Option<NodeId>,
        graph: &'a dyn GraphAdjacency,
        relation_types: Vec<i64>,
        direction: TraversalDirection,
        min_hops: u32,
        max_hops: u32,
        row: Record,
        filter: Option<&'a FilterTree>,
        edges_slot: Option<usize>,
    ) -> Self {
        let neighbors = graph.neighbors(src, direction, &relation_types);
        let mut visited = HashMap::new();
        visited.insert(src, 1);
        Self {
            graph,
            dst,
            relation_types,
            direction,
            min_hops,
            max_hops,
            row,
            filter,
            edges_slot,
            path_nodes: vec![src],
            path_edges: Vec::new(),
            visited,
            stack: vec![Frame { neighbors, idx: 0 }],
            emitted_root: false,
            exhausted: false,
        }
    }

    fn current_head(&self) -> NodeId {
        *self.path_nodes.last().expect("path always has a root node")
    }

    fn build_path(&self) -> Path {
        let mut path = Path::single(self.path_nodes[0]);
        for (edge, node) in self.path_edges.iter().zip(self.path_nodes[1..].iter()) {
            path.push_hop(*edge, *node);
        }
        path
    }

    fn passes_filter(&self, edge: EdgeId, next_node: NodeId) -> bool {
        let Some(filter) = self.filter else {
            return true;
        };
        let Some(slot) = self.edges_slot else {
            return filter.evaluate(&self.row);
        };
        let mut scratch = self.row.clone();
        let mut hop = Path::single(self.current_head());
        hop.push_hop(edge, next_node);
        scratch.set_path(slot, hop);
        filter.evaluate(&scratch)
    }

    fn is_visited(&self, node: NodeId) -> bool {
        self.visited.contains_key(&node)
    }

    fn mark_visited(&mut self, node: NodeId) {
        *self.visited.entry(node).or_insert(0) += 1;
    }

    fn unmark_visited(&mut self, node: NodeId) {
        if let Some(count) = self.visited.get_mut(&node) {
            *count -= 1;
            if *count == 0 {
                self.visited.remove(&node);
            }
        }
    }

    fn backtrack(&mut self) {
        self.stack.pop();
        if let Some(node) = self.path_nodes.pop() {
            self.unmark_visited(node);
        }
        self.path_edges.pop();
    }

    /// Returns the next distinct simple path, or `None` once the
    /// enumeration space is exhausted.
    pub fn next_path(&mut self) -> Option<Path> {
        if self.exhausted {
            return None;
        }

        if !self.emitted_root {
            self.emitted_root = true;
            let root = self.path_nodes[0];
            if self.min_hops == 0 && self.dst.map_or(true, |d| d == root) {
                return Some(self.build_path());
            }
        }

        loop {
            let Some(frame) = self.stack.last_mut() else {
                self.exhausted = true;
                return None;
            };

            if frame.idx >= frame.neighbors.len() {
                self.backtrack();
                continue;
            }

            let (edge_id, next_node, _rel) = frame.neighbors[frame.idx];
            frame.idx += 1;

            // A node may be revisited exactly when it is the fixed
            // destination, which closes the path into a cycle back to it
            // (e.g. a self-loop query's `(a)-[*1..2]->(a)`). Any other
            // revisit would break simple-path node-uniqueness.
            let already_visited = self.is_visited(next_node);
            let closes_cycle_to_dst = already_visited && self.dst == Some(next_node);
            if already_visited && !closes_cycle_to_dst {
                continue;
            }
            if !self.passes_filter(edge_id, next_node) {
                continue;
            }

            self.mark_visited(next_node);
            self.path_nodes.push(next_node);
            self.path_edges.push(edge_id);
            let depth = self.path_edges.len() as u32;

            // A node that closes a cycle back to dst is not expanded
            // further; only genuinely fresh nodes continue the search.
            if !closes_cycle_to_dst && depth < self.max_hops {
                let neighbors = self.graph.neighbors(next_node, self.direction, &self.relation_types);
                self.stack.push(Frame { neighbors, idx: 0 });
            } else {
                self.stack.push(Frame { neighbors: Vec::new(), idx: 0 });
            }

            let hops_ok = depth >= self.min_hops;
            let dst_ok = self.dst.map_or(true, |d| d == next_node);
            if hops_ok && dst_ok {
                return Some(self.build_path());
            }
            // Not yet a valid emission point; keep descending via the loop.
        }
    }
}
