//! Query-graph metadata lookup: node/edge attributes keyed by alias.
//!
//! The production query graph additionally resolves label and property
//! indexes against the storage catalog; that resolution is out of scope
//! here. This module only carries the attributes the optimizer and the
//! traversal operator read.

use std::collections::HashMap;

/// Direction a traversal edge is evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalDirection {
    /// Outgoing edges from the source node.
    Outgoing,
    /// Incoming edges to the source node.
    Incoming,
    /// Edges in either direction.
    Both,
}

/// Sentinel relation-type id meaning "match any relation".
pub const NO_RELATION: i64 = -1;

/// A node in the query graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QgNode {
    /// Alias this node is bound to within the pattern.
    pub alias: String,
    /// Optional label constraint.
    pub label: Option<String>,
}

impl QgNode {
    /// Creates an unlabeled node bound to `alias`.
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            label: None,
        }
    }

    /// Creates a node bound to `alias` constrained to `label`.
    pub fn labeled(alias: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            label: Some(label.into()),
        }
    }

    /// Whether this node carries a label constraint.
    pub fn is_labeled(&self) -> bool {
        self.label.is_some()
    }
}

/// An edge in the query graph, including the variable-length hop bounds
/// consumed by the traversal operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QgEdge {
    /// Alias this edge is bound to within the pattern.
    pub alias: String,
    /// Minimum number of hops (inclusive).
    pub min_hops: u32,
    /// Maximum number of hops (inclusive).
    pub max_hops: u32,
    /// Whether the edge may be traversed in either direction.
    pub bidirectional: bool,
    /// Relation-type ids already resolved against the schema. Parallel to
    /// `reltypes`; an entry here is `None` when only the textual name is
    /// known so far.
    pub reltype_ids: Vec<Option<i64>>,
    /// Textual relation-type names, parallel to `reltype_ids`.
    pub reltypes: Vec<String>,
}

impl QgEdge {
    /// Creates an edge with fixed hop count 1 and no declared relation types.
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            min_hops: 1,
            max_hops: 1,
            bidirectional: false,
            reltype_ids: Vec::new(),
            reltypes: Vec::new(),
        }
    }

    /// Sets the inclusive hop bounds. Panics if `min > max`, mirroring the
    /// invariant the query graph is expected to uphold before handing the
    /// edge to an operator.
    pub fn with_hops(mut self, min_hops: u32, max_hops: u32) -> Self {
        assert!(min_hops <= max_hops, "minHops must be <= maxHops");
        self.min_hops = min_hops;
        self.max_hops = max_hops;
        self
    }

    /// Marks the edge as traversable in either direction.
    pub fn bidirectional(mut self) -> Self {
        self.bidirectional = true;
        self
    }

    /// Declares a relation type by name, leaving its id unresolved.
    pub fn with_relation_name(mut self, name: impl Into<String>) -> Self {
        self.reltype_ids.push(None);
        self.reltypes.push(name.into());
        self
    }

    /// Declares a relation type whose id is already known.
    pub fn with_relation_id(mut self, name: impl Into<String>, id: i64) -> Self {
        self.reltype_ids.push(Some(id));
        self.reltypes.push(name.into());
        self
    }
}

/// Lookup table from alias to node/edge metadata, backing the optimizer
/// and operator's view of the pattern being planned.
#[derive(Debug, Clone, Default)]
pub struct QueryGraph {
    nodes: HashMap<String, QgNode>,
    edges: HashMap<String, QgEdge>,
}

impl QueryGraph {
    /// Creates an empty query graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node, keyed by its alias.
    pub fn add_node(&mut self, node: QgNode) -> &mut Self {
        self.nodes.insert(node.alias.clone(), node);
        self
    }

    /// Registers an edge, keyed by its alias.
    pub fn add_edge(&mut self, edge: QgEdge) -> &mut Self {
        self.edges.insert(edge.alias.clone(), edge);
        self
    }

    /// Looks up a node by alias.
    pub fn node(&self, alias: &str) -> Option<&QgNode> {
        self.nodes.get(alias)
    }

    /// Looks up an edge by alias.
    pub fn edge(&self, alias: &str) -> Option<&QgEdge> {
        self.edges.get(alias)
    }

    /// Returns a node's alias labeled state, defaulting to `false` for
    /// aliases not present in the query graph (pure label scans over an
    /// unconstrained node carry no reward).
    pub fn is_labeled(&self, alias: &str) -> bool {
        self.nodes.get(alias).is_some_and(QgNode::is_labeled)
    }
}
