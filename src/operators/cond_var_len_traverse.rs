//! Conditional variable-length traverse: the pull operator that binds a
//! new destination alias (or, in ExpandInto mode, merely verifies a
//! pre-bound one) by walking an [`AllPathsCtx`] over the upstream's
//! current source node.

use tracing::{debug, trace};

use crate::algebraic_expression::AlgebraicExpression;
use crate::error::{GraphError, Result};
use crate::filter_tree::FilterTree;
use crate::model::NodeId;
use crate::query_graph::{QgEdge, QueryGraph, TraversalDirection, NO_RELATION};
use crate::record::Record;

use super::all_paths::{AllPathsCtx, GraphAdjacency};
use super::Operator;

/// Lazily-resolved state of the edge's relation-type list. Resolution only
/// happens once, against the first upstream row this operator latches
/// onto, since the query graph (and therefore the schema lookups backing
/// it) isn't guaranteed to be ready any earlier.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RelationState {
    Unresolved,
    Resolved(Vec<i64>),
    /// The edge declared relation types but none of them resolved, and
    /// `minHops > 0`: no edge can ever satisfy this traversal.
    Unsatisfiable,
}

/// Resolves a `QGEdge`'s declared relation types against a schema lookup.
///
/// `resolve_id` maps a textual relation-type name to its id, mirroring a
/// schema lookup; it returns `None` when the name has no matching schema
/// entry (e.g. `MATCH (a)-[:NoSuchRel*]->(b)`).
fn resolve_relation_types(edge: &QgEdge, resolve_id: &dyn Fn(&str) -> Option<i64>) -> RelationState {
    if edge.reltype_ids.is_empty() {
        return RelationState::Resolved(vec![NO_RELATION]);
    }

    let mut resolved = Vec::with_capacity(edge.reltype_ids.len());
    for (id, name) in edge.reltype_ids.iter().zip(edge.reltypes.iter()) {
        match id {
            Some(id) => resolved.push(*id),
            None => {
                if let Some(id) = resolve_id(name) {
                    resolved.push(id);
                }
            }
        }
    }

    if resolved.is_empty() && edge.min_hops > 0 {
        RelationState::Unsatisfiable
    } else {
        RelationState::Resolved(resolved)
    }
}

/// Derives the scan direction from the edge's bidirectionality and the
/// AE's current transpose state: a non-bidirectional, transposed AE
/// traverses against the edge's declared direction (dest -> src,
/// evaluated as incoming edges at the source).
fn traverse_direction(edge: &QgEdge, ae: &AlgebraicExpression) -> TraversalDirection {
    if edge.bidirectional {
        TraversalDirection::Both
    } else if ae.is_transposed() {
        TraversalDirection::Incoming
    } else {
        TraversalDirection::Outgoing
    }
}

/// Conditional variable-length traverse operator.
///
/// Two externally visible variants share this implementation:
/// `CondVarLenTraverse` (binds a new destination alias) and
/// `CondVarLenTraverse-ExpandInto` (both endpoints already bound; the
/// operator filters rather than materializes the destination slot). The
/// ExpandInto variant is selected with [`CondVarLenTraverse::expand_into`].
pub struct CondVarLenTraverse<'a> {
    ae: AlgebraicExpression,
    src_slot: usize,
    dst_slot: usize,
    edges_slot: Option<usize>,
    expand_into: bool,
    direction: TraversalDirection,
    min_hops: u32,
    max_hops: u32,
    filter: Option<&'a FilterTree>,
    relations: RelationState,

    row: Option<Record>,
    paths: Option<AllPathsCtx<'a>>,
}

impl<'a> CondVarLenTraverse<'a> {
    /// Builds the operator from the query graph's edge metadata and the
    /// AE it evaluates. `src_slot`/`dst_slot` are the record slots the
    /// operator reads/binds; `edges_slot` is `Some` only when the edge
    /// alias is referenced elsewhere in the plan.
    pub fn new(qg: &QueryGraph, ae: AlgebraicExpression, src_slot: usize, dst_slot: usize, edges_slot: Option<usize>) -> Self {
        let edge_alias = ae.edge_alias().expect("CondVarLenTraverse requires an AE with an edge alias");
        let edge = qg.edge(edge_alias).expect("edge alias not present in query graph");
        assert!(edge.min_hops <= edge.max_hops, "minHops must be <= maxHops");

        let direction = traverse_direction(edge, &ae);

        Self {
            min_hops: edge.min_hops,
            max_hops: edge.max_hops,
            ae,
            src_slot,
            dst_slot,
            edges_slot,
            expand_into: false,
            direction,
            filter: None,
            relations: RelationState::Unresolved,
            row: None,
            paths: None,
        }
    }

    /// Switches the operator into ExpandInto mode: both endpoints are
    /// already bound, so the destination slot is verified rather than
    /// populated.
    pub fn expand_into(&mut self) {
        self.expand_into = true;
    }

    /// Attaches a per-edge filter. Errors if one is already attached.
    pub fn set_filter(&mut self, filter: &'a FilterTree) -> Result<()> {
        if self.filter.is_some() {
            return Err(GraphError::FilterAlreadySet);
        }
        self.filter = Some(filter);
        Ok(())
    }

    /// Deep-clones this operator's static configuration for use in another
    /// plan. Runtime state (cached row, active enumerator) is not carried
    /// over, mirroring a freshly constructed operator.
    ///
    /// `target_type` is the operator-type tag the plan-cloning driver
    /// recorded for the node being replaced; it must match this operator's
    /// own [`Operator::op_type`] before the clone proceeds, mirroring the
    /// source's assertion that the generic clone dispatch landed on the
    /// right handler before downcasting. A mismatch returns
    /// [`GraphError::CloneTypeMismatch`] rather than cloning into the wrong
    /// slot.
    pub fn deep_clone(&self, target_type: &'static str) -> Result<Self> {
        if target_type != self.op_type() {
            return Err(GraphError::CloneTypeMismatch {
                expected: self.op_type(),
                found: target_type,
            });
        }
        Ok(Self {
            ae: self.ae.clone(),
            src_slot: self.src_slot,
            dst_slot: self.dst_slot,
            edges_slot: self.edges_slot,
            expand_into: self.expand_into,
            direction: self.direction,
            min_hops: self.min_hops,
            max_hops: self.max_hops,
            filter: self.filter,
            relations: RelationState::Unresolved,
            row: None,
            paths: None,
        })
    }

    fn fixed_destination(&self) -> Option<NodeId> {
        if self.expand_into {
            self.row.as_ref().and_then(|r| r.get_node(self.dst_slot))
        } else {
            None
        }
    }

    /// Pulls the next upstream row, latching it as the current row and
    /// rebuilding the enumerator over it. Returns `Ok(false)` once the
    /// child is exhausted.
    fn pull_next_row(
        &mut self,
        child: &mut dyn Operator,
        graph: &'a dyn GraphAdjacency,
        edge: &QgEdge,
        resolve_id: &dyn Fn(&str) -> Option<i64>,
    ) -> Result<bool> {
        loop {
            let Some(row) = child.consume()? else {
                return Ok(false);
            };

            let Some(src) = row.get_node(self.src_slot) else {
                // An OPTIONAL MATCH upstream may produce a row with no
                // source node bound; skip it and keep pulling.
                continue;
            };

            self.row = Some(row);

            if self.relations == RelationState::Unresolved {
                self.relations = resolve_relation_types(edge, resolve_id);
                debug!(edge = %edge.alias, relations = ?self.relations, "resolved traversal relation types");
                if self.relations == RelationState::Unsatisfiable {
                    trace!("relation resolution unsatisfiable, min_hops > 0; short-circuiting to EOF");
                    return Ok(false);
                }
            }

            let RelationState::Resolved(ref relation_types) = self.relations else {
                unreachable!("Unresolved handled above, Unsatisfiable returns early");
            };

            let dst = self.fixed_destination();
            self.paths = Some(AllPathsCtx::new(
                src,
                dst,
                graph,
                relation_types.clone(),
                self.direction,
                self.min_hops,
                self.max_hops,
                self.row.clone().expect("row just latched"),
                self.filter,
                self.edges_slot,
            ));
            return Ok(true);
        }
    }

    /// Pulls the next output row, given the graph adjacency the enumerator
    /// reads from, a child operator to pull upstream rows from, and a
    /// relation-name-to-id resolver mirroring a schema lookup.
    ///
    /// The `Operator` trait's `consume` can't take these per-call
    /// collaborators (the production plan threads them through shared
    /// query context instead, which this crate doesn't model), so this is
    /// the entry point callers drive directly.
    pub fn consume_with(
        &mut self,
        child: &mut dyn Operator,
        graph: &'a dyn GraphAdjacency,
        qg: &QueryGraph,
        resolve_id: &dyn Fn(&str) -> Option<i64>,
    ) -> Result<Option<Record>> {
        let edge_alias = self.ae.edge_alias().expect("CondVarLenTraverse requires an edge alias");
        let edge = qg.edge(edge_alias).expect("edge alias not present in query graph").clone();

        loop {
            if let Some(ctx) = self.paths.as_mut() {
                if let Some(path) = ctx.next_path() {
                    let mut out = self.row.clone().expect("active enumerator implies a latched row");
                    if !self.expand_into {
                        out.set_node(self.dst_slot, path.head());
                    }
                    if let Some(slot) = self.edges_slot {
                        out.set_path(slot, path);
                    }
                    return Ok(Some(out));
                }
            }

            if !self.pull_next_row(child, graph, &edge, resolve_id)? {
                return Ok(None);
            }
        }
    }
}

impl std::fmt::Display for CondVarLenTraverse<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} | {}..{} hops, {}->{}",
            self.op_type(),
            self.min_hops,
            self.max_hops,
            self.ae.src(),
            self.ae.dst()
        )
    }
}

impl Operator for CondVarLenTraverse<'_> {
    fn op_type(&self) -> &'static str {
        if self.expand_into {
            "CondVarLenTraverse-ExpandInto"
        } else {
            "CondVarLenTraverse"
        }
    }

    /// `consume_with` is this operator's real entry point: it needs a
    /// graph handle, query graph, and relation resolver this trait method
    /// has no room for. Calling `consume` directly is a programming error.
    fn consume(&mut self) -> Result<Option<Record>> {
        Err(GraphError::Other(
            "CondVarLenTraverse must be driven through consume_with".into(),
        ))
    }

    fn reset(&mut self) {
        self.row = None;
        self.paths = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::all_paths::SimpleGraph;
    use crate::query_graph::QgNode;

    struct OneShot(Option<Record>);

    impl Operator for OneShot {
        fn op_type(&self) -> &'static str {
            "OneShot"
        }
        fn consume(&mut self) -> Result<Option<Record>> {
            Ok(self.0.take())
        }
        fn reset(&mut self) {}
    }

    struct RowFeed(std::vec::IntoIter<Record>);

    impl Operator for RowFeed {
        fn op_type(&self) -> &'static str {
            "RowFeed"
        }
        fn consume(&mut self) -> Result<Option<Record>> {
            Ok(self.0.next())
        }
        fn reset(&mut self) {}
    }

    fn qg_with_edge(edge: QgEdge) -> QueryGraph {
        let mut qg = QueryGraph::new();
        qg.add_node(QgNode::labeled("a", "L0"));
        qg.add_node(QgNode::labeled("b", "L1"));
        qg.add_edge(edge);
        qg
    }

    fn no_resolve(_name: &str) -> Option<i64> {
        None
    }

    /// Scenario 1: `MATCH (a:L0)-[:R*1..2]->(x)-[:R]->(b:L1)`, a one-edge
    /// slice of it: operator emits exactly one row with path `a -R-> x`.
    #[test]
    fn emits_bound_destination_and_path() {
        let mut g = SimpleGraph::new();
        g.add_edge(1, 10, 20, 7);
        let edge = QgEdge::new("r").with_hops(1, 2).with_relation_id("R", 7);
        let qg = qg_with_edge(edge);

        let mut row = Record::new(3);
        row.set_node(0, 10);
        let mut child = OneShot(Some(row));

        let mut op = CondVarLenTraverse::new(&qg, AlgebraicExpression::edge("a", "x", "r"), 0, 1, Some(2));
        let out = op
            .consume_with(&mut child, &g, &qg, &no_resolve)
            .unwrap()
            .expect("one row expected");
        assert_eq!(out.get_node(1), Some(20));
        assert_eq!(out.get_path(2).unwrap().head(), 20);

        assert!(op.consume_with(&mut OneShot(None), &g, &qg, &no_resolve).unwrap().is_none());
    }

    /// Scenario 2: `MATCH (a)-[:R*0..0]->(b)` where `R` is undeclared.
    /// Relation list resolves to empty, `minHops=0`; the zero-length path
    /// is emitted for each upstream row where src == dst.
    #[test]
    fn zero_hop_with_undeclared_relation_emits_self_path() {
        let g = SimpleGraph::new();
        let edge = QgEdge::new("r").with_hops(0, 0).with_relation_name("Undeclared");
        let qg = qg_with_edge(edge);

        let mut row = Record::new(3);
        row.set_node(0, 5);
        let mut child = OneShot(Some(row));

        let mut op = CondVarLenTraverse::new(&qg, AlgebraicExpression::edge("a", "b", "r"), 0, 1, None);
        let out = op
            .consume_with(&mut child, &g, &qg, &no_resolve)
            .unwrap()
            .expect("zero-hop self path expected");
        assert_eq!(out.get_node(1), Some(5));
    }

    /// `MATCH (s)-[:L*1..]->(m)` where label `L` does not exist: relation
    /// resolution is unsatisfiable, and the operator short-circuits to EOF
    /// without ever building an enumerator.
    #[test]
    fn unresolvable_relation_with_min_hops_above_zero_short_circuits() {
        let g = SimpleGraph::new();
        let edge = QgEdge::new("r").with_hops(1, 3).with_relation_name("Missing");
        let qg = qg_with_edge(edge);

        let mut row = Record::new(2);
        row.set_node(0, 1);
        let mut child = OneShot(Some(row));

        let mut op = CondVarLenTraverse::new(&qg, AlgebraicExpression::edge("a", "b", "r"), 0, 1, None);
        assert!(op.consume_with(&mut child, &g, &qg, &no_resolve).unwrap().is_none());
    }

    #[test]
    fn expand_into_verifies_pre_bound_destination_without_rewriting_it() {
        let mut g = SimpleGraph::new();
        g.add_edge(1, 1, 2, 9).add_edge(2, 1, 3, 9);
        let edge = QgEdge::new("r").with_hops(1, 1).with_relation_id("R", 9);
        let qg = qg_with_edge(edge);

        let mut row = Record::new(2);
        row.set_node(0, 1);
        row.set_node(1, 2);
        let mut child = OneShot(Some(row));

        let mut op = CondVarLenTraverse::new(&qg, AlgebraicExpression::edge("a", "b", "r"), 0, 1, None);
        op.expand_into();
        let out = op
            .consume_with(&mut child, &g, &qg, &no_resolve)
            .unwrap()
            .expect("destination 2 is reachable in one hop");
        assert_eq!(out.get_node(1), Some(2), "expand-into must not overwrite the pre-bound destination slot");
    }

    #[test]
    fn second_filter_attachment_is_rejected() {
        let edge = QgEdge::new("r").with_hops(1, 1);
        let qg = qg_with_edge(edge);
        let mut op = CondVarLenTraverse::new(&qg, AlgebraicExpression::edge("a", "b", "r"), 0, 1, None);
        let f1 = FilterTree::leaf("a", |_| true);
        let f2 = FilterTree::leaf("a", |_| true);
        op.set_filter(&f1).unwrap();
        let err = op.set_filter(&f2).unwrap_err();
        assert!(matches!(err, GraphError::FilterAlreadySet));
    }

    #[test]
    fn reset_drops_cached_row_and_enumerator() {
        let mut g = SimpleGraph::new();
        g.add_edge(1, 10, 20, 7);
        let edge = QgEdge::new("r").with_hops(1, 1).with_relation_id("R", 7);
        let qg = qg_with_edge(edge);

        let mut row = Record::new(3);
        row.set_node(0, 10);
        let mut child = OneShot(Some(row));

        let mut op = CondVarLenTraverse::new(&qg, AlgebraicExpression::edge("a", "x", "r"), 0, 1, None);
        op.consume_with(&mut child, &g, &qg, &no_resolve).unwrap();
        assert!(op.row.is_some());
        op.reset();
        assert!(op.row.is_none());
        assert!(op.paths.is_none());
    }

    /// Direction inversion: a transposed AE over a non-bidirectional edge
    /// traverses incoming edges at the bound source, not outgoing ones.
    #[test]
    fn transposed_ae_traverses_incoming_edges() {
        let mut g = SimpleGraph::new();
        // single edge b -> a; with a transposed AE whose src is "a", a
        // traversal reading a -> b must walk this edge incoming-at-a.
        g.add_edge(1, 99, 42, 5);
        let edge = QgEdge::new("r").with_hops(1, 1).with_relation_id("R", 5);
        let qg = qg_with_edge(edge);

        let mut row = Record::new(2);
        row.set_node(0, 42);
        let rows = vec![row];
        let mut child = RowFeed(rows.into_iter());

        let ae = AlgebraicExpression::edge("b", "a", "r").transposed();
        let mut op = CondVarLenTraverse::new(&qg, ae, 0, 1, None);
        let out = op
            .consume_with(&mut child, &g, &qg, &no_resolve)
            .unwrap()
            .expect("incoming edge should be found");
        assert_eq!(out.get_node(1), Some(99));
    }

    #[test]
    fn deep_clone_with_matching_type_tag_succeeds() {
        let edge = QgEdge::new("r").with_hops(1, 1).with_relation_id("R", 7);
        let qg = qg_with_edge(edge);
        let op = CondVarLenTraverse::new(&qg, AlgebraicExpression::edge("a", "b", "r"), 0, 1, None);

        let clone = op.deep_clone(op.op_type()).expect("matching tag must clone");
        assert_eq!(clone.op_type(), op.op_type());
        assert_eq!(clone.ae, op.ae);
    }

    #[test]
    fn deep_clone_with_mismatched_type_tag_is_rejected() {
        let edge = QgEdge::new("r").with_hops(1, 1).with_relation_id("R", 7);
        let qg = qg_with_edge(edge);
        let op = CondVarLenTraverse::new(&qg, AlgebraicExpression::edge("a", "b", "r"), 0, 1, None);

        let err = op.deep_clone("CondVarLenTraverse-ExpandInto").unwrap_err();
        assert!(matches!(
            err,
            GraphError::CloneTypeMismatch {
                expected: "CondVarLenTraverse",
                found: "CondVarLenTraverse-ExpandInto"
            }
        ));
    }

    #[test]
    fn display_renders_op_type_and_hop_bounds() {
        let edge = QgEdge::new("r").with_hops(1, 3).with_relation_id("R", 7);
        let qg = qg_with_edge(edge);
        let op = CondVarLenTraverse::new(&qg, AlgebraicExpression::edge("a", "b", "r"), 0, 1, None);
        assert_eq!(op.to_string(), "CondVarLenTraverse | 1..3 hops, a->b");
    }
}
