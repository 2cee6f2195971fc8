//! End-to-end scenarios composing the optimizer, the all-paths enumerator,
//! and the conditional variable-length traverse operator against a
//! concrete in-memory graph.

use std::collections::HashSet;

use hopgraph::algebraic_expression::AlgebraicExpression;
use hopgraph::config::Config;
use hopgraph::error::Result;
use hopgraph::operators::all_paths::SimpleGraph;
use hopgraph::operators::cond_var_len_traverse::CondVarLenTraverse;
use hopgraph::operators::Operator;
use hopgraph::optimizer::order_expressions;
use hopgraph::query_graph::{QgEdge, QgNode, QueryGraph};
use hopgraph::record::Record;

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

fn no_resolve(_name: &str) -> Option<i64> {
    None
}

/// Scenario 1: `MATCH (a:L0)-[:R*1..2]->(b:L1)` with relations
/// `R = {(a→x), (x→b)}`. The optimizer places a label scan at the head,
/// and the operator emits exactly one row with path `a,R,x,R,b`.
#[test]
fn scenario_1_label_scan_leads_and_single_hop_emits_one_row() {
    let mut qg = QueryGraph::new();
    qg.add_node(QgNode::labeled("a", "L0"));
    qg.add_node(QgNode::labeled("b", "L1"));
    qg.add_edge(QgEdge::new("r").with_hops(1, 1).with_relation_id("R", 1));

    let mut exps = vec![
        AlgebraicExpression::edge("a", "b", "r"),
        AlgebraicExpression::label_scan("a"),
        AlgebraicExpression::label_scan("b"),
    ];
    order_expressions(&qg, &mut exps, &Config::default(), None, &HashSet::new());
    assert!(exps[0].is_label_scan(), "head must be a label scan");

    let mut g = SimpleGraph::new();
    g.add_edge(1, 10, 20, 1);

    let mut row = Record::new(3);
    row.set_node(0, 10);
    let mut child = OneShot(Some(row));

    let mut op = CondVarLenTraverse::new(&qg, AlgebraicExpression::edge("a", "b", "r"), 0, 1, Some(2));
    let out = op
        .consume_with(&mut child, &g, &qg, &no_resolve)
        .unwrap()
        .expect("exactly one row expected");
    assert_eq!(out.get_node(1), Some(20));
    assert_eq!(out.get_path(2).unwrap().len_edges(), 1);
    assert!(op.consume_with(&mut OneShot(None), &g, &qg, &no_resolve).unwrap().is_none());
}

/// Scenario 2: `MATCH (a)-[:R*0..0]->(b)` where `R` is undeclared. The
/// relation list resolves to empty, `minHops=0`, so the zero-length path
/// is emitted for every row where `src == dst`.
#[test]
fn scenario_2_undeclared_relation_with_zero_hops_emits_self_path() {
    let mut qg = QueryGraph::new();
    qg.add_node(QgNode::new("a"));
    qg.add_node(QgNode::new("b"));
    qg.add_edge(QgEdge::new("r").with_hops(0, 0).with_relation_name("Undeclared"));

    let g = SimpleGraph::new();
    let mut row = Record::new(2);
    row.set_node(0, 7);
    let mut child = OneShot(Some(row));

    let mut op = CondVarLenTraverse::new(&qg, AlgebraicExpression::edge("a", "b", "r"), 0, 1, None);
    let out = op
        .consume_with(&mut child, &g, &qg, &no_resolve)
        .unwrap()
        .expect("zero-hop self path expected");
    assert_eq!(out.get_node(1), Some(7));
}

/// Scenario 3: only `a` is labeled, nothing is bound. Entry point resolves
/// to `a`.
#[test]
fn scenario_3_unbound_pattern_prefers_labeled_endpoint() {
    let mut qg = QueryGraph::new();
    qg.add_node(QgNode::labeled("a", "L"));
    qg.add_edge(QgEdge::new("r").with_hops(1, 3));

    let mut exps = vec![AlgebraicExpression::edge("a", "b", "r")];
    order_expressions(&qg, &mut exps, &Config::default(), None, &HashSet::new());
    assert_eq!(exps[0].src(), "a");
}

/// Scenario 4: same pattern, `b` bound. Entry point flips to `b`, the AE
/// transposes, and the derived traversal direction flips from outgoing to
/// incoming.
#[test]
fn scenario_4_bound_variable_flips_entry_point_and_direction() {
    let mut qg = QueryGraph::new();
    qg.add_node(QgNode::labeled("a", "L"));
    qg.add_edge(QgEdge::new("r").with_hops(1, 3).with_relation_id("R", 1));

    let mut exps = vec![AlgebraicExpression::edge("a", "b", "r")];
    let mut bound = HashSet::new();
    bound.insert("b".to_string());
    order_expressions(&qg, &mut exps, &Config::default(), None, &bound);
    assert_eq!(exps[0].src(), "b");
    assert!(exps[0].is_transposed());

    // b -> a edge in the graph; reading from the "b" entry point against a
    // transposed AE must walk it as an incoming edge at b.
    let mut g = SimpleGraph::new();
    g.add_edge(1, 99, 5, 1);

    let mut row = Record::new(2);
    row.set_node(0, 5);
    let mut child = OneShot(Some(row));

    let mut op = CondVarLenTraverse::new(&qg, exps.remove(0), 0, 1, None);
    let out = op
        .consume_with(&mut child, &g, &qg, &no_resolve)
        .unwrap()
        .expect("incoming edge reachable from the flipped entry point");
    assert_eq!(out.get_node(1), Some(99));
}

/// Scenario 5: `MATCH (a)-[*1..2]->(a)` (self-loop). Optimizer returns the
/// AE unchanged; the operator emits every cycle of length 1 or 2 through
/// `a`.
#[test]
fn scenario_5_self_loop_unchanged_and_emits_both_cycle_lengths() {
    let qg = QueryGraph::new();
    let original = AlgebraicExpression::edge("a", "a", "r");
    let mut exps = vec![original.clone()];
    order_expressions(&qg, &mut exps, &Config::default(), None, &HashSet::new());
    assert_eq!(exps[0], original);

    let mut qg = QueryGraph::new();
    qg.add_node(QgNode::new("a"));
    qg.add_edge(QgEdge::new("r").with_hops(1, 2).with_relation_id("R", 1));

    let mut g = SimpleGraph::new();
    g.add_edge(1, 1, 1, 1).add_edge(2, 1, 2, 1).add_edge(3, 2, 1, 1);

    // ExpandInto: both endpoints (src and dst) are the same pre-bound
    // node, and the edge alias is referenced so its path lands in slot 2.
    let mut row = Record::new(3);
    row.set_node(0, 1);
    row.set_node(1, 1);
    let mut child = OneShot(Some(row));

    let mut op = CondVarLenTraverse::new(&qg, AlgebraicExpression::edge("a", "a", "r"), 0, 1, Some(2));
    op.expand_into();

    let mut lengths = Vec::new();
    while let Some(r) = op.consume_with(&mut child, &g, &qg, &no_resolve).unwrap() {
        assert_eq!(r.get_node(1), Some(1), "expand-into must not rewrite the pre-bound destination");
        lengths.push(r.get_path(2).expect("edge alias is referenced").len_edges());
    }
    lengths.sort_unstable();
    assert_eq!(lengths, vec![1, 2]);
}

/// Scenario 6: `MAX_QUEUED_QUERIES=2`, three reader submissions while the
/// sole worker is blocked: the first two succeed, the third is rejected;
/// bulk submissions are never rejected.
#[test]
fn scenario_6_admission_control_rejects_the_third_submission() {
    use hopgraph::error::GraphError;
    use hopgraph::threadpool::ThreadPoolManager;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    let mgr = ThreadPoolManager::new();
    let config = Config {
        reader_threads: 1,
        writer_threads: 1,
        bulk_loader_threads: 1,
        max_queued_queries: Some(2),
        maintain_transpose: false,
    };
    mgr.create_pools(&config).unwrap();

    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Arc::new(Mutex::new(release_rx));
    let blocker = {
        let release_rx = Arc::clone(&release_rx);
        Box::new(move || {
            let _ = release_rx.lock().unwrap().recv();
        })
    };
    mgr.submit_reader(blocker).unwrap();
    thread::sleep(Duration::from_millis(50));

    assert!(mgr.submit_reader(Box::new(|| {})).is_ok());
    assert!(mgr.submit_reader(Box::new(|| {})).is_ok());
    let third = mgr.submit_reader(Box::new(|| {}));
    assert!(matches!(third, Err(GraphError::QueueFull("readers"))));

    for _ in 0..3 {
        assert!(mgr.submit_bulk(Box::new(|| {})).is_ok());
    }

    release_tx.send(()).unwrap();
}
