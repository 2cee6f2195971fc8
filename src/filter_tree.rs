//! A minimal per-edge predicate tree.
//!
//! The production filter tree evaluates a full boolean-predicate language
//! against arbitrary row properties; that evaluator is out of scope here.
//! This module keeps the two things the optimizer and the traversal
//! operator actually need: the set of aliases a filter mentions (so the
//! optimizer can reward AEs whose endpoints are filtered) and a narrow
//! evaluation hook the operator calls once per candidate edge.

use std::collections::HashSet;

use crate::record::Record;

/// A boolean predicate evaluated against a row during path enumeration.
///
/// Leaves reference an alias by name; the concrete comparison performed
/// is supplied as a closure so this crate doesn't need to model the full
/// expression language of the production filter tree.
pub enum FilterTree {
    /// A leaf predicate bound to one alias, evaluated by `test`.
    Leaf {
        /// Alias this predicate reads.
        alias: String,
        /// The comparison itself.
        test: Box<dyn Fn(&Record) -> bool + Send + Sync>,
    },
    /// Conjunction of child predicates.
    And(Vec<FilterTree>),
    /// Disjunction of child predicates.
    Or(Vec<FilterTree>),
    /// Negation of a child predicate.
    Not(Box<FilterTree>),
}

impl FilterTree {
    /// Builds a leaf predicate over `alias`.
    pub fn leaf(alias: impl Into<String>, test: impl Fn(&Record) -> bool + Send + Sync + 'static) -> Self {
        FilterTree::Leaf {
            alias: alias.into(),
            test: Box::new(test),
        }
    }

    /// Evaluates the predicate against `row`.
    pub fn evaluate(&self, row: &Record) -> bool {
        match self {
            FilterTree::Leaf { test, .. } => test(row),
            FilterTree::And(children) => children.iter().all(|c| c.evaluate(row)),
            FilterTree::Or(children) => children.iter().any(|c| c.evaluate(row)),
            FilterTree::Not(child) => !child.evaluate(row),
        }
    }

    /// Collects the set of aliases referenced anywhere in this tree,
    /// mirroring `FilterTree_CollectModified` in the production planner:
    /// the optimizer rewards an AE endpoint present in this set.
    pub fn collect_modified(&self) -> HashSet<String> {
        let mut out = HashSet::new();
        self.collect_modified_into(&mut out);
        out
    }

    fn collect_modified_into(&self, out: &mut HashSet<String>) {
        match self {
            FilterTree::Leaf { alias, .. } => {
                out.insert(alias.clone());
            }
            FilterTree::And(children) | FilterTree::Or(children) => {
                for child in children {
                    child.collect_modified_into(out);
                }
            }
            FilterTree::Not(child) => child.collect_modified_into(out),
        }
    }
}

impl std::fmt::Debug for FilterTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterTree::Leaf { alias, .. } => write!(f, "Leaf({alias})"),
            FilterTree::And(c) => f.debug_tuple("And").field(c).finish(),
            FilterTree::Or(c) => f.debug_tuple("Or").field(c).finish(),
            FilterTree::Not(c) => f.debug_tuple("Not").field(c).finish(),
        }
    }
}
