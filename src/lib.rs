//! # hopgraph - traversal planning and execution core
//!
//! `hopgraph` is the query-planning and execution core of a property-graph
//! database: a traversal-order optimizer that reorders a set of algebraic
//! expressions into an efficient evaluation sequence, a conditional
//! variable-length traversal operator that pulls bounded-hop paths from a
//! graph, and an execution-thread pool manager that admits and schedules
//! query work.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::HashSet;
//! use hopgraph::algebraic_expression::AlgebraicExpression;
//! use hopgraph::config::Config;
//! use hopgraph::optimizer::order_expressions;
//! use hopgraph::query_graph::{QgNode, QueryGraph};
//!
//! let mut qg = QueryGraph::new();
//! qg.add_node(QgNode::labeled("a", "Person"));
//!
//! let mut exps = vec![AlgebraicExpression::edge("a", "b", "KNOWS")];
//! order_expressions(&qg, &mut exps, &Config::default(), None, &HashSet::new());
//! assert_eq!(exps[0].src(), "a");
//! ```
//!
//! ## Architecture
//!
//! - **Query Graph** ([`query_graph`]): alias-keyed node/edge metadata the
//!   optimizer and operator read.
//! - **Algebraic Expression** ([`algebraic_expression`]): one traversal
//!   step, reorderable and transposable.
//! - **Optimizer** ([`optimizer`]): scores every valid arrangement of a
//!   set of expressions and selects an entry point.
//! - **Operators** ([`operators`]): the pull-based execution-plan stages,
//!   including the all-paths enumerator and the conditional
//!   variable-length traverse operator.
//! - **Thread Pool** ([`threadpool`]): fixed-width reader/writer/bulk
//!   pools with admission control and pause/resume.

pub mod algebraic_expression;
pub mod config;
pub mod error;
pub mod filter_tree;
pub mod logging;
pub mod model;
pub mod operators;
pub mod optimizer;
pub mod path;
pub mod query_graph;
pub mod record;
pub mod threadpool;

pub use crate::config::Config;
pub use crate::error::{GraphError, Result};
pub use crate::model::{Edge, EdgeId, Node, NodeId, PropertyValue};
