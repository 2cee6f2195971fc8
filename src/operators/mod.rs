//! Operators: the pull-based execution-plan stages this crate implements.

pub mod all_paths;
pub mod cond_var_len_traverse;

pub use all_paths::{AllPathsCtx, GraphAdjacency};
pub use cond_var_len_traverse::CondVarLenTraverse;

use crate::error::Result;
use crate::record::Record;

/// Capability set every execution-plan operator exposes.
///
/// This replaces the function-pointer vtable of the source with a plain
/// trait; `to_string`/`clone`/`free` become `Display` (on implementors),
/// an explicit `deep_clone` (since a real `Clone` impl can't take a
/// target-plan parameter), and `Drop` respectively.
pub trait Operator {
    /// A stable tag distinguishing operator kinds, used by `deep_clone`
    /// callers to detect a target-type mismatch.
    fn op_type(&self) -> &'static str;

    /// Pulls the next row, or `None` on upstream exhaustion.
    fn consume(&mut self) -> Result<Option<Record>>;

    /// Drops any cached upstream row and active enumerator so the next
    /// `consume` call re-pulls from scratch.
    fn reset(&mut self);
}
