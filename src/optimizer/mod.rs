//! Traversal-order optimizer: reorders a set of algebraic expressions into
//! an efficient evaluation sequence and picks the best entry point.

use std::collections::HashSet;

use crate::algebraic_expression::AlgebraicExpression;
use crate::config::Config;
use crate::filter_tree::FilterTree;
use crate::query_graph::QueryGraph;

/// Transpose penalty.
const T: i64 = 1;
/// Label reward.
const L: i64 = 2 * T;
/// Filter reward.
const F: i64 = 4 * T;
/// Bound-variable reward.
const B: i64 = 8 * F;

/// One ordering of a set of AEs under consideration.
type Arrangement = Vec<AlgebraicExpression>;

/// Reorders `exps` in place into a scored-optimal valid arrangement and
/// resolves directionality so every non-head AE's source is resolvable
/// from a predecessor, finally choosing the better entry point for the
/// head expression.
///
/// `filters` may be absent (no predicate attached to this traversal).
/// `bound_vars` is the set of aliases already bound by an earlier part of
/// the plan.
pub fn order_expressions(
    qg: &QueryGraph,
    exps: &mut Vec<AlgebraicExpression>,
    config: &Config,
    filters: Option<&FilterTree>,
    bound_vars: &HashSet<String>,
) {
    assert!(!exps.is_empty(), "order_expressions requires at least one AE");

    // Return early for a pure scan: a single AE representing a self-loop
    // label scan rather than a traversal.
    if exps.len() == 1 && exps[0].operand_count() == 1 && exps[0].is_self_loop() {
        return;
    }

    let filtered_entities: HashSet<String> = filters.map(FilterTree::collect_modified).unwrap_or_default();

    let arrangements = permutations(exps);

    if arrangements.len() > 1 {
        let valid: Vec<Arrangement> = arrangements
            .into_iter()
            .filter(|a| is_valid_arrangement(a, qg))
            .collect();
        assert!(!valid.is_empty(), "no valid arrangement exists for this AE set");

        let mut best_score = i64::MIN;
        let mut best: &Arrangement = &valid[0];
        for arrangement in &valid {
            let score = score_arrangement(arrangement, qg, config, &filtered_entities, bound_vars);
            if score > best_score {
                best_score = score;
                best = arrangement;
            }
        }
        *exps = best.clone();

        resolve_winning_sequence(exps);
    }

    select_entry_point(qg, &mut exps[0], &filtered_entities, bound_vars);
}

/// All `n!` permutations of `exps`, preserving the source material intact.
fn permutations(exps: &[AlgebraicExpression]) -> Vec<Arrangement> {
    let mut working: Arrangement = exps.to_vec();
    let mut out = Vec::new();
    permute(&mut working, 0, &mut out);
    out
}

fn permute(set: &mut Arrangement, l: usize, out: &mut Vec<Arrangement>) {
    let r = set.len();
    if l == r {
        out.push(set.clone());
        return;
    }
    for i in l..r {
        set.swap(l, i);
        permute(set, l + 1, out);
        set.swap(l, i);
    }
}

/// A valid arrangement satisfies: for every `i > 0`, at least one of the
/// `i`-th AE's src/dst aliases equals the src or dst of some earlier AE;
/// and the head AE is not a single-operand edge-bearing AE adjacent to a
/// labeled node (label scans must lead).
fn is_valid_arrangement(arrangement: &[AlgebraicExpression], qg: &QueryGraph) -> bool {
    let head = &arrangement[0];
    let head_src_labeled = qg.is_labeled(head.src());
    let head_dst_labeled = qg.is_labeled(head.dst());
    if (head_src_labeled || head_dst_labeled) && head.edge_alias().is_some() && head.operand_count() == 1 {
        return false;
    }

    for i in 1..arrangement.len() {
        let exp = &arrangement[i];
        let resolved = arrangement[..i]
            .iter()
            .any(|prev| endpoints_overlap(prev, exp));
        if !resolved {
            return false;
        }
    }
    true
}

fn endpoints_overlap(prev: &AlgebraicExpression, exp: &AlgebraicExpression) -> bool {
    prev.src() == exp.src() || prev.dst() == exp.src() || prev.src() == exp.dst() || prev.dst() == exp.dst()
}

fn penalty_arrangement(arrangement: &[AlgebraicExpression], config: &Config) -> i64 {
    if config.maintain_transpose {
        return 0;
    }

    let mut penalty = (arrangement[0].transpose_count() as i64) * T;

    for i in 1..arrangement.len() {
        let exp = &arrangement[i];
        let src_resolved = arrangement[..i].iter().any(|prev| {
            prev.src() == exp.src() || prev.dst() == exp.src()
        });

        if src_resolved {
            penalty += (exp.transpose_count() as i64) * T;
        } else {
            penalty += ((exp.operand_count() - exp.transpose_count()) as i64) * T;
        }
    }

    penalty
}

fn reward_expression(
    exp: &AlgebraicExpression,
    qg: &QueryGraph,
    filtered_entities: &HashSet<String>,
    bound_vars: &HashSet<String>,
    reward_factor: i64,
) -> i64 {
    let mut reward = 0;

    if bound_vars.contains(exp.src()) {
        reward += B * reward_factor;
    }
    if bound_vars.contains(exp.dst()) {
        reward += B * reward_factor;
    }

    if filtered_entities.contains(exp.src()) {
        reward += F * reward_factor;
    }
    if filtered_entities.contains(exp.dst()) {
        reward += F * reward_factor;
    }

    // Destination label is intentionally not rewarded; see the optimizer's
    // design notes on the source/destination asymmetry.
    if qg.is_labeled(exp.src()) {
        reward += L * reward_factor;
    }

    reward
}

fn reward_arrangement(
    arrangement: &[AlgebraicExpression],
    qg: &QueryGraph,
    filtered_entities: &HashSet<String>,
    bound_vars: &HashSet<String>,
) -> i64 {
    let n = arrangement.len() as i64;
    arrangement
        .iter()
        .enumerate()
        .map(|(i, exp)| {
            let reward_factor = n - i as i64;
            reward_expression(exp, qg, filtered_entities, bound_vars, reward_factor)
        })
        .sum()
}

fn score_arrangement(
    arrangement: &[AlgebraicExpression],
    qg: &QueryGraph,
    config: &Config,
    filtered_entities: &HashSet<String>,
    bound_vars: &HashSet<String>,
) -> i64 {
    reward_arrangement(arrangement, qg, filtered_entities, bound_vars) - penalty_arrangement(arrangement, config)
}

/// Transposes out-of-order expressions so each non-head expression's
/// source is resolved by a predecessor.
fn resolve_winning_sequence(exps: &mut [AlgebraicExpression]) {
    for i in 1..exps.len() {
        let src = exps[i].src().to_owned();
        let resolved = exps[..i]
            .iter()
            .any(|prev| prev.src() == src || prev.dst() == src);
        if !resolved {
            exps[i].transpose();
        }
    }
}

/// Decides whether the head expression should be transposed to start at a
/// better entry point: a bound variable always wins; otherwise filters
/// dominate labels.
fn select_entry_point(
    qg: &QueryGraph,
    exp: &mut AlgebraicExpression,
    filtered_entities: &HashSet<String>,
    bound_vars: &HashSet<String>,
) {
    if exp.operand_count() == 1 && exp.is_self_loop() {
        return;
    }

    if !bound_vars.is_empty() {
        if bound_vars.contains(exp.src()) {
            return;
        }
        if bound_vars.contains(exp.dst()) {
            exp.transpose();
            return;
        }
    }

    let mut src_score = 0;
    let mut dst_score = 0;

    if filtered_entities.contains(exp.src()) {
        src_score += F;
    }
    if filtered_entities.contains(exp.dst()) {
        dst_score += F;
    }

    if qg.is_labeled(exp.src()) {
        src_score += L;
    }
    if qg.is_labeled(exp.dst()) {
        dst_score += L;
    }

    if dst_score > src_score {
        exp.transpose();
    }
}
