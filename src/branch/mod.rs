//! Branch-and-bound engine
//!
//! Workers pull subproblems from the per-thread scheduler and either
//! close them as leaves (at most two terminals left) or branch. The
//! branching step takes the terminal pair with the smallest pairwise
//! max-flow, isolates its weaker member `t_b` with a minimum isolating
//! cut, and produces two children:
//!
//! - **Merge child**: the inclusion-maximal source side of the isolating
//!   cut is contracted into `t_b`. This alone preserves at least one
//!   optimum (isolating-cut lemma), so the search stays exact.
//! - **Delete child**: the cut edges are committed, removed from the
//!   graph, and charged to `deleted_weight`.
//!
//! When the maximal source side is just `{t_b}` the merge child would not
//! shrink the graph, so the step falls back to contract-or-delete
//! branching on the heaviest edge incident to `t_b`. Either way every
//! child strictly shrinks the vertex or edge count.
//!
//! Bounds are total path values (they include `deleted_weight`): the
//! lower bound comes from successive star flows, the upper bound from the
//! isolating-cut 2-approximation, which is itself a feasible solution and
//! is offered to the global incumbent immediately.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::MulticutConfig;
use crate::error::{MulticutError, Result};
use crate::flow;
use crate::graph::validate::validate_graph;
use crate::graph::{EdgeWeight, NodeId};
use crate::problem::{MulticutProblem, UNBOUNDED_CUT};
use crate::queue::PerThreadProblemQueue;

/// How long an idle worker sleeps before re-checking the scheduler
const IDLE_POLL: Duration = Duration::from_micros(200);

/// Search counters for one component solve.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolveStats {
    /// Subproblems popped and processed
    pub problems: u64,
    /// Subproblems that branched into children
    pub branches: u64,
    /// Subproblems discarded by a bound or liveness check
    pub prunes: u64,
    /// Subproblems closed as leaves
    pub leaves: u64,
}

/// Outcome of solving one connected component.
pub(crate) struct ComponentOutcome {
    pub value: EdgeWeight,
    pub exact: bool,
    /// Block label per component-original vertex (empty unless save_cut)
    pub labels: Vec<u32>,
    pub stats: SolveStats,
}

struct SharedState {
    /// Best known total cut value; never increases
    upper: AtomicU64,
    /// Block labels of the incumbent, per component-original vertex
    best: Mutex<Vec<u32>>,
    /// First fatal error observed by any worker
    fatal: Mutex<Option<MulticutError>>,
    cancel: Arc<AtomicBool>,
    save_cut: bool,
    problems: AtomicU64,
    branches: AtomicU64,
    prunes: AtomicU64,
    leaves: AtomicU64,
}

impl SharedState {
    fn new(cancel: Arc<AtomicBool>, save_cut: bool) -> Self {
        Self {
            upper: AtomicU64::new(UNBOUNDED_CUT),
            best: Mutex::new(Vec::new()),
            fatal: Mutex::new(None),
            cancel,
            save_cut,
            problems: AtomicU64::new(0),
            branches: AtomicU64::new(0),
            prunes: AtomicU64::new(0),
            leaves: AtomicU64::new(0),
        }
    }

    fn global_upper(&self) -> EdgeWeight {
        self.upper.load(Ordering::Acquire)
    }

    /// Offer a feasible candidate; the incumbent only ever improves.
    fn offer(&self, value: EdgeWeight, labels: impl FnOnce() -> Vec<u32>) {
        let mut best = self.best.lock();
        if value < self.upper.load(Ordering::Acquire) {
            self.upper.store(value, Ordering::Release);
            if self.save_cut {
                *best = labels();
            }
            debug!(value, "improved global upper bound");
        }
    }

    fn record_fatal(&self, err: MulticutError) {
        let mut fatal = self.fatal.lock();
        if fatal.is_none() {
            *fatal = Some(err);
        }
        self.cancel.store(true, Ordering::SeqCst);
    }

    fn stats(&self) -> SolveStats {
        SolveStats {
            problems: self.problems.load(Ordering::Relaxed),
            branches: self.branches.load(Ordering::Relaxed),
            prunes: self.prunes.load(Ordering::Relaxed),
            leaves: self.leaves.load(Ordering::Relaxed),
        }
    }
}

/// Solve one connected component to optimality (or until cancelled).
pub(crate) fn solve_component(
    mut root: MulticutProblem,
    config: &MulticutConfig,
    cancel: Arc<AtomicBool>,
) -> Result<ComponentOutcome> {
    let state = SharedState::new(cancel, config.save_cut);
    if let Err(err) = evaluate_bounds(&mut root, 0, UNBOUNDED_CUT, config, &state) {
        if matches!(err, MulticutError::Cancelled) {
            // Cancelled before any feasible cut was seen; the caller
            // turns the unbounded value back into a cancellation.
            return Ok(ComponentOutcome {
                value: UNBOUNDED_CUT,
                exact: false,
                labels: Vec::new(),
                stats: state.stats(),
            });
        }
        return Err(err);
    }

    let queue = PerThreadProblemQueue::new(config.threads, config.queue_type, config.queue_capacity);
    queue.push(root, 0);

    std::thread::scope(|scope| {
        for wid in 0..config.threads {
            let queue = &queue;
            let state = &state;
            scope.spawn(move || worker_loop(wid, queue, state, config));
        }
    });

    if let Some(err) = state.fatal.lock().take() {
        return Err(err);
    }

    let cancelled = state.cancel.load(Ordering::SeqCst);
    let labels = std::mem::take(&mut *state.best.lock());
    let outcome = ComponentOutcome {
        value: state.global_upper(),
        exact: !cancelled && !queue.has_shed(),
        labels,
        stats: state.stats(),
    };
    Ok(outcome)
}

fn worker_loop(
    wid: usize,
    queue: &PerThreadProblemQueue,
    state: &SharedState,
    config: &MulticutConfig,
) {
    loop {
        if state.cancel.load(Ordering::SeqCst) {
            // Drain without processing; peers may still push while they
            // finish their current problem.
            while queue.pop(wid).is_some() {
                queue.retire(wid);
            }
            if queue.is_idle() {
                return;
            }
            std::thread::sleep(IDLE_POLL);
            continue;
        }

        match queue.pop(wid) {
            Some(problem) => {
                if let Err(err) = process_problem(problem, wid, queue, state, config) {
                    if matches!(err, MulticutError::Cancelled) {
                        // Oracle interrupted: retire the subproblem
                        // without children and keep going.
                        trace!(worker = wid, "subproblem retired on cancellation");
                    } else {
                        state.record_fatal(err);
                    }
                }
                queue.retire(wid);
            }
            None => {
                if queue.is_idle() {
                    return;
                }
                std::thread::sleep(IDLE_POLL);
            }
        }
    }
}

fn process_problem(
    mut p: MulticutProblem,
    wid: usize,
    queue: &PerThreadProblemQueue,
    state: &SharedState,
    config: &MulticutConfig,
) -> Result<()> {
    state.problems.fetch_add(1, Ordering::Relaxed);

    if p.lower_bound >= state.global_upper() {
        state.prunes.fetch_add(1, Ordering::Relaxed);
        return Ok(());
    }
    if config.verify_graph {
        validate_graph(&p.graph)?;
    }

    p.refresh_terminal_positions();
    delete_forced_edges(&mut p)?;
    retire_separated_terminals(&mut p);

    match p.terminals.len() {
        0 | 1 => {
            close_trivial_leaf(&p, state);
            state.leaves.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
        2 => {
            close_two_terminal_leaf(&p, state, config)?;
            state.leaves.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
        _ => branch_problem(p, wid, queue, state, config),
    }
}

/// Edges between two terminal vertices are crossed by every feasible
/// solution; commit them up front.
fn delete_forced_edges(p: &mut MulticutProblem) -> Result<()> {
    let positions = p.terminal_positions();
    let mut removed = 0;
    for (i, &u) in positions.iter().enumerate() {
        for &v in positions.iter().skip(i + 1) {
            if p.graph.find_edge(u, v).is_some() {
                removed += p.graph.remove_edge(u, v)?;
            }
        }
    }
    if removed > 0 {
        p.deleted_weight += removed;
        for t in &mut p.terminals {
            t.invalid_flow = true;
        }
    }
    Ok(())
}

/// A terminal whose vertex lost every edge is fully separated: record the
/// block of everything contracted into it and retire it from the search.
fn retire_separated_terminals(p: &mut MulticutProblem) {
    let mut i = 0;
    while i < p.terminals.len() {
        let position = p.terminals[i].position;
        if p.graph.degree(position) == 0 {
            let block = p.terminals[i].block;
            for original in p.graph.contained_vertices(position) {
                p.resolved[original as usize] = Some(block);
            }
            p.terminals.remove(i);
        } else {
            i += 1;
        }
    }
}

/// With at most one terminal left nothing remains to separate; the branch
/// closes at its committed weight.
fn close_trivial_leaf(p: &MulticutProblem, state: &SharedState) {
    let default_block = p.terminals.first().map(|t| t.block).unwrap_or(0);
    state.offer(p.deleted_weight, || {
        finish_labels(p, vec![default_block; p.graph.original_n()])
    });
}

/// With exactly two terminals the optimum is the minimum s-t cut.
fn close_two_terminal_leaf(
    p: &MulticutProblem,
    state: &SharedState,
    config: &MulticutConfig,
) -> Result<()> {
    let s = p.terminals[0];
    let t = p.terminals[1];
    let cut = flow::min_st_cut(
        &p.graph,
        s.position,
        t.position,
        config.seed,
        Some(state.cancel.as_ref()),
    )?;
    state.offer(p.deleted_weight + cut.value, || {
        let mut labels = vec![t.block; p.graph.original_n()];
        apply_side(p, &cut.source_side, s.block, &mut labels);
        finish_labels(p, labels)
    });
    Ok(())
}

fn branch_problem(
    mut p: MulticutProblem,
    wid: usize,
    queue: &PerThreadProblemQueue,
    state: &SharedState,
    config: &MulticutConfig,
) -> Result<()> {
    state.branches.fetch_add(1, Ordering::Relaxed);
    let positions = p.terminal_positions();
    let cancel = state.cancel.as_ref();

    // Branching pair: smallest pairwise max-flow, ties by the smaller
    // minimum weighted terminal degree, then by input index order.
    let mut best = (0usize, 1usize);
    let mut best_flow = EdgeWeight::MAX;
    let mut best_degree = EdgeWeight::MAX;
    for i in 0..positions.len() {
        for j in i + 1..positions.len() {
            let value =
                flow::pairwise_flow(&p.graph, positions[i], positions[j], config.seed, Some(cancel))?;
            let degree = p
                .graph
                .weighted_degree(positions[i])
                .min(p.graph.weighted_degree(positions[j]));
            if value < best_flow || (value == best_flow && degree < best_degree) {
                best = (i, j);
                best_flow = value;
                best_degree = degree;
            }
        }
    }
    for t in &mut p.terminals {
        t.invalid_flow = false;
    }

    // Isolate the weaker member of the pair.
    let (i, j) = best;
    let b = if p.graph.weighted_degree(positions[i]) <= p.graph.weighted_degree(positions[j]) {
        i
    } else {
        j
    };
    let iso = flow::isolating_cut(&p.graph, &positions, b, config.seed, Some(cancel))?;
    trace!(
        worker = wid,
        terminal = b,
        cut = iso.value,
        side = iso.max_source_side.len(),
        "branching"
    );

    let parent_lower = p.lower_bound;
    let parent_upper = p.upper_bound;

    if iso.max_source_side.len() > 1 {
        let t_pos = positions[b];
        let delete_base = if iso.value > 0 { Some(p.clone()) } else { None };

        // Merge child: contract the maximal source side into the terminal.
        let mut members: Vec<NodeId> = vec![t_pos];
        members.extend(iso.max_source_side.iter().filter(|&v| v != t_pos));
        let mut merge = p;
        merge.graph.contract_vertex_set(&members)?;
        merge.refresh_terminal_positions();
        merge.path.push('M');
        finish_child(merge, parent_lower, parent_upper, wid, queue, state, config)?;

        // Delete child: commit the cut edges (pointless when the cut is
        // empty; the merge child already absorbs the separated side).
        if let Some(mut delete) = delete_base {
            let (edges, weight) = delete.graph.boundary_edges(&iso.max_source_side);
            for (u, v) in edges {
                delete.graph.remove_edge(u, v)?;
            }
            delete.deleted_weight += weight;
            for t in &mut delete.terminals {
                t.invalid_flow = true;
            }
            delete.path.push('D');
            finish_child(delete, parent_lower, parent_upper, wid, queue, state, config)?;
        }
    } else {
        // The maximal source side is the terminal alone: contracting it
        // would not shrink the graph. Branch on its heaviest incident
        // edge instead; forced-edge deletion already removed any edge to
        // another terminal, so the contraction below never merges two
        // terminals.
        let t_pos = positions[b];
        let mut heaviest: Option<(EdgeWeight, NodeId)> = None;
        for he in p.graph.edges_of(t_pos) {
            let candidate = (he.weight, he.target);
            let better = match heaviest {
                None => true,
                Some((w, v)) => he.weight > w || (he.weight == w && he.target < v),
            };
            if better {
                heaviest = Some(candidate);
            }
        }
        let (weight, neighbor) =
            heaviest.ok_or_else(|| MulticutError::Invariant(format!(
                "branching terminal at {t_pos} has no incident edges"
            )))?;

        let mut delete = p.clone();
        let mut contract = p;
        contract.graph.contract_edge(t_pos, neighbor)?;
        contract.refresh_terminal_positions();
        contract.path.push('M');
        finish_child(contract, parent_lower, parent_upper, wid, queue, state, config)?;

        delete.graph.remove_edge(t_pos, neighbor)?;
        delete.deleted_weight += weight;
        for t in &mut delete.terminals {
            t.invalid_flow = true;
        }
        delete.path.push('D');
        finish_child(delete, parent_lower, parent_upper, wid, queue, state, config)?;
    }
    Ok(())
}

/// Tighten a child's bounds, offer its feasible upper bound to the
/// incumbent, and either push it or prune it.
fn finish_child(
    mut child: MulticutProblem,
    parent_lower: EdgeWeight,
    parent_upper: EdgeWeight,
    wid: usize,
    queue: &PerThreadProblemQueue,
    state: &SharedState,
    config: &MulticutConfig,
) -> Result<()> {
    evaluate_bounds(&mut child, parent_lower, parent_upper, config, state)?;
    if child.lower_bound >= state.global_upper() || child.lower_bound > child.upper_bound {
        state.prunes.fetch_add(1, Ordering::Relaxed);
        return Ok(());
    }
    queue.push(child, wid);
    Ok(())
}

/// Recompute both bounds for `p` as total path values, inheriting from
/// the parent: the lower bound from successive star flows rooted at the
/// heaviest terminal, the upper bound from the isolating-cut
/// 2-approximation (offered to the incumbent as a feasible solution).
fn evaluate_bounds(
    p: &mut MulticutProblem,
    parent_lower: EdgeWeight,
    parent_upper: EdgeWeight,
    config: &MulticutConfig,
    state: &SharedState,
) -> Result<()> {
    p.refresh_terminal_positions();
    let positions = p.terminal_positions();
    if positions.len() < 2 {
        p.lower_bound = p.deleted_weight;
        p.upper_bound = p.deleted_weight;
        return Ok(());
    }

    let mut hub = 0;
    for (index, &pos) in positions.iter().enumerate() {
        if p.graph.weighted_degree(pos) > p.graph.weighted_degree(positions[hub]) {
            hub = index;
        }
    }
    let star = flow::star_flow_sum(
        &p.graph,
        &positions,
        hub,
        config.seed,
        Some(state.cancel.as_ref()),
    )?;
    p.lower_bound = parent_lower.max(p.deleted_weight + star);

    let bound = flow::isolating_cut_bound(
        &p.graph,
        &positions,
        config.seed,
        Some(state.cancel.as_ref()),
    )?;
    let upper_candidate = p.deleted_weight + bound.bound;
    p.upper_bound = parent_upper.min(upper_candidate);
    for t in &mut p.terminals {
        t.invalid_flow = false;
    }

    // The isolating-cut bound is a feasible multiway cut: everything
    // outside the kept source sides joins the excluded terminal's block.
    state.offer(upper_candidate, || {
        let mut labels = vec![p.terminals[bound.max_index].block; p.graph.original_n()];
        for (index, side) in bound.sides.iter().enumerate() {
            if index != bound.max_index {
                apply_side(p, side, p.terminals[index].block, &mut labels);
            }
        }
        finish_labels(p, labels)
    });
    Ok(())
}

/// Label every original vertex contained in `side` with `block`.
fn apply_side(p: &MulticutProblem, side: &RoaringBitmap, block: u32, labels: &mut [u32]) {
    for v in side {
        for original in p.graph.contained_vertices(v) {
            labels[original as usize] = block;
        }
    }
}

/// Overlay the blocks already decided for retired terminals.
fn finish_labels(p: &MulticutProblem, mut labels: Vec<u32>) -> Vec<u32> {
    for (original, resolved) in p.resolved.iter().enumerate() {
        if let Some(block) = resolved {
            labels[original] = *block;
        }
    }
    labels
}
