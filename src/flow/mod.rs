//! Max-flow oracle
//!
//! Dinic's algorithm over a residual network built from a
//! [`MutableGraph`] snapshot; the graph itself is never mutated. On top
//! of plain s-t flows this module provides the three cut queries the
//! branch-and-bound engine needs:
//!
//! - [`min_st_cut`]: minimum s-t cut value with its minimal source side,
//! - [`isolating_cut`]: minimum cut separating one terminal from all
//!   others, with both the minimal and the inclusion-maximal source side,
//! - [`star_flow_sum`]: successive max-flows from a hub terminal to every
//!   other terminal on one shared residual network. The increments are
//!   edge-disjoint flows that all cross the final multiway cut, so their
//!   sum is a sound lower bound; independent per-pair flows would not be.
//!
//! The only randomness is the adjacency scan order, fixed by the
//! configured seed, which breaks ties between equal-value cuts
//! deterministically per seed.

use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use roaring::RoaringBitmap;

use crate::error::{MulticutError, Result};
use crate::graph::{EdgeWeight, MutableGraph, NodeId};

/// Arc capacity standing in for "unbounded" (terminal-to-sink arcs)
const UNBOUNDED: EdgeWeight = EdgeWeight::MAX / 4;

/// Minimum s-t cut value together with its minimal source side.
#[derive(Debug, Clone)]
pub struct StCut {
    /// Cut value (equals the maximum flow)
    pub value: EdgeWeight,
    /// Vertices on the source side of the minimal cut
    pub source_side: RoaringBitmap,
}

/// Minimum isolating cut for one terminal against all others.
#[derive(Debug, Clone)]
pub struct IsolatingCut {
    /// Cut value
    pub value: EdgeWeight,
    /// Minimal source side (smallest vertex set achieving the cut)
    pub min_source_side: RoaringBitmap,
    /// Inclusion-maximal source side achieving the same cut value
    pub max_source_side: RoaringBitmap,
}

/// Isolating-cut bound over all terminals (sum minus the largest cut).
#[derive(Debug, Clone)]
pub struct IsolatingBound {
    /// Sum of all per-terminal isolating cuts minus the largest one; the
    /// union of the other cuts is a feasible multiway cut of this value
    pub bound: EdgeWeight,
    /// Minimal source side per terminal, pairwise disjoint
    pub sides: Vec<RoaringBitmap>,
    /// Index of the terminal whose isolating cut is largest
    pub max_index: usize,
}

#[derive(Debug, Clone, Copy)]
struct FlowArc {
    to: u32,
    cap: EdgeWeight,
}

/// Residual network for Dinic's algorithm.
///
/// Arcs are stored in pairs; arc `i` and arc `i ^ 1` are the two
/// directions of one edge.
pub struct FlowNetwork {
    arcs: Vec<FlowArc>,
    adj: Vec<Vec<u32>>,
    level: Vec<u32>,
    iter: Vec<usize>,
}

impl FlowNetwork {
    /// Build a residual network mirroring `g`, with the adjacency scan
    /// order shuffled deterministically from `seed`.
    pub fn from_graph(g: &MutableGraph, seed: u64) -> Self {
        Self::build(g, seed, &[])
    }

    /// Like [`from_graph`](Self::from_graph), plus a virtual sink vertex
    /// (returned id) attached to every vertex in `sinks` with unbounded
    /// capacity towards the sink.
    pub fn with_virtual_sink(g: &MutableGraph, seed: u64, sinks: &[NodeId]) -> (Self, NodeId) {
        let sink = g.num_vertices() as NodeId;
        (Self::build(g, seed, sinks), sink)
    }

    fn build(g: &MutableGraph, seed: u64, sinks: &[NodeId]) -> Self {
        let n = g.num_vertices() + usize::from(!sinks.is_empty());
        let mut net = Self {
            arcs: Vec::with_capacity(g.num_half_edges() + 2 * sinks.len()),
            adj: vec![Vec::new(); n],
            level: vec![u32::MAX; n],
            iter: vec![0; n],
        };
        for u in g.nodes() {
            for he in g.edges_of(u) {
                if u < he.target {
                    net.add_arc_pair(u, he.target, he.weight, he.weight);
                }
            }
        }
        let mut rng = StdRng::seed_from_u64(seed);
        for list in &mut net.adj {
            list.shuffle(&mut rng);
        }
        if !sinks.is_empty() {
            let sink = (n - 1) as NodeId;
            for &s in sinks {
                net.add_arc_pair(s, sink, UNBOUNDED, 0);
            }
        }
        net
    }

    fn add_arc_pair(&mut self, u: NodeId, v: NodeId, cap_uv: EdgeWeight, cap_vu: EdgeWeight) {
        let base = self.arcs.len() as u32;
        self.arcs.push(FlowArc { to: v, cap: cap_uv });
        self.arcs.push(FlowArc { to: u, cap: cap_vu });
        self.adj[u as usize].push(base);
        self.adj[v as usize].push(base + 1);
    }

    fn bfs(&mut self, s: NodeId, t: NodeId) -> bool {
        self.level.fill(u32::MAX);
        self.level[s as usize] = 0;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(s);
        while let Some(v) = queue.pop_front() {
            for &a in &self.adj[v as usize] {
                let arc = self.arcs[a as usize];
                if arc.cap > 0 && self.level[arc.to as usize] == u32::MAX {
                    self.level[arc.to as usize] = self.level[v as usize] + 1;
                    queue.push_back(arc.to);
                }
            }
        }
        self.level[t as usize] != u32::MAX
    }

    fn dfs(&mut self, v: NodeId, t: NodeId, pushed: EdgeWeight) -> EdgeWeight {
        if v == t {
            return pushed;
        }
        while self.iter[v as usize] < self.adj[v as usize].len() {
            let a = self.adj[v as usize][self.iter[v as usize]] as usize;
            let FlowArc { to, cap } = self.arcs[a];
            if cap > 0 && self.level[to as usize] == self.level[v as usize] + 1 {
                let flow = self.dfs(to, t, pushed.min(cap));
                if flow > 0 {
                    self.arcs[a].cap -= flow;
                    self.arcs[a ^ 1].cap += flow;
                    return flow;
                }
            }
            self.iter[v as usize] += 1;
        }
        0
    }

    /// Run (or continue) the max-flow computation from `s` to `t` on the
    /// current residual state and return the value pushed by this call.
    pub fn max_flow(
        &mut self,
        s: NodeId,
        t: NodeId,
        cancel: Option<&AtomicBool>,
    ) -> Result<EdgeWeight> {
        let mut total = 0;
        while self.bfs(s, t) {
            if let Some(flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    return Err(MulticutError::Cancelled);
                }
            }
            self.iter.fill(0);
            loop {
                let flow = self.dfs(s, t, EdgeWeight::MAX);
                if flow == 0 {
                    break;
                }
                total += flow;
            }
        }
        Ok(total)
    }

    /// Vertices reachable from `s` through positive residual arcs: the
    /// minimal source side of the cut after a max-flow run.
    pub fn min_source_side(&self, s: NodeId, num_real: usize) -> RoaringBitmap {
        let mut side = RoaringBitmap::new();
        let mut queue = std::collections::VecDeque::new();
        side.insert(s);
        queue.push_back(s);
        while let Some(v) = queue.pop_front() {
            for &a in &self.adj[v as usize] {
                let arc = self.arcs[a as usize];
                if arc.cap > 0 && (arc.to as usize) < num_real && !side.contains(arc.to) {
                    side.insert(arc.to);
                    queue.push_back(arc.to);
                }
            }
        }
        side
    }

    /// Complement of the set of vertices that can still reach `t` through
    /// positive residual arcs: the inclusion-maximal source side.
    pub fn max_source_side(&self, t: NodeId, num_real: usize) -> RoaringBitmap {
        let mut reaches = vec![false; self.adj.len()];
        reaches[t as usize] = true;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(t);
        while let Some(w) = queue.pop_front() {
            // Arc pairs: adj[w] holds w->x arcs, and arc^1 is the x->w
            // direction whose residual capacity decides reachability.
            for &a in &self.adj[w as usize] {
                let x = self.arcs[a as usize].to;
                if !reaches[x as usize] && self.arcs[(a ^ 1) as usize].cap > 0 {
                    reaches[x as usize] = true;
                    queue.push_back(x);
                }
            }
        }
        let mut side = RoaringBitmap::new();
        for v in 0..num_real as u32 {
            if !reaches[v as usize] {
                side.insert(v);
            }
        }
        side
    }
}

/// Minimum s-t cut of `g`: value plus minimal source side.
pub fn min_st_cut(
    g: &MutableGraph,
    s: NodeId,
    t: NodeId,
    seed: u64,
    cancel: Option<&AtomicBool>,
) -> Result<StCut> {
    let mut net = FlowNetwork::from_graph(g, seed);
    let value = net.max_flow(s, t, cancel)?;
    let source_side = net.min_source_side(s, g.num_vertices());
    Ok(StCut { value, source_side })
}

/// Maximum flow between two vertices (cut value only).
pub fn pairwise_flow(
    g: &MutableGraph,
    s: NodeId,
    t: NodeId,
    seed: u64,
    cancel: Option<&AtomicBool>,
) -> Result<EdgeWeight> {
    let mut net = FlowNetwork::from_graph(g, seed);
    net.max_flow(s, t, cancel)
}

/// Minimum cut separating `terminals[index]` from all other terminals.
pub fn isolating_cut(
    g: &MutableGraph,
    terminals: &[NodeId],
    index: usize,
    seed: u64,
    cancel: Option<&AtomicBool>,
) -> Result<IsolatingCut> {
    let others: Vec<NodeId> = terminals
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != index)
        .map(|(_, &t)| t)
        .collect();
    let (mut net, sink) = FlowNetwork::with_virtual_sink(g, seed, &others);
    let value = net.max_flow(terminals[index], sink, cancel)?;
    let min_source_side = net.min_source_side(terminals[index], g.num_vertices());
    let max_source_side = net.max_source_side(sink, g.num_vertices());
    Ok(IsolatingCut {
        value,
        min_source_side,
        max_source_side,
    })
}

/// Successive max-flows from `terminals[hub]` to every other terminal on
/// one shared residual network. Sound lower bound for the multiway cut of
/// `g` with the given terminals.
pub fn star_flow_sum(
    g: &MutableGraph,
    terminals: &[NodeId],
    hub: usize,
    seed: u64,
    cancel: Option<&AtomicBool>,
) -> Result<EdgeWeight> {
    let mut net = FlowNetwork::from_graph(g, seed);
    let mut total = 0;
    for (i, &t) in terminals.iter().enumerate() {
        if i != hub {
            total += net.max_flow(terminals[hub], t, cancel)?;
        }
    }
    Ok(total)
}

/// Per-terminal isolating cuts and the 2-approximation upper bound
/// (sum minus the largest cut).
pub fn isolating_cut_bound(
    g: &MutableGraph,
    terminals: &[NodeId],
    seed: u64,
    cancel: Option<&AtomicBool>,
) -> Result<IsolatingBound> {
    let mut values = Vec::with_capacity(terminals.len());
    let mut sides = Vec::with_capacity(terminals.len());
    for index in 0..terminals.len() {
        let cut = isolating_cut(g, terminals, index, seed, cancel)?;
        values.push(cut.value);
        sides.push(cut.min_source_side);
    }
    let max_index = values
        .iter()
        .enumerate()
        .max_by_key(|&(_, v)| v)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let sum: EdgeWeight = values.iter().sum();
    Ok(IsolatingBound {
        bound: sum - values[max_index],
        sides,
        max_index,
    })
}
