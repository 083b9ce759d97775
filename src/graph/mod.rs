//! Mutable contractible graph
//!
//! Packed-adjacency representation of an undirected weighted graph that
//! supports the heavy mutation pattern of the branch-and-bound search:
//! edge contraction, vertex-set contraction, and edge deletion, all with
//! swap-and-pop updates that keep the reverse-edge pointers exact.
//!
//! Every undirected edge is stored as two half-edges. A half-edge at
//! vertex `u` carries its target `v`, the edge weight, and the index of
//! the paired half-edge inside `v`'s adjacency list. All mutations
//! re-point both sides of every touched edge; [`validate::validate_graph`]
//! checks the full invariant set.
//!
//! Vertex identifiers are dense in `[0, n)` and are remapped by
//! contraction: when `u` absorbs `v`, the last vertex moves into `v`'s
//! slot. [`MutableGraph::current_position`] resolves an original
//! identifier to the vertex that currently holds it.

pub mod validate;

use std::collections::HashMap;

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

use crate::error::{MulticutError, Result};

/// Vertex identifier, dense in `[0, n)` within one graph instance
pub type NodeId = u32;

/// Index of a half-edge inside a vertex's adjacency list
pub type EdgeId = u32;

/// Non-negative integer edge weight
pub type EdgeWeight = u64;

/// One direction of an undirected edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfEdge {
    /// Target vertex
    pub target: NodeId,
    /// Edge weight (shared with the paired half-edge)
    pub weight: EdgeWeight,
    /// Index of the paired half-edge in the target's adjacency list
    pub reverse: EdgeId,
}

#[derive(Debug, Clone, Default)]
struct Vertex {
    edges: Vec<HalfEdge>,
    weighted_degree: EdgeWeight,
    contained: RoaringBitmap,
    partition: u32,
}

/// Summary counters for a graph instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    /// Number of current vertices
    pub num_vertices: usize,
    /// Number of half-edge slots (2 per undirected edge)
    pub num_half_edges: usize,
    /// Sum of all edge weights, each edge counted once
    pub total_weight: EdgeWeight,
    /// Smallest weighted degree
    pub min_weighted_degree: EdgeWeight,
    /// Largest weighted degree
    pub max_weighted_degree: EdgeWeight,
}

/// Mutable contractible graph with reverse-edge tracking
#[derive(Debug, Clone)]
pub struct MutableGraph {
    vertices: Vec<Vertex>,
    /// Original identifier -> current vertex slot
    position: Vec<NodeId>,
    half_edges: usize,
}

impl MutableGraph {
    /// Create a graph with `n` isolated vertices.
    pub fn new(n: usize) -> Self {
        let vertices = (0..n)
            .map(|i| {
                let mut contained = RoaringBitmap::new();
                contained.insert(i as u32);
                Vertex {
                    contained,
                    ..Vertex::default()
                }
            })
            .collect();
        Self {
            vertices,
            position: (0..n as NodeId).collect(),
            half_edges: 0,
        }
    }

    /// Build a graph from an edge list.
    pub fn from_edges(n: usize, edges: &[(NodeId, NodeId, EdgeWeight)]) -> Result<Self> {
        let mut g = Self::new(n);
        for &(u, v, w) in edges {
            g.new_edge(u, v, w)?;
        }
        Ok(g)
    }

    /// Number of current vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of half-edge slots; every undirected edge counts twice.
    pub fn num_half_edges(&self) -> usize {
        self.half_edges
    }

    /// Size of the original identifier space this graph was built over.
    pub fn original_n(&self) -> usize {
        self.position.len()
    }

    /// Iterator over the current vertex identifiers.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> {
        0..self.vertices.len() as NodeId
    }

    /// Half-edges incident to `v`.
    pub fn edges_of(&self, v: NodeId) -> &[HalfEdge] {
        &self.vertices[v as usize].edges
    }

    /// Unweighted degree of `v`.
    pub fn degree(&self, v: NodeId) -> usize {
        self.vertices[v as usize].edges.len()
    }

    /// Sum of the weights of all edges incident to `v`.
    pub fn weighted_degree(&self, v: NodeId) -> EdgeWeight {
        self.vertices[v as usize].weighted_degree
    }

    /// Target of half-edge `e` at vertex `v`.
    pub fn edge_target(&self, v: NodeId, e: EdgeId) -> NodeId {
        self.vertices[v as usize].edges[e as usize].target
    }

    /// Weight of half-edge `e` at vertex `v`.
    pub fn edge_weight(&self, v: NodeId, e: EdgeId) -> EdgeWeight {
        self.vertices[v as usize].edges[e as usize].weight
    }

    /// Index of the paired half-edge at the target of `(v, e)`.
    pub fn reverse_edge(&self, v: NodeId, e: EdgeId) -> EdgeId {
        self.vertices[v as usize].edges[e as usize].reverse
    }

    /// Index of the half-edge from `u` to `v`, if the edge exists.
    pub fn find_edge(&self, u: NodeId, v: NodeId) -> Option<EdgeId> {
        self.vertices
            .get(u as usize)?
            .edges
            .iter()
            .position(|he| he.target == v)
            .map(|i| i as EdgeId)
    }

    /// Current vertex slot holding original identifier `original_id`.
    pub fn current_position(&self, original_id: NodeId) -> NodeId {
        self.position[original_id as usize]
    }

    /// Original identifiers merged into vertex `v`.
    pub fn contained_vertices(&self, v: NodeId) -> &RoaringBitmap {
        &self.vertices[v as usize].contained
    }

    /// Partition index of `v` (default 0).
    pub fn partition_index(&self, v: NodeId) -> u32 {
        self.vertices[v as usize].partition
    }

    /// Set the partition index of `v`.
    pub fn set_partition_index(&mut self, v: NodeId, index: u32) {
        self.vertices[v as usize].partition = index;
    }

    /// Sum of all edge weights, each undirected edge counted once.
    pub fn total_edge_weight(&self) -> EdgeWeight {
        self.vertices.iter().map(|v| v.weighted_degree).sum::<u64>() / 2
    }

    /// Summary counters.
    pub fn stats(&self) -> GraphStats {
        let degrees: Vec<EdgeWeight> =
            self.vertices.iter().map(|v| v.weighted_degree).collect();
        GraphStats {
            num_vertices: self.vertices.len(),
            num_half_edges: self.half_edges,
            total_weight: self.total_edge_weight(),
            min_weighted_degree: degrees.iter().copied().min().unwrap_or(0),
            max_weighted_degree: degrees.iter().copied().max().unwrap_or(0),
        }
    }

    /// Add an undirected edge between `u` and `v`.
    ///
    /// Fails on self-loops, out-of-range endpoints, and edges that already
    /// exist; zero weights are allowed.
    pub fn new_edge(&mut self, u: NodeId, v: NodeId, weight: EdgeWeight) -> Result<()> {
        if u == v {
            return Err(MulticutError::SelfLoop(u));
        }
        let n = self.vertices.len() as NodeId;
        if u >= n || v >= n {
            return Err(MulticutError::InvalidVertex(u.max(v)));
        }
        if self.find_edge(u, v).is_some() {
            return Err(MulticutError::EdgeExists(u, v));
        }

        let u_idx = self.vertices[u as usize].edges.len() as EdgeId;
        let v_idx = self.vertices[v as usize].edges.len() as EdgeId;
        self.vertices[u as usize].edges.push(HalfEdge {
            target: v,
            weight,
            reverse: v_idx,
        });
        self.vertices[v as usize].edges.push(HalfEdge {
            target: u,
            weight,
            reverse: u_idx,
        });
        self.vertices[u as usize].weighted_degree += weight;
        self.vertices[v as usize].weighted_degree += weight;
        self.half_edges += 2;
        Ok(())
    }

    /// Set the weight of half-edge `(v, e)`; both directions are updated.
    pub fn set_edge_weight(&mut self, v: NodeId, e: EdgeId, weight: EdgeWeight) {
        let he = self.vertices[v as usize].edges[e as usize];
        let old = he.weight;
        self.vertices[v as usize].edges[e as usize].weight = weight;
        self.vertices[he.target as usize].edges[he.reverse as usize].weight = weight;
        self.vertices[v as usize].weighted_degree =
            self.vertices[v as usize].weighted_degree - old + weight;
        self.vertices[he.target as usize].weighted_degree =
            self.vertices[he.target as usize].weighted_degree - old + weight;
    }

    /// Delete the edge between `u` and `v`, returning its weight.
    pub fn remove_edge(&mut self, u: NodeId, v: NodeId) -> Result<EdgeWeight> {
        let e = self
            .find_edge(u, v)
            .ok_or(MulticutError::EdgeNotFound(u, v))?;
        let he = self.vertices[u as usize].edges[e as usize];
        self.pop_half_edge(u, e as usize);
        self.pop_half_edge(v, he.reverse as usize);
        self.vertices[u as usize].weighted_degree -= he.weight;
        self.vertices[v as usize].weighted_degree -= he.weight;
        self.half_edges -= 2;
        Ok(he.weight)
    }

    /// Contract `v` into `u`: the `(u, v)` edge (if any) disappears,
    /// parallel edges merge by weight addition, and `v`'s contained
    /// vertices transfer to `u`.
    ///
    /// Returns the identifier that holds the merged vertex afterwards.
    /// Contraction moves the highest vertex identifier into `v`'s slot, so
    /// the returned id is `v` when `u` previously held the highest id;
    /// callers holding other identifiers should re-resolve them through
    /// [`current_position`](Self::current_position).
    pub fn contract_edge(&mut self, u: NodeId, v: NodeId) -> Result<NodeId> {
        if u == v {
            return Err(MulticutError::SelfLoop(u));
        }
        let n = self.vertices.len() as NodeId;
        if u >= n || v >= n {
            return Err(MulticutError::InvalidVertex(u.max(v)));
        }

        let mut target_index: HashMap<NodeId, usize> = self.vertices[u as usize]
            .edges
            .iter()
            .enumerate()
            .map(|(i, he)| (he.target, i))
            .collect();

        let v_edges = std::mem::take(&mut self.vertices[v as usize].edges);
        self.vertices[v as usize].weighted_degree = 0;

        for he in v_edges {
            let w = he.target;
            if w == u {
                // The (u, v) edge itself: drop both halves.
                let moved = self.pop_half_edge(u, he.reverse as usize);
                target_index.remove(&v);
                if let Some(m) = moved {
                    target_index.insert(m.target, he.reverse as usize);
                }
                self.vertices[u as usize].weighted_degree -= he.weight;
                self.half_edges -= 2;
            } else if let Some(&idx) = target_index.get(&w) {
                // Parallel edge after the merge: add weights on both sides
                // and drop w's half-edge that pointed at v.
                self.vertices[u as usize].edges[idx].weight += he.weight;
                let rev_u = self.vertices[u as usize].edges[idx].reverse as usize;
                self.vertices[w as usize].edges[rev_u].weight += he.weight;
                self.pop_half_edge(w, he.reverse as usize);
                self.vertices[u as usize].weighted_degree += he.weight;
                self.half_edges -= 2;
            } else {
                // Re-point the edge from v to u.
                let new_idx = self.vertices[u as usize].edges.len();
                self.vertices[u as usize].edges.push(he);
                self.vertices[w as usize].edges[he.reverse as usize].target = u;
                self.vertices[w as usize].edges[he.reverse as usize].reverse = new_idx as EdgeId;
                target_index.insert(w, new_idx);
                self.vertices[u as usize].weighted_degree += he.weight;
            }
        }

        let contained = std::mem::take(&mut self.vertices[v as usize].contained);
        for original in &contained {
            self.position[original as usize] = u;
        }
        self.vertices[u as usize].contained |= contained;

        let old_last = self.vertices.len() as NodeId - 1;
        self.swap_remove_isolated(v);
        Ok(if u == old_last { v } else { u })
    }

    /// Contract all vertices in `set` into the first element.
    ///
    /// Equivalent to repeated [`contract_edge`](Self::contract_edge) but
    /// runs in time linear in the total degree incident to the set.
    /// Returns the identifier holding the merged vertex.
    pub fn contract_vertex_set(&mut self, set: &[NodeId]) -> Result<NodeId> {
        let n = self.vertices.len() as NodeId;
        let mut member_mark = RoaringBitmap::new();
        let mut members: Vec<NodeId> = Vec::with_capacity(set.len());
        for &v in set {
            if v >= n {
                return Err(MulticutError::InvalidVertex(v));
            }
            if member_mark.insert(v) {
                members.push(v);
            }
        }
        let Some(&rep) = members.first() else {
            return Err(MulticutError::InvalidInput(
                "cannot contract an empty vertex set".into(),
            ));
        };
        if members.len() == 1 {
            return Ok(rep);
        }

        // Accumulate the merged external adjacency in first-encounter
        // order so the result is deterministic.
        let mut ext_order: Vec<NodeId> = Vec::new();
        let mut ext_weight: HashMap<NodeId, EdgeWeight> = HashMap::new();
        let mut ext_remove: HashMap<NodeId, Vec<u32>> = HashMap::new();
        let mut internal_half = 0usize;
        let mut external_half = 0usize;
        for &mv in &members {
            for he in &self.vertices[mv as usize].edges {
                if member_mark.contains(he.target) {
                    internal_half += 1;
                } else {
                    external_half += 1;
                    if !ext_weight.contains_key(&he.target) {
                        ext_order.push(he.target);
                    }
                    *ext_weight.entry(he.target).or_insert(0) += he.weight;
                    ext_remove.entry(he.target).or_default().push(he.reverse);
                }
            }
        }

        // Drop every external half-edge pointing into the set, highest
        // index first so pending indices stay valid, then append the
        // single merged half-edge towards the representative.
        let mut rep_reverse: Vec<EdgeId> = Vec::with_capacity(ext_order.len());
        for &w in &ext_order {
            let mut indices = ext_remove.remove(&w).unwrap_or_default();
            indices.sort_unstable_by(|a, b| b.cmp(a));
            for idx in indices {
                self.pop_half_edge(w, idx as usize);
            }
            // The dropped half-edges into the set weigh exactly as much
            // as the merged edge that replaces them, so w's weighted
            // degree is unchanged.
            let weight = ext_weight[&w];
            rep_reverse.push(self.vertices[w as usize].edges.len() as EdgeId);
            self.vertices[w as usize].edges.push(HalfEdge {
                target: rep,
                weight,
                reverse: 0, // patched below once the rep list is final
            });
        }

        // Member adjacency is dead from here on.
        for &mv in &members {
            self.vertices[mv as usize].edges.clear();
            self.vertices[mv as usize].weighted_degree = 0;
        }

        // Rebuild the representative's adjacency from the merged view.
        let mut rep_edges = Vec::with_capacity(ext_order.len());
        let mut rep_degree = 0;
        for (i, &w) in ext_order.iter().enumerate() {
            let weight = ext_weight[&w];
            rep_edges.push(HalfEdge {
                target: w,
                weight,
                reverse: rep_reverse[i],
            });
            self.vertices[w as usize].edges[rep_reverse[i] as usize].reverse = i as EdgeId;
            rep_degree += weight;
        }
        self.vertices[rep as usize].edges = rep_edges;
        self.vertices[rep as usize].weighted_degree = rep_degree;

        self.half_edges =
            self.half_edges - internal_half - 2 * external_half + 2 * ext_order.len();

        // Transfer contained vertices, then remove the absorbed slots.
        let mut rep = rep;
        for &mv in &members[1..] {
            let contained = std::mem::take(&mut self.vertices[mv as usize].contained);
            for original in &contained {
                self.position[original as usize] = rep;
            }
            self.vertices[rep as usize].contained |= contained;
        }
        let mut doomed: Vec<NodeId> = members[1..].to_vec();
        doomed.sort_unstable_by(|a, b| b.cmp(a));
        for slot in doomed {
            let old_last = self.vertices.len() as NodeId - 1;
            self.swap_remove_isolated(slot);
            if rep == old_last {
                rep = slot;
            }
        }
        Ok(rep)
    }

    /// Edges with exactly one endpoint inside `side`, as `(inside,
    /// outside)` pairs, plus their total weight.
    pub fn boundary_edges(&self, side: &RoaringBitmap) -> (Vec<(NodeId, NodeId)>, EdgeWeight) {
        let mut edges = Vec::new();
        let mut weight = 0;
        for v in side {
            for he in &self.vertices[v as usize].edges {
                if !side.contains(he.target) {
                    edges.push((v, he.target));
                    weight += he.weight;
                }
            }
        }
        (edges, weight)
    }

    /// Connected components: per-vertex component label plus the count.
    pub fn connected_components(&self) -> (Vec<u32>, usize) {
        let n = self.vertices.len();
        let mut component = vec![u32::MAX; n];
        let mut count = 0u32;
        let mut queue = std::collections::VecDeque::new();
        for start in 0..n {
            if component[start] != u32::MAX {
                continue;
            }
            component[start] = count;
            queue.push_back(start as NodeId);
            while let Some(v) = queue.pop_front() {
                for he in &self.vertices[v as usize].edges {
                    if component[he.target as usize] == u32::MAX {
                        component[he.target as usize] = count;
                        queue.push_back(he.target);
                    }
                }
            }
            count += 1;
        }
        (component, count as usize)
    }

    /// Remove the half-edge at `(v, idx)` with swap-and-pop, re-pointing
    /// the reverse index of whatever half-edge got moved into `idx`.
    /// Returns the moved half-edge, if any.
    fn pop_half_edge(&mut self, v: NodeId, idx: usize) -> Option<HalfEdge> {
        let last = self.vertices[v as usize].edges.len() - 1;
        let moved = if idx != last {
            self.vertices[v as usize].edges.swap(idx, last);
            let moved = self.vertices[v as usize].edges[idx];
            self.vertices[moved.target as usize].edges[moved.reverse as usize].reverse =
                idx as EdgeId;
            Some(moved)
        } else {
            None
        };
        self.vertices[v as usize].edges.pop();
        moved
    }

    /// Remove the isolated vertex at `slot`, moving the last vertex into
    /// its place and fixing every pointer at that vertex's neighbors.
    fn swap_remove_isolated(&mut self, slot: NodeId) {
        debug_assert!(self.vertices[slot as usize].edges.is_empty());
        let last = self.vertices.len() - 1;
        if (slot as usize) != last {
            let fixes: Vec<(NodeId, EdgeId)> = self.vertices[last]
                .edges
                .iter()
                .map(|he| (he.target, he.reverse))
                .collect();
            for (w, r) in fixes {
                self.vertices[w as usize].edges[r as usize].target = slot;
            }
            let Self {
                vertices, position, ..
            } = self;
            for original in &vertices[last].contained {
                position[original as usize] = slot;
            }
        }
        self.vertices.swap_remove(slot as usize);
    }
}
