//! METIS-style graph reader
//!
//! Format: a header line `n m [fmt]`, then one line per vertex listing its
//! 1-indexed neighbors. `fmt` 1 interleaves an edge weight after each
//! neighbor; `fmt` 10 prefixes each line with a node weight (ignored
//! here); `fmt` 11 does both. Lines starting with `%` are comments.

use std::path::Path;

use crate::error::{MulticutError, Result};
use crate::graph::{EdgeWeight, MutableGraph, NodeId};

/// Read a METIS graph file from disk.
pub fn read_graph<P: AsRef<Path>>(path: P) -> Result<MutableGraph> {
    let contents = std::fs::read_to_string(path)?;
    parse_graph(&contents)
}

/// Parse a METIS graph from a string.
pub fn parse_graph(input: &str) -> Result<MutableGraph> {
    let mut lines = input.lines().filter(|l| !l.trim_start().starts_with('%'));

    let header = lines
        .next()
        .ok_or_else(|| MulticutError::InvalidInput("empty graph file".into()))?;
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() < 2 {
        return Err(MulticutError::InvalidInput(format!(
            "malformed header line: '{header}'"
        )));
    }
    let n: usize = parse_number(fields[0], "vertex count")?;
    let m: usize = parse_number(fields[1], "edge count")?;
    let fmt = fields.get(2).copied().unwrap_or("0");
    let (node_weights, edge_weights) = match fmt {
        "0" | "00" => (false, false),
        "1" | "01" => (false, true),
        "10" => (true, false),
        "11" => (true, true),
        other => {
            return Err(MulticutError::InvalidInput(format!(
                "unsupported format code '{other}'"
            )))
        }
    };

    let mut graph = MutableGraph::new(n);
    let mut seen_edges = 0usize;

    for u in 0..n {
        let line = lines.next().ok_or_else(|| {
            MulticutError::InvalidInput(format!("expected {n} vertex lines, found {u}"))
        })?;
        let mut tokens = line.split_whitespace();
        if node_weights {
            tokens.next(); // node weight, unused
        }
        loop {
            let Some(tok) = tokens.next() else { break };
            let neighbor: usize = parse_number(tok, "neighbor")?;
            if neighbor < 1 || neighbor > n {
                return Err(MulticutError::InvalidInput(format!(
                    "neighbor {neighbor} of vertex {} out of range 1..={n}",
                    u + 1
                )));
            }
            let v = (neighbor - 1) as NodeId;
            let weight: EdgeWeight = if edge_weights {
                let wtok = tokens.next().ok_or_else(|| {
                    MulticutError::InvalidInput(format!(
                        "missing edge weight after neighbor {neighbor} of vertex {}",
                        u + 1
                    ))
                })?;
                parse_number(wtok, "edge weight")?
            } else {
                1
            };
            // Each undirected edge appears on both endpoint lines; insert
            // it when scanning the lower endpoint.
            if (u as NodeId) < v {
                graph.new_edge(u as NodeId, v, weight)?;
                seen_edges += 1;
            } else if v == u as NodeId {
                return Err(MulticutError::SelfLoop(v));
            }
        }
    }

    if seen_edges != m {
        return Err(MulticutError::InvalidInput(format!(
            "header announces {m} edges but {seen_edges} were listed"
        )));
    }
    Ok(graph)
}

fn parse_number<T: std::str::FromStr>(token: &str, what: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| MulticutError::InvalidInput(format!("invalid {what}: '{token}'")))
}
