//! Shortest upgrade path search and mandatory-intermediate expansion.
//!
//! Search is an unweighted breadth-first traversal: hop count is the only
//! criterion, and risk or downtime never influence which path is chosen.
//! Successors are visited in edge-insertion order, so when several shortest
//! paths exist the result is always the same one.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::PathError;
use crate::graph::ModelGraph;
use crate::models::VersionId;

/// One directed hop `(from, to)` of a path.
pub type Hop = (VersionId, VersionId);

/// Find the minimum-hop path from `from` to `to`.
///
/// Returns `Ok(Some(vec![]))` when `from == to`, and `Ok(None)` when `to` is
/// not reachable. Both ids must be nodes of `graph`.
pub fn find_path(
    graph: &ModelGraph,
    from: VersionId,
    to: VersionId,
) -> Result<Option<Vec<Hop>>, PathError> {
    check_endpoints(graph, from, to)?;
    if from == to {
        return Ok(Some(Vec::new()));
    }

    let mut predecessor: HashMap<VersionId, VersionId> = HashMap::new();
    let mut visited: HashSet<VersionId> = HashSet::from([from]);
    let mut queue: VecDeque<VersionId> = VecDeque::from([from]);

    while let Some(current) = queue.pop_front() {
        for &next in graph.successors(current) {
            if !visited.insert(next) {
                continue;
            }
            predecessor.insert(next, current);
            if next == to {
                return Ok(Some(unwind(&predecessor, from, to)));
            }
            queue.push_back(next);
        }
    }

    Ok(None)
}

/// Whether any directed route leads from `from` to `to`.
pub fn has_path(graph: &ModelGraph, from: VersionId, to: VersionId) -> Result<bool, PathError> {
    Ok(find_path(graph, from, to)?.is_some())
}

fn check_endpoints(graph: &ModelGraph, from: VersionId, to: VersionId) -> Result<(), PathError> {
    for id in [from, to] {
        if !graph.contains(id) {
            return Err(PathError::VersionNotInGraph(id));
        }
    }
    Ok(())
}

fn unwind(predecessor: &HashMap<VersionId, VersionId>, from: VersionId, to: VersionId) -> Vec<Hop> {
    let mut hops = Vec::new();
    let mut current = to;
    while current != from {
        let prev = predecessor[&current];
        hops.push((prev, current));
        current = prev;
    }
    hops.reverse();
    hops
}

/// Replace every hop whose edge lists mandatory intermediates
/// `[i1, .., ik]` with the chain `a→i1, i1→i2, .., ik→b`.
///
/// Hops without stored edge metadata pass through unchanged. Synthesized
/// hops are not checked against the graph.
pub fn expand_with_intermediates(graph: &ModelGraph, hops: &[Hop]) -> Vec<Hop> {
    let mut expanded = Vec::with_capacity(hops.len());
    for &(from, to) in hops {
        let intermediates = graph
            .edge(from, to)
            .map(|e| e.mandatory_intermediates.as_slice())
            .unwrap_or(&[]);

        let mut current = from;
        for &via in intermediates {
            expanded.push((current, via));
            current = via;
        }
        expanded.push((current, to));
    }
    expanded
}
