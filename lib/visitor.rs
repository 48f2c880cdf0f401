//! Dependency-ordered traversal of node graphs.
//!
//! Guard and statement graphs are DAGs. A node may be reachable from the root
//! through several paths, but is visited exactly once per traversal.

use crate::model::{Node, NodeTarget};
use crate::Error;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Every node reachable from `root`, ordered so each node comes after all of
/// its sources. `root` is always last.
///
/// Nodes are numbered by their maximum distance from `root`, and returned in
/// decreasing order of that distance. The traversal uses an explicit stack,
/// so deep graphs do not exhaust the call stack.
pub fn precedes(root: &Node) -> Vec<Node> {
    // Discover every distinct node, and count the edges into it.
    let mut index: FxHashMap<Node, usize> = FxHashMap::default();
    let mut nodes: Vec<Node> = vec![root.clone()];
    let mut in_degree: Vec<usize> = vec![0];
    index.insert(root.clone(), 0);

    let mut stack = vec![0];
    while let Some(i) = stack.pop() {
        let node = nodes[i].clone();
        for (_, source) in node.sources() {
            match index.get(source) {
                Some(&j) => in_degree[j] += 1,
                None => {
                    let j = nodes.len();
                    index.insert(source.clone(), j);
                    nodes.push(source.clone());
                    in_degree.push(1);
                    stack.push(j);
                }
            }
        }
    }

    // Longest distance from the root, in topological order from the root.
    let mut distance: Vec<usize> = vec![0; nodes.len()];
    let mut ready = vec![0];
    while let Some(i) = ready.pop() {
        for (_, source) in nodes[i].sources() {
            let j = index[source];
            distance[j] = distance[j].max(distance[i] + 1);
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.push(j);
            }
        }
    }

    let mut order: Vec<usize> = (0..nodes.len()).collect();
    order.sort_by(|a, b| distance[*b].cmp(&distance[*a]));
    order.into_iter().map(|i| nodes[i].clone()).collect()
}

/// Compute a value for `root` from the values of its sources.
///
/// Variable leaves take their values from `initial`. Every other node reachable
/// from `root` is passed to `callback` once, together with the values of its
/// sources in source order, and the value `callback` returns is the value of
/// that node.
///
/// A variable missing from `initial` means the graph is malformed.
pub fn visit<T, F>(root: &Node, initial: &BTreeMap<String, T>, mut callback: F) -> Result<T, Error>
where
    T: Clone,
    F: FnMut(&Node, Vec<T>) -> Result<T, Error>,
{
    let mut results: FxHashMap<Node, T> = FxHashMap::default();

    for node in precedes(root) {
        let result = match *node.target() {
            NodeTarget::Variable(ref name) => initial
                .get(name)
                .cloned()
                .ok_or_else(|| Error::malformed(&node, format!("variable {} is not bound", name)))?,
            _ => {
                let sources = node
                    .sources()
                    .iter()
                    .map(|(name, source)| {
                        results.get(source).cloned().ok_or_else(|| {
                            Error::malformed(&node, format!("source {} was not computed", name))
                        })
                    })
                    .collect::<Result<Vec<T>, Error>>()?;
                callback(&node, sources)?
            }
        };
        results.insert(node, result);
    }

    results
        .remove(root)
        .ok_or_else(|| Error::malformed(root, "root was not computed"))
}
