//! Alteration dependency graph with topological sort.
//!
//! A variant of Kahn's algorithm that breaks ties by sequence number instead of a
//! priority queue, so that identical inputs always yield identical statement order.

use std::collections::HashMap;

use crate::alteration::{Alteration, NodeKey};

/// A directed acyclic graph of alterations.
pub struct Dag<T> {
    /// Nodes in sequence order; `None` once emitted.
    nodes: Vec<Option<T>>,
    /// node index -> indexes of the nodes it still waits for
    edges: Vec<Vec<usize>>,
}

impl<T: Alteration> Dag<T> {
    /// Build the graph. Nodes are stable-sorted by sequence number and only those
    /// dependencies that point at members of `nodes` are kept.
    pub fn build(mut nodes: Vec<T>) -> Self {
        nodes.sort_by_key(|n| n.seq_num());

        let mut index: HashMap<&NodeKey, usize> = HashMap::new();
        for (i, n) in nodes.iter().enumerate() {
            index.entry(n.key()).or_insert(i);
        }

        let edges: Vec<Vec<usize>> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let mut deps: Vec<usize> = n
                    .depends_on()
                    .iter()
                    .filter_map(|k| index.get(k).copied())
                    .filter(|&j| j != i)
                    .collect();
                deps.dedup();
                deps
            })
            .collect();

        Dag {
            nodes: nodes.into_iter().map(Some).collect(),
            edges,
        }
    }

    /// Emit every node after the nodes it depends on. When no remaining node is free
    /// (a cycle), the rest is appended in sequence order.
    pub fn sort(mut self) -> Vec<T> {
        let mut sorted = Vec::with_capacity(self.nodes.len());
        let mut remaining = self.nodes.len();

        while remaining > 0 {
            let head = (0..self.nodes.len())
                .find(|&i| self.nodes[i].is_some() && self.edges[i].is_empty());

            let Some(head) = head else {
                log::debug!(
                    "Unresolvable alteration dependencies, keeping sequence order; remaining={}",
                    remaining
                );
                sorted.extend(self.nodes.into_iter().flatten());
                break;
            };

            for deps in self.edges.iter_mut() {
                deps.retain(|&j| j != head);
            }
            if let Some(node) = self.nodes[head].take() {
                sorted.push(node);
            }
            remaining -= 1;
        }

        sorted
    }
}

/// Build and sort in one step.
pub fn sort_alterations<T: Alteration>(nodes: Vec<T>) -> Vec<T> {
    Dag::build(nodes).sort()
}
