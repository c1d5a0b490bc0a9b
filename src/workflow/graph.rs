//! Action dependency graph: cycle detection, deterministic traversal order,
//! and ancestor computation.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};

use super::WorkflowDefinition;
use crate::error::HarnessError;

/// Directed graph over action indices; an edge runs from a predecessor to
/// the action that declared it in `run_after`.
#[derive(Debug)]
pub(crate) struct DependencyGraph {
    graph: DiGraph<usize, ()>,
    nodes: Vec<NodeIndex>,
}

impl DependencyGraph {
    pub fn new(definition: &WorkflowDefinition) -> Result<Self, HarnessError> {
        let mut graph = DiGraph::new();
        let mut nodes = Vec::with_capacity(definition.actions.len());
        let mut by_name: HashMap<&str, NodeIndex> = HashMap::new();

        for (index, action) in definition.actions.iter().enumerate() {
            let node = graph.add_node(index);
            nodes.push(node);
            by_name.insert(action.name.as_str(), node);
        }

        for action in &definition.actions {
            let target = by_name[action.name.as_str()];
            for dep in &action.run_after {
                let source = by_name.get(dep.step.as_str()).ok_or_else(|| {
                    HarnessError::definition(format!(
                        "action '{}' runs after unknown step '{}'",
                        action.name, dep.step
                    ))
                })?;
                graph.add_edge(*source, target, ());
            }
        }

        if toposort(&graph, None).is_err() {
            return Err(HarnessError::definition(format!(
                "dependency cycle in workflow '{}'",
                definition.name
            )));
        }

        Ok(Self { graph, nodes })
    }

    /// Topological order with declared order as the tie-break: among the
    /// actions whose predecessors have all been emitted, the lowest declared
    /// index goes first.
    pub fn traversal_order(&self) -> Vec<usize> {
        let count = self.nodes.len();
        let mut indegree: Vec<usize> = self
            .nodes
            .iter()
            .map(|&n| {
                self.graph
                    .neighbors_directed(n, petgraph::Direction::Incoming)
                    .count()
            })
            .collect();
        let mut emitted = vec![false; count];
        let mut order = Vec::with_capacity(count);

        while order.len() < count {
            let next = (0..count)
                .find(|&i| !emitted[i] && indegree[i] == 0)
                .expect("acyclic graph always has a ready node");
            emitted[next] = true;
            order.push(next);
            for neighbor in self.graph.neighbors(self.nodes[next]) {
                indegree[self.graph[neighbor]] -= 1;
            }
        }
        order
    }

    /// Transitive predecessors of the given action, as declared indices.
    pub fn ancestors(&self, action_index: usize) -> HashSet<usize> {
        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, self.nodes[action_index]);
        let mut ancestors = HashSet::new();
        while let Some(node) = dfs.next(reversed) {
            if node != self.nodes[action_index] {
                ancestors.insert(self.graph[node]);
            }
        }
        ancestors
    }
}
