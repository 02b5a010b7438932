//! Structural validation of a workflow graph.
//!
//! Run this before persisting or executing a workflow. Validation is a pure
//! pass over the model: every applicable check runs so that all problems are
//! reported together.

use std::collections::{HashMap, HashSet};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::Bfs,
};
use serde::{Deserialize, Serialize};

use crate::{
    model::{EdgeModel, NodeModel, NodeType},
    runtime::INPUT_KEY,
};

/// Outcome of [`validate`]. Warnings alone do not make a graph invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Unvisited,
    InProgress,
    Done,
}

/// Validate nodes and edges of a workflow.
pub fn validate(
    nodes: &[NodeModel],
    edges: &[EdgeModel],
) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let mut seen = HashSet::new();
    for node in nodes {
        if !seen.insert(node.id.as_str()) {
            errors.push(format!("duplicate node id '{}'", node.id));
        }
        if node.id == INPUT_KEY {
            errors.push(format!("node id '{}' is reserved for the run input", INPUT_KEY));
        }
    }

    let starts: Vec<&NodeModel> = nodes.iter().filter(|n| n.node_type == NodeType::Start).collect();
    let ends = nodes.iter().filter(|n| n.node_type == NodeType::End).count();
    if starts.len() != 1 {
        errors.push(format!("workflow must contain exactly one start node, found {}", starts.len()));
    }
    if ends != 1 {
        errors.push(format!("workflow must contain exactly one end node, found {}", ends));
    }
    if starts.len() != 1 || ends != 1 {
        return ValidationResult {
            is_valid: false,
            errors,
            warnings,
        };
    }

    // First declaration wins for duplicated ids; the duplicate is already an error.
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    for node in nodes {
        if !index.contains_key(node.id.as_str()) {
            index.insert(node.id.as_str(), graph.add_node(node.id.as_str()));
        }
    }

    for edge in edges {
        let source = index.get(edge.source.as_str());
        let target = index.get(edge.target.as_str());
        if source.is_none() {
            errors.push(format!("edge '{}' references unknown source node '{}'", edge.id, edge.source));
        }
        if target.is_none() {
            errors.push(format!("edge '{}' references unknown target node '{}'", edge.id, edge.target));
        }
        if let (Some(s), Some(t)) = (source, target) {
            graph.add_edge(*s, *t, ());
        }
    }

    if let Some(node) = find_cycle(&graph) {
        errors.push(format!("graph must be acyclic: cycle detected at node '{}'", graph[node]));
    }

    let start = index[starts[0].id.as_str()];
    let mut reached = vec![false; graph.node_count()];
    let mut bfs = Bfs::new(&graph, start);
    while let Some(idx) = bfs.next(&graph) {
        reached[idx.index()] = true;
    }
    let unreachable: Vec<&str> = graph.node_indices().filter(|idx| !reached[idx.index()]).map(|idx| graph[idx]).collect();
    if !unreachable.is_empty() {
        warnings.push(format!("nodes unreachable from start: {}", unreachable.join(", ")));
    }

    let connected: HashSet<&str> = edges.iter().flat_map(|e| [e.source.as_str(), e.target.as_str()]).collect();
    let isolated: Vec<&str> = nodes
        .iter()
        .filter(|n| !matches!(n.node_type, NodeType::Start | NodeType::End) && !connected.contains(n.id.as_str()))
        .map(|n| n.id.as_str())
        .collect();
    if !isolated.is_empty() {
        warnings.push(format!("isolated nodes with no edges: {}", isolated.join(", ")));
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Three-colour depth-first search. Returns the node a back-edge points to.
fn find_cycle(graph: &DiGraph<&str, ()>) -> Option<NodeIndex> {
    struct Frame {
        node: NodeIndex,
        succs: Vec<NodeIndex>,
        next: usize,
    }

    let successors = |idx: NodeIndex| -> Vec<NodeIndex> { graph.neighbors_directed(idx, Direction::Outgoing).collect() };
    let mut color = vec![Color::Unvisited; graph.node_count()];

    for root in graph.node_indices() {
        if color[root.index()] != Color::Unvisited {
            continue;
        }
        color[root.index()] = Color::InProgress;
        let mut stack = vec![Frame {
            node: root,
            succs: successors(root),
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            if frame.next < frame.succs.len() {
                let succ = frame.succs[frame.next];
                frame.next += 1;
                match color[succ.index()] {
                    Color::InProgress => return Some(succ),
                    Color::Unvisited => {
                        color[succ.index()] = Color::InProgress;
                        stack.push(Frame {
                            node: succ,
                            succs: successors(succ),
                            next: 0,
                        });
                    }
                    Color::Done => {}
                }
            } else {
                color[frame.node.index()] = Color::Done;
                stack.pop();
            }
        }
    }

    None
}
