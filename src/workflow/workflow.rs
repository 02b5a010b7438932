//! Runtime workflow representation using a directed graph.
//!
//! This module wraps the workflow model in a petgraph structure for
//! ordering and inbound-edge lookups. The graph is immutable once built;
//! all per-run state lives in the execution context.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};

use crate::{
    DagflowError, Result, WorkflowModel,
    model::{NodeModel, NodeType},
    workflow::{edge::Edge, node::NodeId},
};

/// Runtime workflow representation as a directed graph.
///
/// Node indices follow declaration order, which is what the topological
/// sort uses to break ties.
#[derive(Debug, Clone)]
pub struct Workflow {
    graph: DiGraph<NodeModel, Edge>,
    index: HashMap<NodeId, NodeIndex>,
}

impl Workflow {
    /// get node by id
    pub fn get_node(
        &self,
        id: &str,
    ) -> Option<&NodeModel> {
        self.index.get(id).map(|idx| &self.graph[*idx])
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeModel> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    /// The first node of the given type.
    pub fn find_by_type(
        &self,
        node_type: NodeType,
    ) -> Option<&NodeModel> {
        self.nodes().find(|n| n.node_type == node_type)
    }

    /// Edges pointing at `nid`, in declaration order.
    pub fn incoming_edges(
        &self,
        nid: &str,
    ) -> Vec<&Edge> {
        let Some(idx) = self.index.get(nid) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self.graph.edges_directed(*idx, Direction::Incoming).collect();
        edges.sort_by_key(|e| e.id());
        edges.into_iter().map(|e| e.weight()).collect()
    }

    /// Topological order computed with Kahn's algorithm.
    ///
    /// Among nodes that are ready at the same time, the one declared first is
    /// released first, so the order is a pure function of the graph.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        let graph = &self.graph;
        let mut in_degree: Vec<usize> = graph.node_indices().map(|idx| graph.edges_directed(idx, Direction::Incoming).count()).collect();

        let mut ready: BinaryHeap<Reverse<NodeIndex>> = graph.node_indices().filter(|idx| in_degree[idx.index()] == 0).map(Reverse).collect();
        let mut sorted = Vec::with_capacity(graph.node_count());

        while let Some(Reverse(idx)) = ready.pop() {
            sorted.push(graph[idx].id.clone());

            for edge in graph.edges_directed(idx, Direction::Outgoing) {
                let target = edge.target();
                in_degree[target.index()] -= 1;
                if in_degree[target.index()] == 0 {
                    ready.push(Reverse(target));
                }
            }
        }

        if sorted.len() != graph.node_count() {
            return Err(DagflowError::Workflow("graph must be acyclic: topological sort did not visit every node".to_string()));
        }

        Ok(sorted)
    }
}

impl TryFrom<&WorkflowModel> for Workflow {
    type Error = DagflowError;

    fn try_from(model: &WorkflowModel) -> Result<Self> {
        let mut graph: DiGraph<NodeModel, Edge> = DiGraph::new();
        let mut index = HashMap::new();

        for node in model.nodes.iter() {
            if index.contains_key(&node.id) {
                return Err(DagflowError::Workflow(format!("duplicate node id '{}'", node.id)));
            }
            let idx = graph.add_node(node.clone());
            index.insert(node.id.clone(), idx);
        }
        for edge in model.edges.iter() {
            let source = index.get(&edge.source).ok_or(DagflowError::Workflow(format!("source node {} not found", edge.source)))?;
            let target = index.get(&edge.target).ok_or(DagflowError::Workflow(format!("target node {} not found", edge.target)))?;
            graph.add_edge(*source, *target, Edge::from(edge));
        }

        Ok(Self {
            graph,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{EdgeCondition, EdgeModel};

    fn node(
        id: &str,
        node_type: NodeType,
    ) -> NodeModel {
        NodeModel::new(id, node_type, json!({}))
    }

    fn edge(
        source: &str,
        target: &str,
    ) -> EdgeModel {
        EdgeModel::new(format!("{}-{}", source, target), source, target)
    }

    fn position(
        order: &[NodeId],
        id: &str,
    ) -> usize {
        order.iter().position(|n| n == id).unwrap()
    }

    #[test]
    fn test_linear_order() {
        let model = WorkflowModel::new(
            vec![node("end", NodeType::End), node("a", NodeType::String), node("start", NodeType::Start)],
            vec![edge("start", "a"), edge("a", "end")],
        );
        let wf = Workflow::try_from(&model).unwrap();
        assert_eq!(wf.topological_order().unwrap(), vec!["start", "a", "end"]);
    }

    #[test]
    fn test_ties_follow_declaration_order() {
        // start fans out to c, b, a (declared a, b, c)
        let model = WorkflowModel::new(
            vec![
                node("start", NodeType::Start),
                node("a", NodeType::String),
                node("b", NodeType::String),
                node("c", NodeType::String),
                node("end", NodeType::End),
            ],
            vec![edge("start", "c"), edge("start", "b"), edge("start", "a"), edge("a", "end"), edge("b", "end"), edge("c", "end")],
        );
        let wf = Workflow::try_from(&model).unwrap();
        assert_eq!(wf.topological_order().unwrap(), vec!["start", "a", "b", "c", "end"]);
    }

    #[test]
    fn test_order_is_linearization() {
        let model = WorkflowModel::new(
            vec![
                node("d", NodeType::String),
                node("start", NodeType::Start),
                node("b", NodeType::Http),
                node("end", NodeType::End),
                node("c", NodeType::Intent),
            ],
            vec![edge("start", "c"), edge("c", "b"), edge("b", "d"), edge("c", "d"), edge("d", "end")],
        );
        let wf = Workflow::try_from(&model).unwrap();
        let order = wf.topological_order().unwrap();
        for e in &model.edges {
            assert!(position(&order, &e.source) < position(&order, &e.target), "{} before {}", e.source, e.target);
        }
    }

    #[test]
    fn test_cycle_fails_ordering() {
        let model = WorkflowModel::new(
            vec![node("start", NodeType::Start), node("a", NodeType::String), node("b", NodeType::String)],
            vec![edge("start", "a"), edge("a", "b"), edge("b", "a")],
        );
        let wf = Workflow::try_from(&model).unwrap();
        let err = wf.topological_order().unwrap_err();
        assert!(err.to_string().contains("acyclic"));
    }

    #[test]
    fn test_duplicate_edges_count_towards_in_degree() {
        let model = WorkflowModel::new(
            vec![node("start", NodeType::Start), node("a", NodeType::String), node("end", NodeType::End)],
            vec![edge("start", "a"), EdgeModel::new("dup", "start", "a"), edge("a", "end")],
        );
        let wf = Workflow::try_from(&model).unwrap();
        assert_eq!(wf.topological_order().unwrap(), vec!["start", "a", "end"]);
        assert_eq!(wf.incoming_edges("a").len(), 2);
    }

    #[test]
    fn test_incoming_edges_keep_conditions() {
        let model = WorkflowModel::new(
            vec![node("start", NodeType::Start), node("end", NodeType::End)],
            vec![edge("start", "end").with_condition(EdgeCondition::always())],
        );
        let wf = Workflow::try_from(&model).unwrap();
        let incoming = wf.incoming_edges("end");
        assert_eq!(incoming.len(), 1);
        assert!(incoming[0].is_conditional());
        assert!(wf.incoming_edges("start").is_empty());
        assert!(wf.incoming_edges("ghost").is_empty());
    }

    #[test]
    fn test_dangling_edge_is_rejected() {
        let model = WorkflowModel::new(vec![node("start", NodeType::Start)], vec![edge("start", "ghost")]);
        assert!(Workflow::try_from(&model).is_err());
    }
}
