use std::collections::HashSet;

use super::model::{Graph, Node, NodeIndex, ResolvedEdge};
use crate::util::contains_ignore_case;

/// The part of a [`Graph`] that survives the current filter query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Subgraph {
    pub nodes: Vec<NodeIndex>,
    pub edges: Vec<ResolvedEdge>,
}

impl Subgraph {
    pub fn full(graph: &Graph) -> Self {
        Self {
            nodes: (0..graph.node_count()).collect(),
            edges: graph.edges.clone(),
        }
    }

    pub fn contains_node(&self, index: NodeIndex) -> bool {
        self.nodes.contains(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn node_matches(node: &Node, query: &str) -> bool {
    [&node.label, &node.kind, &node.item_id]
        .into_iter()
        .any(|field| contains_ignore_case(field, query))
}

pub fn filter(graph: &Graph, query: &str) -> Subgraph {
    filter_subgraph(graph, &Subgraph::full(graph), query)
}

/// Narrows `subset` to the nodes and edges matching `query`.
///
/// Nodes match on label, type or item id. Edges match on their label or on a
/// matched endpoint, but only label matches pull their endpoints into view;
/// any edge left with an invisible endpoint is dropped afterwards.
pub fn filter_subgraph(graph: &Graph, subset: &Subgraph, query: &str) -> Subgraph {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return subset.clone();
    }

    let matched = subset
        .nodes
        .iter()
        .copied()
        .filter(|&index| {
            graph
                .nodes
                .get(index)
                .is_some_and(|node| node_matches(node, &query))
        })
        .collect::<HashSet<_>>();

    let mut pulled_in = HashSet::new();
    let mut matched_edges = Vec::new();
    for edge in &subset.edges {
        let label_match = contains_ignore_case(&edge.label, &query);
        if label_match {
            pulled_in.insert(edge.source);
            pulled_in.insert(edge.target);
        }
        if label_match || matched.contains(&edge.source) || matched.contains(&edge.target) {
            matched_edges.push(edge);
        }
    }

    let nodes = subset
        .nodes
        .iter()
        .copied()
        .filter(|index| matched.contains(index) || pulled_in.contains(index))
        .collect::<Vec<_>>();

    let visible = nodes.iter().copied().collect::<HashSet<_>>();
    let edges = matched_edges
        .into_iter()
        .filter(|edge| visible.contains(&edge.source) && visible.contains(&edge.target))
        .cloned()
        .collect();

    Subgraph { nodes, edges }
}
