use std::collections::HashMap;
use std::fmt;

use log::warn;
use serde::Deserialize;

use crate::error::{GraphError, Result};

pub type NodeIndex = usize;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    Int(i64),
    Str(String),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
        }
    }
}

impl From<i64> for NodeId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default, alias = "itemId")]
    pub item_id: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub label: String,
    /// Fixed layout position taken from the dataset; physics never moves it.
    #[serde(default, rename = "pos", alias = "pinnedPosition")]
    pub pinned_position: Option<[f32; 2]>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, label: &str) -> Self {
        Self {
            id: id.into(),
            item_id: String::new(),
            kind: String::new(),
            label: label.to_owned(),
            pinned_position: None,
        }
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = kind.to_owned();
        self
    }

    pub fn with_item_id(mut self, item_id: &str) -> Self {
        self.item_id = item_id.to_owned();
        self
    }

    pub fn pinned_at(mut self, x: f32, y: f32) -> Self {
        self.pinned_position = Some([x, y]);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default)]
    pub label: String,
}

impl Edge {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>, label: &str) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: label.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct GraphDataset {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// An edge whose endpoints point into [`Graph::nodes`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResolvedEdge {
    pub source: NodeIndex,
    pub target: NodeIndex,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DanglingEdge {
    pub edge: Edge,
    pub missing: NodeId,
}

impl fmt::Display for DanglingEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "edge {} -> {} ({:?}) references unknown node {}",
            self.edge.from, self.edge.to, self.edge.label, self.missing
        )
    }
}

#[derive(Clone, Debug, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<ResolvedEdge>,
    index_by_id: HashMap<NodeId, NodeIndex>,
}

impl Graph {
    pub fn index_of(&self, id: &NodeId) -> Option<NodeIndex> {
        self.index_by_id.get(id).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct Normalized {
    pub graph: Graph,
    pub dangling: Vec<DanglingEdge>,
}

/// Validates a dataset and resolves edge endpoints to node indices.
///
/// Duplicate node ids reject the whole dataset. Edges pointing at unknown ids
/// are dropped and reported in [`Normalized::dangling`].
pub fn normalize(dataset: GraphDataset) -> Result<Normalized> {
    let GraphDataset { nodes, edges } = dataset;

    let mut index_by_id = HashMap::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        if let Some([x, y]) = node.pinned_position
            && !(x.is_finite() && y.is_finite())
        {
            return Err(GraphError::MalformedDataset(format!(
                "node {} has a non-finite pinned position",
                node.id
            )));
        }
        if index_by_id.insert(node.id.clone(), index).is_some() {
            return Err(GraphError::DuplicateNodeId(node.id.clone()));
        }
    }

    let mut resolved = Vec::with_capacity(edges.len());
    let mut dangling = Vec::new();
    for edge in edges {
        match (index_by_id.get(&edge.from), index_by_id.get(&edge.to)) {
            (Some(&source), Some(&target)) => resolved.push(ResolvedEdge {
                source,
                target,
                label: edge.label,
            }),
            (None, _) => {
                let missing = edge.from.clone();
                dangling.push(DanglingEdge { edge, missing });
            }
            (_, None) => {
                let missing = edge.to.clone();
                dangling.push(DanglingEdge { edge, missing });
            }
        }
    }

    for issue in &dangling {
        warn!("dropping dangling {issue}");
    }

    Ok(Normalized {
        graph: Graph {
            nodes,
            edges: resolved,
            index_by_id,
        },
        dangling,
    })
}
