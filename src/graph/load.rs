use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use super::model::{Edge, GraphDataset, Node};

#[derive(Clone, Debug)]
pub enum DatasetSource {
    Demo,
    File(PathBuf),
}

impl DatasetSource {
    pub fn describe(&self) -> String {
        match self {
            Self::Demo => "built-in demo graph".to_owned(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

pub fn load_dataset(source: &DatasetSource) -> Result<GraphDataset> {
    match source {
        DatasetSource::Demo => Ok(demo_dataset()),
        DatasetSource::File(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read dataset {}", path.display()))?;
            parse_dataset(&raw).with_context(|| format!("failed to parse {}", path.display()))
        }
    }
}

pub fn parse_dataset(raw: &str) -> Result<GraphDataset> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON in graph dataset")?;
    let object = parsed
        .as_object()
        .ok_or_else(|| anyhow!("graph dataset must be a JSON object with nodes and edges"))?;

    if !object.contains_key("nodes") {
        return Err(anyhow!("graph dataset has no \"nodes\" array"));
    }

    serde_json::from_value(parsed).context("graph dataset does not match the node/edge shape")
}

pub fn demo_dataset() -> GraphDataset {
    GraphDataset {
        nodes: vec![
            Node::new(1, "Alice").with_item_id("A").with_kind("Person"),
            Node::new(2, "Bob").with_item_id("B").with_kind("Person"),
            Node::new(3, "Acme, Inc.").with_item_id("C").with_kind("Company"),
            Node::new(4, "Widget").with_item_id("D").with_kind("Tool"),
            Node::new(5, "Vienna")
                .with_item_id("E")
                .with_kind("Location")
                .pinned_at(100.0, 50.0),
        ],
        edges: vec![
            Edge::new(1, 2, "knows"),
            Edge::new(2, 3, "works at"),
            Edge::new(1, 3, "investor"),
            Edge::new(3, 4, "produces"),
            Edge::new(1, 5, "lives in"),
            Edge::new(2, 5, "visits"),
        ],
    }
}
