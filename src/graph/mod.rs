mod filter;
mod load;
mod model;

pub use filter::{Subgraph, filter};
pub use load::{DatasetSource, demo_dataset, load_dataset};
pub use model::{
    DanglingEdge, Edge, Graph, GraphDataset, Node, NodeId, NodeIndex, ResolvedEdge, normalize,
};
