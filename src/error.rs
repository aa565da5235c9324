use crate::graph::NodeId;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("duplicate node id {0} in dataset")]
    DuplicateNodeId(NodeId),
    #[error("malformed dataset: {0}")]
    MalformedDataset(String),
    #[error("layout has a zero-area bounding box")]
    DegenerateLayout,
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("graph view has been torn down")]
    Detached,
}

impl GraphError {
    /// Errors that leave the previous dataset on screen instead of rendering a broken one.
    pub fn is_malformed_dataset(&self) -> bool {
        matches!(self, Self::DuplicateNodeId(_) | Self::MalformedDataset(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to parse scene SVG")]
    SvgParse,
    #[error("failed to allocate {width}x{height} pixmap for export")]
    PixmapAlloc { width: u32, height: u32 },
    #[error("failed to encode PNG")]
    PngEncode,
}

pub type Result<T> = std::result::Result<T, GraphError>;
