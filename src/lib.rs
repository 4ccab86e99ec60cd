pub mod config;
pub mod error;
pub mod ingestion;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod types;

pub use config::{LayoutConfig, LayoutVersion, PipelineConfig};
pub use error::{LightmapError, Result};
pub use layout::{LayoutUv, MeshView, OverlappingCorners};
pub use pipeline::Pipeline;
pub use types::IndexedMesh;
