pub mod glb_writer;
pub mod mask;
pub mod report;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{LightmapError, Result};
use crate::types::IndexedMesh;

pub use report::{ChartReport, LayoutReport, MeshReport};

/// Output file paths for one mesh: `<stem>_<mesh>.glb` and `<stem>_<mesh>_mask.png`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshPaths {
    pub glb: PathBuf,
    pub mask: PathBuf,
}

impl MeshPaths {
    pub fn new(out_dir: &Path, stem: &str, mesh_name: &str) -> Self {
        Self {
            glb: out_dir.join(format!("{stem}_{mesh_name}.glb")),
            mask: out_dir.join(format!("{stem}_{mesh_name}_mask.png")),
        }
    }
}

/// Create the output directory if needed.
pub fn prepare_output_dir(out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir).map_err(|e| {
        LightmapError::Output(format!(
            "Failed to create output directory {}: {e}",
            out_dir.display()
        ))
    })
}

/// Serialize `mesh` and write it to `path`.
pub fn write_mesh_glb(mesh: &IndexedMesh, path: &Path) -> Result<()> {
    let glb_data = glb_writer::write_glb(mesh)?;
    fs::write(path, &glb_data)
        .map_err(|e| LightmapError::Output(format!("Failed to write {}: {e}", path.display())))?;
    debug!(path = %path.display(), bytes = glb_data.len(), "Wrote GLB");
    Ok(())
}
