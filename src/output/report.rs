use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::LayoutConfig;
use crate::error::{LightmapError, Result};
use crate::layout::{LayoutUv, MeshView};

/// Contents of `layout.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutReport {
    pub generator: String,
    pub resolution: u32,
    pub src_channel: usize,
    pub dst_channel: usize,
    pub version: String,
    pub meshes: Vec<MeshReport>,
}

impl LayoutReport {
    pub fn new(config: &LayoutConfig, meshes: Vec<MeshReport>) -> Self {
        Self {
            generator: concat!("lightmap-packer ", env!("CARGO_PKG_VERSION")).to_string(),
            resolution: config.resolution,
            src_channel: config.src_channel,
            dst_channel: config.dst_channel,
            version: config.version.to_string(),
            meshes,
        }
    }

    pub fn packed_count(&self) -> usize {
        self.meshes.iter().filter(|m| m.packed).count()
    }
}

/// Layout outcome for one mesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshReport {
    pub name: String,
    pub triangles: usize,
    pub packed: bool,
    /// Texels per unit of world-scaled UV area
    pub uv_scale: f32,
    /// Fraction of atlas texels occupied by charts
    pub coverage: f32,
    pub charts: Vec<ChartReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl MeshReport {
    /// Summarize the current state of a layout session.
    pub fn from_layout<M: MeshView + ?Sized>(name: &str, layout: &LayoutUv<'_, M>) -> Self {
        let resolution = layout.config().resolution as f32;
        let raster = layout.layout_raster();

        let charts = layout
            .charts()
            .iter()
            .map(|chart| {
                let (min, max) = chart.atlas_bounds();
                ChartReport {
                    first_triangle: chart.first_tri,
                    triangle_count: chart.triangle_count(),
                    uv_area: chart.uv_area,
                    world_scale: chart.world_scale.to_array(),
                    atlas_min: (min / resolution).to_array(),
                    atlas_max: (max / resolution).to_array(),
                }
            })
            .collect::<Vec<_>>();

        let coverage = if layout.is_packed() {
            raster.count_set() as f32 / (raster.width() as f32 * raster.height() as f32)
        } else {
            0.0
        };

        Self {
            name: name.to_string(),
            triangles: charts.iter().map(|c| c.triangle_count).sum(),
            packed: layout.is_packed(),
            uv_scale: layout.uv_scale(),
            coverage,
            charts,
            skipped: None,
        }
    }

    /// Report for a mesh that never reached chart finding.
    pub fn skipped(name: &str, triangles: usize, reason: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            triangles,
            packed: false,
            uv_scale: 0.0,
            coverage: 0.0,
            charts: Vec::new(),
            skipped: Some(reason.into()),
        }
    }
}

/// One chart, with its atlas rectangle normalized to `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartReport {
    pub first_triangle: u32,
    pub triangle_count: usize,
    pub uv_area: f32,
    pub world_scale: [f32; 2],
    pub atlas_min: [f32; 2],
    pub atlas_max: [f32; 2],
}

/// Write `layout.json` into `out_dir` and return its path.
pub fn write_report(report: &LayoutReport, out_dir: &Path) -> Result<PathBuf> {
    let path = out_dir.join("layout.json");
    let json_string = serde_json::to_string_pretty(report)
        .map_err(|e| LightmapError::Output(format!("Failed to serialize layout.json: {e}")))?;

    fs::write(&path, &json_string)
        .map_err(|e| LightmapError::Output(format!("Failed to write layout.json: {e}")))?;

    info!(
        meshes = report.meshes.len(),
        packed = report.packed_count(),
        path = %path.display(),
        "Wrote layout.json"
    );

    Ok(path)
}
