pub mod allocator;
pub mod chart;
pub mod chart_finder;
pub mod disjoint_set;
pub mod overlap;
pub mod packer;
pub mod rasterizer;
pub mod scaler;

use glam::{Vec2, Vec3};
use tracing::debug;

use crate::config::LayoutConfig;
use crate::error::{LightmapError, Result};

pub use allocator::{Allocator2D, Rect};
pub use chart::MeshChart;
pub use disjoint_set::DisjointSet;
pub use overlap::{OverlappingCorners, POSITION_THRESHOLD};

/// Per-component tolerance for normals to be considered equal.
pub const NORMAL_THRESHOLD: f32 = 2e-5;

/// Triangle-list mesh as seen by the layout: three corners per triangle,
/// each with a position, a normal and any number of UV channels.
pub trait MeshView {
    fn corner_count(&self) -> usize;
    fn position(&self, corner: usize) -> Vec3;
    fn normal(&self, corner: usize) -> Vec3;
    fn uv_channel_count(&self) -> usize;
    fn uv(&self, channel: usize, corner: usize) -> Vec2;
    /// Grow (or shrink) the number of UV channels; new channels are zeroed.
    fn set_uv_channel_count(&mut self, count: usize);
    fn set_uv(&mut self, channel: usize, corner: usize, uv: Vec2);
}

/// One lightmap layout session over a mesh.
///
/// Typical use: [`find_charts`](Self::find_charts), then
/// [`find_best_packing`](Self::find_best_packing), then
/// [`commit_packed_uvs`](Self::commit_packed_uvs). The mesh is only written
/// on commit.
pub struct LayoutUv<'a, M: MeshView + ?Sized> {
    mesh: &'a mut M,
    config: LayoutConfig,

    /// Working copy of the source channel, one entry per corner
    tex_coords: Vec<Vec2>,
    /// Triangle permutation grouping each chart's triangles contiguously
    sorted_tris: Vec<u32>,
    charts: Vec<MeshChart>,
    total_uv_area: f32,

    layout_raster: Allocator2D,
    chart_raster: Allocator2D,
    best_chart_raster: Allocator2D,

    uv_scale: f32,
    packed: bool,
}

impl<'a, M: MeshView + ?Sized> LayoutUv<'a, M> {
    pub fn new(mesh: &'a mut M, config: &LayoutConfig) -> Result<Self> {
        let num_corners = mesh.corner_count();
        if num_corners % 3 != 0 {
            return Err(LightmapError::Validation(format!(
                "corner count {num_corners} is not a multiple of 3"
            )));
        }
        if config.resolution == 0 {
            return Err(LightmapError::Validation(
                "lightmap resolution must be at least 1".into(),
            ));
        }
        if config.src_channel >= mesh.uv_channel_count() {
            return Err(LightmapError::Input(format!(
                "source UV channel {} does not exist ({} channels)",
                config.src_channel,
                mesh.uv_channel_count()
            )));
        }

        let tex_coords = (0..num_corners)
            .map(|c| mesh.uv(config.src_channel, c))
            .collect();

        let res = config.resolution;
        Ok(Self {
            mesh,
            config: config.clone(),
            tex_coords,
            sorted_tris: Vec::new(),
            charts: Vec::new(),
            total_uv_area: 0.0,
            layout_raster: Allocator2D::new(res, res),
            chart_raster: Allocator2D::new(res, res),
            best_chart_raster: Allocator2D::new(res, res),
            uv_scale: 0.0,
            packed: false,
        })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn charts(&self) -> &[MeshChart] {
        &self.charts
    }

    /// Triangle indices of `chart`.
    pub fn chart_triangles(&self, chart: &MeshChart) -> &[u32] {
        &self.sorted_tris[chart.first_tri as usize..chart.last_tri as usize]
    }

    /// Atlas occupancy of the most recent packing attempt.
    pub fn layout_raster(&self) -> &Allocator2D {
        &self.layout_raster
    }

    /// Global scale of the last successful packing.
    pub fn uv_scale(&self) -> f32 {
        self.uv_scale
    }

    /// Sum over charts of UV area weighted by world scale.
    pub fn total_uv_area(&self) -> f32 {
        self.total_uv_area
    }

    pub fn is_packed(&self) -> bool {
        self.packed
    }

    /// Write the packed layout into the destination channel, normalized to `[0, 1]`.
    ///
    /// Chart state is left untouched, so committing again writes the same UVs.
    pub fn commit_packed_uvs(&mut self) -> Result<()> {
        if !self.packed {
            return Err(LightmapError::Layout(
                "no successful packing to commit".into(),
            ));
        }

        let dst = self.config.dst_channel;
        if self.mesh.uv_channel_count() <= dst {
            self.mesh.set_uv_channel_count(dst + 1);
        }

        let inv_res = 1.0 / self.config.resolution as f32;
        for chart in &self.charts {
            for &tri in &self.sorted_tris[chart.first_tri as usize..chart.last_tri as usize] {
                for k in 0..3 {
                    let corner = tri as usize * 3 + k;
                    let uv = chart.to_atlas(self.tex_coords[corner]) * inv_res;
                    self.mesh.set_uv(dst, corner, uv);
                }
            }
        }

        debug!(charts = self.charts.len(), channel = dst, "Committed packed UVs");
        Ok(())
    }
}

/// Component-wise equality within `eps`.
pub(crate) fn nearly_equal3(a: Vec3, b: Vec3, eps: f32) -> bool {
    (a - b).abs().max_element() <= eps
}

/// Component-wise equality within `eps`.
pub(crate) fn nearly_equal2(a: Vec2, b: Vec2, eps: f32) -> bool {
    (a - b).abs().max_element() <= eps
}
