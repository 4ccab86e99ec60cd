use glam::Vec2;
use tracing::debug;

use super::allocator::Rect;
use super::chart::MeshChart;
use super::rasterizer::{DEFAULT_DILATION, rasterize_triangle};
use super::{LayoutUv, MeshView};

/// Four rotations, each optionally mirrored.
pub const ORIENTATION_COUNT: u32 = 8;
/// Halving steps allowed before giving up on finding any fitting scale.
const MAX_LINEAR_STEPS: usize = 32;
const BINARY_SEARCH_STEPS: usize = 6;

/// Set `chart`'s packing basis and bias for `orientation` (0..8) at its
/// current `uv_scale`.
///
/// Even orientations are rotations by `90 * orientation / 2` degrees, odd
/// ones the mirrored variant of the preceding rotation. The bias maps the
/// chart's bounding box onto `[0.5, 0.5 + extent]` so it sits half a texel
/// from the origin.
pub fn orient_chart(chart: &mut MeshChart, orientation: u32) {
    let s = chart.uv_scale;
    let (min, max) = (chart.min_uv, chart.max_uv);

    let (scale_u, scale_v, bias) = match orientation % ORIENTATION_COUNT {
        0 => (
            Vec2::new(s.x, 0.0),
            Vec2::new(0.0, s.y),
            Vec2::new(-min.x * s.x, -min.y * s.y),
        ),
        1 => (
            Vec2::new(-s.x, 0.0),
            Vec2::new(0.0, s.y),
            Vec2::new(max.x * s.x, -min.y * s.y),
        ),
        2 => (
            Vec2::new(0.0, -s.x),
            Vec2::new(s.y, 0.0),
            Vec2::new(-min.y * s.y, max.x * s.x),
        ),
        3 => (
            Vec2::new(0.0, s.x),
            Vec2::new(s.y, 0.0),
            Vec2::new(-min.y * s.y, -min.x * s.x),
        ),
        4 => (
            Vec2::new(-s.x, 0.0),
            Vec2::new(0.0, -s.y),
            Vec2::new(max.x * s.x, max.y * s.y),
        ),
        5 => (
            Vec2::new(s.x, 0.0),
            Vec2::new(0.0, -s.y),
            Vec2::new(-min.x * s.x, max.y * s.y),
        ),
        6 => (
            Vec2::new(0.0, s.x),
            Vec2::new(-s.y, 0.0),
            Vec2::new(max.y * s.y, -min.x * s.x),
        ),
        _ => (
            Vec2::new(0.0, -s.x),
            Vec2::new(-s.y, 0.0),
            Vec2::new(max.y * s.y, max.x * s.x),
        ),
    };

    chart.packing_scale_u = scale_u;
    chart.packing_scale_v = scale_v;
    chart.packing_bias = bias + Vec2::splat(0.5);
}

impl<M: MeshView + ?Sized> LayoutUv<'_, M> {
    /// Place every chart, largest first, at its best orientation. Returns
    /// false as soon as one chart fits nowhere.
    pub fn pack_charts(&mut self) -> bool {
        let res = self.config.resolution;
        let version = self.config.version;
        self.layout_raster.clear();

        for index in 0..self.charts.len() {
            let mut best = Rect::NONE;
            let mut best_orientation = None;

            for orientation in 0..ORIENTATION_COUNT {
                orient_chart(&mut self.charts[index], orientation);

                let mut rect = self.chart_rect(index);
                if version.flips_rasters() && orientation % 4 == 1 {
                    self.chart_raster.flip_x(&rect);
                } else if version.flips_rasters() && orientation % 4 == 3 {
                    self.chart_raster.flip_y(&rect);
                } else {
                    self.rasterize_chart(index, rect.w, rect.h);
                }

                let found = if version.uses_segments() {
                    self.layout_raster
                        .find_before(&mut rect, &self.chart_raster, &best)
                } else {
                    self.layout_raster.find_bit_by_bit(&mut rect, &self.chart_raster)
                };

                if found && rect.priority(res) < best.priority(res) {
                    best = rect;
                    best_orientation = Some(orientation);
                    self.best_chart_raster.clone_from(&self.chart_raster);
                    if best.x == 0 && best.y == 0 {
                        break;
                    }
                }
            }

            let Some(orientation) = best_orientation else {
                return false;
            };

            let chart = &mut self.charts[index];
            orient_chart(chart, orientation);
            chart.packing_bias += Vec2::new(best.x as f32, best.y as f32);
            self.layout_raster.alloc(&best, &self.best_chart_raster);
        }

        true
    }

    /// Search for the largest global scale at which every chart still packs,
    /// leaving the charts placed at that scale.
    ///
    /// Returns false without touching any state when there are more charts
    /// than texels or nothing has UV area.
    pub fn find_best_packing(&mut self) -> bool {
        let res = self.config.resolution;
        if self.charts.len() as u64 > res as u64 * res as u64 {
            return false;
        }
        if self.total_uv_area <= 0.0 || !self.total_uv_area.is_finite() {
            return false;
        }

        self.packed = false;
        let res = res as f32;
        let mut uv_scale_fail = res * (1.0 / self.total_uv_area).sqrt();
        let mut uv_scale_pass = res * (0.5 / self.total_uv_area).sqrt();

        // Halve until something fits
        let mut found = false;
        for step in 0..MAX_LINEAR_STEPS {
            self.scale_charts(uv_scale_pass);
            if self.pack_charts() {
                found = true;
                break;
            }
            debug!(step, scale = uv_scale_pass, "Packing failed, halving scale");
            uv_scale_fail = uv_scale_pass;
            uv_scale_pass *= 0.5;
        }
        if !found {
            return false;
        }

        for _ in 0..BINARY_SEARCH_STEPS {
            let scale = 0.5 * (uv_scale_fail + uv_scale_pass);
            self.scale_charts(scale);
            if self.pack_charts() {
                uv_scale_pass = scale;
            } else {
                uv_scale_fail = scale;
            }
        }

        // Leave the charts at the last passing scale
        self.scale_charts(uv_scale_pass);
        self.packed = self.pack_charts();
        self.uv_scale = uv_scale_pass;

        debug!(
            charts = self.charts.len(),
            scale = uv_scale_pass,
            packed = self.packed,
            "Scale search complete"
        );
        self.packed
    }

    /// Texel rectangle enclosing chart `index` in its current orientation.
    fn chart_rect(&self, index: usize) -> Rect {
        let res = self.config.resolution;
        let chart = &self.charts[index];
        let size = chart.size();
        let extent = size.x * chart.packing_scale_u + size.y * chart.packing_scale_v;

        let w = ((extent.x.abs() + 1.0).ceil() as u32).clamp(1, res);
        let h = ((extent.y.abs() + 1.0).ceil() as u32).clamp(1, res);
        Rect::new(w, h)
    }

    /// Rasterize chart `index`, dilated, into the scratch raster clipped to `width x height`.
    fn rasterize_chart(&mut self, index: usize, width: u32, height: u32) {
        self.chart_raster.clear();

        let chart = &self.charts[index];
        let raster = &mut self.chart_raster;
        for &tri in &self.sorted_tris[chart.first_tri as usize..chart.last_tri as usize] {
            let base = tri as usize * 3;
            let points = [
                chart.to_atlas(self.tex_coords[base]),
                chart.to_atlas(self.tex_coords[base + 1]),
                chart.to_atlas(self.tex_coords[base + 2]),
            ];
            rasterize_triangle(&points, width, height, DEFAULT_DILATION, |x, y| {
                raster.set_bit(x, y)
            });
        }
    }
}
