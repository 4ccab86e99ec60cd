use glam::Vec2;

use super::{LayoutUv, MeshView};

/// Upper bound on relaxation passes.
const MAX_RELAX_ITERATIONS: usize = 1000;
/// Texel slack when testing a chart edge against the atlas edge.
const CHART_SIZE_EPSILON: f32 = 0.01;
/// Relaxation stops once the rebalancing multiplier is within 1%.
const MIN_REBALANCE: f32 = 1.01;

impl<M: MeshView + ?Sized> LayoutUv<'_, M> {
    /// Set every chart's texel scale for a global `uv_scale`, clamping charts
    /// that would not fit the atlas and redistributing their lost area, then
    /// order charts largest first.
    pub fn scale_charts(&mut self, uv_scale: f32) {
        for chart in &mut self.charts {
            chart.uv_scale = chart.world_scale * uv_scale;
        }

        let max_edge = self.config.resolution.saturating_sub(1) as f32;
        let num_charts = self.charts.len();
        let total_uv_area = self.total_uv_area;

        // Uniform: clamped charts keep their aspect ratio
        let mut multiplier = 1.0f32;
        for _ in 0..MAX_RELAX_ITERATIONS {
            let mut maxed_out = 0;
            let mut scaled_area = 0.0f32;

            for chart in &mut self.charts {
                let edge = (chart.size() * chart.uv_scale * multiplier).max_element();
                if edge + CHART_SIZE_EPSILON > max_edge {
                    chart.uv_scale *= multiplier * fit_factor(max_edge, edge);
                    maxed_out += 1;
                } else {
                    chart.uv_scale *= multiplier;
                }
                scaled_area += chart.uv_area * chart.uv_scale.x * chart.uv_scale.y;
            }

            if maxed_out == 0 || maxed_out == num_charts || scaled_area <= 0.0 {
                break;
            }
            multiplier = uv_scale * (total_uv_area / scaled_area).sqrt();
            if multiplier < MIN_REBALANCE {
                break;
            }
        }

        // Non-uniform: each axis clamps on its own
        let mut multiplier = 1.0f32;
        for _ in 0..MAX_RELAX_ITERATIONS {
            let mut maxed_out = 0;
            let mut scaled_area = 0.0f32;

            for chart in &mut self.charts {
                let edges = chart.size() * chart.uv_scale * multiplier;
                for axis in 0..2 {
                    if edges[axis] + CHART_SIZE_EPSILON > max_edge {
                        chart.uv_scale[axis] *= multiplier * fit_factor(max_edge, edges[axis]);
                        maxed_out += 1;
                    } else {
                        chart.uv_scale[axis] *= multiplier;
                    }
                }
                scaled_area += chart.uv_area * chart.uv_scale.x * chart.uv_scale.y;
            }

            if maxed_out == 0 || maxed_out == 2 * num_charts || scaled_area <= 0.0 {
                break;
            }
            multiplier = uv_scale * (total_uv_area / scaled_area).sqrt();
            if multiplier < MIN_REBALANCE {
                break;
            }
        }

        // Largest packing rect first; stable so ties keep creation order
        self.charts.sort_by(|a, b| {
            let area_a = rect_area(a.size(), a.uv_scale);
            let area_b = rect_area(b.size(), b.uv_scale);
            area_b.total_cmp(&area_a)
        });
    }
}

/// Factor that shrinks `edge` to `max_edge`.
fn fit_factor(max_edge: f32, edge: f32) -> f32 {
    if edge > 0.0 { max_edge / edge } else { 0.0 }
}

fn rect_area(size: Vec2, scale: Vec2) -> f32 {
    size.x * scale.x * size.y * scale.y
}
