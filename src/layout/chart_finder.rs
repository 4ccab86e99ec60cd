use std::time::Instant;

use glam::Vec2;
use tracing::debug;

use super::chart::{MeshChart, SIDES, axis_sides, is_min_side, opposite_side};
use super::disjoint_set::DisjointSet;
use super::overlap::{OverlappingCorners, POSITION_THRESHOLD};
use super::{LayoutUv, MeshView, NORMAL_THRESHOLD, nearly_equal2, nearly_equal3};
use crate::error::{LightmapError, Result};

/// UV areas at or below this are treated as degenerate.
const MIN_UV_AREA: f32 = 1e-8;

/// Corner after `corner` in its triangle.
fn next_corner(corner: usize) -> usize {
    corner - corner % 3 + (corner + 1) % 3
}

/// Corner before `corner` in its triangle.
fn prev_corner(corner: usize) -> usize {
    corner - corner % 3 + (corner + 2) % 3
}

/// Triangle connectivity gathered from overlapping corners.
struct EdgeMatches {
    set: DisjointSet,
    /// Corner on the far side of a border whose UVs differ by a translation
    translated: Vec<Option<usize>>,
    unions: usize,
    candidates: usize,
}

impl<M: MeshView + ?Sized> LayoutUv<'_, M> {
    /// Group triangles into charts and, for versions that join charts, merge
    /// charts whose straight borders line up. Returns the chart count.
    pub fn find_charts(&mut self, overlaps: &OverlappingCorners) -> Result<usize> {
        let start = Instant::now();
        let num_corners = self.tex_coords.len();

        if overlaps.corner_count() != num_corners {
            return Err(LightmapError::Validation(format!(
                "overlap map covers {} corners, mesh has {}",
                overlaps.corner_count(),
                num_corners
            )));
        }

        self.packed = false;
        let mut matches = self.match_edges(overlaps);
        self.build_charts(&mut matches.set);

        let found = self.charts.len();
        if self.config.version.joins_charts() && matches.candidates > 0 {
            self.join_charts(&matches.translated);
        }

        self.strip_empty_charts();
        self.total_uv_area = 0.0;
        for chart in &mut self.charts {
            if chart.uv_area > MIN_UV_AREA {
                chart.world_scale /= chart.uv_area.max(MIN_UV_AREA);
            } else {
                chart.world_scale = Vec2::ZERO;
            }
            self.total_uv_area += chart.uv_area * chart.world_scale.x * chart.world_scale.y;
        }

        debug!(
            triangles = num_corners / 3,
            unions = matches.unions,
            candidates = matches.candidates,
            found,
            charts = self.charts.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Found charts"
        );

        Ok(self.charts.len())
    }

    /// Union triangles across edges with matching UVs and record translated
    /// border matches.
    fn match_edges(&self, overlaps: &OverlappingCorners) -> EdgeMatches {
        let num_corners = self.tex_coords.len();
        let version = self.config.version;
        let uv_eps = version.uv_epsilon();
        let joins_charts = version.joins_charts();

        let mut matches = EdgeMatches {
            set: DisjointSet::new(num_corners / 3),
            translated: vec![None; num_corners],
            unions: 0,
            candidates: 0,
        };

        for i in 0..num_corners {
            let tri_i = i / 3;
            let (i1, i2) = (next_corner(i), prev_corner(i));

            for &j in overlaps.overlapping(i) {
                let tri_j = j / 3;
                if j <= i || tri_j == tri_i {
                    continue;
                }
                if !self.positions_match(i, j) {
                    continue;
                }

                let (j1, j2) = (next_corner(j), prev_corner(j));
                let (ie, je) = if self.positions_match(i2, j1) {
                    (i2, j1)
                } else if self.positions_match(i1, j2) {
                    (i1, j2)
                } else {
                    continue;
                };

                let uvs_match = nearly_equal2(self.tex_coords[i], self.tex_coords[j], uv_eps)
                    && nearly_equal2(self.tex_coords[ie], self.tex_coords[je], uv_eps);

                if uvs_match {
                    // Mirrored neighbors stay in separate charts
                    if self.uv_winding(tri_i) * self.uv_winding(tri_j) >= 0.0 {
                        matches.set.union(tri_i, tri_j);
                        matches.unions += 1;
                    }
                } else if joins_charts
                    && self.normals_match(i, j)
                    && self.normals_match(ie, je)
                {
                    let edge_i = self.tex_coords[ie] - self.tex_coords[i];
                    let edge_j = self.tex_coords[je] - self.tex_coords[j];
                    if nearly_equal2(edge_i, edge_j, uv_eps) {
                        let translated = &mut matches.translated;
                        translated[i] = Some(j);
                        translated[j] = Some(i);
                        translated[ie] = Some(je);
                        translated[je] = Some(ie);
                        matches.candidates += 1;
                    }
                }
            }
        }

        matches
    }

    /// One chart per disjoint set, triangles grouped contiguously in `sorted_tris`.
    fn build_charts(&mut self, set: &mut DisjointSet) {
        let num_tris = self.tex_coords.len() / 3;

        // Flatten so `root` is the representative, then group by it
        for tri in 0..num_tris {
            set.find(tri);
        }
        let mut sorted_tris: Vec<u32> = (0..num_tris as u32).collect();
        sorted_tris.sort_unstable_by_key(|&tri| (set.root(tri as usize), tri));
        self.sorted_tris = sorted_tris;

        let mut charts = Vec::new();
        let mut first = 0;
        while first < num_tris {
            let root = set.root(self.sorted_tris[first] as usize);
            let mut chart = MeshChart::new(first as u32);
            let mut last = first;
            while last < num_tris && set.root(self.sorted_tris[last] as usize) == root {
                self.accumulate_triangle(&mut chart, self.sorted_tris[last] as usize);
                last += 1;
            }
            chart.last_tri = last as u32;
            charts.push(chart);
            first = last;
        }
        self.charts = charts;
    }

    /// Drop charts emptied by joining and renumber the join links of the rest.
    fn strip_empty_charts(&mut self) {
        let mut renumbered = Vec::with_capacity(self.charts.len());
        let mut kept = 0;
        for chart in &self.charts {
            if chart.is_empty() {
                renumbered.push(None);
            } else {
                renumbered.push(Some(kept));
                kept += 1;
            }
        }

        self.charts.retain(|chart| !chart.is_empty());
        for chart in &mut self.charts {
            for link in &mut chart.join {
                *link = link.and_then(|target| renumbered[target]);
            }
        }
    }

    fn positions_match(&self, a: usize, b: usize) -> bool {
        nearly_equal3(
            self.mesh.position(a),
            self.mesh.position(b),
            POSITION_THRESHOLD,
        )
    }

    fn normals_match(&self, a: usize, b: usize) -> bool {
        nearly_equal3(self.mesh.normal(a), self.mesh.normal(b), NORMAL_THRESHOLD)
    }

    /// Signed UV-space area (times two) of triangle `tri`.
    fn uv_winding(&self, tri: usize) -> f32 {
        let uv0 = self.tex_coords[tri * 3];
        let uv1 = self.tex_coords[tri * 3 + 1];
        let uv2 = self.tex_coords[tri * 3 + 2];
        (uv1 - uv0).perp_dot(uv2 - uv0)
    }

    fn accumulate_triangle(&self, chart: &mut MeshChart, tri: usize) {
        let base = tri * 3;
        let uv = [
            self.tex_coords[base],
            self.tex_coords[base + 1],
            self.tex_coords[base + 2],
        ];
        for &corner_uv in &uv {
            chart.include(corner_uv);
        }

        let p0 = self.mesh.position(base);
        let edge1 = self.mesh.position(base + 1) - p0;
        let edge2 = self.mesh.position(base + 2) - p0;

        let uv_edge1 = uv[1] - uv[0];
        let uv_edge2 = uv[2] - uv[0];
        let uv_area = 0.5 * uv_edge1.perp_dot(uv_edge2).abs();
        if !uv_area.is_finite() || uv_area <= MIN_UV_AREA {
            return;
        }

        // World-space edge length per UV unit, weighted by UV area
        let length_u = (uv_edge2.y * edge1 - uv_edge1.y * edge2).length();
        let length_v = (-uv_edge2.x * edge1 + uv_edge1.x * edge2).length();
        let contribution = 0.5 * Vec2::new(length_u, length_v);
        if contribution.is_nan() {
            return;
        }

        chart.world_scale += contribution;
        chart.uv_area += uv_area;
    }

    /// Link charts across straight, congruent borders and fold each chain of
    /// linked charts into its first chart.
    fn join_charts(&mut self, translated: &[Option<usize>]) {
        let links = self.link_borders(translated);
        if links == 0 {
            return;
        }

        let mut merged = 0usize;
        for axis in 0..2 {
            let touched = self.walk_chains(axis);
            merged += touched.iter().filter(|&&t| t).count();

            // Bounds of every chart involved changed, so their links are stale
            for (chart, &was_touched) in touched.iter().enumerate() {
                if was_touched {
                    for side in SIDES {
                        self.unlink(chart, side);
                    }
                }
            }
        }

        debug!(links, merged, "Joined chart borders");
    }

    /// Record reciprocal join links for every translated border match, then
    /// break 2-cycles. Returns the number of links made.
    fn link_borders(&mut self, translated: &[Option<usize>]) -> usize {
        let uv_eps = self.config.version.uv_epsilon();
        let num_charts = self.charts.len();

        let mut chart_of_tri = vec![0usize; self.sorted_tris.len()];
        for (index, chart) in self.charts.iter().enumerate() {
            for &tri in &self.sorted_tris[chart.first_tri as usize..chart.last_tri as usize] {
                chart_of_tri[tri as usize] = index;
            }
        }

        let mut links = 0usize;
        for a in 0..num_charts {
            let (first, last) = (self.charts[a].first_tri, self.charts[a].last_tri);
            for sorted in first..last {
                let tri = self.sorted_tris[sorted as usize] as usize;
                for k in 0..3 {
                    let i = tri * 3 + k;
                    let Some(j) = translated[i] else {
                        continue;
                    };
                    let b = chart_of_tri[j / 3];
                    if b == a {
                        continue;
                    }

                    // Partner corners of the matched edge
                    let partners = [
                        (prev_corner(i), next_corner(j)),
                        (next_corner(i), prev_corner(j)),
                    ];
                    for (ie, je) in partners {
                        if translated[ie] != Some(je) {
                            continue;
                        }
                        for side in SIDES {
                            if self.can_join(a, b, side, [i, j, ie], uv_eps) {
                                self.charts[a].join[side] = Some(b);
                                self.charts[b].join[opposite_side(side)] = Some(a);
                                links += 1;
                            }
                        }
                    }
                }
            }
        }

        // Break 2-cycles: a chart joined to the same neighbor on both sides of an axis
        for a in 0..num_charts {
            for axis in 0..2 {
                let (lo, hi) = axis_sides(axis);
                if let Some(b) = self.charts[a].join[lo]
                    && self.charts[a].join[hi] == Some(b)
                {
                    self.unlink(a, lo);
                }
            }
        }

        links
    }

    /// Whether chart `b` can be attached to side `side` of chart `a` through
    /// the translated corner match `i -> j` with edge partner `ie`.
    fn can_join(
        &self,
        a: usize,
        b: usize,
        side: usize,
        [i, j, ie]: [usize; 3],
        eps: f32,
    ) -> bool {
        let chart_a = &self.charts[a];
        let chart_b = &self.charts[b];
        if chart_a.join[side].is_some() || chart_b.join[opposite_side(side)].is_some() {
            return false;
        }

        let axis = side >> 1;
        let other = axis ^ 1;
        let border = chart_a.side_value(side);

        // Straight border: both edge corners lie on the side
        if (self.tex_coords[i][axis] - border).abs() > eps
            || (self.tex_coords[ie][axis] - border).abs() > eps
        {
            return false;
        }

        let offset = self.tex_coords[i] - self.tex_coords[j];
        let b_min = chart_b.min_uv + offset;
        let b_max = chart_b.max_uv + offset;

        if !nearly_equal2(chart_a.size(), b_max - b_min, eps) {
            return false;
        }

        let b_border = if is_min_side(side) { b_max[axis] } else { b_min[axis] };
        if (b_border - border).abs() > eps {
            return false;
        }

        let center_a = chart_a.min_uv[other] + chart_a.max_uv[other];
        let center_b = b_min[other] + b_max[other];
        (center_a - center_b).abs() <= 2.0 * eps
    }

    /// Fold every chain along `axis` into its root chart and rebuild the
    /// triangle permutation. Returns which charts took part.
    ///
    /// Absorbed charts leave with all their links cleared on both ends.
    fn walk_chains(&mut self, axis: usize) -> Vec<bool> {
        let num_charts = self.charts.len();
        let (lo, hi) = axis_sides(axis);
        let other = axis ^ 1;

        let mut touched = vec![false; num_charts];
        let mut absorbed: Vec<Vec<(u32, u32)>> = vec![Vec::new(); num_charts];

        for root in 0..num_charts {
            if touched[root]
                || self.charts[root].join[lo].is_some()
                || self.charts[root].join[hi].is_none()
                || self.charts[root].is_empty()
            {
                continue;
            }

            let mut next = self.charts[root].join[hi];
            let mut steps = 0;
            while let Some(c) = next {
                if steps >= num_charts || c == root || touched[c] {
                    break;
                }
                steps += 1;
                touched[root] = true;
                touched[c] = true;

                let mut delta = Vec2::ZERO;
                delta[axis] = self.charts[root].max_uv[axis] - self.charts[c].min_uv[axis];
                delta[other] = self.charts[root].min_uv[other] - self.charts[c].min_uv[other];

                let (first, last) = (self.charts[c].first_tri, self.charts[c].last_tri);
                for sorted in first..last {
                    let tri = self.sorted_tris[sorted as usize] as usize;
                    for corner in tri * 3..tri * 3 + 3 {
                        self.tex_coords[corner] += delta;
                    }
                }

                let chart = &mut self.charts[c];
                chart.min_uv += delta;
                chart.max_uv += delta;
                let (min_uv, max_uv) = (chart.min_uv, chart.max_uv);
                let (uv_area, world_scale) = (chart.uv_area, chart.world_scale);
                next = chart.join[hi];
                chart.last_tri = chart.first_tri;
                chart.uv_area = 0.0;
                chart.world_scale = Vec2::ZERO;
                for side in SIDES {
                    self.unlink(c, side);
                }

                let root_chart = &mut self.charts[root];
                root_chart.include(min_uv);
                root_chart.include(max_uv);
                root_chart.uv_area += uv_area;
                root_chart.world_scale += world_scale;
                absorbed[root].push((first, last));
            }
        }

        if touched.iter().any(|&t| t) {
            self.rebuild_permutation(&absorbed);
        }
        touched
    }

    /// Rewrite `sorted_tris` so every chart's own triangles are followed by
    /// the ranges it absorbed.
    fn rebuild_permutation(&mut self, absorbed: &[Vec<(u32, u32)>]) {
        let mut sorted_tris = Vec::with_capacity(self.sorted_tris.len());
        for (chart, ranges) in self.charts.iter_mut().zip(absorbed) {
            let first = sorted_tris.len() as u32;
            sorted_tris.extend_from_slice(
                &self.sorted_tris[chart.first_tri as usize..chart.last_tri as usize],
            );
            for &(start, end) in ranges {
                sorted_tris.extend_from_slice(&self.sorted_tris[start as usize..end as usize]);
            }
            chart.first_tri = first;
            chart.last_tri = sorted_tris.len() as u32;
        }
        self.sorted_tris = sorted_tris;
    }

    /// Clear `side` of `chart` and the reciprocal link on its neighbor.
    fn unlink(&mut self, chart: usize, side: usize) {
        if let Some(other) = self.charts[chart].join[side].take()
            && self.charts[other].join[opposite_side(side)] == Some(chart)
        {
            self.charts[other].join[opposite_side(side)] = None;
        }
    }
}
