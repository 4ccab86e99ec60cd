use glam::Vec2;

/// Sub-pixel precision of the fixed-point grid (28.4).
const SUBPIXEL_BITS: u32 = 4;
const SUBPIXEL_SCALE: f32 = (1 << SUBPIXEL_BITS) as f32;

/// Texel width of the box the triangle is dilated by when packing charts.
pub const DEFAULT_DILATION: f32 = 1.0;

/// One half-edge of a fixed-point triangle.
struct HalfEdge {
    dx: i64,
    dy: i64,
    c: i64,
}

impl HalfEdge {
    fn new(a: (i64, i64), b: (i64, i64), dilate: f32) -> Self {
        let dx = b.0 - a.0;
        let dy = b.1 - a.1;
        let mut c = dy * a.0 - dx * a.1;

        // Top-left fill convention
        if !(dy < 0 || (dy == 0 && dx > 0)) {
            c -= 1;
        }

        // Minkowski sum with an axis-aligned box `dilate` texels wide
        let grow = (dx.abs() + dy.abs()) as f64 * (SUBPIXEL_SCALE as f64 * 0.5) * dilate as f64;
        c += grow.round() as i64;

        Self { dx, dy, c }
    }

    /// Edge value at integer pixel (x, y); inside when `>= 0`.
    fn eval(&self, x: i64, y: i64) -> i64 {
        let scale = SUBPIXEL_SCALE as i64;
        self.c + self.dx * y * scale - self.dy * x * scale
    }
}

fn to_fixed(p: Vec2) -> (i64, i64) {
    (
        (p.x * SUBPIXEL_SCALE).round() as i64,
        (p.y * SUBPIXEL_SCALE).round() as i64,
    )
}

/// Conservatively rasterize a texel-space triangle, calling `plot` for every
/// covered pixel inside `[0, width) x [0, height)`.
///
/// Pixel `(x, y)` covers `[x, x + 1) x [y, y + 1)`. `dilate` grows the triangle
/// by a box of that width so texels touched by the chart's texture filter
/// footprint are included.
pub fn rasterize_triangle<F>(points: &[Vec2; 3], width: u32, height: u32, dilate: f32, mut plot: F)
where
    F: FnMut(u32, u32),
{
    if width == 0 || height == 0 {
        return;
    }

    // Integer coordinates address pixel centers
    let half = Vec2::splat(0.5);
    let mut p = [points[0] - half, points[1] - half, points[2] - half];
    if !p.iter().all(|v| v.is_finite()) {
        return;
    }

    // Counter-clockwise in a y-up frame
    if (p[1] - p[0]).perp_dot(p[2] - p[0]) < 0.0 {
        p.swap(1, 2);
    }

    let fixed = [to_fixed(p[0]), to_fixed(p[1]), to_fixed(p[2])];
    let edges = [
        HalfEdge::new(fixed[0], fixed[1], dilate),
        HalfEdge::new(fixed[1], fixed[2], dilate),
        HalfEdge::new(fixed[2], fixed[0], dilate),
    ];

    let pad = dilate.max(0.0) * 0.5;
    let lo = p[0].min(p[1]).min(p[2]) - Vec2::splat(pad);
    let hi = p[0].max(p[1]).max(p[2]) + Vec2::splat(pad);

    let min_x = (lo.x.floor() as i64).max(0);
    let min_y = (lo.y.floor() as i64).max(0);
    let max_x = (hi.x.ceil() as i64).min(width as i64 - 1);
    let max_y = (hi.y.ceil() as i64).min(height as i64 - 1);

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            if edges.iter().all(|e| e.eval(x, y) >= 0) {
                plot(x as u32, y as u32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn coverage(tris: &[[Vec2; 3]], w: u32, h: u32, dilate: f32) -> HashMap<(u32, u32), u32> {
        let mut hits = HashMap::new();
        for tri in tris {
            rasterize_triangle(tri, w, h, dilate, |x, y| *hits.entry((x, y)).or_insert(0) += 1);
        }
        hits
    }

    fn square(x0: f32, y0: f32, size: f32) -> [[Vec2; 3]; 2] {
        let a = Vec2::new(x0, y0);
        let b = Vec2::new(x0 + size, y0);
        let c = Vec2::new(x0 + size, y0 + size);
        let d = Vec2::new(x0, y0 + size);
        [[a, b, c], [a, c, d]]
    }

    #[test]
    fn shared_diagonal_is_covered_once() {
        let hits = coverage(&square(0.0, 0.0, 4.0), 16, 16, 0.0);
        assert_eq!(hits.len(), 16);
        assert!(hits.values().all(|&n| n == 1), "pixel covered twice: {hits:?}");
        for y in 0..4 {
            for x in 0..4 {
                assert!(hits.contains_key(&(x, y)));
            }
        }
    }

    #[test]
    fn dilation_grows_by_one_texel_ring() {
        // Chart placed with a half-texel margin, as the packer does
        let hits = coverage(&square(0.5, 0.5, 4.0), 5, 5, DEFAULT_DILATION);
        assert_eq!(hits.len(), 25);

        let unclipped = coverage(&square(0.5, 0.5, 4.0), 16, 16, DEFAULT_DILATION);
        for y in 0..5 {
            for x in 0..5 {
                assert!(unclipped.contains_key(&(x, y)), "missing ({x}, {y})");
            }
        }
        assert!(unclipped.keys().all(|&(x, y)| x < 5 && y < 6));
    }

    #[test]
    fn rasterize_is_winding_independent() {
        let ccw = [Vec2::new(1.0, 1.0), Vec2::new(6.0, 1.0), Vec2::new(1.0, 6.0)];
        let cw = [ccw[0], ccw[2], ccw[1]];
        let a = coverage(&[ccw], 8, 8, 1.0);
        let b = coverage(&[cw], 8, 8, 1.0);
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn output_is_clipped_to_scissor() {
        let hits = coverage(&square(-2.0, -2.0, 10.0), 4, 3, 1.0);
        assert_eq!(hits.len(), 12);
        assert!(hits.keys().all(|&(x, y)| x < 4 && y < 3));
    }

    #[test]
    fn tiny_triangle_is_conservative() {
        let tri = [Vec2::new(2.1, 2.1), Vec2::new(2.3, 2.1), Vec2::new(2.2, 2.3)];
        let without = coverage(&[tri], 8, 8, 0.0);
        assert!(without.is_empty());
        let with = coverage(&[tri], 8, 8, 1.0);
        assert!(with.contains_key(&(2, 2)));
    }

    #[test]
    fn non_finite_points_are_skipped() {
        let tri = [Vec2::new(f32::NAN, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
        assert!(coverage(&[tri], 8, 8, 1.0).is_empty());
    }
}
