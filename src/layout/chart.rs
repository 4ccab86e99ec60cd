use glam::Vec2;

/// Join slot indices: left (min U), right (max U), bottom (min V), top (max V).
pub const SIDE_LEFT: usize = 0;
pub const SIDE_RIGHT: usize = 1;
pub const SIDE_BOTTOM: usize = 2;
pub const SIDE_TOP: usize = 3;
pub const SIDES: [usize; 4] = [SIDE_LEFT, SIDE_RIGHT, SIDE_BOTTOM, SIDE_TOP];

/// The (min, max) sides along `axis`: 0 is U, 1 is V.
pub fn axis_sides(axis: usize) -> (usize, usize) {
    if axis == 0 {
        (SIDE_LEFT, SIDE_RIGHT)
    } else {
        (SIDE_BOTTOM, SIDE_TOP)
    }
}

/// Whether `side` bounds the minimum of its axis.
pub fn is_min_side(side: usize) -> bool {
    side == SIDE_LEFT || side == SIDE_BOTTOM
}

/// Side facing `side` across a shared border.
pub fn opposite_side(side: usize) -> usize {
    side ^ 1
}

/// A connected group of triangles that is placed rigidly in the atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshChart {
    /// Half-open range into the sorted triangle permutation
    pub first_tri: u32,
    pub last_tri: u32,

    /// Bounding box of the chart's corners in the UV cache
    pub min_uv: Vec2,
    pub max_uv: Vec2,

    pub uv_area: f32,
    /// World length per UV unit along each axis (area-weighted once finalized)
    pub world_scale: Vec2,
    /// Texels per UV unit for the current packing attempt
    pub uv_scale: Vec2,

    /// Atlas texel position: `u * packing_scale_u + v * packing_scale_v + packing_bias`
    pub packing_scale_u: Vec2,
    pub packing_scale_v: Vec2,
    pub packing_bias: Vec2,

    /// Neighbor chart joined on each side, see `SIDE_*`
    pub join: [Option<usize>; 4],
}

impl MeshChart {
    pub fn new(first_tri: u32) -> Self {
        Self {
            first_tri,
            last_tri: first_tri,
            min_uv: Vec2::splat(f32::MAX),
            max_uv: Vec2::splat(f32::MIN),
            uv_area: 0.0,
            world_scale: Vec2::ZERO,
            uv_scale: Vec2::ZERO,
            packing_scale_u: Vec2::ZERO,
            packing_scale_v: Vec2::ZERO,
            packing_bias: Vec2::ZERO,
            join: [None; 4],
        }
    }

    pub fn triangle_count(&self) -> usize {
        (self.last_tri - self.first_tri) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.first_tri == self.last_tri
    }

    /// UV extent of the bounding box.
    pub fn size(&self) -> Vec2 {
        self.max_uv - self.min_uv
    }

    /// Extend the bounding box to contain `uv`.
    pub fn include(&mut self, uv: Vec2) {
        self.min_uv = self.min_uv.min(uv);
        self.max_uv = self.max_uv.max(uv);
    }

    /// Value of the bounding box on `side`: min or max of that side's axis.
    pub fn side_value(&self, side: usize) -> f32 {
        let axis = side >> 1;
        if is_min_side(side) {
            self.min_uv[axis]
        } else {
            self.max_uv[axis]
        }
    }

    /// Map a UV-cache coordinate to atlas texels with the current packing basis.
    pub fn to_atlas(&self, uv: Vec2) -> Vec2 {
        uv.x * self.packing_scale_u + uv.y * self.packing_scale_v + self.packing_bias
    }

    /// Texel-space bounding box of the chart under the current packing basis.
    pub fn atlas_bounds(&self) -> (Vec2, Vec2) {
        let corners = [
            self.to_atlas(self.min_uv),
            self.to_atlas(Vec2::new(self.max_uv.x, self.min_uv.y)),
            self.to_atlas(Vec2::new(self.min_uv.x, self.max_uv.y)),
            self.to_atlas(self.max_uv),
        ];
        let min = corners.iter().copied().fold(Vec2::splat(f32::MAX), Vec2::min);
        let max = corners.iter().copied().fold(Vec2::splat(f32::MIN), Vec2::max);
        (min, max)
    }
}
