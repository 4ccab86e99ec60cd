use super::MeshView;

/// Default distance under which two corner positions are treated as the same point.
pub const POSITION_THRESHOLD: f32 = 2e-5;

/// Multi-map from a corner to every other corner at (nearly) the same position.
#[derive(Debug, Clone, Default)]
pub struct OverlappingCorners {
    offsets: Vec<usize>,
    corners: Vec<usize>,
}

impl OverlappingCorners {
    /// Find overlapping corners of `mesh` by sorting corners along a skewed axis
    /// and comparing each one against the window of corners that can still
    /// be within `threshold` on every component.
    pub fn find<M: MeshView + ?Sized>(mesh: &M, threshold: f32) -> Self {
        let num_corners = mesh.corner_count();
        let sort_axis = glam::Vec3::new(0.30, 0.33, 0.37);

        let mut order: Vec<(f32, usize)> = (0..num_corners)
            .map(|c| (mesh.position(c).dot(sort_axis), c))
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut pairs = Vec::new();
        for (n, &(key_a, a)) in order.iter().enumerate() {
            let pos_a = mesh.position(a);
            for &(key_b, b) in &order[n + 1..] {
                // Component-wise closeness bounds the skewed-axis distance by the threshold
                if key_b - key_a > threshold {
                    break;
                }
                let delta = (mesh.position(b) - pos_a).abs();
                if delta.max_element() <= threshold {
                    pairs.push((a, b));
                }
            }
        }

        Self::from_pairs(num_corners, &pairs)
    }

    /// Build the map from explicit pairs. Each pair is recorded in both directions.
    pub fn from_pairs(num_corners: usize, pairs: &[(usize, usize)]) -> Self {
        let mut counts = vec![0usize; num_corners + 1];
        for &(a, b) in pairs {
            if a != b {
                counts[a] += 1;
                counts[b] += 1;
            }
        }

        let mut offsets = Vec::with_capacity(num_corners + 1);
        let mut total = 0;
        for &count in &counts[..num_corners] {
            offsets.push(total);
            total += count;
        }
        offsets.push(total);

        let mut fill = offsets.clone();
        let mut corners = vec![0usize; total];
        for &(a, b) in pairs {
            if a == b {
                continue;
            }
            corners[fill[a]] = b;
            fill[a] += 1;
            corners[fill[b]] = a;
            fill[b] += 1;
        }

        for c in 0..num_corners {
            let slot = &mut corners[offsets[c]..offsets[c + 1]];
            slot.sort_unstable();
        }

        Self { offsets, corners }
    }

    /// Corners overlapping `corner`, in ascending order, excluding `corner` itself.
    pub fn overlapping(&self, corner: usize) -> &[usize] {
        match (self.offsets.get(corner), self.offsets.get(corner + 1)) {
            (Some(&start), Some(&end)) => &self.corners[start..end],
            _ => &[],
        }
    }

    pub fn corner_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Total number of (directed) overlap entries.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.corners.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }
}
