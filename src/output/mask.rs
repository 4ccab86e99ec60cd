use std::path::Path;

use tracing::debug;

use crate::error::{LightmapError, Result};
use crate::layout::Allocator2D;

/// Save the atlas occupancy bitmap as an 8-bit grayscale PNG.
///
/// Occupied texels are white; row 0 of the bitmap is the first image row.
pub fn write_mask(raster: &Allocator2D, path: &Path) -> Result<()> {
    let image = raster.to_image();
    image
        .save(path)
        .map_err(|e| LightmapError::Output(format!("Failed to write {}: {e}", path.display())))?;

    debug!(
        path = %path.display(),
        occupied = raster.count_set(),
        "Wrote occupancy mask"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_png_matches_bitmap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");

        let mut raster = Allocator2D::new(8, 4);
        raster.set_bit(0, 0);
        raster.set_bit(7, 3);
        write_mask(&raster, &path).unwrap();

        let loaded = image::open(&path).unwrap().to_luma8();
        assert_eq!(loaded.dimensions(), (8, 4));
        assert_eq!(loaded.get_pixel(0, 0).0[0], 255);
        assert_eq!(loaded.get_pixel(7, 3).0[0], 255);
        assert_eq!(loaded.get_pixel(1, 0).0[0], 0);
    }

    #[test]
    fn mask_into_missing_directory_is_output_error() {
        let raster = Allocator2D::new(2, 2);
        let err = write_mask(&raster, Path::new("/nonexistent/dir/mask.png")).unwrap_err();
        assert!(matches!(err, LightmapError::Output(_)));
    }
}
