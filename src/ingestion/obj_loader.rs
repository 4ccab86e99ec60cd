use std::path::Path;

use tracing::{debug, warn};

use super::{LoadedMesh, check_indices, gather_corners, sanitize_name};
use crate::error::{LightmapError, Result};
use crate::types::IndexedMesh;

/// Load an OBJ file into our internal types, one mesh per OBJ object/group.
///
/// Materials are ignored; lightmap layout only needs geometry and the
/// authored UV channel.
pub fn load_obj(path: &Path) -> Result<Vec<LoadedMesh>> {
    let (models, materials_result) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
        .map_err(|e| LightmapError::Input(format!("Failed to load OBJ: {e}")))?;

    debug!(model_count = models.len(), "Loaded OBJ models");

    if let Err(e) = materials_result {
        debug!("No MTL loaded: {e}");
    }

    let mut meshes = Vec::with_capacity(models.len());
    for (index, model) in models.into_iter().enumerate() {
        match convert_mesh(model.mesh) {
            Ok(mesh) => meshes.push(LoadedMesh {
                name: sanitize_name(&model.name, index),
                mesh,
            }),
            Err(e) => warn!(model = %model.name, "Skipping OBJ model: {e}"),
        }
    }

    Ok(meshes)
}

/// Convert a `tobj::Mesh` into a corner-based `IndexedMesh`.
fn convert_mesh(mesh: tobj::Mesh) -> Result<IndexedMesh> {
    check_indices(&mesh.positions, &mesh.indices)?;

    let normals = if mesh.normals.is_empty() {
        Vec::new()
    } else {
        gather_corners(&mesh.normals, 3, &mesh.indices)?
    };

    // UV V-flip: OBJ uses bottom-left origin, glTF uses top-left
    let uv_channels = if mesh.texcoords.is_empty() {
        Vec::new()
    } else {
        let flipped: Vec<f32> = mesh
            .texcoords
            .chunks_exact(2)
            .flat_map(|uv| [uv[0], 1.0 - uv[1]])
            .collect();
        vec![gather_corners(&flipped, 2, &mesh.indices)?]
    };

    Ok(IndexedMesh {
        positions: mesh.positions,
        indices: mesh.indices,
        normals,
        uv_channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::MeshView;
    use glam::Vec2;

    fn tobj_mesh(texcoords: Vec<f32>, normals: Vec<f32>) -> tobj::Mesh {
        tobj::Mesh {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            normals,
            texcoords,
            indices: vec![0, 1, 2, 0, 2, 3],
            vertex_color: vec![],
            face_arities: vec![],
            texcoord_indices: vec![],
            normal_indices: vec![],
            material_id: None,
        }
    }

    #[test]
    fn convert_mesh_basic() {
        let mesh = tobj_mesh(
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0].repeat(4),
        );

        let indexed = convert_mesh(mesh).unwrap();
        assert_eq!(indexed.vertex_count(), 4);
        assert_eq!(indexed.triangle_count(), 2);
        assert_eq!(indexed.corner_count(), 6);
        assert_eq!(indexed.normals.len(), 18);
        assert_eq!(indexed.uv_channels.len(), 1);
        assert_eq!(indexed.uv_channels[0].len(), 12);
    }

    #[test]
    fn convert_mesh_uv_vflip() {
        let mesh = tobj_mesh(vec![0.0, 0.0, 1.0, 0.3, 0.5, 1.0, 0.0, 1.0], vec![]);
        let indexed = convert_mesh(mesh).unwrap();
        // Corner 1 is vertex 1: (1.0, 0.3) -> (1.0, 0.7)
        let uv = indexed.uv(0, 1);
        assert!((uv - Vec2::new(1.0, 0.7)).abs().max_element() < 1e-6);
        // Corner 5 is vertex 3: (0.0, 1.0) -> (0.0, 0.0)
        assert_eq!(indexed.uv(0, 5), Vec2::new(0.0, 0.0));
    }

    #[test]
    fn convert_mesh_without_attributes() {
        let indexed = convert_mesh(tobj_mesh(vec![], vec![])).unwrap();
        assert!(!indexed.has_normals());
        assert!(indexed.uv_channels.is_empty());
    }

    #[test]
    fn convert_mesh_rejects_bad_indices() {
        let mut mesh = tobj_mesh(vec![], vec![]);
        mesh.indices.push(9);
        assert!(convert_mesh(mesh).is_err());
    }
}
