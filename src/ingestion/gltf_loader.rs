use std::path::Path;

use tracing::{debug, warn};

use super::{LoadedMesh, check_indices, gather_corners, sanitize_name};
use crate::error::{LightmapError, Result};
use crate::types::IndexedMesh;

/// Load a glTF or GLB file, one mesh per triangle primitive.
///
/// Every `TEXCOORD_n` set is kept, in order, as UV channel `n`.
pub fn load_gltf(path: &Path) -> Result<Vec<LoadedMesh>> {
    let (document, buffers, _images) = gltf::import(path)
        .map_err(|e| LightmapError::Input(format!("Failed to load glTF: {e}")))?;

    debug!(meshes = document.meshes().len(), "Loaded glTF document");

    let mut meshes = Vec::new();

    for mesh in document.meshes() {
        let base_name = sanitize_name(mesh.name().unwrap_or(""), mesh.index());
        let primitive_count = mesh.primitives().len();

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                warn!(
                    mesh = ?mesh.name(),
                    mode = ?primitive.mode(),
                    "Skipping non-triangle primitive"
                );
                continue;
            }

            match extract_primitive(&primitive, &buffers) {
                Ok(indexed) => {
                    let name = if primitive_count > 1 {
                        format!("{base_name}_{}", primitive.index())
                    } else {
                        base_name.clone()
                    };
                    meshes.push(LoadedMesh {
                        name,
                        mesh: indexed,
                    });
                }
                Err(e) => {
                    warn!(mesh = ?mesh.name(), "Skipping primitive: {e}");
                }
            }
        }
    }

    Ok(meshes)
}

/// Extract geometry from a single glTF primitive.
fn extract_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
) -> Result<IndexedMesh> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    // Positions (required)
    let positions: Vec<f32> = reader
        .read_positions()
        .ok_or_else(|| LightmapError::Input("Primitive missing positions".into()))?
        .flatten()
        .collect();

    // Non-indexed primitives list their vertices in order
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..(positions.len() / 3) as u32).collect(),
    };
    check_indices(&positions, &indices)?;

    // Normals (optional)
    let normals = match reader.read_normals() {
        Some(iter) => {
            let per_vertex: Vec<f32> = iter.flatten().collect();
            gather_corners(&per_vertex, 3, &indices)?
        }
        None => Vec::new(),
    };

    // UV channels, consecutive sets starting at TEXCOORD_0
    let mut uv_channels = Vec::new();
    while let Some(iter) = reader.read_tex_coords(uv_channels.len() as u32) {
        let per_vertex: Vec<f32> = iter.into_f32().flatten().collect();
        uv_channels.push(gather_corners(&per_vertex, 2, &indices)?);
    }

    Ok(IndexedMesh {
        positions,
        indices,
        normals,
        uv_channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::glb_writer;
    use crate::layout::MeshView;
    use glam::Vec2;

    fn two_channel_quad() -> IndexedMesh {
        IndexedMesh {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 1, 2, 0, 2, 3],
            normals: vec![0.0, 0.0, 1.0].repeat(6),
            uv_channels: vec![
                vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0],
                vec![0.1, 0.1, 0.4, 0.1, 0.4, 0.4, 0.1, 0.1, 0.4, 0.4, 0.1, 0.4],
            ],
        }
    }

    #[test]
    fn load_written_glb_keeps_all_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.glb");
        let glb = glb_writer::write_glb(&two_channel_quad()).unwrap();
        std::fs::write(&path, glb).unwrap();

        let meshes = load_gltf(&path).unwrap();
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0].mesh;
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.uv_channel_count(), 2);
        assert!(mesh.has_normals());
        assert_eq!(mesh.uv(1, 2), Vec2::new(0.4, 0.4));
        assert_eq!(mesh.position(5), glam::Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn load_missing_file_is_input_error() {
        let err = load_gltf(Path::new("/nonexistent/scene.glb")).unwrap_err();
        assert!(matches!(err, LightmapError::Input(_)));
    }
}
