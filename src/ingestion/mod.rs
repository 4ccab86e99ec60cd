pub mod gltf_loader;
pub mod obj_loader;

use std::path::Path;

use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{LightmapError, Result};
use crate::types::IndexedMesh;

/// A mesh as loaded from the input file, with a name usable in file names.
#[derive(Debug, Clone)]
pub struct LoadedMesh {
    pub name: String,
    pub mesh: IndexedMesh,
}

/// Result of the ingestion stage.
#[derive(Debug)]
pub struct IngestionResult {
    pub meshes: Vec<LoadedMesh>,
    pub stats: IngestionStats,
}

/// Statistics about the ingested data.
#[derive(Debug)]
pub struct IngestionStats {
    pub total_vertices: usize,
    pub total_triangles: usize,
    pub total_meshes: usize,
    pub has_normals: bool,
    /// Largest number of UV channels on any mesh
    pub max_uv_channels: usize,
    pub input_format: String,
}

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Obj,
    Gltf,
    Glb,
}

impl InputFormat {
    /// Detect format from file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "obj" => Ok(InputFormat::Obj),
            "gltf" => Ok(InputFormat::Gltf),
            "glb" => Ok(InputFormat::Glb),
            _ => Err(LightmapError::Input(format!(
                "Unsupported file format: .{ext}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::Obj => "OBJ",
            InputFormat::Gltf => "glTF",
            InputFormat::Glb => "GLB",
        }
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run the full ingestion stage.
pub fn ingest(config: &PipelineConfig) -> Result<IngestionResult> {
    // 1. Validate input exists
    if !config.input.exists() {
        return Err(LightmapError::Input(format!(
            "Input file not found: {}",
            config.input.display()
        )));
    }

    // 2. Detect format
    let format = InputFormat::from_path(&config.input)?;
    info!(format = %format, path = %config.input.display(), "Detected input format");

    // 3. Dispatch to loader
    let mut meshes = match format {
        InputFormat::Obj => obj_loader::load_obj(&config.input)?,
        InputFormat::Gltf | InputFormat::Glb => gltf_loader::load_gltf(&config.input)?,
    };
    make_names_unique(&mut meshes);

    // 4. Compute stats
    let stats = compute_stats(&meshes, format);
    debug!(
        vertices = stats.total_vertices,
        triangles = stats.total_triangles,
        meshes = stats.total_meshes,
        uv_channels = stats.max_uv_channels,
        "Ingestion stats"
    );

    Ok(IngestionResult { meshes, stats })
}

/// Compute summary statistics from the ingested meshes.
pub fn compute_stats(meshes: &[LoadedMesh], format: InputFormat) -> IngestionStats {
    IngestionStats {
        total_vertices: meshes.iter().map(|m| m.mesh.vertex_count()).sum(),
        total_triangles: meshes.iter().map(|m| m.mesh.triangle_count()).sum(),
        total_meshes: meshes.len(),
        has_normals: meshes.iter().any(|m| m.mesh.has_normals()),
        max_uv_channels: meshes
            .iter()
            .map(|m| m.mesh.uv_channels.len())
            .max()
            .unwrap_or(0),
        input_format: format.to_string(),
    }
}

/// Reduce `name` to characters safe in a file name; empty names become `mesh_<index>`.
pub fn sanitize_name(name: &str, index: usize) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('_').is_empty() {
        format!("mesh_{index}")
    } else {
        cleaned
    }
}

/// Suffix repeated names with their index so output files don't collide.
fn make_names_unique(meshes: &mut [LoadedMesh]) {
    let mut seen = std::collections::HashSet::new();
    for (index, loaded) in meshes.iter_mut().enumerate() {
        if !seen.insert(loaded.name.clone()) {
            loaded.name = format!("{}_{index}", loaded.name);
            seen.insert(loaded.name.clone());
        }
    }
}

/// Gather a per-vertex attribute of `width` floats into one entry per corner.
pub(crate) fn gather_corners(values: &[f32], width: usize, indices: &[u32]) -> Result<Vec<f32>> {
    let mut out = Vec::with_capacity(indices.len() * width);
    for &index in indices {
        let start = index as usize * width;
        let attribute = values.get(start..start + width).ok_or_else(|| {
            LightmapError::Input(format!(
                "Vertex index {index} out of range for attribute with {} entries",
                values.len() / width.max(1)
            ))
        })?;
        out.extend_from_slice(attribute);
    }
    Ok(out)
}

/// Validate that every index refers to an existing position.
pub(crate) fn check_indices(positions: &[f32], indices: &[u32]) -> Result<()> {
    let vertex_count = positions.len() / 3;
    if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(LightmapError::Input(format!(
            "Vertex index {bad} out of range ({vertex_count} vertices)"
        )));
    }
    if indices.len() % 3 != 0 {
        return Err(LightmapError::Input(format!(
            "Index count {} is not a multiple of 3",
            indices.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(name: &str, mesh: IndexedMesh) -> LoadedMesh {
        LoadedMesh {
            name: name.to_string(),
            mesh,
        }
    }

    #[test]
    fn format_detection() {
        assert_eq!(
            InputFormat::from_path(Path::new("model.obj")).unwrap(),
            InputFormat::Obj
        );
        assert_eq!(
            InputFormat::from_path(Path::new("scene.gltf")).unwrap(),
            InputFormat::Gltf
        );
        assert_eq!(
            InputFormat::from_path(Path::new("scene.glb")).unwrap(),
            InputFormat::Glb
        );
    }

    #[test]
    fn format_detection_case_insensitive() {
        assert_eq!(
            InputFormat::from_path(Path::new("Model.OBJ")).unwrap(),
            InputFormat::Obj
        );
        assert_eq!(
            InputFormat::from_path(Path::new("Scene.GLTF")).unwrap(),
            InputFormat::Gltf
        );
    }

    #[test]
    fn format_detection_unsupported() {
        assert!(InputFormat::from_path(Path::new("file.fbx")).is_err());
        assert!(InputFormat::from_path(Path::new("cloud.ply")).is_err());
    }

    #[test]
    fn compute_stats_basic() {
        let meshes = vec![
            loaded(
                "a",
                IndexedMesh {
                    positions: vec![0.0; 9],
                    indices: vec![0, 1, 2],
                    normals: vec![0.0; 9],
                    uv_channels: vec![vec![0.0; 6], vec![0.0; 6]],
                },
            ),
            loaded(
                "b",
                IndexedMesh {
                    positions: vec![0.0; 12],
                    indices: vec![0, 1, 2, 0, 2, 3],
                    normals: vec![],
                    uv_channels: vec![],
                },
            ),
        ];

        let stats = compute_stats(&meshes, InputFormat::Obj);

        assert_eq!(stats.total_vertices, 7); // 3 + 4
        assert_eq!(stats.total_triangles, 3); // 1 + 2
        assert_eq!(stats.total_meshes, 2);
        assert!(stats.has_normals);
        assert_eq!(stats.max_uv_channels, 2);
        assert_eq!(stats.input_format, "OBJ");
    }

    #[test]
    fn sanitize_names() {
        assert_eq!(sanitize_name("Wall.001", 0), "Wall_001");
        assert_eq!(sanitize_name("floor-tile_2", 3), "floor-tile_2");
        assert_eq!(sanitize_name("", 4), "mesh_4");
        assert_eq!(sanitize_name("///", 5), "mesh_5");
    }

    #[test]
    fn duplicate_names_get_suffixed() {
        let mut meshes = vec![
            loaded("wall", IndexedMesh::default()),
            loaded("wall", IndexedMesh::default()),
            loaded("floor", IndexedMesh::default()),
        ];
        make_names_unique(&mut meshes);
        assert_eq!(meshes[0].name, "wall");
        assert_eq!(meshes[1].name, "wall_1");
        assert_eq!(meshes[2].name, "floor");
    }

    #[test]
    fn gather_corners_expands_shared_vertices() {
        let uvs = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        let corners = gather_corners(&uvs, 2, &[0, 1, 2, 0, 2, 3]).unwrap();
        assert_eq!(corners.len(), 12);
        assert_eq!(&corners[6..8], &[0.0, 0.0]);
        assert_eq!(&corners[10..12], &[0.0, 1.0]);
        assert!(gather_corners(&uvs, 2, &[4]).is_err());
    }

    #[test]
    fn check_indices_bounds() {
        let positions = [0.0; 9];
        assert!(check_indices(&positions, &[0, 1, 2]).is_ok());
        assert!(check_indices(&positions, &[0, 1, 3]).is_err());
        assert!(check_indices(&positions, &[0, 1]).is_err());
    }

    #[test]
    fn ingest_missing_file() {
        let config = PipelineConfig {
            input: std::path::PathBuf::from("/nonexistent/file.obj"),
            ..Default::default()
        };
        let err = ingest(&config).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
