use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use gltf::binary::Glb;
use gltf_json::Index;
use gltf_json::accessor::{ComponentType, GenericComponentType, Type as AccessorType};
use gltf_json::buffer::Target;
use gltf_json::mesh::{Mode, Primitive, Semantic};
use gltf_json::validation::{Checked, USize64};

use crate::error::{LightmapError, Result};
use crate::types::IndexedMesh;

/// Vertex buffers after welding corners that share every attribute.
#[derive(Debug, Default)]
struct WeldedVertices {
    positions: Vec<f32>,
    normals: Vec<f32>,
    uv_channels: Vec<Vec<f32>>,
    indices: Vec<u32>,
}

impl WeldedVertices {
    fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

/// Weld corners with bit-identical position, normal and UVs into shared vertices.
fn weld_corners(mesh: &IndexedMesh) -> WeldedVertices {
    let has_normals = mesh.has_normals();
    let channels: Vec<&Vec<f32>> = mesh
        .uv_channels
        .iter()
        .filter(|uvs| uvs.len() >= mesh.corner_count() * 2)
        .collect();

    let mut welded = WeldedVertices {
        uv_channels: vec![Vec::new(); channels.len()],
        ..Default::default()
    };
    let mut lookup: HashMap<Vec<u32>, u32> = HashMap::new();
    let mut key = Vec::with_capacity(4 + channels.len() * 2);

    for (corner, &vertex) in mesh.indices.iter().enumerate() {
        key.clear();
        key.push(vertex);
        if has_normals {
            key.extend(mesh.normals[corner * 3..corner * 3 + 3].iter().map(|n| n.to_bits()));
        }
        for uvs in &channels {
            key.extend(uvs[corner * 2..corner * 2 + 2].iter().map(|t| t.to_bits()));
        }

        let next = welded.vertex_count() as u32;
        let index = *lookup.entry(key.clone()).or_insert_with(|| {
            let v = vertex as usize;
            welded
                .positions
                .extend_from_slice(&mesh.positions[v * 3..v * 3 + 3]);
            if has_normals {
                welded
                    .normals
                    .extend_from_slice(&mesh.normals[corner * 3..corner * 3 + 3]);
            }
            for (out, uvs) in welded.uv_channels.iter_mut().zip(&channels) {
                out.extend_from_slice(&uvs[corner * 2..corner * 2 + 2]);
            }
            next
        });
        welded.indices.push(index);
    }

    welded
}

/// Serialize an `IndexedMesh` into a binary GLB (glTF 2.0) byte buffer.
///
/// Produces a self-contained GLB with:
/// - 1 buffer (positions + optional normals + every UV channel + indices)
/// - `TEXCOORD_n` for UV channel `n`, so the packed lightmap channel travels
///   next to the authored one
/// - 1 Mesh with 1 Primitive (mode = Triangles), 1 Node, 1 Scene
///
/// Corners sharing all attributes are welded. Indices use u16 when the
/// welded vertex count is <= 65535.
pub fn write_glb(mesh: &IndexedMesh) -> Result<Vec<u8>> {
    if mesh.is_empty() {
        return write_empty_glb();
    }

    let welded = weld_corners(mesh);
    let vertex_count = welded.vertex_count();

    let mut root = new_root();
    let mut bin_data: Vec<u8> = Vec::new();
    let mut attributes = BTreeMap::new();

    let buffer_idx = Index::new(0); // pushed at the end

    // --- Positions (required) ---
    let (pos_min, pos_max) = compute_position_bounds(&welded.positions);
    let pos_view = write_vertex_view(
        &mut root,
        &mut bin_data,
        buffer_idx,
        bytemuck::cast_slice(&welded.positions),
    );
    let pos_accessor = root.push(float_accessor(
        pos_view,
        vertex_count,
        AccessorType::Vec3,
        Some((pos_min, pos_max)),
    ));
    attributes.insert(Checked::Valid(Semantic::Positions), pos_accessor);

    // --- Normals (optional) ---
    if !welded.normals.is_empty() {
        let view = write_vertex_view(
            &mut root,
            &mut bin_data,
            buffer_idx,
            bytemuck::cast_slice(&welded.normals),
        );
        let accessor = root.push(float_accessor(view, vertex_count, AccessorType::Vec3, None));
        attributes.insert(Checked::Valid(Semantic::Normals), accessor);
    }

    // --- UV channels ---
    for (channel, uvs) in welded.uv_channels.iter().enumerate() {
        let view = write_vertex_view(
            &mut root,
            &mut bin_data,
            buffer_idx,
            bytemuck::cast_slice(uvs),
        );
        let accessor = root.push(float_accessor(view, vertex_count, AccessorType::Vec2, None));
        attributes.insert(
            Checked::Valid(Semantic::TexCoords(channel as u32)),
            accessor,
        );
    }

    // --- Indices (u16 when vertex_count <= 65535, else u32) ---
    let use_u16_indices = vertex_count <= 65535;
    let idx_view = write_index_view(
        &mut root,
        &mut bin_data,
        buffer_idx,
        &welded.indices,
        use_u16_indices,
    );
    let idx_component_type = if use_u16_indices {
        ComponentType::U16
    } else {
        ComponentType::U32
    };
    let idx_accessor = root.push(gltf_json::Accessor {
        buffer_view: Some(idx_view),
        byte_offset: Some(USize64(0)),
        count: USize64::from(welded.indices.len()),
        component_type: Checked::Valid(GenericComponentType(idx_component_type)),
        type_: Checked::Valid(AccessorType::Scalar),
        min: None,
        max: None,
        name: None,
        normalized: false,
        sparse: None,
        extensions: Default::default(),
        extras: Default::default(),
    });

    // --- Mesh ---
    let primitive = Primitive {
        attributes,
        indices: Some(idx_accessor),
        material: None,
        mode: Checked::Valid(Mode::Triangles),
        targets: None,
        extensions: Default::default(),
        extras: Default::default(),
    };

    let mesh_idx = root.push(gltf_json::Mesh {
        primitives: vec![primitive],
        weights: None,
        name: None,
        extensions: Default::default(),
        extras: Default::default(),
    });

    // --- Node / Scene ---
    let node_idx = root.push(gltf_json::Node {
        mesh: Some(mesh_idx),
        ..Default::default()
    });
    let scene_idx = root.push(gltf_json::Scene {
        nodes: vec![node_idx],
        name: None,
        extensions: Default::default(),
        extras: Default::default(),
    });
    root.scene = Some(scene_idx);

    // --- Buffer ---
    pad_to_4(&mut bin_data, 0);
    root.push(gltf_json::Buffer {
        byte_length: USize64::from(bin_data.len()),
        uri: None,
        name: None,
        extensions: Default::default(),
        extras: Default::default(),
    });

    assemble_glb(&root, Some(bin_data))
}

fn new_root() -> gltf_json::Root {
    gltf_json::Root {
        asset: gltf_json::Asset {
            version: "2.0".into(),
            generator: Some("lightmap-packer".into()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn pad_to_4(bytes: &mut Vec<u8>, fill: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(fill);
    }
}

/// Tightly packed f32 vertex accessor.
fn float_accessor(
    view: Index<gltf_json::buffer::View>,
    count: usize,
    type_: AccessorType,
    bounds: Option<([f32; 3], [f32; 3])>,
) -> gltf_json::Accessor {
    gltf_json::Accessor {
        buffer_view: Some(view),
        byte_offset: Some(USize64(0)),
        count: USize64::from(count),
        component_type: Checked::Valid(GenericComponentType(ComponentType::F32)),
        type_: Checked::Valid(type_),
        min: bounds.map(|(min, _)| serde_json::json!(min)),
        max: bounds.map(|(_, max)| serde_json::json!(max)),
        name: None,
        normalized: false,
        sparse: None,
        extensions: Default::default(),
        extras: Default::default(),
    }
}

/// Append a vertex attribute buffer view and return its index.
fn write_vertex_view(
    root: &mut gltf_json::Root,
    bin_data: &mut Vec<u8>,
    buffer_idx: Index<gltf_json::Buffer>,
    raw_bytes: &[u8],
) -> Index<gltf_json::buffer::View> {
    pad_to_4(bin_data, 0);
    let byte_offset = bin_data.len();
    bin_data.extend_from_slice(raw_bytes);

    root.push(gltf_json::buffer::View {
        buffer: buffer_idx,
        byte_length: USize64::from(raw_bytes.len()),
        byte_offset: Some(USize64::from(byte_offset)),
        byte_stride: None,
        name: None,
        target: Some(Checked::Valid(Target::ArrayBuffer)),
        extensions: Default::default(),
        extras: Default::default(),
    })
}

/// Append an index buffer view and return its index.
fn write_index_view(
    root: &mut gltf_json::Root,
    bin_data: &mut Vec<u8>,
    buffer_idx: Index<gltf_json::Buffer>,
    indices: &[u32],
    use_u16: bool,
) -> Index<gltf_json::buffer::View> {
    pad_to_4(bin_data, 0);
    let byte_offset = bin_data.len();

    if use_u16 {
        let idx_u16: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
        bin_data.extend_from_slice(bytemuck::cast_slice(&idx_u16));
    } else {
        bin_data.extend_from_slice(bytemuck::cast_slice(indices));
    }
    let byte_length = bin_data.len() - byte_offset;

    root.push(gltf_json::buffer::View {
        buffer: buffer_idx,
        byte_length: USize64::from(byte_length),
        byte_offset: Some(USize64::from(byte_offset)),
        byte_stride: None,
        name: None,
        target: Some(Checked::Valid(Target::ElementArrayBuffer)),
        extensions: Default::default(),
        extras: Default::default(),
    })
}

/// Produce a minimal valid empty GLB.
fn write_empty_glb() -> Result<Vec<u8>> {
    let mut root = new_root();
    let node_idx = root.push(gltf_json::Node::default());
    let scene_idx = root.push(gltf_json::Scene {
        nodes: vec![node_idx],
        name: None,
        extensions: Default::default(),
        extras: Default::default(),
    });
    root.scene = Some(scene_idx);

    assemble_glb(&root, None)
}

fn assemble_glb(root: &gltf_json::Root, bin_data: Option<Vec<u8>>) -> Result<Vec<u8>> {
    let json_string = gltf_json::serialize::to_string(root)
        .map_err(|e| LightmapError::Output(format!("glTF JSON serialization failed: {e}")))?;
    let mut json_bytes = json_string.into_bytes();
    // JSON chunk is padded to 4 bytes with spaces
    pad_to_4(&mut json_bytes, b' ');

    let bin_length = bin_data.as_ref().map_or(0, |bin| 8 + bin.len());
    let glb = Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length: (12 + 8 + json_bytes.len() + bin_length) as u32,
        },
        json: Cow::Owned(json_bytes),
        bin: bin_data.map(Cow::Owned),
    };

    glb.to_vec()
        .map_err(|e| LightmapError::Output(format!("GLB serialization failed: {e}")))
}

/// Compute min/max for a flat positions array (stride 3).
fn compute_position_bounds(positions: &[f32]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::INFINITY; 3];
    let mut max = [f32::NEG_INFINITY; 3];

    for chunk in positions.chunks_exact(3) {
        for i in 0..3 {
            min[i] = min[i].min(chunk[i]);
            max[i] = max[i].max(chunk[i]);
        }
    }

    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_quad() -> IndexedMesh {
        IndexedMesh {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 1, 2, 0, 2, 3],
            normals: [0.0, 0.0, 1.0].repeat(6),
            uv_channels: vec![
                vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0],
                vec![0.1, 0.1, 0.9, 0.1, 0.9, 0.9, 0.1, 0.1, 0.9, 0.9, 0.1, 0.9],
            ],
        }
    }

    #[test]
    fn glb_magic_and_version() {
        let bytes = write_glb(&make_quad()).unwrap();
        assert_eq!(&bytes[0..4], b"glTF", "GLB magic should be 'glTF'");
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        assert_eq!(version, 2, "GLB version should be 2");
    }

    #[test]
    fn glb_roundtrip_parseable() {
        let bytes = write_glb(&make_quad()).unwrap();
        let glb = Glb::from_slice(&bytes).expect("GLB should be parseable");
        assert_eq!(glb.header.version, 2);
        assert!(glb.bin.is_some());
    }

    #[test]
    fn glb_welds_identical_corners() {
        let bytes = write_glb(&make_quad()).unwrap();
        let (doc, _buffers, _images) =
            gltf::import_slice(&bytes).expect("GLB should import cleanly");
        let prim = doc.meshes().next().unwrap().primitives().next().unwrap();

        let positions = prim.get(&Semantic::Positions).expect("should have positions");
        assert_eq!(positions.count(), 4, "shared diagonal corners are welded");
        assert_eq!(prim.indices().expect("should have indices").count(), 6);
    }

    #[test]
    fn glb_writes_every_uv_channel() {
        let bytes = write_glb(&make_quad()).unwrap();
        let (doc, buffers, _images) = gltf::import_slice(&bytes).unwrap();
        let prim = doc.meshes().next().unwrap().primitives().next().unwrap();

        assert!(prim.get(&Semantic::Normals).is_some(), "should have normals");
        assert!(prim.get(&Semantic::TexCoords(0)).is_some());
        assert!(prim.get(&Semantic::TexCoords(1)).is_some());
        assert!(prim.get(&Semantic::TexCoords(2)).is_none());

        let reader = prim.reader(|b| Some(&buffers[b.index()]));
        let lightmap: Vec<[f32; 2]> = reader.read_tex_coords(1).unwrap().into_f32().collect();
        assert!(lightmap.contains(&[0.9, 0.9]));
    }

    #[test]
    fn seams_are_not_welded() {
        let mut mesh = make_quad();
        // Split the diagonal in the lightmap channel only
        mesh.uv_channels[1][6] = 0.2;
        let bytes = write_glb(&mesh).unwrap();
        let (doc, _buffers, _images) = gltf::import_slice(&bytes).unwrap();
        let prim = doc.meshes().next().unwrap().primitives().next().unwrap();
        assert_eq!(prim.get(&Semantic::Positions).unwrap().count(), 5);
    }

    #[test]
    fn glb_u16_indices_for_small_mesh() {
        let bytes = write_glb(&make_quad()).unwrap();
        let (doc, _buffers, _images) = gltf::import_slice(&bytes).unwrap();
        let prim = doc.meshes().next().unwrap().primitives().next().unwrap();
        let idx = prim.indices().unwrap();
        assert_eq!(idx.data_type(), gltf::accessor::DataType::U16);
    }

    #[test]
    fn glb_empty_mesh() {
        let bytes = write_glb(&IndexedMesh::default()).unwrap();
        let glb = Glb::from_slice(&bytes).expect("empty GLB should be parseable");
        assert!(glb.bin.is_none());
    }

    #[test]
    fn position_bounds_correct() {
        let (min, max) = compute_position_bounds(&[1.0, -2.0, 3.0, -1.0, 5.0, 0.0]);
        assert_eq!(min, [-1.0, -2.0, 0.0]);
        assert_eq!(max, [1.0, 5.0, 3.0]);
    }
}
