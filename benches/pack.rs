use criterion::{Criterion, criterion_group, criterion_main};
use lightmap_packer::config::{LayoutConfig, LayoutVersion};
use lightmap_packer::layout::{LayoutUv, OverlappingCorners, POSITION_THRESHOLD};
use lightmap_packer::types::IndexedMesh;

/// Generate `n x n` separate quads of varying size, each with its own UV square.
///
/// Every quad becomes one chart, so the grid size drives the packer.
fn make_quad_grid(n: usize) -> IndexedMesh {
    let mut mesh = IndexedMesh {
        uv_channels: vec![Vec::new()],
        ..Default::default()
    };

    for y in 0..n {
        for x in 0..n {
            let w = 1.0 + (x % 3) as f32 * 0.5;
            let h = 1.0 + (y % 4) as f32 * 0.25;
            let ox = x as f32 * 4.0;
            let oy = y as f32 * 4.0;
            let corners = [
                ([ox, oy], [0.0, 0.0]),
                ([ox + w, oy], [1.0, 0.0]),
                ([ox + w, oy + h], [1.0, 1.0]),
                ([ox, oy], [0.0, 0.0]),
                ([ox + w, oy + h], [1.0, 1.0]),
                ([ox, oy + h], [0.0, 1.0]),
            ];
            for (pos, uv) in corners {
                mesh.indices.push(mesh.vertex_count() as u32);
                mesh.positions.extend_from_slice(&[pos[0], pos[1], 0.0]);
                mesh.normals.extend_from_slice(&[0.0, 0.0, 1.0]);
                mesh.uv_channels[0].extend_from_slice(&uv);
            }
        }
    }

    mesh
}

/// Generate a connected `n x n` grid with a continuous UV mapping (a single chart).
fn make_connected_grid(n: usize) -> IndexedMesh {
    let verts = n + 1;
    let mut positions = Vec::with_capacity(verts * verts * 3);
    for y in 0..verts {
        for x in 0..verts {
            positions.extend_from_slice(&[x as f32 / n as f32, y as f32 / n as f32, 0.0]);
        }
    }

    let mut indices = Vec::new();
    for y in 0..n {
        for x in 0..n {
            let tl = (y * verts + x) as u32;
            let tr = tl + 1;
            let bl = tl + verts as u32;
            let br = bl + 1;
            indices.extend_from_slice(&[tl, bl, tr, tr, bl, br]);
        }
    }

    let uvs: Vec<f32> = indices
        .iter()
        .flat_map(|&i| [positions[i as usize * 3], positions[i as usize * 3 + 1]])
        .collect();

    IndexedMesh {
        normals: [0.0, 0.0, 1.0].repeat(indices.len()),
        positions,
        indices,
        uv_channels: vec![uvs],
    }
}

fn lay_out(mesh: &IndexedMesh, config: &LayoutConfig) -> bool {
    let mut mesh = mesh.clone();
    let overlaps = OverlappingCorners::find(&mesh, POSITION_THRESHOLD);
    let Ok(mut layout) = LayoutUv::new(&mut mesh, config) else {
        return false;
    };
    if layout.find_charts(&overlaps).is_err() {
        return false;
    }
    layout.find_best_packing()
}

fn bench_find_charts(c: &mut Criterion) {
    // ~20K triangles, one chart: exercises union-find over shared edges
    let mesh = make_connected_grid(100);
    let overlaps = OverlappingCorners::find(&mesh, POSITION_THRESHOLD);
    let config = LayoutConfig::default();

    c.bench_function("find_charts_connected_20k", |b| {
        b.iter(|| {
            let mut mesh = mesh.clone();
            let mut layout = LayoutUv::new(&mut mesh, &config).ok()?;
            layout.find_charts(&overlaps).ok()
        });
    });
}

fn bench_pack(c: &mut Criterion) {
    // 256 charts into a 256x256 atlas
    let mesh = make_quad_grid(16);

    for version in [LayoutVersion::Legacy, LayoutVersion::LATEST] {
        let config = LayoutConfig {
            resolution: 256,
            version,
            ..Default::default()
        };
        c.bench_function(&format!("find_best_packing_256_charts_{version}"), |b| {
            b.iter(|| lay_out(&mesh, &config));
        });
    }
}

criterion_group!(benches, bench_find_charts, bench_pack);
criterion_main!(benches);
