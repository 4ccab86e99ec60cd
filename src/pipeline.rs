use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::{LayoutConfig, PipelineConfig};
use crate::error::Result;
use crate::ingestion::{self, IngestionResult, LoadedMesh};
use crate::layout::{Allocator2D, LayoutUv, OverlappingCorners, POSITION_THRESHOLD};
use crate::output::{self, LayoutReport, MeshPaths, MeshReport};

/// Summary of a completed pipeline run.
#[derive(Debug)]
pub struct ProcessingResult {
    pub mesh_count: usize,
    pub packed_count: usize,
    pub duration: Duration,
}

/// Layout result for one mesh, before anything is written.
#[derive(Debug)]
pub struct MeshOutcome {
    pub report: MeshReport,
    /// Atlas occupancy, present when the mesh was packed
    pub occupancy: Option<Allocator2D>,
}

/// Pipeline orchestrator -- drives ingestion, layout and output.
pub struct Pipeline;

impl Pipeline {
    /// Run the full lightmap layout pipeline.
    pub fn run(config: &PipelineConfig) -> Result<ProcessingResult> {
        let start = Instant::now();

        info!(input = %config.input.display(), "Starting pipeline");

        if config.dry_run {
            info!("--dry-run: scanning input only");
            let ingestion_result = ingestion::ingest(config)?;
            print_dry_run_summary(&ingestion_result, &config.layout);
            return Ok(ProcessingResult {
                mesh_count: ingestion_result.meshes.len(),
                packed_count: 0,
                duration: start.elapsed(),
            });
        }

        info!("Stage 1/3: Ingestion");
        let IngestionResult { mut meshes, .. } = ingestion::ingest(config)?;

        info!("Stage 2/3: Layout");
        let outcomes = Self::layout(&mut meshes, &config.layout)?;

        info!("Stage 3/3: Output");
        let report = Self::write_outputs(config, &meshes, outcomes)?;

        let duration = start.elapsed();
        let packed_count = report.packed_count();
        info!(
            meshes = meshes.len(),
            packed = packed_count,
            elapsed = ?duration,
            "Pipeline complete"
        );

        Ok(ProcessingResult {
            mesh_count: meshes.len(),
            packed_count,
            duration,
        })
    }

    /// Lay out every mesh in parallel, writing packed UVs into each mesh.
    pub fn layout(meshes: &mut [LoadedMesh], config: &LayoutConfig) -> Result<Vec<MeshOutcome>> {
        meshes
            .par_iter_mut()
            .map(|loaded| layout_mesh(loaded, config))
            .collect()
    }

    fn write_outputs(
        config: &PipelineConfig,
        meshes: &[LoadedMesh],
        outcomes: Vec<MeshOutcome>,
    ) -> Result<LayoutReport> {
        output::prepare_output_dir(&config.output)?;

        let stem = config
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("mesh");

        meshes
            .par_iter()
            .zip(outcomes.par_iter())
            .try_for_each(|(loaded, outcome)| -> Result<()> {
                let paths = MeshPaths::new(&config.output, stem, &loaded.name);
                output::write_mesh_glb(&loaded.mesh, &paths.glb)?;
                if config.write_masks
                    && let Some(occupancy) = &outcome.occupancy
                {
                    output::mask::write_mask(occupancy, &paths.mask)?;
                }
                Ok(())
            })?;

        let report = LayoutReport::new(
            &config.layout,
            outcomes.into_iter().map(|o| o.report).collect(),
        );
        output::report::write_report(&report, &config.output)?;
        Ok(report)
    }
}

/// Find charts, pack them and commit the result for a single mesh.
///
/// Meshes without geometry or without the source channel are reported as
/// skipped rather than failing the run.
pub fn layout_mesh(loaded: &mut LoadedMesh, config: &LayoutConfig) -> Result<MeshOutcome> {
    let name = loaded.name.as_str();
    let mesh = &mut loaded.mesh;

    if mesh.is_empty() {
        warn!(mesh = name, "Skipping empty mesh");
        return Ok(MeshOutcome {
            report: MeshReport::skipped(name, 0, "empty mesh"),
            occupancy: None,
        });
    }
    if !mesh.has_uvs(config.src_channel) {
        warn!(mesh = name, channel = config.src_channel, "Skipping mesh without source UV channel");
        return Ok(MeshOutcome {
            report: MeshReport::skipped(
                name,
                mesh.triangle_count(),
                format!("missing UV channel {}", config.src_channel),
            ),
            occupancy: None,
        });
    }

    mesh.ensure_normals();
    let overlaps = OverlappingCorners::find(&*mesh, POSITION_THRESHOLD);

    let mut layout = LayoutUv::new(mesh, config)?;
    let chart_count = layout.find_charts(&overlaps)?;

    let occupancy = if layout.find_best_packing() {
        layout.commit_packed_uvs()?;
        Some(layout.layout_raster().clone())
    } else {
        warn!(mesh = name, charts = chart_count, "Charts do not fit the atlas");
        None
    };

    let report = MeshReport::from_layout(name, &layout);
    info!(
        mesh = name,
        charts = chart_count,
        packed = report.packed,
        scale = report.uv_scale,
        "Mesh laid out"
    );

    Ok(MeshOutcome { report, occupancy })
}

/// Print dry-run summary with mesh stats and layout settings.
fn print_dry_run_summary(ingestion: &IngestionResult, layout: &LayoutConfig) {
    let stats = &ingestion.stats;
    println!("=== Dry Run Summary ===");
    println!("  Format:      {}", stats.input_format);
    println!("  Meshes:      {}", stats.total_meshes);
    println!("  Vertices:    {}", stats.total_vertices);
    println!("  Triangles:   {}", stats.total_triangles);
    println!("  Normals:     {}", if stats.has_normals { "yes" } else { "no" });
    println!("  UV channels: {}", stats.max_uv_channels);
    println!();
    println!("=== Layout ===");
    println!("  Resolution:  {0}x{0}", layout.resolution);
    println!("  Channels:    {} -> {}", layout.src_channel, layout.dst_channel);
    println!("  Version:     {}", layout.version);

    let missing: Vec<&str> = ingestion
        .meshes
        .iter()
        .filter(|m| !m.mesh.has_uvs(layout.src_channel))
        .map(|m| m.name.as_str())
        .collect();
    if !missing.is_empty() {
        println!("  Without source channel: {}", missing.join(", "));
    }
}
