use std::path::PathBuf;

use clap::Parser;

/// Chart finding and packing policy.
///
/// Later versions only add behavior: a mesh laid out with an older version
/// keeps producing the same UVs as long as that version is requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum LayoutVersion {
    /// Bit-by-bit placement search, every orientation rasterized, no chart joining.
    #[value(name = "legacy")]
    Legacy,
    /// Row-span placement search, mirrored orientations reuse the previous raster,
    /// charts with congruent straight borders are joined.
    #[value(name = "segmented")]
    Segmented,
    /// Segmented plus a finer UV tolerance for sub-texel charts.
    #[default]
    #[value(name = "small-chart")]
    SmallChartPacking,
}

impl LayoutVersion {
    pub const LATEST: LayoutVersion = LayoutVersion::SmallChartPacking;

    /// Tolerance under which two UV coordinates are considered equal.
    pub fn uv_epsilon(self) -> f32 {
        if self >= LayoutVersion::SmallChartPacking {
            1.0 / 8192.0
        } else {
            1.0 / 1024.0
        }
    }

    pub fn joins_charts(self) -> bool {
        self >= LayoutVersion::Segmented
    }

    /// Whether mirrored orientations are derived by flipping the previous raster.
    pub fn flips_rasters(self) -> bool {
        self >= LayoutVersion::Segmented
    }

    pub fn uses_segments(self) -> bool {
        self >= LayoutVersion::Segmented
    }
}

impl std::fmt::Display for LayoutVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutVersion::Legacy => write!(f, "legacy"),
            LayoutVersion::Segmented => write!(f, "segmented"),
            LayoutVersion::SmallChartPacking => write!(f, "small-chart"),
        }
    }
}

/// Atlas layout parameters for a single mesh.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Atlas edge length in texels.
    pub resolution: u32,
    /// UV channel the charts are read from.
    pub src_channel: usize,
    /// UV channel the packed layout is written to.
    pub dst_channel: usize,
    pub version: LayoutVersion,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            resolution: 64,
            src_channel: 0,
            dst_channel: 1,
            version: LayoutVersion::LATEST,
        }
    }
}

/// Fully resolved pipeline configuration (constructed from CLI args).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub layout: LayoutConfig,
    pub write_masks: bool,
    pub dry_run: bool,
    pub verbose: bool,
    pub threads: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            layout: LayoutConfig::default(),
            write_masks: false,
            dry_run: false,
            verbose: false,
            threads: None,
        }
    }
}

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "lightmap-packer",
    about = "Lightmap UV chart finder and atlas packer",
    version
)]
pub struct CliArgs {
    /// Input file (OBJ, glTF, GLB)
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Output directory
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// Atlas resolution in texels
    #[arg(short = 'r', long, default_value_t = 64)]
    pub resolution: u32,

    /// Source UV channel
    #[arg(long, default_value_t = 0)]
    pub src_channel: usize,

    /// Destination UV channel
    #[arg(long, default_value_t = 1)]
    pub dst_channel: usize,

    /// Layout version: legacy, segmented, or small-chart
    #[arg(long, value_enum, default_value = "small-chart")]
    pub layout_version: LayoutVersion,

    /// Write a PNG of the atlas occupancy per mesh
    #[arg(long)]
    pub write_masks: bool,

    /// Scan input and report stats only
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Worker thread count (default: all cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,
}

impl From<CliArgs> for PipelineConfig {
    fn from(args: CliArgs) -> Self {
        PipelineConfig {
            input: args.input,
            output: args.output,
            layout: LayoutConfig {
                resolution: args.resolution,
                src_channel: args.src_channel,
                dst_channel: args.dst_channel,
                version: args.layout_version,
            },
            write_masks: args.write_masks,
            dry_run: args.dry_run,
            verbose: args.verbose,
            threads: args.threads,
        }
    }
}
