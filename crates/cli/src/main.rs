//! scarmap CLI - landslide detection from pre/post-event imagery

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use scarmap_algorithms::config::DetectionConfig;
use scarmap_algorithms::imagery::{change_index, decode_change_index, ChangeIndexParams};
use scarmap_algorithms::pipeline::{LandslideDetector, SceneInputs};
use scarmap_algorithms::scoring::{summarize_polygons, EmptyZonePolicy, ZonalInputs};
use scarmap_algorithms::terrain::slope;
use scarmap_algorithms::vector::rasterize_mask;
use scarmap_core::io::{read_geojson, read_geotiff, write_geojson, write_geotiff, GeoTiffOptions};
use scarmap_core::{Raster, RasterElement};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "scarmap")]
#[command(author, version, about = "Landslide detection and confidence scoring", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Run the full detection and write scored landslide polygons
    Detect(DetectArgs),
    /// Score existing polygons against slope, DEM and change index rasters
    Score(ScoreArgs),
    /// Compute the change index between two vegetation index rasters
    ChangeIndex {
        /// Pre-event NDVI
        pre: PathBuf,
        /// Post-event NDVI
        post: PathBuf,
        /// Output file (Int32, scale 0.0001, nodata -32768)
        output: PathBuf,
        /// Scale factor applied to the pre-event raster
        #[arg(long, default_value = "1.0")]
        pre_scale: f64,
        /// Scale factor applied to the post-event raster
        #[arg(long, default_value = "1.0")]
        post_scale: f64,
    },
    /// Calculate slope in degrees from a DEM (Horn)
    Slope {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
    },
    /// Print the default configuration as JSON
    Config,
}

/// Options shared by `detect` and `score`
#[derive(Args)]
struct ConfigArgs {
    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Minimum landslide area in CRS units squared (0 disables cleanup)
    #[arg(long)]
    min_area: Option<f64>,
    /// Export additional slope/elevation statistics
    #[arg(long)]
    extra_fields: bool,
    /// Abort instead of skipping polygons without valid pixels
    #[arg(long)]
    fail_on_empty: bool,
}

#[derive(Args)]
struct DetectArgs {
    /// Pre-event NDVI
    #[arg(long)]
    pre_ndvi: PathBuf,
    /// Post-event NDVI
    #[arg(long)]
    post_ndvi: PathBuf,
    /// Post-event NDWI
    #[arg(long)]
    post_ndwi: PathBuf,
    /// Digital elevation model
    #[arg(long)]
    dem: PathBuf,
    /// Slope in degrees; derived from the DEM when omitted
    #[arg(long)]
    slope: Option<PathBuf>,
    /// Artificial surface mask (1 = artificial)
    #[arg(long)]
    artificial: Option<PathBuf>,
    /// Area of interest (GeoJSON polygons)
    #[arg(long)]
    aoi: Option<PathBuf>,
    /// Output GeoJSON with scored polygons
    #[arg(short, long)]
    output: PathBuf,
    /// Also write the final landslide mask
    #[arg(long)]
    mask_output: Option<PathBuf>,
    /// Focal window size (odd)
    #[arg(long)]
    kernel_size: Option<usize>,
    /// Upper NDVI bound for the focal filter
    #[arg(long)]
    ndvi_threshold: Option<f64>,
    /// Fraction of the focal window required
    #[arg(long)]
    coverage_threshold: Option<f64>,
    /// Change index threshold (physical units)
    #[arg(long)]
    rdndvi_threshold: Option<f64>,
    /// Scale factor applied to the pre-event NDVI
    #[arg(long)]
    pre_scale: Option<f64>,
    /// Scale factor applied to the post-event NDVI
    #[arg(long)]
    post_scale: Option<f64>,
    #[command(flatten)]
    common: ConfigArgs,
}

#[derive(Args)]
struct ScoreArgs {
    /// Input polygons (GeoJSON)
    polygons: PathBuf,
    /// Output GeoJSON
    output: PathBuf,
    /// DEM on the grid of the other rasters
    #[arg(long)]
    dem: PathBuf,
    /// Stored change index raster (Int32, scale 0.0001)
    #[arg(long)]
    change_index: PathBuf,
    /// Slope in degrees; derived from the DEM when omitted
    #[arg(long)]
    slope: Option<PathBuf>,
    #[command(flatten)]
    common: ConfigArgs,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn read_raster<T: RasterElement>(path: &Path) -> Result<Raster<T>> {
    let pb = spinner(&format!("Reading {}...", path.display()))?;
    let raster: Raster<T> =
        read_geotiff(path, None).with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} ({} x {})", path.display(), raster.cols(), raster.rows());
    Ok(raster)
}

fn write_raster<T: RasterElement>(raster: &Raster<T>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...")?;
    write_geotiff(raster, path, Some(GeoTiffOptions::default())).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn load_config(args: &ConfigArgs) -> Result<DetectionConfig> {
    let mut config = match &args.config {
        Some(path) => DetectionConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => DetectionConfig::default(),
    };
    if let Some(min_area) = args.min_area {
        config.min_area = min_area;
    }
    if args.extra_fields {
        config.extra_fields = true;
    }
    if args.fail_on_empty {
        config.empty_zone = EmptyZonePolicy::Fail;
    }
    Ok(config)
}

fn detect_config(args: &DetectArgs) -> Result<DetectionConfig> {
    let mut config = load_config(&args.common)?;
    if let Some(v) = args.kernel_size {
        config.kernel_size = v;
    }
    if let Some(v) = args.ndvi_threshold {
        config.ndvi_threshold = v;
    }
    if let Some(v) = args.coverage_threshold {
        config.coverage_threshold = v;
    }
    if let Some(v) = args.rdndvi_threshold {
        config.rdndvi_threshold = v;
    }
    if let Some(v) = args.pre_scale {
        config.pre_scale = v;
    }
    if let Some(v) = args.post_scale {
        config.post_scale = v;
    }
    Ok(config)
}

fn report_skipped(skipped: usize) {
    if skipped > 0 {
        warn!("{} polygon(s) skipped for lack of valid pixels", skipped);
    }
}

// ─── Commands ───────────────────────────────────────────────────────────

fn run_detect(args: DetectArgs) -> Result<()> {
    let config = detect_config(&args)?;
    let detector = LandslideDetector::new(config).context("Invalid configuration")?;

    let pre = read_raster::<f64>(&args.pre_ndvi)?;
    let post = read_raster::<f64>(&args.post_ndvi)?;
    let ndwi = read_raster::<f64>(&args.post_ndwi)?;
    let dem = read_raster::<f64>(&args.dem)?;
    let slope_raster = args.slope.as_deref().map(read_raster::<f64>).transpose()?;
    let artificial = args.artificial.as_deref().map(read_raster::<u8>).transpose()?;
    let aoi = match &args.aoi {
        Some(path) => {
            let features = read_geojson(path).with_context(|| format!("Failed to read AOI {}", path.display()))?;
            Some(rasterize_mask(&features, &pre).context("Failed to rasterize AOI")?)
        }
        None => None,
    };

    let mut scene = SceneInputs::new(&pre, &post, &ndwi, &dem);
    if let Some(s) = slope_raster.as_ref() {
        scene = scene.with_slope(s);
    }
    if let Some(a) = artificial.as_ref() {
        scene = scene.with_artificial(a);
    }
    if let Some(a) = aoi.as_ref() {
        scene = scene.with_aoi(a);
    }

    let pb = spinner("Detecting landslides...")?;
    let start = Instant::now();
    let detection = detector.detect(&scene).context("Detection failed")?;
    let elapsed = start.elapsed();
    pb.finish_and_clear();

    println!(
        "Landslides: {} polygon(s), {} pixel(s)",
        detection.scored.len(),
        detection.final_mask.count_set()
    );
    report_skipped(detection.skipped().len());

    if let Some(path) = &args.mask_output {
        write_raster(&detection.final_mask, path)?;
        println!("Mask saved to: {}", path.display());
    }
    write_geojson(&detection.to_feature_collection(), &args.output).context("Failed to write polygons")?;
    done("Landslides", &args.output, elapsed);
    Ok(())
}

fn run_score(args: ScoreArgs) -> Result<()> {
    let config = load_config(&args.common)?;
    config.validate().context("Invalid configuration")?;

    let features = read_geojson(&args.polygons)
        .with_context(|| format!("Failed to read polygons {}", args.polygons.display()))?;
    let dem = read_raster::<f64>(&args.dem)?;
    let index = read_raster::<i32>(&args.change_index)?;
    let slope_raster = match &args.slope {
        Some(path) => read_raster::<f64>(path)?,
        None => slope(&dem).context("Failed to calculate slope")?,
    };

    let start = Instant::now();
    let rdndvi = decode_change_index(&index)?;
    let inputs = ZonalInputs {
        slope: &slope_raster,
        elevation: &dem,
        rdndvi: &rdndvi,
    };
    let scored = summarize_polygons(&features, &inputs, config.extra_fields, config.empty_zone)
        .context("Failed to summarize polygons")?
        .score(&config.weights)
        .context("Failed to score polygons")?;
    let elapsed = start.elapsed();

    println!("Scored {} polygon(s)", scored.len());
    report_skipped(scored.skipped.len());
    write_geojson(&scored.to_feature_collection(), &args.output).context("Failed to write polygons")?;
    done("Scored polygons", &args.output, elapsed);
    Ok(())
}

fn run_info(input: &Path) -> Result<()> {
    let raster = read_raster::<f64>(input)?;
    let (rows, cols) = raster.shape();
    let bounds = raster.bounds();
    let stats = raster.statistics();

    println!("File: {}", input.display());
    println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
    println!("Cell size: {}", raster.cell_size());
    println!(
        "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
        bounds.0, bounds.1, bounds.2, bounds.3
    );
    if let Some(crs) = raster.crs() {
        println!("CRS: {}", crs.identifier());
    }
    if let Some(nodata) = raster.nodata() {
        println!("NoData: {}", nodata);
    }
    println!("\nStatistics:");
    if let Some(min) = stats.min {
        println!("  Min: {:.4}", min);
    }
    if let Some(max) = stats.max {
        println!("  Max: {:.4}", max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.4}", mean);
    }
    println!(
        "  Valid cells: {} ({:.1}%)",
        stats.valid_count,
        100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => run_info(&input)?,

        Commands::Detect(args) => run_detect(args)?,

        Commands::Score(args) => run_score(args)?,

        Commands::ChangeIndex {
            pre,
            post,
            output,
            pre_scale,
            post_scale,
        } => {
            let pre = read_raster::<f64>(&pre)?;
            let post = read_raster::<f64>(&post)?;
            let start = Instant::now();
            let result = change_index(&pre, &post, ChangeIndexParams { pre_scale, post_scale })
                .context("Failed to calculate change index")?;
            let elapsed = start.elapsed();
            write_raster(&result, &output)?;
            done("Change index", &output, elapsed);
        }

        Commands::Slope { input, output } => {
            let dem = read_raster::<f64>(&input)?;
            let start = Instant::now();
            let result = slope(&dem).context("Failed to calculate slope")?;
            let elapsed = start.elapsed();
            write_raster(&result, &output)?;
            done("Slope", &output, elapsed);
        }

        Commands::Config => {
            println!("{}", DetectionConfig::default().to_json()?);
        }
    }

    Ok(())
}
