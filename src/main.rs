//! Sharkmap CLI - shark presence heat maps from synthetic ocean data.
//!
//! Generates a land-masked synthetic corpus, trains a presence model on it
//! and renders a thresholded heat map artifact.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sharkmap::export::ArtifactFormat;
use sharkmap::landmask::DEFAULT_COASTLINE_PATH;
use sharkmap::model::TrainingTarget;
use sharkmap::pipeline::{
    load_land_mask, run_generate, run_heatmap_with, ArtifactDestination, ErrorKind, GenerateParams, HeatmapParams,
    PipelineError, DEFAULT_CORPUS_PATH,
};
use sharkmap::render::IntensityTransform;
use sharkmap::samples::{read_corpus, summarize, SamplerConfig};
use sharkmap::store::{ArtifactStore, DirectoryStore};

/// Shark presence heat map generator.
#[derive(Parser)]
#[command(name = "sharkmap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic ocean-only corpus.
    Generate {
        /// Number of samples.
        #[arg(short = 'n', long, default_value = "1000")]
        num_samples: usize,

        /// Random seed for reproducible generation (clock-derived if unset).
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output CSV path.
        #[arg(short, long, default_value = DEFAULT_CORPUS_PATH)]
        output: PathBuf,

        /// Land polygon shapefile.
        #[arg(long, default_value = DEFAULT_COASTLINE_PATH)]
        coastline: PathBuf,

        /// Rejection budget per requested sample.
        #[arg(long, default_value = "1000")]
        max_attempts: usize,
    },

    /// Train the model and render a heat map.
    Heatmap {
        /// JSON parameter file; flags below override its values.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Input corpus CSV.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output artifact path.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Grid resolution in degrees.
        #[arg(long)]
        grid_res: Option<f64>,

        /// Presence probability threshold.
        #[arg(long)]
        prob_threshold: Option<f64>,

        /// Held-out test fraction.
        #[arg(long)]
        test_size: Option<f64>,

        /// Number of trees.
        #[arg(long)]
        n_est: Option<usize>,

        /// Land polygon shapefile.
        #[arg(long)]
        coastline: Option<PathBuf>,

        /// Training target.
        #[arg(long)]
        target: Option<TargetArg>,

        /// Intensity exponent (score^gamma); linear when unset.
        #[arg(long)]
        gamma: Option<f64>,

        /// Artifact format (inferred from the output extension when unset).
        #[arg(short, long)]
        format: Option<FormatArg>,

        /// Write into this store directory under a timestamped name instead of `--out`.
        #[arg(long)]
        store: Option<PathBuf>,

        /// Print the run report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List stored heat maps, newest first.
    List {
        /// Store directory.
        #[arg(long, default_value = "maps")]
        store: PathBuf,

        /// Only list artifacts with this extension.
        #[arg(long, default_value = "html")]
        extension: String,

        /// List every artifact regardless of extension.
        #[arg(long)]
        all: bool,
    },

    /// Summarize a corpus.
    Info {
        /// Corpus CSV.
        #[arg(short, long, default_value = DEFAULT_CORPUS_PATH)]
        input: PathBuf,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TargetArg {
    /// Mean of per-covariate optimality terms.
    Heuristic,
    /// Weighted linear blend normalized by the corpus maximum.
    LinearBlend,
}

impl From<TargetArg> for TrainingTarget {
    fn from(t: TargetArg) -> Self {
        match t {
            TargetArg::Heuristic => TrainingTarget::Heuristic,
            TargetArg::LinearBlend => TrainingTarget::LinearBlend,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Interactive Leaflet page.
    Html,
    /// Heat layer as JSON.
    Json,
    /// Equirectangular RGBA raster.
    Png,
}

impl From<FormatArg> for ArtifactFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Html => ArtifactFormat::Html,
            FormatArg::Json => ArtifactFormat::Json,
            FormatArg::Png => ArtifactFormat::Png,
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Warning: a global tracing subscriber was already installed");
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Generate {
            num_samples,
            seed,
            output,
            coastline,
            max_attempts,
        } => {
            let params = GenerateParams {
                output,
                coastline,
                sampler: SamplerConfig {
                    num_samples,
                    seed,
                    max_attempts_per_sample: max_attempts,
                    ..Default::default()
                },
            };
            cmd_generate(&params)
        }
        Commands::Heatmap {
            config,
            input,
            out,
            grid_res,
            prob_threshold,
            test_size,
            n_est,
            coastline,
            target,
            gamma,
            format,
            store,
            json,
        } => {
            let params = match config {
                Some(path) => HeatmapParams::from_json_file(&path),
                None => Ok(HeatmapParams::default()),
            };
            params.and_then(|mut params| {
                if let Some(v) = input {
                    params.input = v;
                }
                if let Some(v) = out {
                    params.output = v;
                }
                if let Some(v) = grid_res {
                    params.grid_resolution = v;
                }
                if let Some(v) = prob_threshold {
                    params.threshold = v;
                }
                if let Some(v) = test_size {
                    params.test_size = v;
                }
                if let Some(v) = n_est {
                    params.n_estimators = v;
                }
                if let Some(v) = coastline {
                    params.coastline = v;
                }
                if let Some(v) = target {
                    params.target = v.into();
                }
                if let Some(gamma) = gamma {
                    params.transform = IntensityTransform::Power { gamma };
                }
                if let Some(v) = format {
                    params.format = Some(v.into());
                }
                cmd_heatmap(&params, store, json)
            })
        }
        Commands::List { store, extension, all } => cmd_list(store, &extension, all),
        Commands::Info { input, json } => cmd_info(&input, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_generate(params: &GenerateParams) -> Result<(), PipelineError> {
    println!("Sharkmap - Synthetic Ocean Corpus");
    println!("=================================");
    println!("Samples: {}", params.sampler.num_samples);
    match params.sampler.seed {
        Some(seed) => println!("Seed: {seed}"),
        None => println!("Seed: (clock)"),
    }
    println!("Coastline: {}", params.coastline.display());

    let report = run_generate(params)?;
    println!(
        "\nWrote {} ocean samples to {} in {:.2}s",
        report.samples,
        report.output.display(),
        report.elapsed_ms as f64 / 1000.0
    );
    Ok(())
}

fn cmd_heatmap(params: &HeatmapParams, store: Option<PathBuf>, json: bool) -> Result<(), PipelineError> {
    params.validate()?;
    let format = params.artifact_format()?;

    let destination = match store {
        Some(dir) => {
            let store = DirectoryStore::open(&dir).map_err(|e| PipelineError::from_stage("store", e))?;
            let id = format!(
                "{}.{}",
                chrono::Local::now().format("shark_heatmap_%Y%m%d_%H%M%S"),
                format.extension()
            );
            ArtifactDestination::Store {
                store: Arc::new(store),
                id,
            }
        }
        None => ArtifactDestination::Path(params.output.clone()),
    };

    if !json {
        println!("Sharkmap - Shark Presence Heat Map");
        println!("==================================");
        println!("Input: {}", params.input.display());
        println!("Grid resolution: {} deg", params.grid_resolution);
        println!("Threshold: {}", params.threshold);
        println!("Trees: {} (test fraction {})", params.n_estimators, params.test_size);
        println!();
    }

    let mask = load_land_mask(&params.coastline)?;
    info!("{}", mask.statistics());

    let report = run_heatmap_with(
        params,
        mask,
        destination,
        |name, i, total| {
            if !json {
                println!("[{}/{}] {}...", i + 1, total, name);
            }
        },
        |_, _, _| {},
    )?;

    if json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| PipelineError::new(ErrorKind::Io, "report", e.to_string()))?;
        println!("{text}");
    } else {
        println!("\n{}", report.metrics);
        println!(
            "Cells: {} total, {} ocean, {} land",
            report.total_cells, report.ocean_cells, report.land_cells
        );
        println!("Hotspots: {} (P >= {})", report.hotspots, report.threshold);
        println!("Saved {}", report.artifact.display());
    }
    Ok(())
}

fn cmd_list(store: PathBuf, extension: &str, all: bool) -> Result<(), PipelineError> {
    let mut store = DirectoryStore::open(&store).map_err(|e| PipelineError::from_stage("store", e))?;
    if !all {
        store = store.with_extension(extension);
    }
    let ids = store.list().map_err(|e| PipelineError::from_stage("store", e))?;
    if ids.is_empty() {
        println!("No artifacts in {}", store.root().display());
    }
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

fn cmd_info(input: &std::path::Path, json: bool) -> Result<(), PipelineError> {
    let samples = read_corpus(input).map_err(|e| PipelineError::from_stage("corpus-load", e))?;
    let summary = summarize(&samples).map_err(|e| PipelineError::from_stage("corpus-load", e))?;

    if json {
        let text = serde_json::to_string_pretty(&summary)
            .map_err(|e| PipelineError::new(ErrorKind::Io, "report", e.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    println!("Corpus: {}", input.display());
    println!("Rows: {}", summary.rows);
    println!("Columns: {}", summary.columns.join(", "));
    println!(
        "Latitude: {:.3} to {:.3}",
        summary.bounds.lat_min, summary.bounds.lat_max
    );
    println!(
        "Longitude: {:.3} to {:.3}",
        summary.bounds.lon_min, summary.bounds.lon_max
    );
    println!("Mean SST: {:.2} C", summary.sst_mean);
    println!("Mean chlorophyll: {:.3} mg/m3", summary.chlor_mean);
    println!("Mean depth: {:.1} m", summary.depth_mean);
    Ok(())
}
