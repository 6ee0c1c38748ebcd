//! Entry points for complete runs: heat maps and corpus generation.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use super::error::{ErrorKind, PipelineError};
use super::params::{GenerateParams, HeatmapParams};
use super::stage::{
    ArtifactDestination, AssignmentStage, CorpusLoadStage, CorpusWriteStage, ExportStage, GridStage, Pipeline,
    RenderStage, RunContext, SamplingStage, TrainingStage,
};
use crate::export::ArtifactFormat;
use crate::landmask::{LandMask, LandQuery};
use crate::model::{ModelMetrics, PresenceScorer};

/// Summary of a finished heat-map run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub metrics: ModelMetrics,
    pub scorer: String,
    pub samples: usize,
    /// Lattice size before land masking.
    pub total_cells: usize,
    pub ocean_cells: usize,
    pub land_cells: usize,
    /// Cells at or above the threshold.
    pub hotspots: usize,
    pub threshold: f64,
    pub artifact: PathBuf,
    pub format: ArtifactFormat,
    pub elapsed_ms: u64,
}

/// Summary of a corpus generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateReport {
    pub samples: usize,
    pub output: PathBuf,
    pub elapsed_ms: u64,
}

/// Loads the land mask named by `path`.
pub fn load_land_mask(path: &std::path::Path) -> Result<Arc<LandMask>, PipelineError> {
    let mask = LandMask::from_shapefile(path).map_err(|e| PipelineError::from_stage("land-mask", e))?;
    Ok(Arc::new(mask))
}

/// Assembles the six heat-map stages.
pub fn heatmap_pipeline(params: &HeatmapParams, destination: ArtifactDestination) -> Result<Pipeline, PipelineError> {
    params.validate()?;
    let mut pipeline = Pipeline::new();
    pipeline
        .add_stage(CorpusLoadStage {
            path: params.input.clone(),
        })
        .add_stage(TrainingStage {
            config: params.model_config(),
        })
        .add_stage(GridStage {
            spec: params.grid_spec(),
        })
        .add_stage(AssignmentStage)
        .add_stage(RenderStage {
            config: params.render_config(),
        })
        .add_stage(ExportStage {
            destination,
            format: params.artifact_format()?,
        });
    Ok(pipeline)
}

/// Runs the full heat-map pipeline with an already loaded mask.
///
/// # Arguments
/// * `params` - Run parameters
/// * `mask` - Land mask for the grid
/// * `destination` - Where the artifact goes
/// * `on_stage_start` / `on_stage_complete` - Progress callbacks
pub fn run_heatmap_with<F1, F2>(
    params: &HeatmapParams,
    mask: Arc<dyn LandQuery>,
    destination: ArtifactDestination,
    on_stage_start: F1,
    on_stage_complete: F2,
) -> Result<RunReport, PipelineError>
where
    F1: FnMut(&str, usize, usize),
    F2: FnMut(&str, usize, usize),
{
    let start = Instant::now();
    let pipeline = heatmap_pipeline(params, destination)?;
    let mut ctx = RunContext::new(mask);
    pipeline.run_with_callbacks(&mut ctx, on_stage_start, on_stage_complete)?;

    let incomplete = |what: &str| PipelineError::new(ErrorKind::Internal, "report", format!("run finished without {what}"));
    let model = ctx.model.as_ref().ok_or_else(|| incomplete("a model"))?;
    let grid = ctx.grid.as_ref().ok_or_else(|| incomplete("a grid"))?;
    let layer = ctx.layer.as_ref().ok_or_else(|| incomplete("a heat layer"))?;
    let artifact = ctx.artifact.clone().ok_or_else(|| incomplete("an artifact"))?;

    let report = RunReport {
        metrics: *model.metrics(),
        scorer: model.name().to_string(),
        samples: ctx.samples.len(),
        total_cells: grid.total_cells(),
        ocean_cells: grid.cells.len(),
        land_cells: grid.land_cells(),
        hotspots: layer.points.len(),
        threshold: params.threshold,
        artifact,
        format: params.artifact_format()?,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    if report.hotspots == 0 {
        warn!(threshold = report.threshold, "no cells reached the threshold; artifact is empty");
    }
    info!(
        hotspots = report.hotspots,
        ocean_cells = report.ocean_cells,
        artifact = %report.artifact.display(),
        "heat map complete"
    );
    Ok(report)
}

/// Runs the heat-map pipeline, loading the mask from `params.coastline` and
/// writing the artifact to `params.output`.
pub fn run_heatmap(params: &HeatmapParams) -> Result<RunReport, PipelineError> {
    params.validate()?;
    let mask = load_land_mask(&params.coastline)?;
    run_heatmap_with(
        params,
        mask,
        ArtifactDestination::Path(params.output.clone()),
        |_, _, _| {},
        |_, _, _| {},
    )
}

/// Handle to a heat-map run executing on a background thread.
pub struct HeatmapJob {
    handle: JoinHandle<Result<RunReport, PipelineError>>,
}

impl HeatmapJob {
    /// True once the run has finished, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the run and returns its outcome.
    pub fn join(self) -> Result<RunReport, PipelineError> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(PipelineError::new(ErrorKind::Internal, "job", "heat-map worker panicked")),
        }
    }
}

/// Starts [`run_heatmap`] on a background thread.
pub fn spawn_heatmap_job(params: HeatmapParams) -> HeatmapJob {
    HeatmapJob {
        handle: std::thread::spawn(move || run_heatmap(&params)),
    }
}

/// Starts a heat-map run with a preloaded mask and explicit destination.
pub fn spawn_heatmap_job_with(
    params: HeatmapParams,
    mask: Arc<dyn LandQuery>,
    destination: ArtifactDestination,
) -> HeatmapJob {
    HeatmapJob {
        handle: std::thread::spawn(move || run_heatmap_with(&params, mask, destination, |_, _, _| {}, |_, _, _| {})),
    }
}

/// Generates a synthetic corpus with the given mask and writes it out.
pub fn run_generate_with(params: &GenerateParams, mask: Arc<dyn LandQuery>) -> Result<GenerateReport, PipelineError> {
    let start = Instant::now();
    let mut pipeline = Pipeline::new();
    pipeline
        .add_stage(SamplingStage {
            config: params.sampler.clone(),
        })
        .add_stage(CorpusWriteStage {
            path: params.output.clone(),
        });

    let mut ctx = RunContext::new(mask);
    pipeline.run(&mut ctx)?;

    let report = GenerateReport {
        samples: ctx.samples.len(),
        output: params.output.clone(),
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    info!(samples = report.samples, output = %report.output.display(), "corpus written");
    Ok(report)
}

/// Generates a synthetic corpus, loading the mask from `params.coastline`.
pub fn run_generate(params: &GenerateParams) -> Result<GenerateReport, PipelineError> {
    let mask = load_land_mask(&params.coastline)?;
    run_generate_with(params, mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmask::tests::toy_world;
    use crate::samples::{read_corpus, SamplerConfig};
    use crate::store::{ArtifactStore, DirectoryStore};
    use tempfile::tempdir;

    fn write_test_corpus(dir: &std::path::Path, n: usize) -> PathBuf {
        let path = dir.join("corpus.csv");
        let params = GenerateParams {
            output: path.clone(),
            coastline: PathBuf::from("unused"),
            sampler: SamplerConfig::with_samples(n, 42),
        };
        run_generate_with(&params, Arc::new(toy_world())).unwrap();
        path
    }

    fn test_params(input: PathBuf, output: PathBuf) -> HeatmapParams {
        HeatmapParams {
            input,
            output,
            grid_resolution: 1.0,
            threshold: 0.4,
            test_size: 0.2,
            n_estimators: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_writes_corpus() {
        let dir = tempdir().unwrap();
        let path = write_test_corpus(dir.path(), 75);
        let samples = read_corpus(&path).unwrap();
        assert_eq!(samples.len(), 75);
    }

    #[test]
    fn test_end_to_end_heatmap() {
        let dir = tempdir().unwrap();
        let input = write_test_corpus(dir.path(), 200);
        let output = dir.path().join("map.html");
        let params = test_params(input, output.clone());

        let mut stages = Vec::new();
        let report = run_heatmap_with(
            &params,
            Arc::new(toy_world()),
            ArtifactDestination::Path(output.clone()),
            |name, _, _| stages.push(name.to_string()),
            |_, _, _| {},
        )
        .unwrap();

        assert_eq!(stages.len(), 6);
        assert!(report.metrics.r2.is_finite());
        assert!(report.metrics.r2 <= 1.0);
        assert_eq!(report.metrics.n_test, 40);
        assert_eq!(report.samples, 200);
        assert_eq!(report.total_cells, report.ocean_cells + report.land_cells);
        assert!(report.hotspots <= report.ocean_cells);
        assert_eq!(report.artifact, output);
        assert_eq!(report.format, ArtifactFormat::Html);

        let html = std::fs::read_to_string(&output).unwrap();
        assert!(html.contains("L.heatLayer"));
    }

    #[test]
    fn test_store_destination_and_listing() {
        let dir = tempdir().unwrap();
        let input = write_test_corpus(dir.path(), 120);
        let store: Arc<dyn ArtifactStore> = Arc::new(DirectoryStore::open(dir.path().join("maps")).unwrap());
        let params = HeatmapParams {
            format: Some(ArtifactFormat::Json),
            ..test_params(input, PathBuf::from("ignored.html"))
        };

        let job = spawn_heatmap_job_with(
            params,
            Arc::new(toy_world()),
            ArtifactDestination::Store {
                store: Arc::clone(&store),
                id: "shark_heatmap_20240101_000000.json".to_string(),
            },
        );
        let report = job.join().unwrap();

        assert_eq!(report.format, ArtifactFormat::Json);
        assert_eq!(store.list().unwrap(), vec!["shark_heatmap_20240101_000000.json".to_string()]);
        let bytes = store.get("shark_heatmap_20240101_000000.json").unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["points"].as_array().unwrap().len(), report.hotspots);
    }

    #[test]
    fn test_missing_input_leaves_no_artifact() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("map.html");
        let params = test_params(dir.path().join("absent.csv"), output.clone());

        let err = run_heatmap_with(
            &params,
            Arc::new(toy_world()),
            ArtifactDestination::Path(output.clone()),
            |_, _, _| {},
            |_, _, _| {},
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.stage(), "corpus-load");
        assert!(!output.exists());
    }

    #[test]
    fn test_background_job_reports_missing_coastline() {
        let dir = tempdir().unwrap();
        let params = HeatmapParams {
            coastline: dir.path().join("no_such_land.shp"),
            ..test_params(dir.path().join("corpus.csv"), dir.path().join("map.html"))
        };

        let err = spawn_heatmap_job(params).join().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Initialization);
        assert_eq!(err.stage(), "land-mask");
    }

    #[test]
    fn test_invalid_params_fail_before_work() {
        let dir = tempdir().unwrap();
        let params = HeatmapParams {
            threshold: f64::NAN,
            ..test_params(dir.path().join("corpus.csv"), dir.path().join("map.html"))
        };
        let err = run_heatmap(&params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
