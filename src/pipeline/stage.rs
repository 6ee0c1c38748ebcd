//! Pipeline stage trait and orchestration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::error::PipelineError;
use crate::export::{encode_layer, export_layer, ArtifactFormat};
use crate::grid::{build_grid, GridSpec, OceanGrid};
use crate::landmask::LandQuery;
use crate::model::{train_model, ModelConfig, TrainedModel};
use crate::render::{render_layer, HeatLayer, RenderConfig, ScoredCell};
use crate::samples::{generate_samples, read_corpus, write_corpus, GeoSample, SamplerConfig};
use crate::spatial::{assign_features, AssignedCell};
use crate::store::ArtifactStore;

/// Unique identifier for pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    /// Rejection sampling of a synthetic corpus.
    Sampling,
    /// Persisting the corpus as CSV.
    CorpusWrite,
    /// Loading a corpus from CSV.
    CorpusLoad,
    /// Forest training and evaluation.
    Training,
    /// Grid enumeration and land masking.
    Grid,
    /// Nearest-sample covariate assignment.
    Assignment,
    /// Scoring and threshold filtering.
    Rendering,
    /// Writing the artifact.
    Export,
}

impl StageId {
    /// Returns the name of the stage.
    pub fn name(&self) -> &'static str {
        match self {
            StageId::Sampling => "sampling",
            StageId::CorpusWrite => "corpus-write",
            StageId::CorpusLoad => "corpus-load",
            StageId::Training => "training",
            StageId::Grid => "grid",
            StageId::Assignment => "assignment",
            StageId::Rendering => "rendering",
            StageId::Export => "export",
        }
    }
}

/// State threaded through the stages of one run.
pub struct RunContext {
    /// Land mask shared by sampling and grid masking.
    pub mask: Arc<dyn LandQuery>,
    pub samples: Vec<GeoSample>,
    pub model: Option<TrainedModel>,
    pub grid: Option<OceanGrid>,
    pub assigned: Vec<AssignedCell>,
    pub scored: Vec<ScoredCell>,
    pub layer: Option<HeatLayer>,
    /// Location of the written artifact.
    pub artifact: Option<PathBuf>,
    /// Wall time per completed stage.
    pub timings: Vec<(StageId, Duration)>,
}

impl RunContext {
    pub fn new(mask: Arc<dyn LandQuery>) -> Self {
        Self {
            mask,
            samples: Vec::new(),
            model: None,
            grid: None,
            assigned: Vec::new(),
            scored: Vec::new(),
            layer: None,
            artifact: None,
            timings: Vec::new(),
        }
    }
}

/// One step of a pipeline.
///
/// Each stage reads what earlier stages left in the [`RunContext`] and adds
/// its own results. Stages never write partial results on failure.
pub trait PipelineStage: Send + Sync {
    /// Returns the unique identifier for this stage.
    fn id(&self) -> StageId;

    /// Returns a human-readable name for the stage.
    fn name(&self) -> &str;

    /// Returns the stage IDs that must be executed before this stage.
    fn dependencies(&self) -> &[StageId] {
        &[]
    }

    /// Executes the stage against the run context.
    ///
    /// # Arguments
    /// * `ctx` - Run state produced by earlier stages
    ///
    /// # Returns
    /// `Ok(())` on success, or an error describing what went wrong
    fn execute(&self, ctx: &mut RunContext) -> Result<(), PipelineError>;
}

/// Orchestrates stages into a complete run.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn PipelineStage>>,
}

impl Pipeline {
    /// Creates a new empty pipeline.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Adds a stage to the pipeline.
    pub fn add_stage<S: PipelineStage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Returns the number of stages in the pipeline.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Executes all stages in order.
    pub fn run(&self, ctx: &mut RunContext) -> Result<(), PipelineError> {
        self.run_with_callbacks(ctx, |_, _, _| {}, |_, _, _| {})
    }

    /// Executes all stages with progress callbacks.
    ///
    /// # Arguments
    /// * `ctx` - Run state
    /// * `on_stage_start` - Called when each stage begins
    /// * `on_stage_complete` - Called when each stage finishes
    pub fn run_with_callbacks<F1, F2>(
        &self,
        ctx: &mut RunContext,
        mut on_stage_start: F1,
        mut on_stage_complete: F2,
    ) -> Result<(), PipelineError>
    where
        F1: FnMut(&str, usize, usize),
        F2: FnMut(&str, usize, usize),
    {
        let total = self.stages.len();
        let mut completed: Vec<StageId> = Vec::new();

        for (i, stage) in self.stages.iter().enumerate() {
            on_stage_start(stage.name(), i, total);

            for dep in stage.dependencies() {
                if !completed.contains(dep) {
                    return Err(PipelineError::missing_dependency(stage.id().name(), dep.name()));
                }
            }

            let start = Instant::now();
            debug!(stage = stage.id().name(), "stage started");
            stage.execute(ctx)?;
            let elapsed = start.elapsed();
            info!(
                stage = stage.id().name(),
                elapsed_ms = elapsed.as_millis() as u64,
                "stage complete"
            );
            ctx.timings.push((stage.id(), elapsed));
            completed.push(stage.id());

            on_stage_complete(stage.name(), i, total);
        }

        Ok(())
    }
}

/// Draws a synthetic corpus over the ocean.
pub struct SamplingStage {
    pub config: SamplerConfig,
}

impl PipelineStage for SamplingStage {
    fn id(&self) -> StageId {
        StageId::Sampling
    }

    fn name(&self) -> &str {
        "Synthetic Sampling"
    }

    fn execute(&self, ctx: &mut RunContext) -> Result<(), PipelineError> {
        ctx.samples = generate_samples(&self.config, ctx.mask.as_ref())
            .map_err(|e| PipelineError::from_stage(self.id().name(), e))?;
        Ok(())
    }
}

/// Persists the corpus.
pub struct CorpusWriteStage {
    pub path: PathBuf,
}

impl PipelineStage for CorpusWriteStage {
    fn id(&self) -> StageId {
        StageId::CorpusWrite
    }

    fn name(&self) -> &str {
        "Corpus Write"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Sampling]
    }

    fn execute(&self, ctx: &mut RunContext) -> Result<(), PipelineError> {
        write_corpus(&self.path, &ctx.samples).map_err(|e| PipelineError::from_stage(self.id().name(), e))?;
        ctx.artifact = Some(self.path.clone());
        Ok(())
    }
}

/// Reads a corpus from CSV.
pub struct CorpusLoadStage {
    pub path: PathBuf,
}

impl PipelineStage for CorpusLoadStage {
    fn id(&self) -> StageId {
        StageId::CorpusLoad
    }

    fn name(&self) -> &str {
        "Corpus Load"
    }

    fn execute(&self, ctx: &mut RunContext) -> Result<(), PipelineError> {
        ctx.samples = read_corpus(&self.path).map_err(|e| PipelineError::from_stage(self.id().name(), e))?;
        info!(rows = ctx.samples.len(), path = %self.path.display(), "corpus loaded");
        Ok(())
    }
}

/// Trains the presence model on the current corpus.
pub struct TrainingStage {
    pub config: ModelConfig,
}

impl PipelineStage for TrainingStage {
    fn id(&self) -> StageId {
        StageId::Training
    }

    fn name(&self) -> &str {
        "Model Training"
    }

    fn execute(&self, ctx: &mut RunContext) -> Result<(), PipelineError> {
        let model = train_model(&ctx.samples, &self.config).map_err(|e| PipelineError::from_stage(self.id().name(), e))?;
        ctx.model = Some(model);
        Ok(())
    }
}

/// Builds the land-masked grid over the corpus extent.
pub struct GridStage {
    pub spec: GridSpec,
}

impl PipelineStage for GridStage {
    fn id(&self) -> StageId {
        StageId::Grid
    }

    fn name(&self) -> &str {
        "Grid Construction"
    }

    fn execute(&self, ctx: &mut RunContext) -> Result<(), PipelineError> {
        let grid = build_grid(&ctx.samples, &self.spec, ctx.mask.as_ref())
            .map_err(|e| PipelineError::from_stage(self.id().name(), e))?;
        ctx.grid = Some(grid);
        Ok(())
    }
}

/// Copies nearest-sample covariates onto the grid.
pub struct AssignmentStage;

impl PipelineStage for AssignmentStage {
    fn id(&self) -> StageId {
        StageId::Assignment
    }

    fn name(&self) -> &str {
        "Feature Assignment"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Grid]
    }

    fn execute(&self, ctx: &mut RunContext) -> Result<(), PipelineError> {
        let grid = ctx
            .grid
            .as_ref()
            .ok_or_else(|| PipelineError::missing_dependency(self.id().name(), StageId::Grid.name()))?;
        ctx.assigned =
            assign_features(&grid.cells, &ctx.samples).map_err(|e| PipelineError::from_stage(self.id().name(), e))?;
        Ok(())
    }
}

/// Scores assigned cells and builds the heat layer.
pub struct RenderStage {
    pub config: RenderConfig,
}

impl PipelineStage for RenderStage {
    fn id(&self) -> StageId {
        StageId::Rendering
    }

    fn name(&self) -> &str {
        "Heat Rendering"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Training, StageId::Assignment]
    }

    fn execute(&self, ctx: &mut RunContext) -> Result<(), PipelineError> {
        let stage = self.id().name();
        let model = ctx
            .model
            .as_ref()
            .ok_or_else(|| PipelineError::missing_dependency(stage, StageId::Training.name()))?;
        let grid = ctx
            .grid
            .as_ref()
            .ok_or_else(|| PipelineError::missing_dependency(stage, StageId::Grid.name()))?;

        let (scored, layer) = render_layer(&ctx.assigned, model, &ctx.samples, grid.bbox, &self.config)
            .map_err(|e| PipelineError::from_stage(stage, e))?;
        ctx.scored = scored;
        ctx.layer = Some(layer);
        Ok(())
    }
}

/// Where the export stage puts the artifact.
#[derive(Clone)]
pub enum ArtifactDestination {
    /// A plain file path, written atomically.
    Path(PathBuf),
    /// An entry in an artifact store.
    Store { store: Arc<dyn ArtifactStore>, id: String },
}

/// Encodes the heat layer and writes it out.
pub struct ExportStage {
    pub destination: ArtifactDestination,
    pub format: ArtifactFormat,
}

impl PipelineStage for ExportStage {
    fn id(&self) -> StageId {
        StageId::Export
    }

    fn name(&self) -> &str {
        "Artifact Export"
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Rendering]
    }

    fn execute(&self, ctx: &mut RunContext) -> Result<(), PipelineError> {
        let stage = self.id().name();
        let layer = ctx
            .layer
            .as_ref()
            .ok_or_else(|| PipelineError::missing_dependency(stage, StageId::Rendering.name()))?;

        let path = match &self.destination {
            ArtifactDestination::Path(path) => {
                export_layer(layer, path, self.format).map_err(|e| PipelineError::from_stage(stage, e))?;
                path.clone()
            }
            ArtifactDestination::Store { store, id } => {
                let bytes = encode_layer(layer, self.format).map_err(|e| PipelineError::from_stage(stage, e))?;
                store.put(id, &bytes).map_err(|e| PipelineError::from_stage(stage, e))?
            }
        };
        info!(path = %path.display(), format = self.format.extension(), "artifact written");
        ctx.artifact = Some(path);
        Ok(())
    }
}
