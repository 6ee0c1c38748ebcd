//! Pipeline module for orchestrating heat-map runs.
//!
//! Provides a trait-based architecture for modular stages (sampling, corpus
//! I/O, training, gridding, assignment, rendering, export) composed into
//! complete runs, plus the library entry points that replace shelling out
//! to a separate training script.

mod error;
mod params;
mod run;
mod stage;

pub use error::{Classify, ErrorKind, PipelineError};
pub use params::{GenerateParams, HeatmapParams, DEFAULT_CORPUS_PATH, DEFAULT_OUTPUT_PATH};
pub use run::{
    heatmap_pipeline, load_land_mask, run_generate, run_generate_with, run_heatmap, run_heatmap_with,
    spawn_heatmap_job, spawn_heatmap_job_with, GenerateReport, HeatmapJob, RunReport,
};
pub use stage::{
    ArtifactDestination, AssignmentStage, CorpusLoadStage, CorpusWriteStage, ExportStage, GridStage, Pipeline,
    PipelineStage, RenderStage, RunContext, SamplingStage, StageId, TrainingStage,
};
