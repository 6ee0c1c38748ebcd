//! Shark presence heat maps from synthetic ocean observations.
//!
//! This crate generates ocean-only synthetic samples against a coastline
//! land mask, trains a regression-tree ensemble to score shark presence from
//! environmental covariates, and rasterizes the prediction onto a
//! land-masked lat/lon grid as a thresholded heat layer.

pub mod export;
pub mod grid;
pub mod landmask;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod samples;
pub mod spatial;
pub mod store;

pub use grid::{GridCell, GridSpec};
pub use landmask::{LandMask, LandQuery};
pub use model::{ModelConfig, PresenceScorer, TrainedModel, TrainingTarget};
pub use pipeline::{run_heatmap, spawn_heatmap_job, ErrorKind, HeatmapParams, Pipeline, PipelineError, RunReport};
pub use render::{HeatPoint, RenderConfig};
pub use samples::{Covariates, GeoSample, SamplerConfig};
pub use store::{ArtifactStore, DirectoryStore};
