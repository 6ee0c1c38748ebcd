//! Pipeline error type and classification of stage failures.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::export::ExportError;
use crate::grid::GridError;
use crate::landmask::LandMaskError;
use crate::model::ModelError;
use crate::render::RenderError;
use crate::samples::{SampleIoError, SamplingError};
use crate::spatial::AssignError;
use crate::store::StoreError;

/// Broad category of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Land mask reference missing, unreadable or empty.
    Initialization,
    /// Rejection sampling ran out of attempts.
    SamplingExhausted,
    /// Corpus or grid inputs are malformed or degenerate.
    Data,
    /// The training target cannot support a model.
    DegenerateModel,
    /// Reading or writing files failed.
    Io,
    /// Parameters are out of range.
    Config,
    /// A background worker died without reporting a result.
    Internal,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Initialization => "initialization",
            ErrorKind::SamplingExhausted => "sampling-exhausted",
            ErrorKind::Data => "data",
            ErrorKind::DegenerateModel => "degenerate-model",
            ErrorKind::Io => "io",
            ErrorKind::Config => "config",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that can occur during pipeline execution.
#[derive(Error, Debug)]
#[error("Stage '{stage}' failed ({kind}): {message}")]
pub struct PipelineError {
    kind: ErrorKind,
    stage: String,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl PipelineError {
    /// Error without an underlying cause.
    pub fn new(kind: ErrorKind, stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage: stage.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a module error raised inside `stage`, classifying it.
    pub fn from_stage<E>(stage: impl Into<String>, err: E) -> Self
    where
        E: Classify + std::error::Error + Send + Sync + 'static,
    {
        Self {
            kind: err.kind(),
            stage: stage.into(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// A stage ran before one of its prerequisites.
    pub fn missing_dependency(stage: &str, dependency: &str) -> Self {
        Self::new(
            ErrorKind::Config,
            stage,
            format!("requires stage '{dependency}' to run first"),
        )
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Maps a module error onto an [`ErrorKind`].
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

impl Classify for LandMaskError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Initialization
    }
}

impl Classify for SamplingError {
    fn kind(&self) -> ErrorKind {
        match self {
            SamplingError::Exhausted { .. } => ErrorKind::SamplingExhausted,
            SamplingError::InvalidRange(_) => ErrorKind::Config,
        }
    }
}

impl Classify for SampleIoError {
    fn kind(&self) -> ErrorKind {
        match self {
            SampleIoError::Io { .. } => ErrorKind::Io,
            _ => ErrorKind::Data,
        }
    }
}

impl Classify for ModelError {
    fn kind(&self) -> ErrorKind {
        match self {
            ModelError::EmptyTrainingSet
            | ModelError::ZeroVarianceTarget(_)
            | ModelError::ZeroMaxScore(_)
            | ModelError::NonFiniteTarget => ErrorKind::DegenerateModel,
            ModelError::InsufficientData { .. } => ErrorKind::Data,
            ModelError::InvalidConfig(_) => ErrorKind::Config,
        }
    }
}

impl Classify for GridError {
    fn kind(&self) -> ErrorKind {
        match self {
            GridError::TooLarge { .. } => ErrorKind::Config,
            _ => ErrorKind::Data,
        }
    }
}

impl Classify for AssignError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Data
    }
}

impl Classify for RenderError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Config
    }
}

impl Classify for ExportError {
    fn kind(&self) -> ErrorKind {
        match self {
            ExportError::Io(_) | ExportError::Image(_) | ExportError::Json(_) => ErrorKind::Io,
            ExportError::UnknownFormat(_) | ExportError::InvalidDimensions(..) => ErrorKind::Config,
        }
    }
}

impl Classify for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Io { .. } => ErrorKind::Io,
            StoreError::NotFound(_) => ErrorKind::Data,
            StoreError::InvalidId(_) => ErrorKind::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_classification() {
        let err = PipelineError::from_stage(
            "sampling",
            SamplingError::Exhausted {
                requested: 3,
                accepted: 0,
                attempts: 10,
            },
        );
        assert_eq!(err.kind(), ErrorKind::SamplingExhausted);
        assert_eq!(err.stage(), "sampling");
        assert!(err.source().is_some());

        let err = PipelineError::from_stage("training", ModelError::ZeroVarianceTarget(0.5));
        assert_eq!(err.kind(), ErrorKind::DegenerateModel);

        let err = PipelineError::from_stage("corpus", SampleIoError::Empty);
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn test_display_names_stage_and_kind() {
        let err = PipelineError::from_stage("assign", AssignError::EmptyReference);
        let text = err.to_string();
        assert!(text.contains("'assign'"));
        assert!(text.contains("(data)"));
        assert!(text.contains("no reference samples"));
    }
}
