//! Ошибки конвейера

use std::path::PathBuf;

use thiserror::Error;

use crate::sources::{SourceKind, SourceStatus};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing source files: {}", describe_missing(.0))]
    MissingSources(Vec<SourceStatus>),

    #[error("{source_kind}: missing required columns {missing:?} (headers: {headers:?})")]
    SchemaMismatch {
        source_kind: SourceKind,
        missing: Vec<String>,
        headers: Vec<String>,
    },

    #[error("{source_kind}: column {field} is ambiguous, candidates {candidates:?}")]
    AmbiguousHeader {
        source_kind: SourceKind,
        field: String,
        candidates: Vec<String>,
    },

    #[error("{source_kind}: failed to read {path}: {message}")]
    Load {
        source_kind: SourceKind,
        path: PathBuf,
        message: String,
    },

    #[error(
        "failed to load model {path}: {message}. Train the classifier offline, export it with \
         `booster.dump_model()` to JSON and place the file at this path"
    )]
    ModelLoad { path: PathBuf, message: String },

    #[error("model was trained on features {found:?}, expected {expected:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("region table is not prepared yet, run the prepare stage first")]
    NotPrepared,

    #[error("no model results yet, run the modelling stage first")]
    NoResults,

    #[error("no rows to process: {0}")]
    EmptyDataset(String),
}

impl PipelineError {
    /// Короткое имя варианта для API
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingSources(_) => "missing_sources",
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::AmbiguousHeader { .. } => "ambiguous_header",
            Self::Load { .. } => "load",
            Self::ModelLoad { .. } => "model_load",
            Self::FeatureMismatch { .. } => "feature_mismatch",
            Self::NotPrepared => "not_prepared",
            Self::NoResults => "no_results",
            Self::EmptyDataset(_) => "empty_dataset",
        }
    }
}

fn describe_missing(statuses: &[SourceStatus]) -> String {
    statuses
        .iter()
        .map(|s| format!("{} ({})", s.source, s.path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, PipelineError>;
