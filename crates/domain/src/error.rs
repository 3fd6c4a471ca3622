use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TempoError {
    #[error("usage error: {0}")]
    Usage(String),
    #[error("failed to load model '{model}': {reason}")]
    ModelLoad { model: String, reason: String },
    #[error("failed to read {path:?}: {reason}")]
    Input { path: PathBuf, reason: String },
    #[error("tempo estimation failed: {0}")]
    Estimation(String),
    #[error("failed to write {path:?}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TempoError {
    pub fn usage<T: Into<String>>(message: T) -> Self {
        Self::Usage(message.into())
    }

    pub fn model_load<M: Into<String>, E: ToString>(model: M, reason: E) -> Self {
        Self::ModelLoad {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    pub fn input<E: ToString>(path: &Path, reason: E) -> Self {
        Self::Input {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn estimation<E: ToString>(reason: E) -> Self {
        Self::Estimation(reason.to_string())
    }

    pub fn output(path: &Path, source: std::io::Error) -> Self {
        Self::Output {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Errors that belong to a single input file and may be skipped in a batch.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::Input { .. } | Self::Estimation(_) | Self::Output { .. } | Self::Serialization(_)
        )
    }
}
