use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use tempo_domain::{OutputFormat, TempoError};

use crate::model::DEFAULT_MODEL;

/// Everything one invocation needs to know, independent of how it was parsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub model: String,
    pub inputs: Vec<PathBuf>,
    /// Explicit destinations, matched to `inputs` by position.
    pub outputs: Vec<PathBuf>,
    pub output_dir: Option<PathBuf>,
    /// Appended to the input file name to derive an output path.
    pub extension: Option<String>,
    pub format: OutputFormat,
    pub interpolate: bool,
    pub continue_on_error: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            output_dir: None,
            extension: None,
            format: OutputFormat::Plain,
            interpolate: false,
            continue_on_error: false,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), TempoError> {
        if self.inputs.is_empty() {
            return Err(TempoError::usage("at least one input file is required"));
        }
        if !self.outputs.is_empty() && self.outputs.len() != self.inputs.len() {
            return Err(TempoError::usage(format!(
                "number of output files ({}) must match number of input files ({})",
                self.outputs.len(),
                self.inputs.len()
            )));
        }
        if !self.outputs.is_empty() && self.output_dir.is_some() {
            return Err(TempoError::usage(
                "explicit output files cannot be combined with an output directory",
            ));
        }
        Ok(())
    }
}
