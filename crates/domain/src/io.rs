use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::jams::{JamsDocument, Provenance};
use crate::{TempoError, TempoResult};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Plain,
    Mirex,
    Jams,
}

pub trait ResultExporter {
    fn export(&self, result: &TempoResult, format: OutputFormat) -> Result<Vec<u8>, TempoError>;
}

/// Plain and MIREX lines. The trailing newline is left to the writer.
pub struct TextExporter;

impl ResultExporter for TextExporter {
    fn export(&self, result: &TempoResult, format: OutputFormat) -> Result<Vec<u8>, TempoError> {
        let text = match (format, result) {
            (OutputFormat::Plain, TempoResult::Single(bpm)) => decimal(*bpm),
            (OutputFormat::Mirex, TempoResult::Mirex(estimate)) => format!(
                "{}\t{}\t{}",
                decimal(estimate.t1),
                decimal(estimate.t2),
                decimal(estimate.s1)
            ),
            (format, result) => {
                return Err(TempoError::Serialization(format!(
                    "TextExporter cannot render {:?} as {:?}",
                    result, format
                )))
            }
        };
        Ok(text.into_bytes())
    }
}

/// JAMS documents for a single audio file.
pub struct JamsExporter {
    pub file_name: String,
    pub duration: f64,
    pub provenance: Provenance,
}

impl JamsExporter {
    pub fn for_file(input: &Path, duration: f64, provenance: Provenance) -> Self {
        let file_name = input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            file_name,
            duration,
            provenance,
        }
    }
}

impl ResultExporter for JamsExporter {
    fn export(&self, result: &TempoResult, format: OutputFormat) -> Result<Vec<u8>, TempoError> {
        match (format, result) {
            (OutputFormat::Jams, TempoResult::Mirex(estimate)) => JamsDocument::tempo(
                self.file_name.clone(),
                self.duration,
                estimate,
                &self.provenance,
            )
            .to_vec(),
            (format, result) => Err(TempoError::Serialization(format!(
                "JamsExporter cannot render {:?} as {:?}",
                result, format
            ))),
        }
    }
}

/// Formats a value with at least one decimal place, e.g. `120.0` or `117.5`.
pub fn decimal(value: f32) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
