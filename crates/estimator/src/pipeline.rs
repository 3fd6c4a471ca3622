use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use tempo_audio::FeatureReader;
use tempo_domain::{
    JamsExporter, OutputFormat, Provenance, ResultExporter, TempoError, TempoResult, TextExporter,
};

use crate::config::RunConfig;
use crate::output::{resolve_destination, Destination};
use crate::tempo::TempoModel;

pub const DATA_SOURCE: &str =
    "Single-step tempo estimation with a convolutional neural network on 40-band mel spectrograms";

/// Outcome of a batch. Only populated with failures when continuing on error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: Vec<PathBuf>,
}

impl BatchSummary {
    pub fn all_failed(&self) -> bool {
        self.processed == 0 && !self.failed.is_empty()
    }
}

/// Runs every input of a [`RunConfig`] through one loaded model.
pub struct BatchRunner<'a, M, F> {
    model: &'a M,
    features: &'a F,
    config: &'a RunConfig,
}

impl<'a, M: TempoModel, F: FeatureReader> BatchRunner<'a, M, F> {
    pub fn new(model: &'a M, features: &'a F, config: &'a RunConfig) -> Self {
        Self {
            model,
            features,
            config,
        }
    }

    /// Processes all inputs in order. Results bound for stdout go to `stdout`,
    /// progress markers to `progress`.
    pub fn run<O: Write, P: Write>(
        &self,
        stdout: &mut O,
        progress: &mut P,
    ) -> Result<BatchSummary, TempoError> {
        if let Some(dir) = &self.config.output_dir {
            fs::create_dir_all(dir).map_err(|err| TempoError::output(dir, err))?;
        }

        let mut summary = BatchSummary::default();
        for (index, input) in self.config.inputs.iter().enumerate() {
            mark(progress, ".");
            match self.process(index, input, stdout) {
                Ok(destination) => {
                    debug!(?destination, "wrote result");
                    summary.processed += 1;
                }
                Err(err) if self.config.continue_on_error && err.is_per_file() => {
                    warn!("skipping {:?}", input);
                    mark(progress, &format!("E\n{err}\n"));
                    summary.failed.push(input.clone());
                }
                Err(err) => return Err(err),
            }
        }
        mark(progress, "\nDone\n");
        info!(
            processed = summary.processed,
            failed = summary.failed.len(),
            "batch complete"
        );
        Ok(summary)
    }

    /// Extracts, estimates, formats and writes the result for one input.
    #[instrument(skip(self, stdout))]
    pub fn process<O: Write>(
        &self,
        index: usize,
        input: &Path,
        stdout: &mut O,
    ) -> Result<Destination, TempoError> {
        info!("analyzing {:?}", input);
        let features = self.features.read_features(input)?;
        let interpolate = self.config.interpolate;
        let payload = match self.config.format {
            OutputFormat::Plain => {
                let bpm = self.model.estimate_tempo(&features, interpolate)?;
                TextExporter.export(&TempoResult::Single(bpm), OutputFormat::Plain)?
            }
            OutputFormat::Mirex => {
                let estimate = self.model.estimate_mirex(&features, interpolate)?;
                TextExporter.export(&TempoResult::Mirex(estimate), OutputFormat::Mirex)?
            }
            OutputFormat::Jams => {
                let estimate = self.model.estimate_mirex(&features, interpolate)?;
                let duration = self.features.duration(input)?;
                JamsExporter::for_file(input, duration, self.provenance())
                    .export(&TempoResult::Mirex(estimate), OutputFormat::Jams)?
            }
        };
        let destination = resolve_destination(input, index, self.config);
        write_payload(&destination, &payload, stdout)?;
        Ok(destination)
    }

    fn provenance(&self) -> Provenance {
        let version = env!("CARGO_PKG_VERSION");
        Provenance {
            version: version.to_string(),
            annotation_tools: format!("tempo-cnn {} (model={})", version, self.config.model),
            data_source: DATA_SOURCE.to_string(),
        }
    }
}

fn write_payload<O: Write>(
    destination: &Destination,
    payload: &[u8],
    stdout: &mut O,
) -> Result<(), TempoError> {
    match destination {
        Destination::Stdout => print_payload(stdout, payload)
            .map_err(|err| TempoError::output(Path::new("<stdout>"), err)),
        Destination::File(path) => {
            let mut contents = payload.to_vec();
            contents.push(b'\n');
            fs::write(path, contents).map_err(|err| TempoError::output(path, err))
        }
    }
}

fn print_payload<O: Write>(stdout: &mut O, payload: &[u8]) -> std::io::Result<()> {
    stdout.write_all(b"\n")?;
    stdout.write_all(payload)?;
    stdout.write_all(b"\n")?;
    stdout.flush()
}

/// Progress is best effort; a closed stderr must not fail the batch.
fn mark<P: Write>(progress: &mut P, marker: &str) {
    let _ = progress
        .write_all(marker.as_bytes())
        .and_then(|_| progress.flush());
}
