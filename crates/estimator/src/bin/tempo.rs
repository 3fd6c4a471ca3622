use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, CommandFactory, Parser};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tempo_audio::MelFeatureReader;
use tempo_domain::OutputFormat;
use tempo_estimator::{BatchRunner, BatchSummary, ModelLocator, RunConfig, TempoClassifier};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Estimate the tempo of audio files with a convolutional neural network",
    long_about = None,
    disable_version_flag = true
)]
struct Cli {
    /// Print version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    version: Option<bool>,
    /// Model name (e.g. fcn, cnn, ismir2018, deeptemp_k16) or path to an .onnx file
    #[arg(short, long, default_value = tempo_estimator::DEFAULT_MODEL)]
    model: String,
    /// Interpolate between tempo classes instead of reporting the strongest class
    #[arg(long)]
    interpolate: bool,
    /// Report two tempo candidates and the confidence of the first, tab separated
    #[arg(long, conflicts_with = "jams")]
    mirex: bool,
    /// Write a JAMS tempo annotation per input to a .jams file
    #[arg(long)]
    jams: bool,
    /// Input audio files
    #[arg(short, long, num_args = 1..)]
    input: Vec<PathBuf>,
    /// Output files, one per input
    #[arg(short, long, num_args = 1.., conflicts_with = "outputdir")]
    output: Vec<PathBuf>,
    /// Directory for derived output files
    #[arg(short = 'd', long)]
    outputdir: Option<PathBuf>,
    /// Append this extension to the input file name to form the output path
    #[arg(short, long)]
    extension: Option<String>,
    /// Continue with the remaining files after an error
    #[arg(short, long)]
    cont: bool,
    /// Directory holding <model>.onnx files
    #[arg(long, env = "TEMPO_CNN_MODELS", default_value = "models")]
    models_dir: PathBuf,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        let format = if self.jams {
            OutputFormat::Jams
        } else if self.mirex {
            OutputFormat::Mirex
        } else {
            OutputFormat::Plain
        };
        RunConfig {
            model: self.model.clone(),
            inputs: self.input.clone(),
            outputs: self.output.clone(),
            output_dir: self.outputdir.clone(),
            extension: self.extension.clone(),
            format,
            interpolate: self.interpolate,
            continue_on_error: self.cont,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.run_config();
    if let Err(err) = config.validate() {
        eprintln!("{err}");
        let _ = Cli::command().write_help(&mut io::stderr());
        return ExitCode::from(1);
    }

    let result = run(&cli, &config);
    match &result {
        Ok(summary) if summary.all_failed() => {
            error!(failed = summary.failed.len(), "no input could be processed");
        }
        Ok(_) => {}
        Err(err) => eprintln!("Error: {err:#}"),
    }
    ExitCode::from(exit_status(&result))
}

/// 0 when at least one input was processed, 2 when every input failed
/// under `--cont`, 1 when the batch aborted.
fn exit_status(result: &anyhow::Result<BatchSummary>) -> u8 {
    match result {
        Ok(summary) if summary.all_failed() => 2,
        Ok(_) => 0,
        Err(_) => 1,
    }
}

fn run(cli: &Cli, config: &RunConfig) -> anyhow::Result<BatchSummary> {
    let locator = ModelLocator::new(&cli.models_dir);
    let classifier = TempoClassifier::load(&config.model, &locator)?;
    info!(
        model = %classifier.name(),
        models_dir = %locator.models_dir().display(),
        "classifier ready"
    );

    let features = MelFeatureReader::default();
    let runner = BatchRunner::new(&classifier, &features, config);
    let mut stdout = io::stdout().lock();
    let summary = runner
        .run(&mut stdout, &mut io::stderr())
        .context("batch aborted")?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_domain::TempoError;

    #[test]
    fn unified_flag_surface() {
        let cli = Cli::try_parse_from([
            "tempo",
            "-m",
            "cnn",
            "--interpolate",
            "--mirex",
            "-i",
            "a.wav",
            "b.wav",
            "-o",
            "a.txt",
            "b.txt",
            "-c",
        ])
        .unwrap();
        let config = cli.run_config();
        assert_eq!(config.model, "cnn");
        assert_eq!(config.format, OutputFormat::Mirex);
        assert_eq!(config.inputs.len(), 2);
        assert_eq!(config.outputs.len(), 2);
        assert!(config.interpolate);
        assert!(config.continue_on_error);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn defaults_to_fcn_and_plain() {
        let cli = Cli::try_parse_from(["tempo", "-i", "a.wav"]).unwrap();
        let config = cli.run_config();
        assert_eq!(config.model, "fcn");
        assert_eq!(config.format, OutputFormat::Plain);
    }

    #[test]
    fn mirex_and_jams_conflict() {
        assert!(Cli::try_parse_from(["tempo", "--mirex", "--jams", "-i", "a.wav"]).is_err());
    }

    #[test]
    fn output_and_outputdir_conflict() {
        assert!(Cli::try_parse_from(["tempo", "-i", "a.wav", "-o", "a.txt", "-d", "out"]).is_err());
    }

    #[test]
    fn missing_input_reaches_validation() {
        let cli = Cli::try_parse_from(["tempo", "--jams"]).unwrap();
        assert!(matches!(
            cli.run_config().validate(),
            Err(TempoError::Usage(_))
        ));
    }

    #[test]
    fn mismatched_outputs_fail_validation() {
        let cli = Cli::try_parse_from(["tempo", "-i", "a.wav", "b.wav", "-o", "a.txt"]).unwrap();
        assert!(cli.run_config().validate().is_err());
    }

    #[test]
    fn exit_status_reflects_batch_outcome() {
        let summary = |processed: usize, failed: &[&str]| BatchSummary {
            processed,
            failed: failed.iter().map(PathBuf::from).collect(),
        };
        assert_eq!(exit_status(&Ok(summary(2, &[]))), 0);
        assert_eq!(exit_status(&Ok(summary(1, &["broken.wav"]))), 0);
        assert_eq!(exit_status(&Ok(summary(0, &["a.wav", "b.wav"]))), 2);
        let aborted: anyhow::Result<BatchSummary> =
            Err(TempoError::input(std::path::Path::new("a.wav"), "undecodable").into());
        assert_eq!(exit_status(&aborted), 1);
    }

    #[test]
    fn version_flag_is_lowercase() {
        let err = Cli::try_parse_from(["tempo", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
