use std::path::Path;

use ndarray::Array2;
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use tempo_domain::TempoError;

use crate::dsp::{hann_window, mel_filter_bank, reflect_pad, resample};
use crate::io::AudioDecoder;

/// Mel spectrogram of one recording, shaped `(bands, frames)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBlock {
    pub mel: Array2<f32>,
}

impl FeatureBlock {
    pub fn bands(&self) -> usize {
        self.mel.nrows()
    }

    pub fn frames(&self) -> usize {
        self.mel.ncols()
    }
}

/// Source of network input features and track durations.
pub trait FeatureReader {
    fn read_features(&self, path: &Path) -> Result<FeatureBlock, TempoError>;

    /// Duration in seconds, decoded independently of the features.
    fn duration(&self, path: &Path) -> Result<f64, TempoError>;
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct MelConfig {
    pub sample_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub fmin: f32,
    pub fmax: f32,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            sample_rate: 11_025,
            n_fft: 1024,
            hop_length: 512,
            n_mels: 40,
            fmin: 20.0,
            fmax: 5000.0,
        }
    }
}

pub struct MelSpectrogram {
    config: MelConfig,
    window: Vec<f32>,
    filters: Array2<f32>,
}

impl MelSpectrogram {
    pub fn new(config: MelConfig) -> Self {
        Self {
            window: hann_window(config.n_fft),
            filters: mel_filter_bank(
                config.sample_rate,
                config.n_fft,
                config.n_mels,
                config.fmin,
                config.fmax,
            ),
            config,
        }
    }

    pub fn config(&self) -> &MelConfig {
        &self.config
    }

    /// Magnitude mel spectrogram of mono samples already at the configured rate.
    pub fn compute(&self, samples: &[f32]) -> Result<Array2<f32>, String> {
        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;
        let padded = reflect_pad(samples, n_fft / 2);
        let frames = 1 + (padded.len() - n_fft) / hop;

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n_fft);
        let mut input = fft.make_input_vec();
        let mut spectrum = fft.make_output_vec();
        let mut magnitudes = Array2::<f32>::zeros((spectrum.len(), frames));

        for frame in 0..frames {
            let start = frame * hop;
            for (slot, (sample, weight)) in input
                .iter_mut()
                .zip(padded[start..start + n_fft].iter().zip(&self.window))
            {
                *slot = sample * weight;
            }
            fft.process(&mut input, &mut spectrum)
                .map_err(|err| err.to_string())?;
            for (bin, value) in spectrum.iter().enumerate() {
                magnitudes[[bin, frame]] = value.norm();
            }
        }

        Ok(self.filters.dot(&magnitudes))
    }
}

impl Default for MelSpectrogram {
    fn default() -> Self {
        Self::new(MelConfig::default())
    }
}

/// Decodes with symphonia and extracts the mel features the tempo networks expect.
#[derive(Default)]
pub struct MelFeatureReader {
    spectrogram: MelSpectrogram,
}

impl FeatureReader for MelFeatureReader {
    #[instrument(skip(self))]
    fn read_features(&self, path: &Path) -> Result<FeatureBlock, TempoError> {
        let audio = AudioDecoder::open(path)?;
        if audio.samples.is_empty() {
            return Err(TempoError::input(path, "no audio frames decoded"));
        }
        let target_rate = self.spectrogram.config().sample_rate;
        let samples = resample(&audio.samples, audio.sample_rate, target_rate)
            .map_err(|err| TempoError::input(path, err))?;
        let mel = self
            .spectrogram
            .compute(&samples)
            .map_err(|err| TempoError::input(path, err))?;
        debug!(bands = mel.nrows(), frames = mel.ncols(), "extracted features");
        Ok(FeatureBlock { mel })
    }

    fn duration(&self, path: &Path) -> Result<f64, TempoError> {
        Ok(AudioDecoder::open(path)?.duration_secs())
    }
}
