use std::cmp::Ordering;

use ndarray::{s, Array1, Array2, Array4, ArrayViewMut2, Axis};
use tracing::debug;

use tempo_audio::FeatureBlock;
use tempo_domain::{MirexEstimate, TempoError};

use crate::model::ModelLocator;
use crate::onnx::OnnxPredictor;

/// Tempo of class 0. Class `k` stands for `MIN_BPM + k`.
pub const MIN_BPM: f32 = 30.0;
pub const WINDOW_FRAMES: usize = 256;
pub const WINDOW_HOP: usize = 128;

pub trait ClassPredictor {
    /// Maps a `(windows, bands, frames, 1)` batch to one probability row per window.
    fn predict(&self, input: Array4<f32>) -> Result<Array2<f32>, TempoError>;
}

pub trait TempoModel {
    fn estimate_tempo(&self, features: &FeatureBlock, interpolate: bool)
        -> Result<f32, TempoError>;

    fn estimate_mirex(
        &self,
        features: &FeatureBlock,
        interpolate: bool,
    ) -> Result<MirexEstimate, TempoError>;
}

pub struct TempoClassifier<P> {
    name: String,
    predictor: P,
}

impl TempoClassifier<OnnxPredictor> {
    pub fn load(model: &str, locator: &ModelLocator) -> Result<Self, TempoError> {
        let path = locator.resolve(model)?;
        let predictor = OnnxPredictor::load(model, &path)?;
        Ok(Self::new(model, predictor))
    }
}

impl<P: ClassPredictor> TempoClassifier<P> {
    pub fn new(name: impl Into<String>, predictor: P) -> Self {
        Self {
            name: name.into(),
            predictor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class probabilities averaged over all analysis windows.
    pub fn class_distribution(&self, features: &FeatureBlock) -> Result<Array1<f32>, TempoError> {
        let batch = windows(features)?;
        let count = batch.dim().0;
        let predictions = self.predictor.predict(batch)?;
        if predictions.nrows() != count || predictions.ncols() == 0 {
            return Err(TempoError::estimation(format!(
                "expected {count} prediction rows, got shape {:?}",
                predictions.dim()
            )));
        }
        predictions
            .mean_axis(Axis(0))
            .ok_or_else(|| TempoError::estimation("empty prediction"))
    }
}

impl<P: ClassPredictor> TempoModel for TempoClassifier<P> {
    fn estimate_tempo(
        &self,
        features: &FeatureBlock,
        interpolate: bool,
    ) -> Result<f32, TempoError> {
        let distribution = self.class_distribution(features)?;
        let index = argmax(&distribution);
        let bpm = MIN_BPM + class_position(&distribution, index, interpolate);
        debug!(model = %self.name, bpm, "estimated tempo");
        Ok(bpm)
    }

    fn estimate_mirex(
        &self,
        features: &FeatureBlock,
        interpolate: bool,
    ) -> Result<MirexEstimate, TempoError> {
        let distribution = self.class_distribution(features)?;
        let bpm = |index: usize| MIN_BPM + class_position(&distribution, index, interpolate);
        let peaks = ranked_peaks(&distribution);
        let estimate = match peaks.as_slice() {
            [] => {
                let tempo = bpm(argmax(&distribution));
                MirexEstimate::new(tempo, tempo, 1.0)?
            }
            [only] => {
                let t1 = bpm(*only);
                let t2 = if t1 < 100.0 { t1 * 2.0 } else { t1 / 2.0 };
                MirexEstimate::new(t1, t2, 1.0)?
            }
            [first, second, ..] => {
                let (h1, h2) = (distribution[*first], distribution[*second]);
                let s1 = if h1 + h2 > 0.0 { h1 / (h1 + h2) } else { 0.5 };
                MirexEstimate::new(bpm(*first), bpm(*second), s1.clamp(0.0, 1.0))?
            }
        };
        let estimate = estimate.ordered();
        debug!(model = %self.name, ?estimate, "estimated tempo candidates");
        Ok(estimate)
    }
}

/// Cuts the spectrogram into standardised, overlapping network inputs.
/// Inputs shorter than one window are zero-padded.
fn windows(features: &FeatureBlock) -> Result<Array4<f32>, TempoError> {
    let (bands, frames) = features.mel.dim();
    if frames == 0 || bands == 0 {
        return Err(TempoError::estimation("feature block is empty"));
    }
    let count = if frames <= WINDOW_FRAMES {
        1
    } else {
        1 + (frames - WINDOW_FRAMES) / WINDOW_HOP
    };
    let mut batch = Array4::<f32>::zeros((count, bands, WINDOW_FRAMES, 1));
    for index in 0..count {
        let start = index * WINDOW_HOP;
        let end = (start + WINDOW_FRAMES).min(frames);
        batch
            .slice_mut(s![index, .., 0..end - start, 0])
            .assign(&features.mel.slice(s![.., start..end]));
        standardise(batch.slice_mut(s![index, .., .., 0]));
    }
    Ok(batch)
}

fn standardise(mut window: ArrayViewMut2<f32>) {
    let mean = window.mean().unwrap_or(0.0);
    let std = window.std(0.0);
    if std > 0.0 {
        window.mapv_inplace(|value| (value - mean) / std);
    } else {
        window.mapv_inplace(|value| value - mean);
    }
}

fn argmax(values: &Array1<f32>) -> usize {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
        .map(|(index, _)| index)
        .unwrap_or(0)
}

/// Class index of a peak, optionally refined by fitting a parabola through
/// the peak and its two neighbours.
fn class_position(values: &Array1<f32>, index: usize, interpolate: bool) -> f32 {
    if !interpolate || index == 0 || index + 1 >= values.len() {
        return index as f32;
    }
    let (left, center, right) = (values[index - 1], values[index], values[index + 1]);
    let curvature = left - 2.0 * center + right;
    if curvature == 0.0 {
        return index as f32;
    }
    let offset = 0.5 * (left - right) / curvature;
    index as f32 + offset.clamp(-0.5, 0.5)
}

/// Interior local maxima, highest first.
fn ranked_peaks(values: &Array1<f32>) -> Vec<usize> {
    let mut peaks: Vec<usize> = (1..values.len().saturating_sub(1))
        .filter(|&i| values[i] > values[i - 1] && values[i] >= values[i + 1])
        .collect();
    peaks.sort_by(|a, b| {
        values[*b]
            .partial_cmp(&values[*a])
            .unwrap_or(Ordering::Equal)
    });
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::Cell;

    /// Returns the same distribution for every window.
    struct FixedPredictor {
        distribution: Vec<f32>,
        calls: Cell<usize>,
        last_batch: Cell<(usize, usize, usize, usize)>,
    }

    impl FixedPredictor {
        fn new(distribution: Vec<f32>) -> Self {
            Self {
                distribution,
                calls: Cell::new(0),
                last_batch: Cell::new((0, 0, 0, 0)),
            }
        }
    }

    impl ClassPredictor for FixedPredictor {
        fn predict(&self, input: Array4<f32>) -> Result<Array2<f32>, TempoError> {
            self.calls.set(self.calls.get() + 1);
            self.last_batch.set(input.dim());
            let rows = input.dim().0;
            let classes = self.distribution.len();
            Ok(Array2::from_shape_fn((rows, classes), |(_, c)| {
                self.distribution[c]
            }))
        }
    }

    fn distribution(peaks: &[(usize, f32)]) -> Vec<f32> {
        let mut values = vec![0.0; 256];
        for &(index, height) in peaks {
            values[index] = height;
        }
        values
    }

    fn features(frames: usize) -> FeatureBlock {
        FeatureBlock {
            mel: Array2::from_shape_fn((40, frames), |(b, f)| (b * 7 + f % 13) as f32),
        }
    }

    #[test]
    fn windows_cover_long_inputs() {
        let batch = windows(&features(1000)).unwrap();
        assert_eq!(batch.dim(), (1 + (1000 - 256) / 128, 40, 256, 1));
        let first = batch.slice(s![0, .., .., 0]);
        assert_relative_eq!(first.mean().unwrap(), 0.0, epsilon = 1e-4);
        assert_relative_eq!(first.std(0.0), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn short_input_is_padded_to_one_window() {
        let batch = windows(&features(30)).unwrap();
        assert_eq!(batch.dim(), (1, 40, 256, 1));
    }

    #[test]
    fn empty_features_fail() {
        let empty = FeatureBlock {
            mel: Array2::zeros((40, 0)),
        };
        assert!(matches!(
            windows(&empty),
            Err(TempoError::Estimation(_))
        ));
    }

    #[test]
    fn argmax_maps_to_bpm() {
        let classifier =
            TempoClassifier::new("fcn", FixedPredictor::new(distribution(&[(90, 0.8)])));
        let bpm = classifier.estimate_tempo(&features(600), false).unwrap();
        assert_eq!(bpm, 120.0);
        assert_eq!(classifier.predictor.calls.get(), 1);
        assert_eq!(classifier.predictor.last_batch.get().0, 3);
    }

    #[test]
    fn interpolation_moves_toward_heavier_neighbour() {
        let classifier = TempoClassifier::new(
            "fcn",
            FixedPredictor::new(distribution(&[(89, 0.1), (90, 0.6), (91, 0.3)])),
        );
        let discrete = classifier.estimate_tempo(&features(300), false).unwrap();
        let interpolated = classifier.estimate_tempo(&features(300), true).unwrap();
        assert_eq!(discrete, 120.0);
        assert!(interpolated > 120.0 && interpolated < 120.5);
    }

    #[test]
    fn mirex_uses_two_highest_peaks() {
        let classifier = TempoClassifier::new(
            "fcn",
            FixedPredictor::new(distribution(&[(30, 0.2), (90, 0.6), (200, 0.1)])),
        );
        let estimate = classifier.estimate_mirex(&features(300), false).unwrap();
        assert_eq!(estimate.t1, 60.0);
        assert_eq!(estimate.t2, 120.0);
        assert_relative_eq!(estimate.s1, 0.25, epsilon = 1e-6);
        assert_relative_eq!(estimate.s1 + estimate.s2(), 1.0);
    }

    #[test]
    fn single_peak_pairs_with_octave() {
        let slow = TempoClassifier::new("fcn", FixedPredictor::new(distribution(&[(50, 0.9)])));
        let estimate = slow.estimate_mirex(&features(300), false).unwrap();
        assert_eq!((estimate.t1, estimate.t2, estimate.s1), (80.0, 160.0, 1.0));

        let fast = TempoClassifier::new("fcn", FixedPredictor::new(distribution(&[(150, 0.9)])));
        let estimate = fast.estimate_mirex(&features(300), false).unwrap();
        assert_eq!((estimate.t1, estimate.t2), (90.0, 180.0));
        assert_eq!(estimate.s1, 0.0);
    }

    #[test]
    fn wrong_prediction_shape_is_estimation_error() {
        struct Broken;
        impl ClassPredictor for Broken {
            fn predict(&self, _input: Array4<f32>) -> Result<Array2<f32>, TempoError> {
                Ok(Array2::zeros((1, 0)))
            }
        }
        let classifier = TempoClassifier::new("fcn", Broken);
        assert!(matches!(
            classifier.estimate_tempo(&features(300), false),
            Err(TempoError::Estimation(_))
        ));
    }
}
