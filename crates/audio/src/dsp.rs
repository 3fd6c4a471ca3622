use std::f32::consts::PI;

use ndarray::Array2;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

const RESAMPLER_PARAMETER: SincInterpolationParameters = SincInterpolationParameters {
    sinc_len: 256,
    f_cutoff: 0.95,
    interpolation: SincInterpolationType::Linear,
    oversampling_factor: 256,
    window: WindowFunction::BlackmanHarris2,
};

const RESAMPLER_CHUNK: usize = 1024;

/// Periodic Hann window, as used for STFT frames.
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / size as f32).cos())
        .collect()
}

/// Resamples mono audio. Output length is `len * to / from`, rounded.
pub fn resample(samples: &[f32], from: u32, to: u32) -> Result<Vec<f32>, String> {
    if from == to || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    let ratio = to as f64 / from as f64;
    let expected = (samples.len() as f64 * ratio).round() as usize;
    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 1.0, RESAMPLER_PARAMETER, RESAMPLER_CHUNK, 1)
            .map_err(|err| err.to_string())?;

    let mut resampled = Vec::with_capacity(expected + RESAMPLER_CHUNK);
    let mut chunks = samples.chunks_exact(RESAMPLER_CHUNK);
    for chunk in &mut chunks {
        let out = resampler
            .process(&[chunk], None)
            .map_err(|err| err.to_string())?;
        resampled.extend_from_slice(&out[0]);
    }
    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let out = resampler
            .process_partial(Some(&[remainder][..]), None)
            .map_err(|err| err.to_string())?;
        resampled.extend_from_slice(&out[0]);
    }
    // flush the filter delay
    let delay = resampler.output_delay();
    while resampled.len() < expected + delay {
        let out = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|err| err.to_string())?;
        if out[0].is_empty() {
            break;
        }
        resampled.extend_from_slice(&out[0]);
    }

    resampled.drain(..delay.min(resampled.len()));
    resampled.truncate(expected);
    debug!(from, to, input = samples.len(), output = resampled.len(), "resampled");
    Ok(resampled)
}

/// Pads `half` samples on each side by reflecting around the edges.
/// Falls back to zero padding when the signal is too short to reflect.
pub fn reflect_pad(samples: &[f32], half: usize) -> Vec<f32> {
    let mut padded = Vec::with_capacity(samples.len() + 2 * half);
    if samples.len() > half {
        padded.extend(samples[1..=half].iter().rev());
        padded.extend_from_slice(samples);
        let last = samples.len() - 1;
        padded.extend(samples[last - half..last].iter().rev());
    } else {
        padded.resize(half, 0.0);
        padded.extend_from_slice(samples);
        padded.resize(samples.len() + 2 * half, 0.0);
    }
    padded
}

fn hz_to_mel(hz: f32) -> f32 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = 6.4f32.ln() / 27.0;
    if hz >= min_log_hz {
        min_log_mel + (hz / min_log_hz).ln() / logstep
    } else {
        hz / f_sp
    }
}

fn mel_to_hz(mel: f32) -> f32 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = 6.4f32.ln() / 27.0;
    if mel >= min_log_mel {
        min_log_hz * (logstep * (mel - min_log_mel)).exp()
    } else {
        f_sp * mel
    }
}

/// Slaney-style triangular mel filters with area normalisation.
/// Shape is `(n_mels, n_fft / 2 + 1)`.
pub fn mel_filter_bank(
    sample_rate: u32,
    n_fft: usize,
    n_mels: usize,
    fmin: f32,
    fmax: f32,
) -> Array2<f32> {
    let bins = n_fft / 2 + 1;
    let fft_freqs: Vec<f32> = (0..bins)
        .map(|k| k as f32 * sample_rate as f32 / n_fft as f32)
        .collect();
    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);
    let mel_freqs: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
        .collect();

    let mut weights = Array2::<f32>::zeros((n_mels, bins));
    for m in 0..n_mels {
        let (left, center, right) = (mel_freqs[m], mel_freqs[m + 1], mel_freqs[m + 2]);
        let enorm = 2.0 / (right - left);
        for (k, &freq) in fft_freqs.iter().enumerate() {
            let lower = (freq - left) / (center - left);
            let upper = (right - freq) / (right - center);
            weights[[m, k]] = lower.min(upper).max(0.0) * enorm;
        }
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn hann_window_is_periodic() {
        let window = hann_window(8);
        assert_abs_diff_eq!(window[0], 0.0);
        assert_abs_diff_eq!(window[4], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(window[2], window[6], epsilon = 1e-6);
    }

    #[test]
    fn reflect_pad_mirrors_edges() {
        let padded = reflect_pad(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(padded, vec![3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn reflect_pad_short_signal_uses_zeros() {
        let padded = reflect_pad(&[1.0], 2);
        assert_eq!(padded, vec![0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn mel_scale_round_trips() {
        for hz in [20.0, 440.0, 1000.0, 4200.0] {
            assert_abs_diff_eq!(mel_to_hz(hz_to_mel(hz)), hz, epsilon = 0.05);
        }
    }

    #[test]
    fn mel_filters_stay_inside_band() {
        let bank = mel_filter_bank(11025, 1024, 40, 20.0, 5000.0);
        assert_eq!(bank.dim(), (40, 513));
        // bin spacing is ~10.77 Hz, so bin 0 (0 Hz) and bins above 5000 Hz are empty
        assert!(bank.column(0).iter().all(|w| *w == 0.0));
        assert!(bank.column(470).iter().all(|w| *w == 0.0));
        assert!(bank.rows().into_iter().all(|row| row.sum() > 0.0));
    }

    #[test]
    fn resample_keeps_expected_length() {
        let samples: Vec<f32> = (0..44100)
            .map(|n| (2.0 * PI * 220.0 * n as f32 / 44100.0).sin())
            .collect();
        let out = resample(&samples, 44100, 11025).unwrap();
        assert_eq!(out.len(), 11025);
        let peak = out.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak > 0.8 && peak < 1.2);
    }
}
