use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use tempo_domain::TempoError;

/// Decoded audio, mixed down to a single channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioReader {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioReader {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

pub struct AudioDecoder;

impl AudioDecoder {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<AudioReader, TempoError> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref).map_err(|err| TempoError::input(path_ref, err))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = path_ref.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|err| TempoError::input(path_ref, err))?;
        let mut format = probed.format;
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| TempoError::input(path_ref, "no decodable audio track"))?;
        let track_id = track.id;
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|err| TempoError::input(path_ref, err))?;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
        let mut channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(1);
        let mut samples = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphError::ResetRequired) => break,
                Err(err) => return Err(TempoError::input(path_ref, err)),
            };
            if packet.track_id() != track_id {
                continue;
            }
            let buffer = match decoder.decode(&packet) {
                Ok(buffer) => buffer,
                // skip undecodable packet
                Err(SymphError::DecodeError(_)) => continue,
                Err(err) => return Err(TempoError::input(path_ref, err)),
            };
            let spec = *buffer.spec();
            sample_rate = spec.rate;
            channels = spec.channels.count() as u16;
            let mut interleaved = SampleBuffer::<f32>::new(buffer.frames() as u64, spec);
            interleaved.copy_interleaved_ref(buffer);
            mix_down(interleaved.samples(), channels as usize, &mut samples);
        }

        if sample_rate == 0 {
            return Err(TempoError::input(path_ref, "unknown sample rate"));
        }
        debug!(
            path = ?path_ref,
            sample_rate,
            channels,
            frames = samples.len(),
            "decoded audio"
        );
        Ok(AudioReader {
            sample_rate,
            channels,
            samples,
        })
    }
}

/// Averages interleaved frames into mono samples appended to `out`.
pub fn mix_down(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    let channels = channels.max(1);
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}
