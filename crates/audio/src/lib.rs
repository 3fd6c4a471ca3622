pub mod analysis;
pub mod dsp;
pub mod io;

pub use analysis::{FeatureBlock, FeatureReader, MelConfig, MelFeatureReader, MelSpectrogram};
pub use io::{AudioDecoder, AudioReader};
