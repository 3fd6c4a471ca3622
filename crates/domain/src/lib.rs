pub mod error;
pub mod io;
pub mod jams;
pub mod tempo;

pub use crate::error::TempoError;
pub use crate::io::{decimal, JamsExporter, OutputFormat, ResultExporter, TextExporter};
pub use crate::jams::{JamsDocument, Provenance};
pub use crate::tempo::{MirexEstimate, TempoResult};
