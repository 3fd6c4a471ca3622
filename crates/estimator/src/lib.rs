pub mod config;
pub mod model;
pub mod onnx;
pub mod output;
pub mod pipeline;
pub mod tempo;

pub use config::RunConfig;
pub use model::{is_known_model, ModelLocator, DEFAULT_MODEL};
pub use output::{resolve_destination, Destination};
pub use pipeline::{BatchRunner, BatchSummary};
pub use tempo::{ClassPredictor, TempoClassifier, TempoModel};
