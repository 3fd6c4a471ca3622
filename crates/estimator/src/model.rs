use std::path::{Path, PathBuf};

use tracing::debug;

use tempo_domain::TempoError;

pub const DEFAULT_MODEL: &str = "fcn";

/// Models shipped under their own names.
pub const BASE_MODELS: &[&str] = &[
    "ismir2018",
    "fma2018",
    "cnn",
    "fcn",
    "mazurka",
    "deeptemp",
    "deepsquare",
    "shallowtemp",
];

/// Kernel-width variants, published as `<family>_k<width>`.
const KERNEL_VARIANTS: &[(&str, &[u32])] = &[
    ("deeptemp", &[2, 4, 8, 16, 24]),
    ("deepsquare", &[1, 2, 4, 8, 16, 24]),
    ("shallowtemp", &[1, 2, 4, 6, 8, 12]),
];

pub fn is_known_model(name: &str) -> bool {
    if BASE_MODELS.contains(&name) {
        return true;
    }
    let Some((family, width)) = name.rsplit_once("_k") else {
        return false;
    };
    let Ok(width) = width.parse::<u32>() else {
        return false;
    };
    KERNEL_VARIANTS
        .iter()
        .any(|(known, widths)| *known == family && widths.contains(&width))
}

/// Maps model names to ONNX files inside a models directory.
#[derive(Debug, Clone)]
pub struct ModelLocator {
    models_dir: PathBuf,
}

impl ModelLocator {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Resolves a known name to `<dir>/<name>.onnx`, or accepts a path to an
    /// existing `.onnx` file as is.
    pub fn resolve(&self, model: &str) -> Result<PathBuf, TempoError> {
        let direct = Path::new(model);
        if direct.extension().is_some_and(|ext| ext == "onnx") {
            if direct.is_file() {
                return Ok(direct.to_path_buf());
            }
            return Err(TempoError::model_load(model, "model file does not exist"));
        }
        if !is_known_model(model) {
            return Err(TempoError::model_load(model, "unknown model name"));
        }
        let path = self.models_dir.join(format!("{model}.onnx"));
        debug!(model, path = ?path, "resolved model weights");
        if !path.is_file() {
            return Err(TempoError::model_load(
                model,
                format!("weights not found at {}", path.display()),
            ));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_names_and_variants() {
        for name in BASE_MODELS {
            assert!(is_known_model(name), "{name}");
        }
        assert!(is_known_model("deeptemp_k16"));
        assert!(is_known_model("shallowtemp_k6"));
        assert!(!is_known_model("deeptemp_k3"));
        assert!(!is_known_model("fcn_k2"));
        assert!(!is_known_model("resnet"));
    }

    #[test]
    fn unknown_name_fails_to_load() {
        let locator = ModelLocator::new("models");
        let err = locator.resolve("resnet").unwrap_err();
        assert!(matches!(err, TempoError::ModelLoad { .. }));
    }

    #[test]
    fn missing_weights_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let locator = ModelLocator::new(dir.path());
        let err = locator.resolve("fcn").unwrap_err();
        assert!(err.to_string().contains("weights not found"));
    }

    #[test]
    fn resolves_into_models_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cnn.onnx"), b"").unwrap();
        let locator = ModelLocator::new(dir.path());
        assert_eq!(locator.models_dir(), dir.path());
        assert_eq!(locator.resolve("cnn").unwrap(), dir.path().join("cnn.onnx"));
    }

    #[test]
    fn accepts_explicit_onnx_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.onnx");
        std::fs::write(&path, b"").unwrap();
        let locator = ModelLocator::new("unused");
        assert_eq!(locator.resolve(path.to_str().unwrap()).unwrap(), path);
        assert!(locator.resolve("elsewhere/missing.onnx").is_err());
    }
}
