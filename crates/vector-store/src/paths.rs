use std::path::PathBuf;

pub const DOCCHAT_CACHE_DIR_NAME: &str = "docchat";
pub const MODELS_DIR_NAME: &str = "models";

/// Environment variable that overrides the model directory.
pub const MODEL_DIR_ENV: &str = "DOCCHAT_MODEL_DIR";

/// Resolves the directory holding `<model_id>/model.onnx` and
/// `<model_id>/tokenizer.json`.
///
/// Order: `DOCCHAT_MODEL_DIR`, a `./models` directory in the working tree,
/// `$XDG_CACHE_HOME/docchat/models`, then `$HOME/.cache/docchat/models`.
#[must_use]
pub fn model_dir() -> PathBuf {
    if let Ok(path) = std::env::var(MODEL_DIR_ENV) {
        return PathBuf::from(path);
    }

    if let Ok(cwd) = std::env::current_dir() {
        let local = cwd.join(MODELS_DIR_NAME);
        if local.is_dir() {
            return local;
        }
    }

    if let Ok(path) = std::env::var("XDG_CACHE_HOME") {
        return PathBuf::from(path)
            .join(DOCCHAT_CACHE_DIR_NAME)
            .join(MODELS_DIR_NAME);
    }

    std::env::var("HOME")
        .map_or_else(|_| PathBuf::from("."), PathBuf::from)
        .join(".cache")
        .join(DOCCHAT_CACHE_DIR_NAME)
        .join(MODELS_DIR_NAME)
}
