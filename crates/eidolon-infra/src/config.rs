//! Engine configuration loader for Eidolon.
//!
//! Reads `eidolon.toml` from the data directory and deserializes it into
//! [`EngineConfig`]. Falls back to defaults when the file is missing or
//! malformed -- a broken config file must never prevent startup.

use std::path::Path;

use eidolon_types::config::EngineConfig;

/// Load the engine configuration from `{data_dir}/eidolon.toml`.
///
/// - If the file does not exist, returns [`EngineConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the
///   default.
/// - Otherwise returns the parsed config (partial files keep serde
///   defaults for missing fields).
pub async fn load_engine_config(data_dir: &Path) -> EngineConfig {
    let config_path = data_dir.join("eidolon.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No eidolon.toml found at {}, using defaults",
                config_path.display()
            );
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!(
                "Failed to read {}: {err}, using defaults",
                config_path.display()
            );
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            EngineConfig::default()
        }
    }
}
