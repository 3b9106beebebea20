//! Socket-path configuration for the sample `echo-server`/`echo-client`
//! binaries. TOML is the sole config source, using the same "raw struct
//! with every field `Option`, deserialized then defaulted" pattern as the
//! rest of the workspace's config loaders.
//!
//! Unlike a real daemon's mandatory config, a missing file here just means
//! "use the defaults" — these binaries are meant to run with zero setup
//! for local experimentation.

use serde::Deserialize;
use std::io;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/gg-core-bus/echo.toml";
pub const DEFAULT_SOCKET_PATH: &str = "/run/gg-core-bus/echo.sock";

#[derive(Debug, Clone)]
pub struct EchoConfig {
    pub socket_path: String,
    pub max_msg_len: usize,
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    socket_path: Option<String>,
    max_msg_len: Option<usize>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file '{path}': {source}")]
    Io { path: String, source: io::Error },
    #[error("parsing config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Load from `path`. A missing file is not an error; any other read
/// failure (permissions, a directory where a file was expected) is.
pub fn load_config_from_path(path: &Path) -> Result<EchoConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(toml_str) => toml::from_str(&toml_str)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => RawConfig::default(),
        Err(e) => {
            return Err(ConfigError::Io {
                path: path.display().to_string(),
                source: e,
            })
        }
    };

    Ok(EchoConfig {
        socket_path: raw
            .socket_path
            .unwrap_or_else(|| DEFAULT_SOCKET_PATH.to_owned()),
        max_msg_len: raw.max_msg_len.unwrap_or(gg_corebus::DEFAULT_MAX_MSG_LEN),
    })
}

/// Load from `DEFAULT_CONFIG_PATH`.
pub fn load_config() -> Result<EchoConfig, ConfigError> {
    load_config_from_path(Path::new(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = load_config_from_path(Path::new("/nonexistent/echo.toml")).unwrap();
        assert_eq!(cfg.socket_path, DEFAULT_SOCKET_PATH);
        assert_eq!(cfg.max_msg_len, gg_corebus::DEFAULT_MAX_MSG_LEN);
    }

    #[test]
    fn overrides_apply_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echo.toml");
        std::fs::write(&path, "socket_path = \"/tmp/custom.sock\"\nmax_msg_len = 4096\n").unwrap();
        let cfg = load_config_from_path(&path).unwrap();
        assert_eq!(cfg.socket_path, "/tmp/custom.sock");
        assert_eq!(cfg.max_msg_len, 4096);
    }
}
