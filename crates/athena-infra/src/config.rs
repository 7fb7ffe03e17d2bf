//! Configuration loader and data directory layout.
//!
//! Reads `config.toml` from the data directory (`~/.athena/` by default).
//! A missing file means defaults. A file that does not parse or fails
//! validation is an error.

use std::path::{Path, PathBuf};

use anyhow::Context;
use athena_types::config::AthenaConfig;

pub const DATA_DIR_ENV: &str = "ATHENA_DATA_DIR";
pub const CONFIG_FILE: &str = "config.toml";

/// Resolve the data directory.
///
/// Priority: explicit path, `ATHENA_DATA_DIR`, `~/.athena`, `./.athena`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(dir) = std::env::var(DATA_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".athena"))
        .unwrap_or_else(|| PathBuf::from(".athena"))
}

/// Load and validate `{data_dir}/config.toml`.
pub async fn load_config(data_dir: &Path) -> anyhow::Result<AthenaConfig> {
    let path = data_dir.join(CONFIG_FILE);

    let config = match tokio::fs::read_to_string(&path).await {
        Ok(content) => toml::from_str::<AthenaConfig>(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml at {}, using defaults", path.display());
            AthenaConfig::default()
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    config
        .validate()
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    Ok(config)
}

/// Resolved on-disk locations for one data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AthenaPaths {
    pub data_dir: PathBuf,
    pub corpus_dir: PathBuf,
    pub index_dir: PathBuf,
}

impl AthenaPaths {
    /// Relative `corpus.dir` and `index.dir` are taken relative to `data_dir`.
    pub fn resolve(data_dir: &Path, config: &AthenaConfig) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            corpus_dir: under(data_dir, &config.corpus.dir),
            index_dir: under(data_dir, &config.index.dir),
        }
    }
}

fn under(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
