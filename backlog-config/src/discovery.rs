//! Configuration file discovery
//!
//! Finds the project configuration file inside the backlog directory. Formats
//! are tried in a fixed order and the first existing file wins.

use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// File stem of the project configuration file
pub const CONFIG_FILE_STEM: &str = "config";

/// The project config file that was found
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub format: ConfigFormat,
}

/// Serialization format, decided by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    /// `.yaml` or `.yml`
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Format for a file extension, case-insensitive
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Extensions in lookup order
const EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Find the configuration file in `dir`
pub fn find_config_file(dir: &Path) -> Option<ConfigFile> {
    if !dir.is_dir() {
        debug!("Config directory does not exist: {}", dir.display());
        return None;
    }

    for ext in EXTENSIONS {
        let path = dir.join(format!("{}.{}", CONFIG_FILE_STEM, ext));
        trace!("Checking for config file {}", path.display());
        if path.is_file() {
            let format = ConfigFormat::from_extension(ext)?;
            debug!("Found config file {} ({:?})", path.display(), format);
            return Some(ConfigFile { path, format });
        }
    }

    None
}
