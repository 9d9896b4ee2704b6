//! Configuration for glob-import transforms.
//!
//! Options are read from `globimport.config.json` in the project root:
//!
//! ```json
//! {
//!   "takeover": true,
//!   "alias": { "@": "./src" }
//! }
//! ```

use crate::error::{Error, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Config file name looked up in the project root.
pub const CONFIG_FILE: &str = "globimport.config.json";

/// Runtime configuration for the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

/// Options controlling which call forms are transformed and how aliases resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GlobImportOptions {
    /// Also transform `import.meta.glob`, `globEager` and `globEagerDefault`,
    /// not just `import.meta.importGlob`.
    pub takeover: bool,

    /// Import aliases (e.g., `@` → `./src`). Relative targets are resolved
    /// against the project root.
    pub alias: BTreeMap<String, String>,
}

impl GlobImportOptions {
    /// Set takeover mode.
    #[must_use]
    pub fn with_takeover(mut self, takeover: bool) -> Self {
        self.takeover = takeover;
        self
    }

    /// Add an alias.
    #[must_use]
    pub fn with_alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.alias.insert(from.into(), to.into());
        self
    }

    /// Alias table with every target made absolute against `root`.
    #[must_use]
    pub fn resolved_aliases(&self, root: &str) -> Vec<(String, String)> {
        self.alias
            .iter()
            .map(|(from, to)| {
                let to = paths::to_posix(to);
                let target = if to.starts_with('/') {
                    paths::normalize(&to)
                } else {
                    paths::join(root, &to)
                };
                (from.clone(), target)
            })
            .collect()
    }
}

/// Find the config file in the given root directory.
#[must_use]
pub fn find_config_file(root: &Path) -> Option<PathBuf> {
    let path = root.join(CONFIG_FILE);
    path.exists().then_some(path)
}

/// Load options from a config file.
///
/// If `config_path` is `Some`, that file must exist. Otherwise the root is
/// searched and `Ok(None)` is returned when no config file is present.
pub fn load_options(
    root: &Path,
    config_path: Option<&Path>,
) -> Result<Option<(PathBuf, GlobImportOptions)>> {
    let path = match config_path {
        Some(p) => {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                root.join(p)
            }
        }
        None => match find_config_file(root) {
            Some(p) => p,
            None => return Ok(None),
        },
    };

    let source = std::fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
        path: path.clone(),
        source,
    })?;

    let options = serde_json::from_str(&source).map_err(|source| Error::ConfigParse {
        path: path.clone(),
        source,
    })?;

    Ok(Some((path, options)))
}
