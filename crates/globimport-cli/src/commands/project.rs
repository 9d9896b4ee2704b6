//! Project setup shared by `transform` and `watch`.

use globimport_core::config::load_options;
use globimport_core::{paths, AliasResolver, GlobImportOptions};
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Flags selecting the project and its options.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Project root (defaults to the nearest directory with package.json, the config file or .git)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Also transform import.meta.glob, globEager and globEagerDefault
    #[arg(long)]
    pub takeover: bool,

    /// Import alias, e.g. `@=./src` (repeatable)
    #[arg(long, value_name = "FROM=TO")]
    pub alias: Vec<String>,

    /// Explicit config file (overrides auto-discovery)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// A resolved project: root, options and alias resolver.
#[derive(Debug, Clone)]
pub struct Project {
    /// Canonical root directory.
    pub root: PathBuf,
    /// Root as a POSIX string.
    pub root_id: String,
    pub options: GlobImportOptions,
    pub resolver: AliasResolver,
}

impl ProjectArgs {
    /// Resolve the project relative to `cwd`.
    ///
    /// Config file values come first; `--takeover` and `--alias` override them.
    pub fn resolve(&self, cwd: &Path) -> Result<Project> {
        let root = match &self.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => cwd.join(root),
            None => paths::project_root(cwd).unwrap_or_else(|| cwd.to_path_buf()),
        };
        let root = dunce::canonicalize(&root)
            .into_diagnostic()
            .wrap_err_with(|| format!("project root {} is not accessible", root.display()))?;

        let mut options = match load_options(&root, self.config.as_deref()).into_diagnostic()? {
            Some((path, options)) => {
                info!(path = %path.display(), "loaded config");
                options
            }
            None => GlobImportOptions::default(),
        };

        if self.takeover {
            options.takeover = true;
        }
        for alias in &self.alias {
            let (from, to) = parse_alias(alias)?;
            options = options.with_alias(from, to);
        }

        let root_id = paths::path_to_posix(&root);
        let resolver = AliasResolver::from_pairs(options.resolved_aliases(&root_id));
        debug!(root = %root_id, takeover = options.takeover, aliases = options.alias.len(), "resolved project");

        Ok(Project {
            root,
            root_id,
            options,
            resolver,
        })
    }
}

/// Split `FROM=TO`.
fn parse_alias(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((from, to)) if !from.is_empty() && !to.is_empty() => Ok((from, to)),
        _ => Err(miette!("invalid alias '{raw}': expected FROM=TO")),
    }
}
