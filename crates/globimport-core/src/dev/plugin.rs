//! Dev-server plugin wiring the transformer to a host.
//!
//! The host calls the hooks in this order:
//! 1. `config` - once, before the watcher starts
//! 2. `build_start` - at the start of every build session
//! 3. `transform` - for every module it loads
//! 4. `handle_file_event` - for every file the watcher reports

use super::hmr::{now_ms, HmrPayload, HmrUpdate};
use crate::config::GlobImportOptions;
use crate::error::Result;
use crate::glob::{DependencyIndex, GlobMatcher, GlobTransformer, ModuleResolver, TransformOutput};
use crate::paths;
use tracing::{debug, trace};

/// Watcher settings a plugin may adjust.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchConfig {
    /// Whether `watch_paths` receives literal paths only.
    /// Glob imports register patterns, so they need this off.
    pub disable_globbing: bool,
}

/// What happened to a watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Add,
    Unlink,
    Change,
}

/// The host's module graph, as seen by the plugin.
pub trait HostModuleGraph: Send + Sync {
    /// Ids of the live modules backed by `file`.
    fn modules_by_file(&self, file: &str) -> Vec<String>;

    /// Drop cached output of a module so the next request re-transforms it.
    fn invalidate(&self, module_id: &str);

    /// Push a payload to connected clients.
    fn send_update(&self, payload: HmrPayload);
}

/// The host's file watcher.
pub trait HostWatcher: Send + Sync {
    /// Start watching `patterns`. Repeated patterns must be tolerated.
    fn watch_paths(&self, patterns: &[String]);
}

/// Glob-import plugin for one dev session.
pub struct GlobImportPlugin {
    transformer: GlobTransformer,
    index: DependencyIndex,
}

impl GlobImportPlugin {
    /// Create a plugin for the project at `root`.
    pub fn new(root: impl AsRef<str>, options: GlobImportOptions) -> Self {
        Self::with_transformer(GlobTransformer::new(root, options))
    }

    /// Create a plugin around a configured transformer.
    pub fn with_transformer(transformer: GlobTransformer) -> Self {
        Self {
            transformer,
            index: DependencyIndex::new(),
        }
    }

    /// Plugin name.
    pub fn name(&self) -> &'static str {
        "glob-import"
    }

    pub fn transformer(&self) -> &GlobTransformer {
        &self.transformer
    }

    pub fn index(&self) -> &DependencyIndex {
        &self.index
    }

    fn matcher(&self) -> &dyn GlobMatcher {
        self.transformer.matcher().as_ref()
    }

    /// Adjust the host's watcher settings.
    pub fn config(&self, config: &mut WatchConfig) {
        config.disable_globbing = false;
    }

    /// Start of a build session: forget every recorded dependency.
    pub fn build_start(&self) {
        self.index.reset();
    }

    /// Transform a module and record its glob dependencies.
    ///
    /// Returns `Ok(None)` when the module has nothing to rewrite. A module
    /// that no longer contains glob imports loses its recorded entry.
    pub async fn transform(
        &self,
        code: &str,
        id: &str,
        resolver: &dyn ModuleResolver,
        watcher: Option<&dyn HostWatcher>,
    ) -> Result<Option<TransformOutput>> {
        let module_id = paths::to_posix(id);
        let Some(output) = self.transformer.transform(code, &module_id, resolver).await? else {
            if self.index.remove(&module_id) {
                trace!(module_id = %module_id, "dropped stale glob dependencies");
            }
            return Ok(None);
        };

        let watch = self.index.record(&module_id, &output.globs);
        if let Some(watcher) = watcher {
            watcher.watch_paths(&watch);
        }
        Ok(Some(output))
    }

    /// React to a watcher event.
    ///
    /// Adding or removing a file invalidates every module whose glob
    /// imports match it and sends one update listing them. Returns the ids
    /// of the invalidated modules.
    pub fn handle_file_event(
        &self,
        path: &str,
        kind: FileEventKind,
        graph: &dyn HostModuleGraph,
    ) -> Vec<String> {
        if kind == FileEventKind::Change {
            return Vec::new();
        }

        let path = paths::to_posix(path);
        let affected = self.index.affected_modules(&path, self.matcher());
        let modules: Vec<String> = affected
            .iter()
            .flat_map(|id| graph.modules_by_file(id))
            .collect();
        if modules.is_empty() {
            return modules;
        }

        let timestamp = now_ms();
        let updates = modules
            .iter()
            .map(|module_id| {
                graph.invalidate(module_id);
                HmrUpdate::js_update(module_id, timestamp)
            })
            .collect();
        graph.send_update(HmrPayload::Update { updates });

        debug!(path = %path, ?kind, modules = modules.len(), "invalidated glob importers");
        modules
    }
}
