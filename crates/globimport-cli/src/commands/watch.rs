//! `globimport watch` command implementation.
//!
//! Transforms every module under the project root once, then keeps the
//! glob imports fresh: files added to or removed from a glob's directory
//! invalidate the modules importing it, and an `update` payload is printed
//! to stdout for each event.

use super::project::{Project, ProjectArgs};
use globimport_core::dev::{
    FileEventKind, GlobImportPlugin, HmrPayload, HostWatcher, ModuleGraph, WatchConfig,
};
use globimport_core::glob::base::static_base;
use globimport_core::{paths, Config, HostModuleGraph};
use miette::{IntoDiagnostic, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Extensions of the modules transformed by a session.
const MODULE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "mjs", "cjs", "mts", "cts", "vue", "svelte",
];

/// Watch command action.
#[derive(Debug, Clone)]
pub struct WatchAction {
    pub project: ProjectArgs,
}

/// Run the watch command until interrupted.
pub fn run(config: &Config, action: WatchAction) -> Result<()> {
    let project = action.project.resolve(&config.cwd)?;
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    runtime.block_on(session(project))
}

/// `notify` watcher behind the plugin's [`HostWatcher`] seam.
struct NotifyWatcher {
    watcher: Mutex<RecommendedWatcher>,
    /// Project root, watched for patterns that are not absolute.
    root: PathBuf,
    /// Directories watched recursively.
    dirs: Mutex<HashSet<PathBuf>>,
    /// Files watched on their own.
    files: Mutex<HashSet<PathBuf>>,
    /// Whether glob patterns are reduced to their base directory.
    globbing: bool,
}

impl NotifyWatcher {
    fn new(
        tx: mpsc::UnboundedSender<notify::Event>,
        root: &Path,
        config: &WatchConfig,
    ) -> Result<Self> {
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let _ = tx.send(event);
                }
                Err(e) => warn!(error = %e, "watch error"),
            }
        })
        .into_diagnostic()?;

        Ok(Self {
            watcher: Mutex::new(watcher),
            root: root.to_path_buf(),
            dirs: Mutex::new(HashSet::new()),
            files: Mutex::new(HashSet::new()),
            globbing: !config.disable_globbing,
        })
    }

    /// Watch the directory a pattern scans, or its nearest existing ancestor.
    fn watch_dir(&self, dir: &Path) {
        let Some(dir) = dir.ancestors().find(|p| p.is_dir()) else {
            return;
        };

        let mut dirs = self.dirs.lock().unwrap_or_else(PoisonError::into_inner);
        if dirs.iter().any(|watched| dir.starts_with(watched)) {
            return;
        }

        let mut watcher = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        match watcher.watch(dir, RecursiveMode::Recursive) {
            Ok(()) => {
                debug!(dir = %dir.display(), "watching directory");
                dirs.insert(dir.to_path_buf());
            }
            Err(e) => warn!(dir = %dir.display(), error = %e, "failed to watch directory"),
        }
    }

    /// Watch a single module file.
    fn watch_file(&self, file: &Path) {
        if self
            .dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|watched| file.starts_with(watched))
        {
            return;
        }

        let mut files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        if files.contains(file) {
            return;
        }
        let mut watcher = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        match watcher.watch(file, RecursiveMode::NonRecursive) {
            Ok(()) => {
                files.insert(file.to_path_buf());
            }
            Err(e) => warn!(file = %file.display(), error = %e, "failed to watch module"),
        }
    }
}

impl HostWatcher for NotifyWatcher {
    fn watch_paths(&self, patterns: &[String]) {
        for pattern in patterns.iter().filter(|p| !p.starts_with('!')) {
            if !paths::is_absolute(pattern) {
                self.watch_dir(&self.root);
                continue;
            }
            let dir = if self.globbing {
                static_base(pattern)
            } else {
                paths::dirname(pattern)
            };
            self.watch_dir(Path::new(&dir));
        }
    }
}

/// State shared by the session loop.
struct Session {
    project: Project,
    plugin: GlobImportPlugin,
    graph: Arc<ModuleGraph>,
    watcher: NotifyWatcher,
}

impl Session {
    /// Transform one module and register it in the graph.
    async fn transform(&self, id: &str) {
        let code = match tokio::fs::read_to_string(id).await {
            Ok(code) => code,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(id, "module is gone");
                return;
            }
            Err(e) => {
                warn!(id, error = %e, "failed to read module");
                return;
            }
        };

        self.graph.ensure_module(id, id);
        self.watcher.watch_file(Path::new(id));

        match self
            .plugin
            .transform(&code, id, &self.project.resolver, Some(&self.watcher))
            .await
        {
            Ok(Some(output)) => {
                info!(id, globs = output.globs.len(), "transformed");
            }
            Ok(None) => debug!(id, "no glob imports"),
            Err(e) => {
                warn!(id, error = %e, "transform failed");
                self.graph.send_update(HmrPayload::Error {
                    message: format!("{id}: {e}"),
                });
            }
        }
    }

    /// Handle one batch of filesystem events.
    async fn handle_event(&self, event: notify::Event) {
        for (path, kind) in classify(&event) {
            let id = paths::path_to_posix(dunce::simplified(&path));
            if is_ignored(&self.project.root_id, &id) {
                continue;
            }

            match kind {
                FileEventKind::Add | FileEventKind::Unlink => {
                    let invalidated = self.plugin.handle_file_event(&id, kind, self.graph.as_ref());
                    for module in &invalidated {
                        self.transform(module).await;
                    }
                    if kind == FileEventKind::Add && is_module(&path) && self.graph.get(&id).is_none() {
                        self.transform(&id).await;
                    }
                }
                FileEventKind::Change => {
                    if self.graph.get(&id).is_some() {
                        self.transform(&id).await;
                    }
                }
            }
        }
    }
}

async fn session(project: Project) -> Result<()> {
    let plugin = GlobImportPlugin::new(&project.root_id, project.options.clone());
    let mut watch_config = WatchConfig {
        disable_globbing: true,
    };
    plugin.config(&mut watch_config);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let watcher = NotifyWatcher::new(tx, &project.root, &watch_config)?;
    let graph = Arc::new(ModuleGraph::new());

    // Print payloads as they are sent
    let mut payloads = graph.subscribe();
    tokio::spawn(async move {
        loop {
            match payloads.recv().await {
                Ok(payload) => match payload.to_json() {
                    Ok(line) => println!("{line}"),
                    Err(e) => warn!(error = %e, "failed to serialize payload"),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "dropped update payloads"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let session = Session {
        plugin,
        graph,
        watcher,
        project,
    };

    session.plugin.build_start();
    let modules = find_modules(&session.project.root);
    for module in &modules {
        session.transform(module).await;
    }
    info!(
        root = %session.project.root_id,
        modules = modules.len(),
        tracked = session.plugin.index().len(),
        "watch session ready"
    );

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                session.handle_event(event).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("stopping watch session");
                break;
            }
        }
    }

    Ok(())
}

/// Map a `notify` event to per-path glob-import events.
fn classify(event: &notify::Event) -> Vec<(PathBuf, FileEventKind)> {
    let all = |kind: FileEventKind| -> Vec<(PathBuf, FileEventKind)> {
        event.paths.iter().map(|p| (p.clone(), kind)).collect()
    };
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            all(FileEventKind::Add)
        }
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            all(FileEventKind::Unlink)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut events = Vec::new();
            if let Some(from) = event.paths.first() {
                events.push((from.clone(), FileEventKind::Unlink));
            }
            if let Some(to) = event.paths.get(1) {
                events.push((to.clone(), FileEventKind::Add));
            }
            events
        }
        EventKind::Modify(_) => all(FileEventKind::Change),
        _ => Vec::new(),
    }
}

/// Paths inside `node_modules` or a dot-directory of the project.
fn is_ignored(root: &str, id: &str) -> bool {
    let rel = id.strip_prefix(root).unwrap_or(id);
    let mut dirs = rel.split('/').filter(|s| !s.is_empty()).rev().skip(1);
    dirs.any(|dir| dir == "node_modules" || dir.starts_with('.'))
}

fn is_module(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| MODULE_EXTENSIONS.contains(&ext))
}

/// Module ids under `root`, skipping `node_modules` and dot-directories.
fn find_modules(root: &Path) -> Vec<String> {
    let mut modules: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            name != "node_modules" && !name.starts_with('.')
        })
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_module(entry.path()))
        .map(|entry| paths::path_to_posix(entry.path()))
        .collect();
    modules.sort();
    modules
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use std::fs;

    #[test]
    fn test_classify_events() {
        let event = notify::Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/p/src/a.ts"));
        assert_eq!(
            classify(&event),
            vec![(PathBuf::from("/p/src/a.ts"), FileEventKind::Add)]
        );

        let event = notify::Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(PathBuf::from("/p/src/a.ts"));
        assert_eq!(classify(&event)[0].1, FileEventKind::Unlink);

        let event = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/p/a.ts"))
            .add_path(PathBuf::from("/p/b.ts"));
        assert_eq!(
            classify(&event),
            vec![
                (PathBuf::from("/p/a.ts"), FileEventKind::Unlink),
                (PathBuf::from("/p/b.ts"), FileEventKind::Add),
            ]
        );

        let event = notify::Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(PathBuf::from("/p/a.ts"));
        assert_eq!(classify(&event)[0].1, FileEventKind::Change);

        assert!(classify(&notify::Event::new(EventKind::Any)).is_empty());
    }

    #[test]
    fn test_is_ignored() {
        assert!(is_ignored("/p", "/p/node_modules/x/index.js"));
        assert!(is_ignored("/p", "/p/.git/HEAD"));
        assert!(!is_ignored("/p", "/p/src/a.ts"));
        assert!(!is_ignored("/p", "/p/src/.env"));
        assert!(!is_ignored("/tmp/.tmp1", "/tmp/.tmp1/src/a.ts"));
    }

    #[test]
    fn test_unanchored_patterns_watch_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let watcher = NotifyWatcher::new(
            tx,
            &root,
            &WatchConfig {
                disable_globbing: false,
            },
        )
        .unwrap();

        watcher.watch_paths(&["**/*.md".to_string(), "!**/skip.md".to_string()]);
        let dirs = watcher.dirs.lock().unwrap();
        assert_eq!(dirs.iter().collect::<Vec<_>>(), vec![&root]);
    }

    #[test]
    fn test_find_modules() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("app");
        for rel in [
            "src/main.ts",
            "src/App.vue",
            "src/style.css",
            "node_modules/dep/index.js",
            ".cache/x.js",
        ] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }

        let modules = find_modules(&root);
        let root_id = paths::path_to_posix(&root);
        assert_eq!(
            modules,
            vec![format!("{root_id}/src/App.vue"), format!("{root_id}/src/main.ts")]
        );
    }
}
