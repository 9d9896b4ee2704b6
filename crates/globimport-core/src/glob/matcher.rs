//! Filesystem glob expansion and single-path matching.
//!
//! Patterns are POSIX patterns as produced by the resolver. A leading `!`
//! marks an exclusion. Patterns that are not absolute (`**/…`) are anchored
//! at the project root, never at the scan base.

use crate::error::{Error, Result};
use crate::paths;
use futures::future::BoxFuture;
use ::glob::{MatchOptions, Pattern};
use std::path::Path;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Options for [`GlobMatcher::expand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Directory the walk starts from. Every positive pattern lies below it.
    pub cwd: String,
    /// Project root that non-absolute patterns are anchored at.
    pub root: String,
    /// Let wildcards match names starting with `.`.
    pub dot: bool,
    /// Extra exclusion patterns.
    pub ignore: Vec<String>,
}

/// Glob engine used by the transformer and the invalidator.
pub trait GlobMatcher: Send + Sync {
    /// Absolute paths of the files matching `patterns`, in no particular order.
    fn expand<'a>(
        &'a self,
        patterns: &'a [String],
        options: &'a ExpandOptions,
    ) -> BoxFuture<'a, Result<Vec<String>>>;

    /// Whether `path` matches at least one positive pattern and no negated one.
    fn is_match(&self, path: &str, patterns: &[String]) -> bool;
}

/// [`GlobMatcher`] backed by `walkdir` and `glob::Pattern`.
///
/// Supports `*`, `?`, `**`, `[...]` and `{a,b}` alternation.
#[derive(Debug, Clone, Default)]
pub struct FsGlobMatcher {
    /// Anchor for non-absolute patterns in [`GlobMatcher::is_match`].
    /// Empty means the filesystem root.
    root: String,
}

impl FsGlobMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matcher for one project: `**/…` patterns only match below `root`.
    pub fn with_root(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }
}

impl GlobMatcher for FsGlobMatcher {
    fn expand<'a>(
        &'a self,
        patterns: &'a [String],
        options: &'a ExpandOptions,
    ) -> BoxFuture<'a, Result<Vec<String>>> {
        let patterns = patterns.to_vec();
        let options = options.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || expand_blocking(&patterns, &options))
                .await
                .map_err(|e| Error::other(format!("glob expansion task failed: {e}")))?
        })
    }

    fn is_match(&self, path: &str, patterns: &[String]) -> bool {
        match GlobSet::compile(patterns, &self.root) {
            Ok(set) => set.matches(path, match_options(false)),
            Err(e) => {
                debug!(error = %e, "skipping invalid glob set");
                false
            }
        }
    }
}

fn match_options(dot: bool) -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: !dot,
    }
}

/// Compiled positive and negated patterns.
struct GlobSet {
    positives: Vec<Pattern>,
    negatives: Vec<Pattern>,
}

impl GlobSet {
    fn compile(patterns: &[String], anchor: &str) -> Result<Self> {
        let mut set = Self {
            positives: Vec::new(),
            negatives: Vec::new(),
        };

        for raw in patterns {
            let (negated, body) = match raw.strip_prefix('!') {
                Some(body) => (true, body),
                None => (false, raw.as_str()),
            };
            let anchored = anchor_pattern(body, anchor);
            for alternative in expand_braces(&anchored) {
                let pattern = Pattern::new(&alternative).map_err(|e| Error::Pattern {
                    pattern: raw.clone(),
                    message: e.to_string(),
                })?;
                if negated {
                    set.negatives.push(pattern);
                } else {
                    set.positives.push(pattern);
                }
            }
        }

        Ok(set)
    }

    fn matches(&self, path: &str, options: MatchOptions) -> bool {
        self.positives.iter().any(|p| p.matches_with(path, options))
            && !self.excludes(path, options)
    }

    fn excludes(&self, path: &str, options: MatchOptions) -> bool {
        self.negatives.iter().any(|p| p.matches_with(path, options))
    }
}

fn anchor_pattern(pattern: &str, anchor: &str) -> String {
    if paths::is_absolute(pattern) {
        pattern.to_string()
    } else {
        format!("{}/{}", anchor.trim_end_matches('/'), pattern)
    }
}

/// Expand `{a,b}` alternations into separate patterns.
pub(crate) fn expand_braces(pattern: &str) -> Vec<String> {
    let mut depth = 0usize;
    let mut open = 0usize;

    for (i, c) in pattern.char_indices() {
        match c {
            '{' => {
                if depth == 0 {
                    open = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let alternatives = split_alternatives(&pattern[open + 1..i]);
                    if alternatives.len() > 1 {
                        let prefix = &pattern[..open];
                        let suffix = &pattern[i + 1..];
                        return alternatives
                            .iter()
                            .flat_map(|alt| expand_braces(&format!("{prefix}{alt}{suffix}")))
                            .collect();
                    }
                }
            }
            _ => {}
        }
    }

    vec![pattern.to_string()]
}

/// Split on commas that are not nested in another brace group.
fn split_alternatives(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in inner.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}

fn expand_blocking(patterns: &[String], options: &ExpandOptions) -> Result<Vec<String>> {
    let globs = GlobSet::compile(patterns, &options.root)?;
    if globs.positives.is_empty() {
        return Ok(Vec::new());
    }
    let ignore = GlobSet::compile(&options.ignore, &options.root)?;

    // `<dir>/**` ignores prune whole directories during the walk
    let prune = options
        .ignore
        .iter()
        .filter_map(|p| p.strip_suffix("/**"))
        .map(|p| p.to_string())
        .collect::<Vec<_>>();
    let prune = GlobSet::compile(&prune, &options.root)?;

    let match_options = match_options(options.dot);
    let prune_dot_dirs = !options.dot
        && !patterns.iter().any(|p| {
            let p = p.trim_start_matches('!');
            p.strip_prefix(options.cwd.as_str()).unwrap_or(p).contains("/.")
        });

    let root = Path::new(&options.cwd);
    if !root.is_dir() {
        trace!(cwd = %options.cwd, "glob root does not exist");
        return Ok(Vec::new());
    }

    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            if prune_dot_dirs && entry.file_name().to_string_lossy().starts_with('.') {
                return false;
            }
            let path = paths::path_to_posix(entry.path());
            !prune
                .positives
                .iter()
                .any(|p| p.matches_with(&path, match_options))
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                if err
                    .io_error()
                    .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound)
                {
                    continue;
                }
                return Err(Error::Walk {
                    path: err
                        .path()
                        .map_or_else(|| options.cwd.clone(), paths::path_to_posix),
                    message: err.to_string(),
                });
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let path = paths::path_to_posix(entry.path());
        if globs.matches(&path, match_options) && !ignore.matches(&path, match_options) {
            files.push(path);
        }
    }

    debug!(cwd = %options.cwd, patterns = patterns.len(), files = files.len(), "expanded globs");
    Ok(files)
}
