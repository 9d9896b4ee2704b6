//! Rewriting glob-import calls into object literals of imports.

use super::base::common_base;
use super::call::{parse_import_globs, GlobCallOccurrence, ResolvedGlobSet};
use super::matcher::{ExpandOptions, FsGlobMatcher, GlobMatcher};
use super::query::{file_query, stringify_query};
use super::resolve::ModuleResolver;
use crate::config::GlobImportOptions;
use crate::error::Result;
use crate::paths;
use crate::splice::{SourceBuffer, SourceMap};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, trace};

/// Prefix of the bindings created for eager imports.
const EAGER_PREFIX: &str = "__glob_import_";

/// Result of transforming one module.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    /// Rewritten source.
    pub code: String,
    /// Map from `code` back to the original source.
    pub map: SourceMap,
    /// Resolved patterns of every rewritten call, in source order.
    pub globs: Vec<ResolvedGlobSet>,
}

/// Generated code for one call.
struct Rewrite {
    replacement: String,
    imports: Vec<String>,
}

/// Transforms modules of one project.
#[derive(Clone)]
pub struct GlobTransformer {
    root: String,
    options: GlobImportOptions,
    matcher: Arc<dyn GlobMatcher>,
}

impl GlobTransformer {
    /// Create a transformer for the project at `root` using the filesystem matcher.
    pub fn new(root: impl AsRef<str>, options: GlobImportOptions) -> Self {
        let root = paths::normalize(&paths::to_posix(root.as_ref()));
        Self {
            matcher: Arc::new(FsGlobMatcher::with_root(root.clone())),
            root,
            options,
        }
    }

    /// Use a different glob engine.
    #[must_use]
    pub fn with_matcher(mut self, matcher: Arc<dyn GlobMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn options(&self) -> &GlobImportOptions {
        &self.options
    }

    pub fn matcher(&self) -> &Arc<dyn GlobMatcher> {
        &self.matcher
    }

    /// Rewrite every glob-import call in `code`.
    ///
    /// Returns `Ok(None)` when the module has no call to rewrite.
    pub async fn transform(
        &self,
        code: &str,
        id: &str,
        resolver: &dyn ModuleResolver,
    ) -> Result<Option<TransformOutput>> {
        let id = paths::to_posix(id);
        let dir = (!paths::is_virtual_module(&id)).then(|| paths::dirname(&id));

        let takeover = self.options.takeover;
        let mut calls =
            parse_import_globs(code, &id, dir.as_deref(), &self.root, takeover, resolver).await?;
        if takeover {
            for call in &mut calls {
                if call.force_eager {
                    call.options.eager = true;
                }
                if call.force_default_export {
                    call.options.export = Some("default".to_string());
                }
            }
        }

        if calls.is_empty() {
            trace!(id = %id, "no glob imports");
            return Ok(None);
        }

        let rewrites =
            try_join_all(calls.iter().map(|call| self.rewrite(call, &id, dir.as_deref()))).await?;

        let mut buffer = SourceBuffer::new(code);
        let mut imports = Vec::new();
        for (call, rewrite) in calls.iter().zip(rewrites) {
            buffer.overwrite(call.start, call.end, &rewrite.replacement)?;
            imports.extend(rewrite.imports);
        }
        if !imports.is_empty() {
            buffer.prepend(&format!("{}\n", imports.join("\n")));
        }

        debug!(id = %id, calls = calls.len(), imports = imports.len(), "transformed glob imports");
        Ok(Some(TransformOutput {
            code: buffer.to_string(),
            map: buffer.generate_map(&id, true),
            globs: calls.into_iter().map(|call| call.resolved).collect(),
        }))
    }

    async fn rewrite(
        &self,
        call: &GlobCallOccurrence,
        id: &str,
        dir: Option<&str>,
    ) -> Result<Rewrite> {
        let options = &call.options;
        let cwd = common_base(&call.resolved.resolved, &self.root);
        let ignore = if options.exhaustive {
            Vec::new()
        } else {
            vec![format!("{}/**/node_modules/**", cwd.trim_end_matches('/'))]
        };
        let expand = ExpandOptions {
            cwd,
            root: self.root.clone(),
            dot: options.exhaustive,
            ignore,
        };

        let mut files = self.matcher.expand(&call.resolved.resolved, &expand).await?;
        files.retain(|file| file != id);
        files.sort();
        files.dedup();
        trace!(id, index = call.index, files = files.len(), "expanded glob import");

        let query = stringify_query(options.query.as_ref());
        let mut entries = Vec::with_capacity(files.len());
        let mut imports = Vec::new();

        for (i, file) in files.iter().enumerate() {
            let (key, import_path) = self.file_paths(file, dir, call.resolved.is_relative);
            let specifier = format!("{import_path}{}", file_query(&query, file));

            if options.eager {
                let binding = format!("{EAGER_PREFIX}{}_{i}", call.index);
                let clause = match &options.export {
                    Some(export) => format!("{{ {export} as {binding} }}"),
                    None => format!("* as {binding}"),
                };
                imports.push(format!("import {clause} from {}", js_string(&specifier)));
                entries.push(format!("{}: {binding}", js_string(&key)));
            } else {
                let mut loader = format!("import({})", js_string(&specifier));
                if let Some(export) = &options.export {
                    loader.push_str(&format!(".then(m => m[{}])", js_string(export)));
                }
                entries.push(format!("{}: () => {loader}", js_string(&key)));
            }
        }

        Ok(Rewrite {
            replacement: format!("{{\n{}\n}}", entries.join(",\n")),
            imports,
        })
    }

    /// Object key and import path of a matched file.
    fn file_paths(&self, file: &str, dir: Option<&str>, is_relative: bool) -> (String, String) {
        let Some(dir) = dir else {
            let path = format!("/{}", paths::relative(&self.root, file));
            return (path.clone(), path);
        };

        let mut import_path = paths::relative(dir, file);
        if !import_path.starts_with('.') {
            import_path = format!("./{import_path}");
        }

        let key = if is_relative {
            import_path.clone()
        } else {
            let from_root = paths::relative(&self.root, file);
            if from_root.starts_with('.') {
                from_root
            } else {
                format!("/{from_root}")
            }
        };

        (key, import_path)
    }
}

/// Transform one module with a transformer built for this call.
pub async fn transform_module(
    code: &str,
    id: &str,
    root: &str,
    resolver: &dyn ModuleResolver,
    options: &GlobImportOptions,
) -> Result<Option<TransformOutput>> {
    GlobTransformer::new(root, options.clone())
        .transform(code, id, resolver)
        .await
}

/// JavaScript string literal for `s`.
fn js_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}
