//! Turning written glob patterns into absolute patterns.

use crate::error::{Error, Result};
use crate::paths;
use futures::future::BoxFuture;
use tracing::trace;

/// Resolves alias and bare specifiers used as glob patterns.
///
/// Implemented by the host. Returning `Ok(None)` means "not handled", in
/// which case the specifier is used as written.
pub trait ModuleResolver: Send + Sync {
    fn resolve_id<'a>(
        &'a self,
        specifier: &'a str,
        importer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Option<String>>>;
}

/// Resolver that never resolves anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl ModuleResolver for NoopResolver {
    fn resolve_id<'a>(
        &'a self,
        _specifier: &'a str,
        _importer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async { Ok(None) })
    }
}

/// Prefix aliases (e.g., `@` → `/project/src`).
///
/// A specifier matches an alias when it equals it or continues with `/`.
/// Longer aliases win.
#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    aliases: Vec<(String, String)>,
}

impl AliasResolver {
    /// Create an empty alias resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an alias.
    #[must_use]
    pub fn alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.aliases.push((from.into(), to.into()));
        self.aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        self
    }

    /// Build from `(from, to)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        pairs
            .into_iter()
            .fold(Self::new(), |resolver, (from, to)| resolver.alias(from, to))
    }

    fn resolve(&self, specifier: &str) -> Option<String> {
        for (from, to) in &self.aliases {
            if specifier == from {
                return Some(to.clone());
            }
            if let Some(rest) = specifier.strip_prefix(from.as_str()) {
                if rest.starts_with('/') {
                    return Some(format!("{}{}", to.trim_end_matches('/'), rest));
                }
            }
        }
        None
    }
}

impl ModuleResolver for AliasResolver {
    fn resolve_id<'a>(
        &'a self,
        specifier: &'a str,
        _importer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<Option<String>>> {
        let resolved = self.resolve(specifier);
        Box::pin(async move { Ok(resolved) })
    }
}

/// Resolve one written pattern to an absolute pattern.
///
/// `dir` is the directory of the importing module, `None` for virtual modules.
/// Patterns starting with `**` are returned as written; the matcher anchors
/// them at the project root.
pub async fn to_absolute_glob(
    glob: &str,
    root: &str,
    importer: &str,
    dir: Option<&str>,
    resolver: &dyn ModuleResolver,
) -> Result<String> {
    let (prefix, pattern) = match glob.strip_prefix('!') {
        Some(rest) => ("!", rest),
        None => ("", glob),
    };

    if let Some(rest) = pattern.strip_prefix('/') {
        return Ok(format!("{prefix}{}", paths::join(root, rest)));
    }
    if pattern.starts_with("./") || pattern.starts_with("../") {
        let dir = dir.ok_or_else(|| Error::VirtualRelative {
            glob: glob.to_string(),
        })?;
        return Ok(format!("{prefix}{}", paths::join(dir, pattern)));
    }
    if pattern.starts_with("**") {
        return Ok(glob.to_string());
    }

    let resolved = resolver
        .resolve_id(pattern, Some(importer))
        .await?
        .map_or_else(|| pattern.to_string(), |id| paths::to_posix(&id));
    trace!(glob, resolved = %resolved, "resolved aliased glob");

    if paths::is_absolute(&resolved) {
        Ok(format!("{prefix}{resolved}"))
    } else {
        Err(Error::InvalidGlob {
            glob: pattern.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn resolve(glob: &str, resolver: &dyn ModuleResolver) -> Result<String> {
        to_absolute_glob(glob, "/project", "/project/src/main.ts", Some("/project/src"), resolver)
            .await
    }

    #[tokio::test]
    async fn test_relative_and_root_patterns() {
        let noop = NoopResolver;
        assert_eq!(resolve("./mods/*.ts", &noop).await.unwrap(), "/project/src/mods/*.ts");
        assert_eq!(resolve("../lib/**/*.js", &noop).await.unwrap(), "/project/lib/**/*.js");
        assert_eq!(resolve("/pages/*.vue", &noop).await.unwrap(), "/project/pages/*.vue");
        assert_eq!(resolve("**/*.md", &noop).await.unwrap(), "**/*.md");
    }

    #[tokio::test]
    async fn test_negation_is_preserved() {
        let noop = NoopResolver;
        assert_eq!(resolve("!./mods/skip.ts", &noop).await.unwrap(), "!/project/src/mods/skip.ts");
        assert_eq!(resolve("!**/*.test.ts", &noop).await.unwrap(), "!**/*.test.ts");
    }

    #[tokio::test]
    async fn test_alias_resolution() {
        let aliases = AliasResolver::new()
            .alias("@", "/project/src")
            .alias("@components", "/project/src/components");
        assert_eq!(
            resolve("@/pages/*.ts", &aliases).await.unwrap(),
            "/project/src/pages/*.ts"
        );
        assert_eq!(
            resolve("@components/*.tsx", &aliases).await.unwrap(),
            "/project/src/components/*.tsx"
        );
    }

    #[tokio::test]
    async fn test_unresolved_bare_pattern_fails() {
        let err = resolve("foo", &NoopResolver).await.unwrap_err();
        assert!(matches!(err, Error::InvalidGlob { ref glob } if glob == "foo"));
    }

    #[tokio::test]
    async fn test_relative_pattern_without_dir_fails() {
        let err = to_absolute_glob("./a/*.ts", "/project", "virtual:x", None, &NoopResolver)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VirtualRelative { .. }));
    }
}
