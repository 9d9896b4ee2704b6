//! POSIX path algebra on strings.
//!
//! Module ids, glob patterns and generated specifiers are all `/`-separated
//! strings, independent of the host platform, so these helpers never go
//! through `std::path`.

use std::path::{Path, PathBuf};

/// Convert backslashes to forward slashes.
#[must_use]
pub fn to_posix(path: &str) -> String {
    path.replace('\\', "/")
}

/// Whether the path is rooted at `/`.
#[must_use]
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

/// Lexically normalize a path: collapse `.`, `..`, duplicate and trailing slashes.
///
/// Leading `..` segments of a relative path are kept; `..` above `/` is dropped.
#[must_use]
pub fn normalize(path: &str) -> String {
    let absolute = is_absolute(path);
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Join `rest` onto `base` and normalize the result.
#[must_use]
pub fn join(base: &str, rest: &str) -> String {
    if rest.is_empty() {
        return normalize(base);
    }
    normalize(&format!("{base}/{rest}"))
}

/// Parent directory of a path (`/` for top-level entries, `.` for bare names).
#[must_use]
pub fn dirname(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
        None if is_absolute(path) => "/".to_string(),
        None => ".".to_string(),
    }
}

/// Last segment of a path.
#[must_use]
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Relative path from directory `from` to `to`. Both must be absolute.
///
/// Returns an empty string when the paths are equal.
#[must_use]
pub fn relative(from: &str, to: &str) -> String {
    let from = normalize(from);
    let to = normalize(to);
    let from_segments: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let to_segments: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let common = from_segments
        .iter()
        .zip(&to_segments)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; from_segments.len() - common];
    parts.extend(&to_segments[common..]);
    parts.join("/")
}

/// Whether a module id names a virtual/synthetic module with no directory on disk.
#[must_use]
pub fn is_virtual_module(id: &str) -> bool {
    id.starts_with("virtual:") || id.starts_with('\0') || !id.contains('/')
}

/// Render a filesystem path as a POSIX string.
#[must_use]
pub fn path_to_posix(path: &Path) -> String {
    to_posix(&path.to_string_lossy())
}

/// Find the project root by walking up from `cwd` looking for `package.json`,
/// the glob-import config file, or `.git`.
#[must_use]
pub fn project_root(cwd: &Path) -> Option<PathBuf> {
    let mut current = cwd.to_path_buf();

    loop {
        if current.join("package.json").exists()
            || current.join(crate::config::CONFIG_FILE).exists()
            || current.join(".git").exists()
        {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/a/./b//c/"), "/a/b/c");
        assert_eq!(normalize("/a/b/../c"), "/a/c");
        assert_eq!(normalize("/../a"), "/a");
        assert_eq!(normalize("../a/../../b"), "../../b");
        assert_eq!(normalize("a/.."), ".");
        assert_eq!(normalize("/"), "/");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/project", "src/*.ts"), "/project/src/*.ts");
        assert_eq!(join("/project/src", "../lib/**/*.js"), "/project/lib/**/*.js");
        assert_eq!(join("/project", ""), "/project");
    }

    #[test]
    fn test_dirname_basename() {
        assert_eq!(dirname("/project/src/main.ts"), "/project/src");
        assert_eq!(dirname("/main.ts"), "/");
        assert_eq!(dirname("main.ts"), ".");
        assert_eq!(basename("/project/src/main.ts"), "main.ts");
        assert_eq!(basename("/project/src/"), "src");
    }

    #[test]
    fn test_relative() {
        assert_eq!(relative("/project/src", "/project/src/mods/a.ts"), "mods/a.ts");
        assert_eq!(relative("/project/src/pages", "/project/src/mods/a.ts"), "../mods/a.ts");
        assert_eq!(relative("/project", "/other/x.ts"), "../other/x.ts");
        assert_eq!(relative("/project", "/project"), "");
        assert_eq!(relative("/", "/a/b"), "a/b");
    }

    #[test]
    fn test_is_virtual_module() {
        assert!(is_virtual_module("virtual:routes"));
        assert!(is_virtual_module("\0glob-entry"));
        assert!(is_virtual_module("entry"));
        assert!(!is_virtual_module("/project/src/main.ts"));
    }

    #[test]
    fn test_to_posix() {
        assert_eq!(to_posix(r"C:\project\src\main.ts"), "C:/project/src/main.ts");
    }

    #[test]
    fn test_project_root_finds_package_json() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        let nested = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(project_root(&nested), Some(dir.path().to_path_buf()));
    }
}
