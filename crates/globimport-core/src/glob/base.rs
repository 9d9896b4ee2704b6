//! Scan roots for glob expansion.

use crate::paths;

/// Characters that make a path segment a glob rather than a literal.
const GLOB_MAGIC: &[char] = &['*', '?', '[', ']', '{', '}', '(', ')', '!'];

/// Whether a segment contains glob syntax.
pub fn is_magic(segment: &str) -> bool {
    segment.contains(GLOB_MAGIC)
}

/// The literal directory prefix of a pattern.
///
/// Stops at the first segment with glob syntax. A trailing segment that
/// looks like a file name (contains a `.`) is dropped.
pub fn static_base(pattern: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in pattern.split('/') {
        if is_magic(segment) {
            break;
        }
        segments.push(segment);
    }

    if segments.last().is_some_and(|last| last.contains('.')) {
        segments.pop();
    }

    let base = segments.join("/");
    if base.is_empty() && paths::is_absolute(pattern) {
        "/".to_string()
    } else {
        base
    }
}

/// Longest common directory of the positive patterns, compared by segment.
///
/// Falls back to `/` when the patterns share nothing and to `root` when
/// there are no positive patterns. Patterns that are not absolute (`**/…`)
/// are matched from `root`.
pub fn common_base(patterns: &[String], root: &str) -> String {
    let bases: Vec<String> = patterns
        .iter()
        .filter(|pattern| !pattern.starts_with('!'))
        .map(|pattern| {
            if paths::is_absolute(pattern) {
                static_base(pattern)
            } else {
                root.to_string()
            }
        })
        .collect();

    let Some((first, rest)) = bases.split_first() else {
        return root.to_string();
    };

    let mut common: Vec<&str> = first.split('/').filter(|s| !s.is_empty()).collect();
    for base in rest {
        let shared = common
            .iter()
            .zip(base.split('/').filter(|s| !s.is_empty()))
            .take_while(|(a, b)| *a == b)
            .count();
        common.truncate(shared);
    }

    format!("/{}", common.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(|p| (*p).to_string()).collect()
    }

    #[test]
    fn test_static_base() {
        assert_eq!(static_base("/project/src/mods/*.ts"), "/project/src/mods");
        assert_eq!(static_base("/project/src/**/index.ts"), "/project/src");
        assert_eq!(static_base("/project/src/main.ts"), "/project/src");
        assert_eq!(static_base("/project/{a,b}/*.ts"), "/project");
        assert_eq!(static_base("/*.ts"), "/");
    }

    #[test]
    fn test_common_base_single_pattern() {
        let patterns = strings(&["/project/src/mods/*.ts"]);
        assert_eq!(common_base(&patterns, "/project"), "/project/src/mods");
    }

    #[test]
    fn test_common_base_ignores_negations() {
        let patterns = strings(&["/project/src/a/*.ts", "/project/src/b/*.ts", "!/other/x.ts"]);
        assert_eq!(common_base(&patterns, "/project"), "/project/src");
    }

    #[test]
    fn test_common_base_compares_segments() {
        let patterns = strings(&["/project/abc/*.ts", "/project/abcd/*.ts"]);
        assert_eq!(common_base(&patterns, "/project"), "/project");
    }

    #[test]
    fn test_common_base_no_positive_patterns() {
        let patterns = strings(&["!/project/src/*.ts"]);
        assert_eq!(common_base(&patterns, "/project"), "/project");
        assert_eq!(common_base(&[], "/project"), "/project");
    }

    #[test]
    fn test_common_base_divergent_patterns_fall_back_to_filesystem_root() {
        let patterns = strings(&[
            "/srv/app/deep/nested/one/**/*.ts",
            "/opt/vendor/lib/two/*.js",
            "/home/user/projects/three/{a,b}/*.vue",
        ]);
        assert_eq!(common_base(&patterns, "/srv/app"), "/");
    }

    #[test]
    fn test_common_base_relative_double_star_uses_root() {
        let patterns = strings(&["**/*.md", "/project/docs/*.md"]);
        assert_eq!(common_base(&patterns, "/project"), "/project");
    }
}
