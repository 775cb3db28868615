//! Shelve targets: depth, URL detection, peg revisions and path normalization

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// How far below a target directory shelving reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Depth {
    /// Only the target itself
    Empty,
    /// The target and its file children
    Files,
    /// The target and all its direct children
    Immediates,
    /// The target and everything below it
    #[default]
    Infinity,
}

impl Depth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::Empty => "empty",
            Depth::Files => "files",
            Depth::Immediates => "immediates",
            Depth::Infinity => "infinity",
        }
    }

    /// Returns true if `path` falls under `target` at this depth.
    ///
    /// Both paths are relative to the working copy root; an empty `target`
    /// stands for the root itself.
    pub fn covers(&self, target: &Path, path: &Path) -> bool {
        if path == target {
            return true;
        }

        let Ok(rest) = path.strip_prefix(target) else {
            return false;
        };

        match self {
            Depth::Empty => false,
            // Only files are versioned, so a direct child is always a file
            Depth::Files | Depth::Immediates => rest.components().count() == 1,
            Depth::Infinity => true,
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if the argument names a repository location rather than a
/// local path (`https://host/repo`, `file:///srv/repo`, `^/trunk`).
pub fn is_url(arg: &str) -> bool {
    if arg.starts_with("^/") {
        return true;
    }

    match arg.find("://") {
        Some(pos) if pos > 0 => arg[..pos]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        _ => false,
    }
}

/// Strips a peg revision (`path@REV`) from a target.
///
/// Everything from the last `@` is removed, so a path that itself contains
/// `@` must be written with a trailing `@` (`user@host@`).
pub fn strip_peg_revision(arg: &str) -> &str {
    match arg.rfind('@') {
        Some(pos) => &arg[..pos],
        None => arg,
    }
}

/// Lexically normalizes a path: drops `.` components and folds `..` into
/// its parent. The file system is never consulted.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_depth_is_infinity() {
        assert_eq!(Depth::default(), Depth::Infinity);
        assert_eq!(Depth::Immediates.to_string(), "immediates");
    }

    #[test]
    fn depth_coverage() {
        let target = Path::new("src");
        let direct = Path::new("src/main.rs");
        let nested = Path::new("src/cli/app.rs");
        let outside = Path::new("srcx/main.rs");

        assert!(Depth::Empty.covers(target, target));
        assert!(!Depth::Empty.covers(target, direct));

        assert!(Depth::Files.covers(target, direct));
        assert!(!Depth::Files.covers(target, nested));
        assert!(Depth::Immediates.covers(target, direct));
        assert!(!Depth::Immediates.covers(target, nested));

        assert!(Depth::Infinity.covers(target, nested));
        assert!(!Depth::Infinity.covers(target, outside));
    }

    #[test]
    fn root_target_covers_everything_at_infinity() {
        let root = Path::new("");

        assert!(Depth::Infinity.covers(root, Path::new("a/b/c.txt")));
        assert!(Depth::Files.covers(root, Path::new("README.md")));
        assert!(!Depth::Files.covers(root, Path::new("a/b.txt")));
    }

    #[test]
    fn detects_urls() {
        assert!(is_url("https://example.com/repo"));
        assert!(is_url("svn+ssh://host/repo"));
        assert!(is_url("file:///srv/repo"));
        assert!(is_url("^/trunk"));

        assert!(!is_url("src/main.rs"));
        assert!(!is_url("://odd"));
        assert!(!is_url("dir with space://x"));
    }

    #[test]
    fn strips_peg_revisions() {
        assert_eq!(strip_peg_revision("foo.c@HEAD"), "foo.c");
        assert_eq!(strip_peg_revision("foo.c@12"), "foo.c");
        assert_eq!(strip_peg_revision("user@host@"), "user@host");
        assert_eq!(strip_peg_revision("foo.c"), "foo.c");
    }

    #[test]
    fn normalizes_lexically() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("a/b/..")), PathBuf::from("a"));
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
    }
}
