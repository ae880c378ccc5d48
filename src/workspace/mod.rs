// src/workspace/mod.rs

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("path '{path}' resolves outside workspace {root}")]
pub struct WorkspaceViolation {
    pub path: String,
    pub root: String,
}

/// Boundary check consulted before any file-context target is emitted.
pub trait PathValidator: Send + Sync {
    fn validate(&self, path: &str) -> Result<PathBuf, WorkspaceViolation>;
}

/// Sandbox rooted at one directory.
///
/// Every existing prefix of a path is canonicalized, so a symlink inside the
/// root that points elsewhere resolves to where it really leads. The part of
/// the path that does not exist yet is joined lexically. Nothing is created
/// on disk.
#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: resolve(root.as_ref()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PathValidator for Workspace {
    fn validate(&self, path: &str) -> Result<PathBuf, WorkspaceViolation> {
        let candidate = Path::new(path);
        let resolved = if candidate.is_absolute() {
            resolve(candidate)
        } else {
            resolve(&self.root.join(candidate))
        };

        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(WorkspaceViolation {
                path: path.to_string(),
                root: self.root.display().to_string(),
            })
        }
    }
}

/// Walk `path` component by component the way the OS would. After each
/// step the prefix is canonicalized if it exists, so `..` always pops a real
/// directory. A `..` that cannot pop is kept so the result never looks
/// contained.
fn resolve(path: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match resolved.components().next_back() {
                Some(Component::Normal(_)) => {
                    resolved.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => resolved.push(".."),
            },
            other => {
                resolved.push(other.as_os_str());
                if let Ok(real) = resolved.canonicalize() {
                    resolved = real;
                }
            }
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        (dir, ws)
    }

    #[test]
    fn relative_paths_stay_inside() {
        let (dir, ws) = sandbox();
        let resolved = ws.validate("notes/today.txt").unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap().join("notes/today.txt"));
        assert!(ws.validate("notes/../a.txt").is_ok());
    }

    #[test]
    fn escapes_are_rejected() {
        let (_dir, ws) = sandbox();
        assert!(ws.validate("../secret.txt").is_err());
        assert!(ws.validate("a/../../b.txt").is_err());
        assert!(ws.validate("/etc/passwd").is_err());
    }

    #[test]
    fn absolute_path_inside_root_is_fine() {
        let (dir, ws) = sandbox();
        let inside = dir.path().join("x.txt");
        assert!(ws.validate(inside.to_str().unwrap()).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_out_of_root_is_rejected() {
        let (dir, ws) = sandbox();
        let outside = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        let err = ws.validate("link/passwd").unwrap_err();
        assert_eq!(err.path, "link/passwd");
        assert!(ws.validate("link").is_err());
        // `..` follows the link target, not the link's parent.
        assert!(ws.validate("link/../notes.txt").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_within_root_is_fine() {
        let (dir, ws) = sandbox();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();

        let resolved = ws.validate("alias/notes.txt").unwrap();
        assert_eq!(resolved, ws.root().join("real/notes.txt"));
    }

    #[test]
    fn missing_relative_root_is_resolved_lexically() {
        let ws = Workspace::new("no-such-workspace-dir");
        assert_eq!(ws.root(), Path::new("no-such-workspace-dir"));
        assert!(ws.validate("a.txt").is_ok());
        assert!(ws.validate("../../a.txt").is_err());
    }
}
