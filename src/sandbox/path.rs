// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Path resolution and sandbox boundary enforcement (§4.5).
//!
//! A relative guest path is resolved by concatenating it onto the sandbox root *first*,
//! then lexically normalizing the result, then checking the normalized path still lives
//! under the root. Normalizing the requested path in isolation before joining it would let
//! a guest-supplied `..` walk out of the root before the prefix check ever runs; doing it
//! in this order means the only path ever checked is the one the guest cannot escape from.
//!
//! An absolute guest path is never re-rooted: it is normalized standalone and accepted
//! only if it already falls under the sandbox root or under one of the additional path
//! rules the backend was configured with (e.g. a read-only mount outside the root).
//! Anything else is rejected as `PATH_BLOCKED` rather than silently treated as
//! root-relative.

use std::path::{Component, Path, PathBuf};

use crate::proto::Errno;
use crate::sandbox::violation::ViolationKind;

/// An additional absolute-path prefix a sandbox may resolve outside its root, alongside
/// whether writes are permitted under it.
#[derive(Debug, Clone)]
pub struct PathRule {
    pub prefix: PathBuf,
    pub allow_write: bool,
}

impl PathRule {
    #[must_use]
    pub fn new(prefix: impl Into<PathBuf>, allow_write: bool) -> Self {
        Self { prefix: prefix.into(), allow_write }
    }
}

/// Resolves `requested` (a guest-supplied path, as raw bytes off the wire) against
/// `root`, rejecting anything that would resolve outside of it or outside `rules`.
///
/// `is_write` marks whether this resolution is for a write-intent operation (`OPEN` in a
/// writing mode, `REMOVE`, `RENAME`'s destination); it only matters for absolute paths
/// matching a [`PathRule`] with `allow_write: false`.
///
/// On rejection, returns both the `Errno` to report to the guest and the
/// [`ViolationKind`] to report to an observer.
pub fn resolve(
    root: &Path,
    requested: &[u8],
    is_write: bool,
    rules: &[PathRule],
) -> Result<PathBuf, (Errno, ViolationKind)> {
    let requested_str =
        core::str::from_utf8(requested).map_err(|_| (Errno::Inval, ViolationKind::InvalidEncoding))?;
    let normalized_input = requested_str.replace('\\', "/");
    let path = Path::new(&normalized_input);

    if path.is_absolute() {
        resolve_absolute(root, path, is_write, rules)
    } else {
        resolve_relative(root, path)
    }
}

fn resolve_absolute(
    root: &Path,
    path: &Path,
    is_write: bool,
    rules: &[PathRule],
) -> Result<PathBuf, (Errno, ViolationKind)> {
    let normalized = normalize(path);
    if normalized.starts_with(root) {
        return Ok(normalized);
    }
    for rule in rules {
        if normalized.starts_with(&rule.prefix) {
            return if is_write && !rule.allow_write {
                Err((Errno::Access, ViolationKind::WriteBlocked { requested: normalized }))
            } else {
                Ok(normalized)
            };
        }
    }
    Err((Errno::Access, ViolationKind::PathBlocked { requested: normalized }))
}

fn resolve_relative(root: &Path, path: &Path) -> Result<PathBuf, (Errno, ViolationKind)> {
    let candidate = root.join(path);
    let normalized = normalize(&candidate);
    if normalized.starts_with(root) {
        Ok(normalized)
    } else {
        Err((Errno::Access, ViolationKind::PathTraversal { requested: path.to_path_buf() }))
    }
}

/// Lexically collapses `.` and `..` components without touching the filesystem (the
/// target may not exist yet, as for `OPEN` in a creating mode).
fn normalize(path: &Path) -> PathBuf {
    let mut stack: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(stack.last(), Some(Component::RootDir) | None) {
                    stack.pop();
                } else {
                    stack.push(component);
                }
            }
            other => stack.push(other),
        }
    }
    stack.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_RULES: &[PathRule] = &[];

    #[test]
    fn plain_relative_path_resolves_under_root() {
        let root = Path::new("/sandbox/root");
        let resolved = resolve(root, b"a/b.txt", false, NO_RULES).unwrap();
        assert_eq!(resolved, Path::new("/sandbox/root/a/b.txt"));
    }

    #[test]
    fn parent_dir_traversal_is_rejected() {
        let root = Path::new("/sandbox/root");
        let err = resolve(root, b"../../etc/passwd", false, NO_RULES).unwrap_err();
        assert_eq!(err.0, Errno::Access);
        assert!(matches!(err.1, ViolationKind::PathTraversal { .. }));
    }

    #[test]
    fn internal_parent_dir_that_stays_inside_root_is_allowed() {
        let root = Path::new("/sandbox/root");
        let resolved = resolve(root, b"a/../b.txt", false, NO_RULES).unwrap();
        assert_eq!(resolved, Path::new("/sandbox/root/b.txt"));
    }

    #[test]
    fn leading_slash_is_rejected_as_path_blocked_not_reinterpreted_as_relative() {
        let root = Path::new("/sandbox/root");
        let err = resolve(root, b"/etc/passwd", false, NO_RULES).unwrap_err();
        assert_eq!(err.0, Errno::Access);
        assert!(matches!(err.1, ViolationKind::PathBlocked { .. }));
    }

    #[test]
    fn absolute_path_under_root_resolves_directly() {
        let root = Path::new("/sandbox/root");
        let resolved = resolve(root, b"/sandbox/root/a.txt", false, NO_RULES).unwrap();
        assert_eq!(resolved, Path::new("/sandbox/root/a.txt"));
    }

    #[test]
    fn absolute_path_matching_a_read_only_rule_rejects_writes() {
        let root = Path::new("/sandbox/root");
        let rules = [PathRule::new("/mnt/shared", false)];
        let resolved = resolve(root, b"/mnt/shared/a.txt", false, &rules).unwrap();
        assert_eq!(resolved, Path::new("/mnt/shared/a.txt"));

        let err = resolve(root, b"/mnt/shared/a.txt", true, &rules).unwrap_err();
        assert_eq!(err.0, Errno::Access);
        assert!(matches!(err.1, ViolationKind::WriteBlocked { .. }));
    }

    #[test]
    fn absolute_path_matching_no_rule_is_path_blocked() {
        let root = Path::new("/sandbox/root");
        let rules = [PathRule::new("/mnt/shared", true)];
        let err = resolve(root, b"/etc/passwd", false, &rules).unwrap_err();
        assert_eq!(err.0, Errno::Access);
        assert!(matches!(err.1, ViolationKind::PathBlocked { .. }));
    }

    #[test]
    fn invalid_utf8_path_is_rejected() {
        let root = Path::new("/sandbox/root");
        let err = resolve(root, b"\xFF\xFE", false, NO_RULES).unwrap_err();
        assert_eq!(err.0, Errno::Inval);
        assert_eq!(err.1, ViolationKind::InvalidEncoding);
    }
}
