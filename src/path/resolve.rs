//! Root-confined path resolution
//!
//! Single choke point between candidate object paths and the filesystem.
//! A candidate only resolves when the lexically normalized result stays
//! strictly inside the storage root; the root itself is never a valid
//! object location.

use std::path::{Component, Path, PathBuf};

/// Resolve `candidate` against `root`, rejecting any escape.
///
/// Returns `None` for candidates containing NUL, for `..` sequences that
/// climb out of the root, for absolute-path injection landing elsewhere,
/// and for candidates that normalize to the root directory itself.
pub fn resolve_under_root(root: &Path, candidate: &str) -> Option<PathBuf> {
    if candidate.contains('\0') {
        return None;
    }
    let joined = root.join(candidate);
    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(prefix) => resolved.push(prefix.as_os_str()),
            Component::RootDir => resolved.push(Component::RootDir),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    return None;
                }
            }
            Component::Normal(name) => resolved.push(name),
        }
    }
    if resolved.starts_with(root) && resolved != root {
        Some(resolved)
    } else {
        None
    }
}
