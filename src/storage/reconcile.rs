//! Post-delete reconciliation
//!
//! Two independent, opt-in cleanup walks run after a successful delete:
//! removing empty ancestor directories on disk, and removing empty metadata
//! folders up the parent chain. Both are advisory: every failed step is a
//! soft stop, logged and swallowed, never affecting the primary delete
//! outcome.

use crate::folders::FolderStore;
use crate::storage::FileDescriptor;
use log::{debug, warn};
use std::path::Path;
use tokio::fs;

/// Walk upward from `start`, removing directories while they are empty.
/// Stops at the storage root, at the first non-empty directory, or on any
/// I/O error. A remove that fails because a concurrent upload repopulated
/// the directory is also a stop, not corruption.
pub async fn prune_empty_dirs(root: &Path, start: Option<&Path>) {
    let Some(start) = start else { return };
    let mut dir = start.to_path_buf();
    while dir.starts_with(root) && dir != *root {
        match fs::read_dir(&dir).await {
            Ok(mut entries) => match entries.next_entry().await {
                Ok(Some(_)) => break,
                Ok(None) => {
                    if let Err(e) = fs::remove_dir(&dir).await {
                        debug!("Stopped directory prune at {}: {}", dir.display(), e);
                        break;
                    }
                    debug!("Removed empty directory {}", dir.display());
                    match dir.parent() {
                        Some(parent) => dir = parent.to_path_buf(),
                        None => break,
                    }
                }
                Err(e) => {
                    debug!("Stopped directory prune at {}: {}", dir.display(), e);
                    break;
                }
            },
            Err(e) => {
                debug!("Stopped directory prune at {}: {}", dir.display(), e);
                break;
            }
        }
    }
}

/// Walk the metadata-folder parent chain upward from the deleted object's
/// folder, deleting folders with no child folders and no remaining sibling
/// files. The starting folder comes from the descriptor's folder id, its
/// recorded folder path, or the store's own file record, in that order;
/// when none resolves, nothing happens.
pub fn prune_empty_folders(store: &dyn FolderStore, desc: &FileDescriptor) {
    let start = desc
        .folder_id
        .or_else(|| {
            desc.folder_path
                .as_deref()
                .and_then(|path| store.folder_by_path(path).ok().flatten())
                .map(|folder| folder.id)
        })
        .or_else(|| store.folder_of_file(&desc.hash).ok().flatten());
    let Some(mut id) = start else {
        debug!("No folder reference for {}, skipping folder prune", desc.hash);
        return;
    };

    loop {
        let folder = match store.folder(id) {
            Ok(Some(folder)) => folder,
            Ok(None) => return,
            Err(e) => {
                warn!("Stopped folder prune at id {}: {}", id, e);
                return;
            }
        };
        match store.child_folder_count(folder.id) {
            Ok(0) => {}
            Ok(_) => return,
            Err(e) => {
                warn!("Stopped folder prune at {}: {}", folder.path, e);
                return;
            }
        }
        match store.file_count_in_folder(&folder.path, &desc.hash) {
            Ok(0) => {}
            Ok(_) => return,
            Err(e) => {
                warn!("Stopped folder prune at {}: {}", folder.path, e);
                return;
            }
        }
        if let Err(e) = store.delete_folder(folder.id) {
            warn!("Stopped folder prune at {}: {}", folder.path, e);
            return;
        }
        debug!("Removed empty folder {}", folder.path);
        match folder.parent {
            Some(parent) => id = parent,
            None => return,
        }
    }
}
