//! Mock implementation of the FolderStore trait for testing

use crate::folders::{Folder, FolderResult, FolderStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockState {
    folders: HashMap<i64, Folder>,
    files: HashMap<String, String>,
    next_id: i64,
}

/// In-memory folder store for tests
pub struct MockFolderStore {
    state: Arc<Mutex<MockState>>,
    /// When set, every call fails; used to exercise soft-stop cleanup
    fail_all: Arc<Mutex<bool>>,
}

impl MockFolderStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState { next_id: 1, ..Default::default() })),
            fail_all: Arc::new(Mutex::new(false)),
        }
    }

    /// Make every subsequent call fail
    pub fn poison(&self) {
        *self.fail_all.lock().unwrap() = true;
    }

    pub fn folder_count(&self) -> usize {
        self.state.lock().unwrap().folders.len()
    }

    fn check(&self) -> FolderResult<()> {
        if *self.fail_all.lock().unwrap() {
            Err(crate::error::StoreError::Folder("mock store poisoned".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MockFolderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FolderStore for MockFolderStore {
    fn folder(&self, id: i64) -> FolderResult<Option<Folder>> {
        self.check()?;
        Ok(self.state.lock().unwrap().folders.get(&id).cloned())
    }

    fn folder_by_path(&self, path: &str) -> FolderResult<Option<Folder>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state.folders.values().find(|f| f.path == path).cloned())
    }

    fn child_folder_count(&self, id: i64) -> FolderResult<u64> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state.folders.values().filter(|f| f.parent == Some(id)).count() as u64)
    }

    fn file_count_in_folder(&self, path: &str, exclude_hash: &str) -> FolderResult<u64> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .iter()
            .filter(|(hash, folder)| folder.as_str() == path && hash.as_str() != exclude_hash)
            .count() as u64)
    }

    fn delete_folder(&self, id: i64) -> FolderResult<()> {
        self.check()?;
        self.state.lock().unwrap().folders.remove(&id);
        Ok(())
    }

    fn folder_of_file(&self, hash: &str) -> FolderResult<Option<i64>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        let Some(path) = state.files.get(hash) else {
            return Ok(None);
        };
        Ok(state.folders.values().find(|f| &f.path == path).map(|f| f.id))
    }

    fn ensure_path(&self, segments: &[String]) -> FolderResult<Option<Folder>> {
        self.check()?;
        if segments.is_empty() {
            return Ok(None);
        }
        let mut state = self.state.lock().unwrap();
        let mut parent: Option<i64> = None;
        let mut path = String::new();
        let mut current = None;
        for name in segments {
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(name);
            let existing = state.folders.values().find(|f| f.path == path).cloned();
            let folder = match existing {
                Some(folder) => folder,
                None => {
                    let id = state.next_id;
                    state.next_id += 1;
                    let folder = Folder {
                        id,
                        name: name.clone(),
                        parent,
                        path: path.clone(),
                    };
                    state.folders.insert(id, folder.clone());
                    folder
                }
            };
            parent = Some(folder.id);
            current = Some(folder);
        }
        Ok(current)
    }

    fn record_file(&self, hash: &str, folder_path: &str) -> FolderResult<()> {
        self.check()?;
        self.state
            .lock()
            .unwrap()
            .files
            .insert(hash.to_string(), folder_path.to_string());
        Ok(())
    }

    fn forget_file(&self, hash: &str) -> FolderResult<()> {
        self.check()?;
        self.state.lock().unwrap().files.remove(hash);
        Ok(())
    }
}
