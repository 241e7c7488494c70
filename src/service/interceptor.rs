//! Upload entry point and interception
//!
//! Every upload flows through the `UploadEntryPoint` trait. The plain entry
//! point writes to the object store and records folder membership; the
//! interceptor wraps it to translate privacy and virtual-folder intent into
//! concrete hints before the store sees the request. Wrapping is idempotent,
//! so assembling the chain twice cannot stack a second interceptor.

use crate::config::AppConfig;
use crate::error::StoreError;
use crate::folders::FolderStore;
use crate::path::{sanitize_dir_path, sanitize_folder_name};
use crate::storage::local_store::LocalObjectStore;
use crate::storage::{FileDescriptor, StoredObject, UploadSource};
use futures::future::BoxFuture;
use log::{debug, warn};
use std::sync::Arc;

/// A single upload as the entry point sees it
#[derive(Debug, Default)]
pub struct UploadRequest {
    pub descriptor: FileDescriptor,
    /// Folder path the caller wants the object filed under, slash separated
    pub virtual_hint: Option<String>,
    /// Store under the private folder, keyed by owner
    pub private: bool,
    /// Owner identifier for private uploads
    pub owner: Option<String>,
}

/// Where uploads enter the storage layer
pub trait UploadEntryPoint: Send + Sync {
    fn upload<'a>(
        &'a self,
        request: UploadRequest,
        source: UploadSource,
    ) -> BoxFuture<'a, Result<StoredObject, StoreError>>;

    /// True when this entry point already sits behind an interceptor
    fn is_intercepted(&self) -> bool {
        false
    }
}

/// Entry point writing straight to the object store
pub struct StoreEntryPoint {
    store: Arc<LocalObjectStore>,
    folders: Arc<dyn FolderStore>,
}

impl StoreEntryPoint {
    pub fn new(store: Arc<LocalObjectStore>, folders: Arc<dyn FolderStore>) -> Self {
        Self { store, folders }
    }
}

impl UploadEntryPoint for StoreEntryPoint {
    fn upload<'a>(
        &'a self,
        request: UploadRequest,
        source: UploadSource,
    ) -> BoxFuture<'a, Result<StoredObject, StoreError>> {
        Box::pin(async move {
            let stored = self.store.upload(&request.descriptor, source).await?;
            if let Some(folder_path) = &request.descriptor.folder_path {
                // folder membership is advisory; the object is already on disk
                if let Err(e) = self.folders.record_file(&request.descriptor.hash, folder_path) {
                    warn!(
                        "Failed to record {} under folder {}: {}",
                        request.descriptor.hash, folder_path, e
                    );
                }
            }
            Ok(stored)
        })
    }
}

/// Decorator translating upload intent into storage hints.
///
/// Privacy wins over everything: a private upload is forced under
/// `<private-folder>/<owner>` and the owner must sanitize to something
/// non-empty. Otherwise the virtual hint may double as the physical hint
/// when configured and no explicit hint was given. The virtual hint also
/// drives metadata folder creation, whose failure never fails the upload.
pub struct UploadInterceptor {
    inner: Arc<dyn UploadEntryPoint>,
    folders: Arc<dyn FolderStore>,
    private_enabled: bool,
    private_folder: String,
    reuse_virtual_hint: bool,
}

impl UploadInterceptor {
    pub fn wrap(
        inner: Arc<dyn UploadEntryPoint>,
        folders: Arc<dyn FolderStore>,
        config: &AppConfig,
    ) -> Arc<dyn UploadEntryPoint> {
        if inner.is_intercepted() {
            return inner;
        }
        Arc::new(Self {
            inner,
            folders,
            private_enabled: config.private_access.enabled,
            private_folder: config.private_access.folder_name.clone(),
            reuse_virtual_hint: config.storage.reuse_virtual_hint,
        })
    }

    fn folder_segments(&self, virtual_hint: &str) -> Vec<String> {
        virtual_hint
            .split(['/', '\\'])
            .map(sanitize_folder_name)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl UploadEntryPoint for UploadInterceptor {
    fn upload<'a>(
        &'a self,
        mut request: UploadRequest,
        source: UploadSource,
    ) -> BoxFuture<'a, Result<StoredObject, StoreError>> {
        Box::pin(async move {
            if request.private && self.private_enabled {
                let owner = sanitize_dir_path(request.owner.as_deref().unwrap_or(""));
                if owner.is_empty() {
                    warn!(
                        "Private upload {} has no usable owner identifier",
                        request.descriptor.hash
                    );
                    return Err(StoreError::InvalidDirectoryHint);
                }
                let hint = format!("{}/{}", self.private_folder, owner);
                debug!("Routing private upload {} to {}", request.descriptor.hash, hint);
                request.descriptor.dir_hint = Some(hint.clone());
                request.virtual_hint = Some(hint);
            } else if self.reuse_virtual_hint
                && request.descriptor.dir_hint.as_deref().map_or(true, str::is_empty)
            {
                if let Some(hint) = &request.virtual_hint {
                    request.descriptor.dir_hint = Some(hint.clone());
                }
            }

            if let Some(virtual_hint) = request.virtual_hint.clone() {
                let segments = self.folder_segments(&virtual_hint);
                if !segments.is_empty() {
                    match self.folders.ensure_path(&segments) {
                        Ok(Some(folder)) => {
                            request.descriptor.folder_id = Some(folder.id);
                            request.descriptor.folder_path = Some(folder.path);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!("Could not ensure folder path {}: {}", virtual_hint, e);
                        }
                    }
                }
            }

            self.inner.upload(request, source).await
        })
    }

    fn is_intercepted(&self) -> bool {
        true
    }
}
