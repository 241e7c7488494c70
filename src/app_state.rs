//! Application State Management
//!
//! Wires the object store, folder store, upload chain and access gate
//! together behind `Arc`s, following the dependency injection pattern.

use std::sync::Arc;

use log::info;

use crate::access::verifier::{SharedTokenVerifier, SubjectDirectory};
use crate::access::AccessGate;
use crate::config::AppConfig;
use crate::error::StoreError;
use crate::folders::mock_store::MockFolderStore;
use crate::folders::sqlite_store::SqliteFolderStore;
use crate::folders::FolderStore;
use crate::service::interceptor::{StoreEntryPoint, UploadEntryPoint, UploadInterceptor};
use crate::storage::local_store::LocalObjectStore;

/// Application state containing all components and their dependencies
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LocalObjectStore>,
    pub folders: Arc<dyn FolderStore>,
    pub uploader: Arc<dyn UploadEntryPoint>,
    pub gate: Arc<AccessGate>,
    pub config: AppConfig,
}

impl AppState {
    /// Create application state with components configured from YAML config
    pub fn new() -> Result<Self, StoreError> {
        let config = AppConfig::load().expect("Failed to load configuration");
        Self::from_config(config)
    }

    /// Create application state from configuration
    pub fn from_config(config: AppConfig) -> Result<Self, StoreError> {
        info!("Initializing application state");
        let store = Arc::new(LocalObjectStore::new(
            &config.storage,
            config.server.max_payload_size,
        )?);
        let folders: Arc<dyn FolderStore> =
            Arc::new(SqliteFolderStore::new(&config.storage.folder_db_path)?);
        Self::assemble(config, store, folders)
    }

    fn assemble(
        config: AppConfig,
        store: Arc<LocalObjectStore>,
        folders: Arc<dyn FolderStore>,
    ) -> Result<Self, StoreError> {
        let privileged = Arc::new(SharedTokenVerifier::uniform(
            &config.private_access.privileged_tokens,
            "privileged",
        ));
        let users = Arc::new(SharedTokenVerifier::new(
            config.private_access.user_tokens.clone(),
        ));
        let gate = Arc::new(AccessGate::new(
            &config.private_access,
            &config.storage.mount,
            privileged,
            users,
            Arc::new(SubjectDirectory),
        ));

        let entry: Arc<dyn UploadEntryPoint> =
            Arc::new(StoreEntryPoint::new(store.clone(), folders.clone()));
        let uploader = UploadInterceptor::wrap(entry, folders.clone(), &config);

        info!("Application state initialized");
        Ok(Self {
            store,
            folders,
            uploader,
            gate,
            config,
        })
    }

    /// Application state for testing: objects under `root`, mock folder
    /// store, a known signing secret and fixed bearer tokens.
    pub fn new_for_testing(root: &std::path::Path) -> Self {
        let mut config = AppConfig::default();
        config.storage.base_path = root.to_string_lossy().to_string();
        config.private_access.secret = "test-secret".to_string();
        config.private_access.privileged_tokens = vec!["admin-token".to_string()];
        config
            .private_access
            .user_tokens
            .insert("user-token".to_string(), "u1".to_string());

        let store = Arc::new(
            LocalObjectStore::new(&config.storage, config.server.max_payload_size)
                .expect("test storage root must be usable"),
        );
        let folders: Arc<dyn FolderStore> = Arc::new(MockFolderStore::new());
        Self::assemble(config, store, folders).expect("test state must assemble")
    }
}
