//! Local filesystem object store
//!
//! Uploads write to `prefix / sanitized-hint / filename` under the storage
//! root. Deletes are best-effort: the descriptor may carry stale or missing
//! extension and path information, so candidates are reconstructed from a
//! union of weak signals and tried through the root-confined resolver; a
//! directory scan is the last resort. Every candidate is side-effect-free
//! until a match commits to deletion.

use crate::config::StorageConfig;
use crate::error::StoreError;
use crate::path::{resolve_under_root, sanitize_dir_path};
use crate::storage::{
    ext_from_path_like, mime_extension, normalize_ext, reconcile, DeleteOutcome, FileDescriptor,
    StoredObject, UploadSource,
};
use futures::StreamExt;
use log::{debug, info};
use percent_encoding::percent_decode_str;
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Length of the random filename token under non-guessable naming
const NAME_TOKEN_LEN: usize = 12;

/// Local filesystem object store
pub struct LocalObjectStore {
    root: PathBuf,
    mount: String,
    prefix: Option<String>,
    base_url: Option<String>,
    url_marker: String,
    strict_hints: bool,
    random_names: bool,
    debug: bool,
    prune_dirs: bool,
    max_payload_size: u64,
}

impl LocalObjectStore {
    /// Create a store rooted at the configured base path, creating it if
    /// necessary. The root is canonicalized so confinement checks compare
    /// resolved paths.
    pub fn new(storage: &StorageConfig, max_payload_size: u64) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&storage.base_path)?;
        let root = std::fs::canonicalize(&storage.base_path)?;
        info!("Using storage root {}", root.display());

        let prefix = storage
            .prefix
            .as_deref()
            .map(sanitize_dir_path)
            .filter(|p| !p.is_empty());
        let url_marker = storage
            .url_marker
            .clone()
            .unwrap_or_else(|| storage.mount.clone());

        Ok(Self {
            root,
            mount: storage.mount.clone(),
            prefix,
            base_url: storage.base_url.clone(),
            url_marker,
            strict_hints: storage.strict_hints,
            random_names: storage.random_names,
            debug: storage.debug,
            prune_dirs: storage.prune_dirs,
            max_payload_size,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mount(&self) -> &str {
        &self.mount
    }

    /// Base for public URLs: the configured base URL, or `/<mount>`
    fn public_base(&self) -> String {
        match &self.base_url {
            Some(base) if !base.is_empty() => base.trim_end_matches('/').to_string(),
            _ => format!("/{}", self.mount),
        }
    }

    fn object_filename(&self, hash: &str, ext: &str) -> String {
        if self.random_names {
            let token: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(NAME_TOKEN_LEN)
                .map(char::from)
                .collect();
            format!("{token}_{hash}{ext}")
        } else {
            format!("{hash}{ext}")
        }
    }

    fn join_object_path(&self, dir: &str, filename: &str) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if let Some(prefix) = &self.prefix {
            parts.push(prefix);
        }
        if !dir.is_empty() {
            parts.push(dir);
        }
        parts.push(filename);
        parts.join("/")
    }

    /// Store a payload under the descriptor's sanitized directory hint.
    ///
    /// Parent directories are created idempotently; I/O failures propagate
    /// unmodified and partial writes are not recovered, the caller owns
    /// retry policy.
    pub async fn upload(
        &self,
        desc: &FileDescriptor,
        source: UploadSource,
    ) -> Result<StoredObject, StoreError> {
        if desc.hash.is_empty() {
            return Err(StoreError::InvalidDescriptor("hash is required".to_string()));
        }
        let hint = desc.dir_hint.as_deref().unwrap_or("");
        let sanitized = sanitize_dir_path(hint);
        if self.strict_hints && !hint.trim().is_empty() && sanitized.is_empty() {
            return Err(StoreError::InvalidDirectoryHint);
        }

        let ext = desc.ext.as_deref().and_then(normalize_ext).unwrap_or_default();
        let filename = self.object_filename(&desc.hash, &ext);
        let object_path = self.join_object_path(&sanitized, &filename);
        let abs = resolve_under_root(&self.root, &object_path)
            .ok_or(StoreError::InvalidDirectoryHint)?;

        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&abs).await?;
        let mut written: u64 = 0;
        match source {
            UploadSource::Buffer(bytes) => {
                written = bytes.len() as u64;
                self.check_size(written)?;
                file.write_all(&bytes).await?;
            }
            UploadSource::Stream(mut stream) => {
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    written += chunk.len() as u64;
                    self.check_size(written)?;
                    file.write_all(&chunk).await?;
                }
            }
        }
        file.flush().await?;

        info!(
            "Stored object {} at {} ({} bytes)",
            desc.hash,
            abs.display(),
            written
        );
        Ok(StoredObject {
            hash: desc.hash.clone(),
            ext,
            url: format!("{}/{}", self.public_base(), object_path),
            path: object_path,
        })
    }

    fn check_size(&self, written: u64) -> Result<(), StoreError> {
        if written > self.max_payload_size {
            Err(StoreError::PayloadTooLarge {
                size: written,
                limit: self.max_payload_size,
            })
        } else {
            Ok(())
        }
    }

    /// Locate and remove an object from a partial descriptor.
    ///
    /// Phase one tries reconstructed path candidates through the resolver;
    /// phase two scans candidate directories for a hash-named entry. An
    /// object that cannot be found is a `NotFound` outcome, not an error.
    pub async fn delete(&self, desc: &FileDescriptor) -> Result<DeleteOutcome, StoreError> {
        if desc.hash.is_empty() {
            return Err(StoreError::InvalidDescriptor("hash is required".to_string()));
        }
        let exts = self.extension_candidates(desc);
        let candidates = self.path_candidates(desc, &exts);
        if self.debug {
            debug!("Delete candidates for {}: {:?}", desc.hash, candidates);
        }

        for candidate in &candidates {
            let Some(abs) = resolve_under_root(&self.root, candidate) else {
                // escape attempts read as "no such candidate"
                continue;
            };
            match fs::metadata(&abs).await {
                Ok(meta) if meta.is_file() => {
                    fs::remove_file(&abs).await?;
                    info!("Deleted object {} at {}", desc.hash, abs.display());
                    self.prune_after(&abs).await;
                    return Ok(DeleteOutcome::Deleted(abs));
                }
                _ => {}
            }
        }

        if let Some(pattern) = scan_pattern(&desc.hash, &exts) {
            for dir in self.scan_directories(&candidates) {
                let Ok(mut entries) = fs::read_dir(&dir).await else {
                    continue;
                };
                while let Ok(Some(entry)) = entries.next_entry().await {
                    let name = entry.file_name();
                    let Some(name) = name.to_str() else { continue };
                    if !pattern.is_match(name) {
                        continue;
                    }
                    if !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                        continue;
                    }
                    let path = entry.path();
                    fs::remove_file(&path).await?;
                    info!("Deleted object {} via directory scan at {}", desc.hash, path.display());
                    self.prune_after(&path).await;
                    return Ok(DeleteOutcome::Deleted(path));
                }
            }
        }

        info!("Object {} not found for deletion", desc.hash);
        Ok(DeleteOutcome::NotFound)
    }

    async fn prune_after(&self, deleted: &Path) {
        if self.prune_dirs {
            reconcile::prune_empty_dirs(&self.root, deleted.parent()).await;
        }
    }

    /// Union of weak extension signals, in priority order; the empty string
    /// is the last resort when nothing is known.
    fn extension_candidates(&self, desc: &FileDescriptor) -> Vec<String> {
        let mut exts: Vec<String> = Vec::new();
        push_unique(&mut exts, desc.ext.as_deref().and_then(normalize_ext));
        push_unique(&mut exts, desc.url.as_deref().and_then(ext_from_path_like));
        push_unique(&mut exts, desc.preview_url.as_deref().and_then(ext_from_path_like));
        push_unique(&mut exts, desc.name.as_deref().and_then(ext_from_path_like));
        push_unique(
            &mut exts,
            desc.mime.as_deref().and_then(|m| mime_extension(m).map(str::to_string)),
        );
        if exts.is_empty() {
            exts.push(String::new());
        }
        exts
    }

    /// Object-path candidates: each extension combined with the sanitized
    /// hint, the raw slash-normalized hint (objects stored before a
    /// sanitization rule changed), and no directory at all; plus the bare
    /// filename and any path recoverable from the recorded URLs.
    fn path_candidates(&self, desc: &FileDescriptor, exts: &[String]) -> Vec<String> {
        let hint = desc.dir_hint.as_deref().unwrap_or("");
        let sanitized = sanitize_dir_path(hint);
        let raw = slash_normalize(hint);

        let mut dirs: Vec<String> = Vec::new();
        for dir in [sanitized.as_str(), raw.as_str(), ""] {
            if !dirs.iter().any(|d| d == dir) {
                dirs.push(dir.to_string());
            }
        }

        let mut out: Vec<String> = Vec::new();
        for ext in exts {
            let filename = format!("{}{}", desc.hash, ext);
            for dir in &dirs {
                push_unique(&mut out, Some(self.join_object_path(dir, &filename)));
            }
            push_unique(&mut out, Some(filename));
        }
        for link in [desc.url.as_deref(), desc.preview_url.as_deref()].into_iter().flatten() {
            push_unique(&mut out, self.path_from_url(link));
        }
        out
    }

    /// Recover a full object path from a recorded URL: the segment run after
    /// the configured marker, percent-decoded, or the remainder after the
    /// configured base URL when no marker is present.
    fn path_from_url(&self, url: &str) -> Option<String> {
        let path_part = url.split(['?', '#']).next().unwrap_or("");
        let segments: Vec<&str> = path_part.split('/').collect();
        if let Some(pos) = segments.iter().position(|s| *s == self.url_marker) {
            let rest = segments[pos + 1..].join("/");
            if !rest.is_empty() {
                return percent_decode(&rest);
            }
        }
        if let Some(base) = &self.base_url {
            let base = base.trim_end_matches('/');
            if !base.is_empty() {
                if let Some(rest) = path_part.strip_prefix(base) {
                    let rest = rest.trim_start_matches('/');
                    if !rest.is_empty() {
                        return percent_decode(rest);
                    }
                }
            }
        }
        None
    }

    /// Directories worth scanning: the parents of every candidate path that
    /// resolves, plus the store root.
    fn scan_directories(&self, candidates: &[String]) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        for candidate in candidates {
            if let Some((dir, _)) = candidate.rsplit_once('/') {
                if let Some(abs) = resolve_under_root(&self.root, dir) {
                    if !dirs.contains(&abs) {
                        dirs.push(abs);
                    }
                }
            }
        }
        if !dirs.contains(&self.root) {
            dirs.push(self.root.clone());
        }
        dirs
    }
}

fn push_unique(list: &mut Vec<String>, value: Option<String>) {
    if let Some(value) = value {
        if !list.contains(&value) {
            list.push(value);
        }
    }
}

/// Normalize separators without sanitizing: backslashes become slashes,
/// empty segments drop out.
fn slash_normalize(raw: &str) -> String {
    raw.split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn percent_decode(s: &str) -> Option<String> {
    percent_decode_str(s).decode_utf8().ok().map(|c| c.into_owned())
}

/// Filename matcher for the last-resort scan. Known extensions narrow the
/// match; otherwise any short alphanumeric extension after the hash counts.
/// Assumes hash uniqueness per directory; a shared hash+extension could
/// match a different logical object (accepted risk).
fn scan_pattern(hash: &str, exts: &[String]) -> Option<Regex> {
    let known: Vec<String> = exts
        .iter()
        .filter(|e| !e.is_empty())
        .map(|e| regex::escape(e))
        .collect();
    let pattern = if known.is_empty() {
        format!(r"(?i)^{}\.[a-z0-9]{{1,6}}$", regex::escape(hash))
    } else {
        format!(r"(?i)^{}({})$", regex::escape(hash), known.join("|"))
    };
    Regex::new(&pattern).ok()
}
