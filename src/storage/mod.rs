//! Object Storage Layer
//!
//! Persists uploaded objects on the local filesystem under the storage root
//! and removes them again from partial, possibly stale descriptors. Shared
//! types and the extension heuristics live here; the disk implementation is
//! in `local_store`, post-delete cleanup in `reconcile`.

pub mod local_store;
pub mod reconcile;

use bytes::Bytes;
use futures::Stream;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::pin::Pin;

/// Stream of payload chunks fed into an upload
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Payload for an upload: fully buffered or streamed
pub enum UploadSource {
    Buffer(Bytes),
    Stream(ByteStream),
}

/// Description of a stored object.
///
/// Only `hash` is mandatory. At delete time every other field is a weak
/// signal: the declared extension or path may be stale or absent, and the
/// store reconstructs candidates from whatever is present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub hash: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub dir_hint: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub folder_id: Option<i64>,
    #[serde(default)]
    pub folder_path: Option<String>,
}

/// Result of a successful upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredObject {
    pub hash: String,
    pub ext: String,
    /// Object path relative to the storage root
    pub path: String,
    /// Public URL the object is served under
    pub url: String,
}

/// Outcome of a delete; an absent object is informational, not an error
#[derive(Debug, PartialEq)]
pub enum DeleteOutcome {
    Deleted(PathBuf),
    NotFound,
}

lazy_static! {
    /// MIME type to extension lookup, covering common image and PDF types
    /// only; anything else yields no candidate.
    static ref MIME_EXTENSIONS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("image/jpeg", ".jpg");
        m.insert("image/pjpeg", ".jpg");
        m.insert("image/png", ".png");
        m.insert("image/gif", ".gif");
        m.insert("image/webp", ".webp");
        m.insert("image/svg+xml", ".svg");
        m.insert("image/avif", ".avif");
        m.insert("image/tiff", ".tif");
        m.insert("image/bmp", ".bmp");
        m.insert("image/x-icon", ".ico");
        m.insert("application/pdf", ".pdf");
        m
    };
}

/// Extension for a MIME type, for the common image/PDF set only
pub fn mime_extension(mime: &str) -> Option<&'static str> {
    MIME_EXTENSIONS.get(mime.trim().to_ascii_lowercase().as_str()).copied()
}

/// Normalize a declared extension to `.ext` form
pub fn normalize_ext(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Some(format!(".{trimmed}"))
}

/// Extract a plausible extension from a URL or filename
pub fn ext_from_path_like(s: &str) -> Option<String> {
    let path_part = s.split(['?', '#']).next().unwrap_or("");
    let name = path_part.rsplit('/').next().unwrap_or("");
    let idx = name.rfind('.')?;
    let ext = &name[idx..];
    if ext.len() < 2 || ext.len() > 10 {
        return None;
    }
    if ext[1..].chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext.to_string())
    } else {
        None
    }
}
