//! HTTP service layer
//!
//! Thin actix handlers over the storage, folder and access components.
//! Upload descriptors arrive as headers next to the raw payload stream;
//! deletes take a JSON descriptor body; reads go through the access gate
//! before touching the filesystem.

pub mod interceptor;

use actix_web::{web, HttpRequest, HttpResponse};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncReadExt;

use crate::access::AccessRequest;
use crate::app_state::AppState;
use crate::error::StoreError;
use crate::path::resolve_under_root;
use crate::service::interceptor::UploadRequest;
use crate::storage::reconcile::prune_empty_folders;
use crate::storage::{DeleteOutcome, FileDescriptor, UploadSource};

fn header_value<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Header value as text. Hints and names may carry UTF-8 beyond what
/// `to_str` accepts, so this decodes the raw bytes leniently.
fn header_text(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

fn bearer_token<'a>(req: &'a HttpRequest) -> Option<&'a str> {
    header_value(req, "Authorization")?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Build the upload request from descriptor headers. Only the hash is
/// required; everything else is optional context.
fn upload_request_from_headers(req: &HttpRequest) -> Result<UploadRequest, StoreError> {
    let hash = header_value(req, "X-File-Hash")
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .ok_or_else(|| StoreError::InvalidDescriptor("missing X-File-Hash header".to_string()))?;

    let descriptor = FileDescriptor {
        hash,
        name: header_text(req, "X-File-Name"),
        ext: header_value(req, "X-File-Ext").map(str::to_string),
        mime: header_value(req, "X-Mime-Type").map(str::to_string),
        dir_hint: header_text(req, "X-Dir-Hint"),
        ..Default::default()
    };

    let private = matches!(header_value(req, "X-Private"), Some("true") | Some("1"));

    Ok(UploadRequest {
        descriptor,
        virtual_hint: header_text(req, "X-Virtual-Dir"),
        private,
        owner: header_text(req, "X-Owner"),
    })
}

pub async fn upload_service(
    mut payload: web::Payload,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, StoreError> {
    let request = upload_request_from_headers(&req)?;
    log_mdc::insert("hash", &request.descriptor.hash);
    debug!("Upload requested for {}", request.descriptor.hash);

    // actix payloads are not Send; collect the chunks here and hand the
    // storage layer a buffer
    let limit = app_state.config.server.max_payload_size;
    let mut bytes = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(std::io::Error::other)?;
        bytes.extend_from_slice(&chunk);
        if bytes.len() as u64 > limit {
            return Err(StoreError::PayloadTooLarge {
                size: bytes.len() as u64,
                limit,
            });
        }
    }

    let private = request.private;
    let source = UploadSource::Buffer(bytes.freeze());
    let stored = app_state.uploader.upload(request, source).await?;
    info!("Stored object {} at {}", stored.hash, stored.path);

    let mut response = json!({
        "hash": stored.hash,
        "ext": stored.ext,
        "path": stored.path,
        "url": stored.url,
    });
    if private {
        let canonical = format!("/{}/{}", app_state.config.storage.mount, stored.path);
        let signed = app_state
            .gate
            .signer()
            .sign_url(&canonical, app_state.config.private_access.ttl_secs);
        response["signed_url"] = json!(signed);
    }
    Ok(HttpResponse::Ok().json(response))
}

pub async fn delete_service(
    descriptor: web::Json<FileDescriptor>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, StoreError> {
    let descriptor = descriptor.into_inner();
    if descriptor.hash.trim().is_empty() {
        return Err(StoreError::InvalidDescriptor("hash is required".to_string()));
    }
    log_mdc::insert("hash", &descriptor.hash);
    debug!("Delete requested for {}", descriptor.hash);

    match app_state.store.delete(&descriptor).await? {
        DeleteOutcome::Deleted(path) => {
            info!("Deleted {} at {}", descriptor.hash, path.display());
            // prune while the file record still exists; by-hash start
            // resolution needs it, and the count excludes this hash anyway
            if app_state.config.storage.prune_folders {
                prune_empty_folders(app_state.folders.as_ref(), &descriptor);
            }
            if let Err(e) = app_state.folders.forget_file(&descriptor.hash) {
                warn!("Failed to drop folder record for {}: {}", descriptor.hash, e);
            }
            Ok(HttpResponse::Ok().json(json!({
                "deleted": true,
                "path": path.display().to_string(),
            })))
        }
        DeleteOutcome::NotFound => {
            info!("No stored object matched {}", descriptor.hash);
            Ok(HttpResponse::Ok().json(json!({
                "deleted": false,
                "detail": "object not found",
            })))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    expires: Option<String>,
}

pub async fn serve_service(
    path: web::Path<String>,
    query: web::Query<SignedQuery>,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, StoreError> {
    let rel = path.into_inner();
    // the gate must judge the same decoded spelling the resolver resolves,
    // never the raw request line
    let canonical = format!("/{}/{}", app_state.config.storage.mount, rel);

    if app_state.gate.applies_to(&canonical) {
        let access = AccessRequest {
            path: &canonical,
            bearer: bearer_token(&req),
            token: query.token.as_deref(),
            expires: query.expires.as_deref(),
        };
        if !app_state.gate.authorize(&access) {
            return Err(StoreError::AccessDenied);
        }
    }

    let Some(full_path) = resolve_under_root(app_state.store.root(), &rel) else {
        debug!("Read path {} does not resolve under the root", rel);
        return Ok(HttpResponse::NotFound().body("Object not found"));
    };
    match tokio::fs::metadata(&full_path).await {
        Ok(meta) if meta.is_file() => {}
        _ => return Ok(HttpResponse::NotFound().body("Object not found")),
    }
    let file = match tokio::fs::File::open(&full_path).await {
        Ok(file) => file,
        Err(e) => {
            debug!("Open of {} failed: {}", full_path.display(), e);
            return Ok(HttpResponse::NotFound().body("Object not found"));
        }
    };
    Ok(HttpResponse::Ok()
        .content_type("application/octet-stream")
        .streaming(read_chunks(file)))
}

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Serve a file as a chunked stream instead of slurping it into memory
fn read_chunks(
    file: tokio::fs::File,
) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> {
    futures::stream::unfold(file, |mut file| async move {
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        match file.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), file))
            }
            Err(e) => Some((Err(e), file)),
        }
    })
}
