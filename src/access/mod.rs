//! Private-Object Access Gate
//!
//! Stateless per-request authorization for reads under the private folder.
//! Three independent checks run in fixed order, first success wins; the
//! order reflects relative cost, not security semantics, since each check
//! is sufficient on its own. A verifier failure counts as that check
//! failing and never aborts the remaining checks.

pub mod verifier;

use crate::config::PrivateAccessConfig;
use crate::signing::UrlSigner;
use log::{debug, warn};
use std::sync::Arc;
use verifier::{PrincipalDirectory, TokenVerifier};

/// The request-shaped view the gate decides on
#[derive(Debug, Default)]
pub struct AccessRequest<'a> {
    /// Request path with the query string removed (the canonical path)
    pub path: &'a str,
    /// Bearer credential from the Authorization header, if any
    pub bearer: Option<&'a str>,
    /// `token` query parameter
    pub token: Option<&'a str>,
    /// `expires` query parameter, as supplied
    pub expires: Option<&'a str>,
}

/// Authorization gate for private-object reads
pub struct AccessGate {
    mount: String,
    folder_name: String,
    owner_field: String,
    enabled: bool,
    signer: UrlSigner,
    privileged: Arc<dyn TokenVerifier>,
    users: Arc<dyn TokenVerifier>,
    directory: Arc<dyn PrincipalDirectory>,
}

impl AccessGate {
    pub fn new(
        config: &PrivateAccessConfig,
        mount: &str,
        privileged: Arc<dyn TokenVerifier>,
        users: Arc<dyn TokenVerifier>,
        directory: Arc<dyn PrincipalDirectory>,
    ) -> Self {
        Self {
            mount: mount.to_string(),
            folder_name: config.folder_name.clone(),
            owner_field: config.owner_field.clone(),
            enabled: config.enabled,
            signer: UrlSigner::new(config.secret.clone()),
            privileged,
            users,
            directory,
        }
    }

    pub fn signer(&self) -> &UrlSigner {
        &self.signer
    }

    /// Whether the gate guards this path at all; everything outside
    /// `/<mount>/<private-folder>/` bypasses it entirely.
    pub fn applies_to(&self, path: &str) -> bool {
        self.enabled && path.starts_with(&format!("/{}/{}/", self.mount, self.folder_name))
    }

    /// The path segment encoding the resource owner, directly after the
    /// private folder name.
    fn owner_segment<'a>(&self, path: &'a str) -> Option<&'a str> {
        let prefix = format!("/{}/{}/", self.mount, self.folder_name);
        let rest = path.strip_prefix(prefix.as_str())?;
        let owner = rest.split('/').next()?;
        (!owner.is_empty()).then_some(owner)
    }

    /// Short-circuit OR over the three authorization paths
    pub fn authorize(&self, request: &AccessRequest<'_>) -> bool {
        if self.check_privileged(request) {
            debug!("Access to {} granted to privileged caller", request.path);
            return true;
        }
        if self.check_owner(request) {
            debug!("Access to {} granted to owner", request.path);
            return true;
        }
        if self.check_signed_url(request) {
            debug!("Access to {} granted via signed URL", request.path);
            return true;
        }
        warn!("Access to {} denied", request.path);
        false
    }

    fn check_privileged(&self, request: &AccessRequest<'_>) -> bool {
        let Some(bearer) = request.bearer else { return false };
        self.privileged.verify(bearer).is_ok()
    }

    fn check_owner(&self, request: &AccessRequest<'_>) -> bool {
        let Some(bearer) = request.bearer else { return false };
        let Some(owner) = self.owner_segment(request.path) else {
            return false;
        };
        let principal = match self.users.verify(bearer) {
            Ok(principal) => principal,
            Err(_) => return false,
        };
        match self.directory.identifier(&principal.subject, &self.owner_field) {
            Ok(Some(identifier)) => identifier == owner,
            Ok(None) => false,
            Err(_) => false,
        }
    }

    fn check_signed_url(&self, request: &AccessRequest<'_>) -> bool {
        let (Some(token), Some(expires)) = (request.token, request.expires) else {
            return false;
        };
        let Ok(expires_at) = expires.parse::<i64>() else {
            return false;
        };
        if chrono::Utc::now().timestamp() >= expires_at {
            return false;
        }
        self.signer.verify(request.path, expires_at, token)
    }
}
