//! Opaque credential verification seams
//!
//! Token verification and principal lookup belong to external services; the
//! gate only needs these two traits. The shipped implementations cover the
//! configured shared-token table and the common case where the owner path
//! segment encodes the caller's own subject id.

use std::collections::HashMap;
use thiserror::Error;

/// A verifier rejected or failed to decode a credential
#[derive(Debug, Error)]
#[error("{0}")]
pub struct VerifierError(pub String);

/// The authenticated caller a credential decodes to
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub subject: String,
}

/// Decodes a bearer credential into a principal
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Principal, VerifierError>;
}

/// Looks up a principal's designated identifier field
pub trait PrincipalDirectory: Send + Sync {
    fn identifier(&self, subject: &str, field: &str) -> Result<Option<String>, VerifierError>;
}

/// Verifier backed by a configured token-to-subject table
pub struct SharedTokenVerifier {
    tokens: HashMap<String, String>,
}

impl SharedTokenVerifier {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    /// Table where every listed token maps to the same subject
    pub fn uniform(tokens: &[String], subject: &str) -> Self {
        Self {
            tokens: tokens
                .iter()
                .map(|t| (t.clone(), subject.to_string()))
                .collect(),
        }
    }
}

impl TokenVerifier for SharedTokenVerifier {
    fn verify(&self, token: &str) -> Result<Principal, VerifierError> {
        if token.is_empty() {
            return Err(VerifierError("empty credential".to_string()));
        }
        match self.tokens.get(token) {
            Some(subject) => Ok(Principal { subject: subject.clone() }),
            None => Err(VerifierError("unknown credential".to_string())),
        }
    }
}

/// Directory where the identifier of every subject is the subject itself,
/// regardless of the configured field
pub struct SubjectDirectory;

impl PrincipalDirectory for SubjectDirectory {
    fn identifier(&self, subject: &str, _field: &str) -> Result<Option<String>, VerifierError> {
        Ok(Some(subject.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_token_verifier() {
        let mut tokens = HashMap::new();
        tokens.insert("tok-1".to_string(), "user-42".to_string());
        let verifier = SharedTokenVerifier::new(tokens);

        assert_eq!(verifier.verify("tok-1").unwrap().subject, "user-42");
        assert!(verifier.verify("tok-2").is_err());
        assert!(verifier.verify("").is_err());
    }

    #[test]
    fn test_uniform_table() {
        let verifier =
            SharedTokenVerifier::uniform(&["a".to_string(), "b".to_string()], "admin");
        assert_eq!(verifier.verify("a").unwrap().subject, "admin");
        assert_eq!(verifier.verify("b").unwrap().subject, "admin");
        assert!(verifier.verify("c").is_err());
    }

    #[test]
    fn test_subject_directory_echoes_subject() {
        let dir = SubjectDirectory;
        assert_eq!(dir.identifier("u1", "id").unwrap(), Some("u1".to_string()));
        assert_eq!(dir.identifier("u1", "email").unwrap(), Some("u1".to_string()));
    }
}
