//! Claim verification for HMAC-signed JWTs.
//!
//! A claim token must carry two string claims:
//! - `subject` (the user or device id whose windows are updated)
//! - `dbauth` (the attribute string, e.g. `accounts:allow:30days`)
//!
//! Only the symmetric HMAC family is accepted. The header algorithm is
//! checked before any signature work, so `none` and asymmetric algorithms
//! are rejected without touching the key.

use std::collections::HashSet;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use dbwarden_types::SubjectId;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Algorithms a claim may be signed with.
pub const ACCEPTED_ALGORITHMS: [&str; 3] = ["HS256", "HS384", "HS512"];

// ============================================================================
// Errors
// ============================================================================

/// Why a claim token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    /// The token is not three base64url JSON segments.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The header names an algorithm outside HS256/HS384/HS512.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The signature does not match the shared secret.
    #[error("invalid signature")]
    InvalidSignature,

    /// A required claim is absent, not a string, or empty.
    #[error("missing claim: {0}")]
    MissingClaim(&'static str),

    /// The `exp` claim lies in the past.
    #[error("token expired")]
    Expired,
}

impl ClaimError {
    /// Stable identifier for responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedToken(_) => "malformed_token",
            Self::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Self::InvalidSignature => "invalid_signature",
            Self::MissingClaim(_) => "missing_claim",
            Self::Expired => "expired",
        }
    }
}

// ============================================================================
// Claims
// ============================================================================

/// A claim whose signature has been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedClaim {
    pub subject: SubjectId,
    /// Raw attribute string, parsed later by the rule parser.
    pub dbauth: String,
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Claims are read loosely so that a wrong type reports as a missing claim
/// rather than a malformed token.
#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    subject: Option<serde_json::Value>,
    #[serde(default)]
    dbauth: Option<serde_json::Value>,
}

// ============================================================================
// Verifier
// ============================================================================

/// Verifies claim tokens against a shared HMAC secret.
#[derive(Clone)]
pub struct ClaimVerifier {
    key: DecodingKey,
    leeway_secs: u64,
}

impl fmt::Debug for ClaimVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimVerifier")
            .field("key", &"<redacted>")
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

impl ClaimVerifier {
    /// Creates a verifier for tokens signed with `secret`.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            leeway_secs: 0,
        }
    }

    /// Sets the clock skew tolerated when checking `exp`.
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    /// Verifies `token` and extracts its claims.
    pub fn verify(&self, token: &str) -> Result<VerifiedClaim, ClaimError> {
        let token = token.trim();
        let algorithm = header_algorithm(token)?;

        let mut validation = Validation::new(algorithm);
        validation.required_spec_claims = HashSet::new();
        validation.leeway = self.leeway_secs;
        validation.validate_aud = false;

        let data = decode::<RawClaims>(token, &self.key, &validation).map_err(|e| {
            debug!(error = %e, "claim token rejected");
            match e.kind() {
                ErrorKind::InvalidSignature => ClaimError::InvalidSignature,
                ErrorKind::ExpiredSignature => ClaimError::Expired,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                    ClaimError::UnsupportedAlgorithm(format!("{algorithm:?}"))
                }
                _ => ClaimError::MalformedToken(e.to_string()),
            }
        })?;

        let subject = string_claim(data.claims.subject).ok_or(ClaimError::MissingClaim("subject"))?;
        if subject.trim().is_empty() {
            return Err(ClaimError::MissingClaim("subject"));
        }
        let dbauth = string_claim(data.claims.dbauth).ok_or(ClaimError::MissingClaim("dbauth"))?;

        Ok(VerifiedClaim {
            subject: SubjectId::new(subject),
            dbauth,
        })
    }
}

/// Reads the header's `alg` without trusting anything else in the token.
fn header_algorithm(token: &str) -> Result<Algorithm, ClaimError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(ClaimError::MalformedToken(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(segments[0])
        .map_err(|e| ClaimError::MalformedToken(format!("header is not base64url: {e}")))?;
    let header: RawHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| ClaimError::MalformedToken(format!("header is not JSON: {e}")))?;

    match header.alg.as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        _ => Err(ClaimError::UnsupportedAlgorithm(header.alg)),
    }
}

fn string_claim(value: Option<serde_json::Value>) -> Option<String> {
    match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    }
}
