//! Wire-level JWT claim shape.

use serde::{Deserialize, Serialize};

pub const ISSUER: &str = "mcp-broker";
pub const AUDIENCE: &str = "mcp-broker";

/// Default lifetime assigned at issuance by `generate_jwt`. The broker
/// itself never refreshes tokens.
pub const DEFAULT_TOKEN_LIFETIME_DAYS: i64 = 30;

/// Claims exactly as carried on the wire. Deserialized permissively so the
/// verifier can apply its own validation and produce one generic error
/// rather than relying on `jsonwebtoken`'s claim errors (which differ per
/// missing/invalid field).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawClaims {
    pub iss: Option<String>,
    pub aud: Option<String>,
    pub sub: Option<String>,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
    #[serde(default)]
    pub allowed_tags: Option<serde_json::Value>,
}

/// Claims that have passed validation: every field present, correctly
/// typed, and non-expired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims {
    pub subject: String,
    pub allowed_tags: Vec<String>,
    pub issued_at: i64,
    pub expires_at: i64,
}
