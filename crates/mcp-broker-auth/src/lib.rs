//! JWT verification, per-session client context, and the tag-based access
//! filter shared by the aggregator and broker server.

pub mod claims;
pub mod context;
pub mod error;
pub mod keyfile;
pub mod verifier;

pub use claims::{DEFAULT_TOKEN_LIFETIME_DAYS, RawClaims, VerifiedClaims, AUDIENCE, ISSUER};
pub use context::{has_access, ClientContext, WILDCARD_TAG};
pub use error::{AuthError, Result};
pub use keyfile::check_private_key_permissions;
pub use verifier::JwtVerifier;
