//! Per-session authenticated identity and the tag-based access filter.

use std::collections::HashSet;

use crate::claims::VerifiedClaims;

pub const WILDCARD_TAG: &str = "*";

/// Authenticated identity attached to a session after a successful
/// `authenticate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    pub subject: String,
    pub allowed_tags: HashSet<String>,
    pub authenticated_at: i64,
}

impl ClientContext {
    pub fn from_claims(claims: VerifiedClaims, authenticated_at: i64) -> Self {
        Self {
            subject: claims.subject,
            allowed_tags: claims.allowed_tags.into_iter().collect(),
            authenticated_at,
        }
    }

    pub fn has_wildcard(&self) -> bool {
        self.allowed_tags.contains(WILDCARD_TAG)
    }

    /// OR-over-tags visibility/authorization check: true iff this context
    /// holds the wildcard, or shares at least one tag with `required_tags`.
    ///
    /// An empty `required_tags` (an untagged server) is a fail-safe deny
    /// for non-wildcard contexts — empty intersection never grants access
    /// on its own, wildcard must override explicitly.
    pub fn has_access_to_tags(&self, required_tags: &[String]) -> bool {
        if self.has_wildcard() {
            return true;
        }
        required_tags.iter().any(|tag| self.allowed_tags.contains(tag))
    }
}

/// Stateless decision function over a context and a tool's server tags.
/// Kept as a free function (rather than a method only) so the broker
/// server and the aggregator can share the exact same check without
/// constructing a context for the unauthenticated "development mode" path.
pub fn has_access(context: Option<&ClientContext>, required_tags: &[String]) -> bool {
    match context {
        Some(ctx) => ctx.has_access_to_tags(required_tags),
        // No context at all means an unauthenticated, development-mode
        // session — the broker server decides whether that's permitted via
        // `BrokerConfig.require_auth`; once it has, this always returns
        // true so every tool is visible.
        None => true,
    }
}
