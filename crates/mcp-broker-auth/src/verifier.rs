//! RS256 JWT verification.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::claims::{AUDIENCE, ISSUER, RawClaims, VerifiedClaims};
use crate::error::{AuthError, Result};

/// Verifies bearer tokens against one RS256 public key. Constructed once at
/// startup from the configured PEM file.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
}

impl JwtVerifier {
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let decoding_key = DecodingKey::from_rsa_pem(pem)
            .map_err(|_| AuthError::KeyFile("not a valid RSA PEM public key".to_string()))?;
        Ok(Self { decoding_key })
    }

    /// Verify a compact JWT and return its validated claims.
    ///
    /// `jsonwebtoken`'s own claim validation is disabled here (`validate_aud`
    /// off, no `exp`/`iss` requirement baked in) because the broker needs to
    /// apply one uniform check across `iss`, `aud`, `sub`, `exp`, and
    /// `allowed_tags` and collapse every failure into the same
    /// [`AuthError::InvalidToken`] — never revealing which claim was wrong.
    pub fn verify(&self, token: &str) -> Result<VerifiedClaims> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<RawClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| AuthError::InvalidToken)?;
        validate_claims(data.claims)
    }
}

fn validate_claims(claims: RawClaims) -> Result<VerifiedClaims> {
    if claims.iss.as_deref() != Some(ISSUER) {
        return Err(AuthError::InvalidToken);
    }
    if claims.aud.as_deref() != Some(AUDIENCE) {
        return Err(AuthError::InvalidToken);
    }
    let subject = claims.sub.ok_or(AuthError::InvalidToken)?;
    let expires_at = claims.exp.ok_or(AuthError::InvalidToken)?;
    let issued_at = claims.iat.unwrap_or(0);

    let now = chrono::Utc::now().timestamp();
    if expires_at <= now {
        return Err(AuthError::InvalidToken);
    }

    let allowed_tags = parse_allowed_tags(claims.allowed_tags)?;

    Ok(VerifiedClaims {
        subject,
        allowed_tags,
        issued_at,
        expires_at,
    })
}

fn parse_allowed_tags(value: Option<serde_json::Value>) -> Result<Vec<String>> {
    let array = value
        .and_then(|v| v.as_array().cloned())
        .ok_or(AuthError::InvalidToken)?;

    array
        .into_iter()
        .map(|v| v.as_str().map(str::to_string).ok_or(AuthError::InvalidToken))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    const TEST_KEY_BITS: usize = 2048;

    fn test_keypair() -> (Vec<u8>, Vec<u8>) {
        // A fixed 2048-bit RSA test keypair (not used anywhere else) so
        // tests don't depend on keygen at runtime.
        let private_pem = include_bytes!("../testdata/test_rsa_private.pem").to_vec();
        let public_pem = include_bytes!("../testdata/test_rsa_public.pem").to_vec();
        let _ = TEST_KEY_BITS;
        (private_pem, public_pem)
    }

    fn sign(private_pem: &[u8], claims: serde_json::Value) -> String {
        let key = EncodingKey::from_rsa_pem(private_pem).unwrap();
        encode(&Header::new(Algorithm::RS256), &claims, &key).unwrap()
    }

    #[test]
    fn accepts_well_formed_token() {
        let (private_pem, public_pem) = test_keypair();
        let now = chrono::Utc::now().timestamp();
        let token = sign(
            &private_pem,
            json!({
                "iss": ISSUER,
                "aud": AUDIENCE,
                "sub": "user-1",
                "iat": now,
                "exp": now + 3600,
                "allowed_tags": ["private", "calendars"],
            }),
        );

        let verifier = JwtVerifier::from_pem(&public_pem).unwrap();
        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.subject, "user-1");
        assert_eq!(claims.allowed_tags, vec!["private", "calendars"]);
    }

    #[test]
    fn rejects_missing_allowed_tags() {
        let (private_pem, public_pem) = test_keypair();
        let now = chrono::Utc::now().timestamp();
        let token = sign(
            &private_pem,
            json!({"iss": ISSUER, "aud": AUDIENCE, "sub": "u", "iat": now, "exp": now + 3600}),
        );

        let verifier = JwtVerifier::from_pem(&public_pem).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn rejects_non_string_allowed_tags_element() {
        let (private_pem, public_pem) = test_keypair();
        let now = chrono::Utc::now().timestamp();
        let token = sign(
            &private_pem,
            json!({
                "iss": ISSUER, "aud": AUDIENCE, "sub": "u", "iat": now, "exp": now + 3600,
                "allowed_tags": ["ok", 7],
            }),
        );

        let verifier = JwtVerifier::from_pem(&public_pem).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn rejects_expired_token() {
        let (private_pem, public_pem) = test_keypair();
        let now = chrono::Utc::now().timestamp();
        let token = sign(
            &private_pem,
            json!({
                "iss": ISSUER, "aud": AUDIENCE, "sub": "u", "iat": now - 7200, "exp": now - 3600,
                "allowed_tags": ["x"],
            }),
        );

        let verifier = JwtVerifier::from_pem(&public_pem).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn rejects_wrong_issuer() {
        let (private_pem, public_pem) = test_keypair();
        let now = chrono::Utc::now().timestamp();
        let token = sign(
            &private_pem,
            json!({
                "iss": "someone-else", "aud": AUDIENCE, "sub": "u", "iat": now, "exp": now + 3600,
                "allowed_tags": ["x"],
            }),
        );

        let verifier = JwtVerifier::from_pem(&public_pem).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AuthError::InvalidToken)));
    }
}
