//! Issues a broker-format RS256 JWT from a private key on disk. Separate
//! from the broker's own runtime, which only ever verifies with the public
//! half — this is a standalone issuer utility, not part of the core broker.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use mcp_broker_auth::{check_private_key_permissions, AUDIENCE, DEFAULT_TOKEN_LIFETIME_DAYS, ISSUER};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "generate_jwt")]
#[command(about = "Issue a broker-format RS256 JWT")]
struct Args {
    /// RSA private key (PEM) to sign with. Must be mode 0600 or 0400.
    #[arg(long, env = "MCP_JWT_PRIVATE_KEY_PATH")]
    private_key: PathBuf,

    /// Subject claim for the issued token.
    #[arg(long)]
    subject: String,

    /// Tag this token is allowed to see. Repeat for multiple tags, or pass
    /// "*" for the wildcard.
    #[arg(long = "allowed-tag", required = true)]
    allowed_tags: Vec<String>,

    /// Token lifetime in days.
    #[arg(long, default_value_t = DEFAULT_TOKEN_LIFETIME_DAYS)]
    lifetime_days: i64,
}

#[derive(Serialize)]
struct Claims {
    iss: &'static str,
    aud: &'static str,
    sub: String,
    iat: i64,
    exp: i64,
    allowed_tags: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    check_private_key_permissions(&args.private_key)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("private key permission check failed")?;
    let pem = std::fs::read(&args.private_key)
        .with_context(|| format!("failed to read private key at {}", args.private_key.display()))?;
    let encoding_key = EncodingKey::from_rsa_pem(&pem).context("invalid RSA private key")?;

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        iss: ISSUER,
        aud: AUDIENCE,
        sub: args.subject,
        iat: now,
        exp: now + args.lifetime_days * 86_400,
        allowed_tags: args.allowed_tags,
    };

    let token = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
        .context("failed to sign token")?;
    println!("{token}");
    Ok(())
}
