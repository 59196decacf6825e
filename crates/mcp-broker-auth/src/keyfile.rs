//! Private-key file permission enforcement.
//!
//! The broker's own runtime never reads a private key (it only verifies
//! with a public key); this check exists for `generate_jwt`, the separate
//! issuer utility, which must refuse to sign with a key file that's
//! readable by anyone but its owner.

use std::path::Path;

use crate::error::{AuthError, Result};

#[cfg(unix)]
pub fn check_private_key_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)
        .map_err(|e| AuthError::KeyFile(format!("cannot stat '{}': {e}", path.display())))?;
    let mode = metadata.permissions().mode() & 0o777;

    if mode != 0o600 && mode != 0o400 {
        return Err(AuthError::KeyFile(format!(
            "'{}' has mode {mode:o}, expected 0600 or 0400",
            path.display()
        )));
    }

    Ok(())
}

#[cfg(not(unix))]
pub fn check_private_key_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
