//! Activation snippet for shells.
//!
//! After a successful cycle the target profile can be activated with
//! `source ~/.swamp_profile`. The snippet selects the profile by name and
//! clears raw keys so downstream tools cannot pick up stale exported
//! credentials instead.

use std::path::Path;

use log::info;
use tokio::fs;

use crate::error::{Error, Result};

/// Shell snippet that activates `profile` and clears raw keys, so tools
/// resolve credentials through the named profile.
pub fn activation_snippet(profile: &str) -> String {
    format!("export AWS_PROFILE={profile}\nunset AWS_ACCESS_KEY_ID\nunset AWS_SECRET_ACCESS_KEY\n")
}

/// Overwrites `path` with the activation snippet for `profile`.
///
/// # Arguments
///
/// * `profile` - Target profile to activate
/// * `path` - Snippet location; the file is truncated and rewritten in full on
///   every call, never appended to
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be created or written, for example
/// when its directory does not exist.
pub async fn export_activation(profile: &str, path: &Path) -> Result<()> {
    fs::write(path, activation_snippet(profile)).await.map_err(|e| {
        Error::io(
            format!("Error writing target profile to export file {}", path.display()),
            e,
        )
    })?;
    info!("Exported profile {profile} to {}", path.display());
    Ok(())
}
