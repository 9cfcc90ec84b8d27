//! Subcommand implementations

pub mod config;
pub mod doctor;
pub mod format;
pub mod run;
pub mod state;

use anyhow::{Context, Result, bail};
use secrecy::SecretString;

/// Load a required secret from the named environment variable
pub(crate) fn load_secret(env_var: &str, purpose: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No env var configured for {}", purpose);
    }

    let value = std::env::var(env_var)
        .with_context(|| format!("Missing env var {} for {}", env_var, purpose))?;

    if value.trim().is_empty() {
        bail!("Env var {} is empty for {}", env_var, purpose);
    }

    Ok(SecretString::new(value.into()))
}

/// Load an optional secret; unset or blank means absent
pub(crate) fn optional_secret(env_var: &str) -> Option<SecretString> {
    if env_var.trim().is_empty() {
        return None;
    }

    match std::env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Some(SecretString::new(value.into())),
        _ => None,
    }
}
