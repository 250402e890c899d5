// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./medvault.toml` > `~/.config/medvault/medvault.toml`
//! > `/etc/medvault/medvault.toml` with environment variable overrides via the
//! `MEDVAULT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::MedvaultConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/medvault/medvault.toml` (system-wide)
/// 3. `~/.config/medvault/medvault.toml` (user XDG config)
/// 4. `./medvault.toml` (local directory)
/// 5. `MEDVAULT_*` environment variables
pub fn load_config() -> Result<MedvaultConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MedvaultConfig::default()))
        .merge(Toml::file("/etc/medvault/medvault.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("medvault/medvault.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("medvault.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<MedvaultConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MedvaultConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MedvaultConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MedvaultConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `MEDVAULT_CRYPTO_DATA_KEY` must map to
/// `crypto.data_key`, not `crypto.data.key`.
fn env_provider() -> Env {
    Env::prefixed("MEDVAULT_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: MEDVAULT_CRYPTO_DATA_KEY -> "crypto_data_key"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("storage_", "storage.", 1)
            .replacen("crypto_", "crypto.", 1)
            .replacen("auth_", "auth.", 1);
        mapped.into()
    })
}
