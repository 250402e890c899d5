// SPDX-FileCopyrightText: 2026 Medvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the medvault case store.
//!
//! Layered TOML configuration (system, XDG, local directory) with
//! `MEDVAULT_*` environment variable overrides, loaded via Figment.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{AuthConfig, CryptoConfig, MedvaultConfig, StorageConfig};
