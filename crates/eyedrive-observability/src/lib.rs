// Copyright 2025 EyeDrive Contributors
// SPDX-License-Identifier: Apache-2.0

//! # eyedrive-observability
//!
//! Logging infrastructure shared by every EyeDrive crate, with per-crate
//! debug flag support.
//!
//! ## Features
//! - `file-logging`: JSON log files with daily rotation, one folder per run

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known EyeDrive crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "eyedrive-config",
    "eyedrive-hal",
    "eyedrive-core",
    "eyedrive-runtime",
];

/// Tracing target for a crate name (`eyedrive-core` -> `eyedrive_core`).
pub fn crate_target(crate_name: &str) -> String {
    crate_name.replace('-', "_")
}
