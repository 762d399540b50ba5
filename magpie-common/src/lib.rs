//! Common types and utilities shared across Magpie crates.
//!
//! This crate defines shared run parameters, observability helpers, and error
//! types used throughout the Magpie workspace. It is intentionally lightweight
//! and dependency‑minimal so that all crates can depend on it without
//! introducing heavy transitive costs.
//!
//! # Overview
//!
//! - [`RunDefaults`]: Baseline collection parameters
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`MagpieError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! Constructing the default run parameters:
//!
//! ```rust
//! use magpie_common::RunDefaults;
//!
//! let defaults = RunDefaults::default();
//! assert_eq!(defaults.days_back, 7);
//! assert_eq!(defaults.max_items_per_keyword, 100);
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;

/// Baseline parameters for a research run.
///
/// These apply when neither the CLI nor the configuration file overrides
/// them, and they bound what a single keyword search is allowed to pull.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDefaults {
    /// How many trailing days of posts a keyword search covers.
    pub days_back: u32,
    /// Cap on collected posts per keyword, per platform.
    pub max_items_per_keyword: u32,
    /// Default per‑request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            days_back: 7,
            max_items_per_keyword: 100,
            request_timeout_secs: 30,
        }
    }
}

/// Error types used across the Magpie system.
#[derive(thiserror::Error, Debug)]
pub enum MagpieError {
    /// An agent failed to complete a requested operation.
    #[error("Agent error: {0}")]
    Agent(String),

    /// A collection backend (HTTP, WebDriver) reported an error.
    #[error("Fetch error: {0}")]
    Fetch(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Text analysis could not process an input.
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// The artifact store rejected or lost an operation.
    #[error("Store error: {0}")]
    Store(String),

    /// Operation exceeded the configured timeout.
    #[error("Timeout occurred")]
    Timeout,
}

/// Convenient alias for results that use [`MagpieError`].
pub type Result<T> = std::result::Result<T, MagpieError>;
