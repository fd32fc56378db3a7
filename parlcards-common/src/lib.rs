//! # ParlCards Common Library
//!
//! Shared code for the ParlCards crates including:
//! - Error type and `Result` alias
//! - Settings loading (TOML file, environment overrides, compiled defaults)
//! - Atomic file writes for durable state
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod fs;
pub mod time;

pub use config::Settings;
pub use error::{Error, Result};
