//! # SMSX Common Library
//!
//! Shared code for the SMS field-experiment pipeline:
//! - Error and result types
//! - TOML configuration model and loading
//! - CSV table helpers used at every stage boundary

pub mod config;
pub mod error;
pub mod table;

pub use error::{Error, Result};
