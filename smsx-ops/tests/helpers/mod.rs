//! Test Helper Utilities
//!
//! Shared utilities for testing smsx-ops

#![allow(dead_code)]

pub mod fakes;

// Re-export commonly used items
pub use fakes::{link, links, subject, FakeSender, FakeShortener};
