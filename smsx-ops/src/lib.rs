//! smsx-ops library interface
//!
//! Batch stages of the SMS field experiment:
//! 1. Contact Normalizer: survey export → unique subjects
//! 2. Link Provisioner: subjects → tracking links + random assignment
//! 3. Message Dispatcher: assignments → sent messages + outcomes
//! 4. Click Aggregator: provider link inventory → click counts
//!
//! Stages communicate only through CSV tables in the data folder.

pub mod config;
pub mod models;
pub mod services;
pub mod stages;
