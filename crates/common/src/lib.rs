//! Common types and utilities for PR Metrics

pub mod config;
pub mod duration;
pub mod error;
pub mod models;
pub mod rollups;

pub use config::Config;
pub use error::{Error, Result};
