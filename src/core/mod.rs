//! Core types: errors, configuration, path normalization.

pub mod config;
pub mod errors;
pub mod paths;
