//! Shared utilities for keepsake.
//!
//! This crate provides the leaf building blocks used across the keepsake
//! workspace:
//! - File probing primitives (content hashing, size, mtime, text classification)
//! - Path resolution and traversal-safe joins
//! - Text normalization helpers
//! - Validation of user-supplied names and descriptions
//! - Logging setup with tracing

pub mod log;
pub mod path;
pub mod probe;
pub mod text;
pub mod validate;

pub use validate::ValidationError;
