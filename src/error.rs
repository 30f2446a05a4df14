//! Error types for the healer.
//!
//! Only [`ElementNotFound`] ever reaches a `resolve` caller. Everything in
//! [`HealError`] is recoverable: it gets logged, recorded in the resolve trace,
//! and the cascade moves on.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HealError {
    #[error("Failed to load store file {path}: {reason}")]
    StoreLoad { path: PathBuf, reason: String },

    #[error("Adapter rejected {selector_type} selector '{selector}': {reason}")]
    CandidateRealization {
        selector_type: String,
        selector: String,
        reason: String,
    },

    #[error("Element '{selector}' not visible within {timeout_ms}ms")]
    TimeoutExceeded { selector: String, timeout_ms: u64 },

    #[error("Failed to write {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },
}

/// Raised by a page adapter when a (type, selector) pair cannot be turned into
/// an element handle at all, e.g. an unsupported type or malformed XPath.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct RealizationError {
    pub reason: String,
}

impl RealizationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Terminal outcome of a resolution: every stage was exhausted.
#[derive(Debug, Clone, Error)]
#[error("Element not found for locator '{locator_id}' after {attempts} attempts")]
pub struct ElementNotFound {
    pub locator_id: String,
    pub attempts: usize,
}
