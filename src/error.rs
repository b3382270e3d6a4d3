// src/error.rs
//! Unified error handling for the display pipeline
//!
//! Every fallible operation in the crate reports through [`ScopeError`] so
//! that callers (UI glue, acquisition drivers) see one taxonomy: precondition
//! violations, invalid filter parameters, allocation failures, and
//! configuration errors. Rejected operations never leave partial state behind.

use thiserror::Error;

/// Unified error type for the display pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScopeError {
    /// Caller violated an interface precondition; no state was mutated
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// Channel index outside the device channel set
    #[error("channel index {index} out of range (device has {device_channels} channels)")]
    ChannelOutOfRange {
        /// Offending index
        index: usize,
        /// Size of the device channel set
        device_channels: usize,
    },

    /// Filter parameter rejected at construction time; the previous filter stays active
    #[error("invalid filter parameter: {reason} (cutoff {cutoff_hz} Hz, sample rate {sample_rate_hz} Hz)")]
    InvalidFilterParameter {
        /// Why the parameter was rejected
        reason: String,
        /// Requested cutoff frequency
        cutoff_hz: f32,
        /// Sampling rate the filter was designed for
        sample_rate_hz: f32,
    },

    /// Storage reallocation failed; the pipeline keeps its last valid configuration
    #[error("allocation of {requested_bytes} bytes failed for {component}")]
    AllocationFailure {
        /// Component that requested the storage
        component: &'static str,
        /// Requested size in bytes
        requested_bytes: usize,
    },

    /// Configuration file or value error
    #[error("configuration error: {0}")]
    Config(String),
}

impl ScopeError {
    /// Shorthand for a precondition violation
    pub fn precondition(reason: impl Into<String>) -> Self {
        ScopeError::Precondition(reason.into())
    }

    /// Shorthand for a rejected filter parameter
    pub fn invalid_filter(reason: impl Into<String>, cutoff_hz: f32, sample_rate_hz: f32) -> Self {
        ScopeError::InvalidFilterParameter {
            reason: reason.into(),
            cutoff_hz,
            sample_rate_hz,
        }
    }
}

/// Result type alias for pipeline operations
pub type ScopeResult<T> = Result<T, ScopeError>;
