// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for manifest validation and timeline control.

use std::fmt;

/// The constraint an individual manifest entry failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFault {
    /// Neither a start offset nor a follow-up relationship was declared
    MissingAnchor,
    /// Duration is absent or zero
    MissingDuration,
    /// Start offset is below zero
    NegativeStart,
    /// Duration is below zero
    NegativeDuration,
    /// Start offset or duration is NaN or infinite
    NonFinite,
}

impl fmt::Display for EntryFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            EntryFault::MissingAnchor => "entry declares neither `start` nor `follow_up`",
            EntryFault::MissingDuration => "entry has no duration",
            EntryFault::NegativeStart => "entry has a negative start",
            EntryFault::NegativeDuration => "entry has a negative duration",
            EntryFault::NonFinite => "entry has a non-finite start or duration",
        };
        f.write_str(reason)
    }
}

/// Error type for timeline operations
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// The manifest has no events
    #[error("Cannot call function: {operation}, no valid manifest provided")]
    EmptyManifest {
        /// Operation that was refused
        operation: &'static str,
    },

    /// A manifest entry failed validation
    #[error("Invalid manifest entry {index}: {fault}")]
    InvalidEntry {
        /// Position of the entry in declaration order
        index: usize,
        /// The failed constraint
        fault: EntryFault,
    },

    /// Tick interval of zero
    #[error("Tick interval must be at least one millisecond")]
    InvalidTick,

    /// RON document could not be parsed
    #[error("Config parse error: {0}")]
    Config(#[from] ron::error::SpannedError),

    /// RON document could not be written
    #[error("Config serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Result alias for timeline operations
pub type Result<T> = std::result::Result<T, TimelineError>;
