// src/error.rs

//! Central error type for the gather subsystem

use thiserror::Error;

/// Errors surfaced by the gather subsystem
#[derive(Error, Debug)]
pub enum Error {
    /// The cancellation signal was observed; the gather was aborted
    #[error("gather cancelled")]
    Cancelled,

    /// No configured source exposes dependency metadata
    #[error("no configured source provides dependency information")]
    NoSourcesAvailable,

    /// A source's transport failed
    #[error("source '{name}' unavailable: {reason}")]
    SourceUnavailable { name: String, reason: String },

    /// A source returned a response that could not be parsed
    #[error("source '{name}' returned malformed metadata: {reason}")]
    SourceMalformed { name: String, reason: String },

    /// Version string could not be parsed
    #[error("invalid version '{0}'")]
    InvalidVersion(String),

    /// Version range string could not be parsed
    #[error("invalid version range '{0}'")]
    InvalidRange(String),

    /// Target framework string could not be parsed
    #[error("invalid target framework '{0}'")]
    InvalidFramework(String),

    /// Component construction failed
    #[error("initialization failed: {0}")]
    InitError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
