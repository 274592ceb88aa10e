//! Rich diagnostic error types for pensum.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Recoverable outcomes (`NotFound`, a
//! clarification request from the extraction service) are ordinary variants the
//! caller matches on — they are never panics.

use miette::Diagnostic;
use thiserror::Error;

use crate::calendar::CalendarError;
use crate::config::ConfigError;
use crate::paths::PathError;

/// Top-level error type for pensum.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, sources) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum PensumError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("obligation not found: {id}")]
    #[diagnostic(
        code(pensum::store::not_found),
        help("The id does not reference a live obligation. List current ones with `pensum list`.")
    )]
    NotFound { id: u64 },

    #[error("obligation title is empty")]
    #[diagnostic(
        code(pensum::store::empty_title),
        help("An obligation needs a non-empty title. Pass some text describing what is owed.")
    )]
    EmptyTitle,

    #[error("invalid estimated duration: {minutes} minutes")]
    #[diagnostic(
        code(pensum::store::invalid_duration),
        help("The estimated duration must be a positive number of minutes.")
    )]
    InvalidDuration { minutes: u32 },

    #[error("I/O error on {path}: {source}")]
    #[diagnostic(
        code(pensum::store::io),
        help(
            "A filesystem operation on the obligation file failed. Check that the \
             data directory exists, has correct permissions, and the disk is not full."
        )
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(pensum::store::serde),
        help(
            "Failed to serialize or deserialize the obligation file. If the file was \
             edited by hand, fix or remove it; pensum rewrites it in full on the next mutation."
        )
    )]
    Serialization { message: String },
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Extraction errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExtractError {
    #[error("extraction service unavailable: {message}")]
    #[diagnostic(
        code(pensum::extract::unavailable),
        help(
            "The text-understanding service could not be reached. Check the \
             `extractor_endpoint` setting, or capture with an explicit date instead."
        )
    )]
    Unavailable { message: String },

    #[error("malformed extraction response: {message}")]
    #[diagnostic(
        code(pensum::extract::malformed),
        help("The service answered with a shape pensum does not understand. Service version mismatch?")
    )]
    Malformed { message: String },

    #[error("no extraction endpoint configured")]
    #[diagnostic(
        code(pensum::extract::no_endpoint),
        help("Set `extractor_endpoint` in the config file to use remote extraction.")
    )]
    NoEndpoint,
}

/// Result type for extraction operations.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Convenience alias for functions returning pensum results.
pub type PensumResult<T> = std::result::Result<T, PensumError>;
