#![forbid(unsafe_code)]

//! Error taxonomy for the interface layer.
//!
//! Nothing in this crate propagates a panic across a boundary. Template and
//! configuration failures are recovered locally (logged, degraded result);
//! marshal failures fall through transports; only the runtime-ready timeout
//! surfaces to whatever owns the page lifecycle.

use thiserror::Error;

/// Template or configuration resource load failures.
///
/// All three variants are recoverable: callers log them and proceed with
/// "no document" / "no options" as a first-class outcome.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("fetch failed: {message}")]
    Network { message: String },

    #[error("fetch returned HTTP {status}")]
    Status { status: u16 },

    #[error("document parse failed: {message}")]
    Parse { message: String },
}

impl LoadError {
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

/// Declarative-binding configuration errors.
///
/// A mismatch between the schema and the mounted fragment (or the options
/// resource) skips the affected field and continues; schema-internal
/// violations (duplicate ids/keys) fail schema construction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("template URL is empty and no cached entry exists")]
    EmptyUrl,

    #[error("form container `{selector}` not found in template")]
    MissingContainer { selector: String },

    #[error("declared control `#{id}` not found in mounted form")]
    MissingControl { id: String },

    #[error("option data path `{path}` yielded no data")]
    MissingDataPath { path: String },

    #[error("duplicate field id `{id}` in schema")]
    DuplicateId { id: String },

    #[error("duplicate output key `{key}` in schema")]
    DuplicateKey { key: String },
}

/// Foreign-boundary delivery failures.
#[derive(Debug, Error)]
pub enum MarshalError {
    /// The foreign allocator returned a null/zero address (or threw).
    #[error("foreign allocation of {bytes} bytes failed")]
    Allocation { bytes: usize },

    /// A foreign entry point threw or is missing at call time.
    #[error("foreign call `{entry}` failed: {message}")]
    Invocation { entry: String, message: String },

    /// The module exposes neither the pointer nor the named-call transport.
    #[error("module exposes no delivery method")]
    NoTransport,

    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl MarshalError {
    #[must_use]
    pub fn invocation(entry: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invocation {
            entry: entry.into(),
            message: message.into(),
        }
    }
}

/// Initialization failures surfaced to the page lifecycle owner.
///
/// Only [`InitError::ReadyTimeout`] escapes the interface layer as a hard
/// failure; everything else degrades in place.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("engine module did not become ready within {timeout_ms} ms")]
    ReadyTimeout { timeout_ms: u32 },

    #[error("engine module failed to start: {message}")]
    ModuleFailed { message: String },

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Marshal(#[from] MarshalError),
}
