//! Error types for tfagent.
//!
//! This module defines the error hierarchy using `thiserror`. Every variant
//! built through the [`err!`](crate::err) macro records the source location
//! where it was constructed, which makes failures in the pipeline easy to
//! trace back.
//!
//! # Error Categories
//!
//! - **Load errors**: missing directories, unreadable files (fatal)
//! - **Parse errors**: HCL syntax failures (isolated per file)
//! - **Extraction errors**: duplicate definitions, malformed blocks (fatal)
//! - **Config errors**: invalid configuration files or values
//! - **Model errors**: the local model server is down, slow, or misbehaving
//!
//! # Example
//!
//! ```rust
//! use tfagent::error::{TfAgentError, Result};
//!
//! fn read(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).map_err(|e| TfAgentError::FileRead {
//!         path: path.into(),
//!         source: e,
//!         src_path: file!(),
//!         src_line: line!(),
//!     })
//! }
//! ```

use crate::types::{EntryKind, SourceLocation};
use std::path::PathBuf;
use thiserror::Error;

/// Macro to create errors with automatic source location tracking.
///
/// Usage:
/// ```ignore
/// return Err(err!(DirectoryNotFound { path: dir.to_path_buf() }));
/// ```
#[macro_export]
macro_rules! err {
    ($variant:ident { $($field:ident: $value:expr),* $(,)? }) => {
        $crate::error::TfAgentError::$variant {
            $($field: $value,)*
            src_path: file!(),
            src_line: line!(),
        }
    };
}

/// A specialized Result type for tfagent operations.
pub type Result<T> = std::result::Result<T, TfAgentError>;

/// The main error type for tfagent.
#[derive(Error, Debug)]
pub enum TfAgentError {
    // =========================================================================
    // I/O and File System Errors
    // =========================================================================
    /// I/O error with path context.
    #[error("I/O error at '{path}' ({src_path}:{src_line}): {source}")]
    Io {
        /// The path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Directory not found.
    #[error("Directory not found: {path} ({src_path}:{src_line})")]
    DirectoryNotFound {
        /// The missing directory path
        path: PathBuf,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// A configuration file could not be read.
    #[error("Failed to read '{path}' ({src_path}:{src_line}): {source}")]
    FileRead {
        /// The unreadable file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // HCL Parsing Errors
    // =========================================================================
    /// HCL parsing error.
    #[error("Failed to parse HCL in '{file}'{} ({src_path}:{src_line}): {message}", format_position(.line, .column))]
    HclParse {
        /// The file being parsed
        file: PathBuf,
        /// Error message
        message: String,
        /// Line number (if available)
        line: Option<usize>,
        /// Column number (if available)
        column: Option<usize>,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Invalid HCL structure (e.g., a resource block with a single label).
    #[error("Invalid HCL structure at {location} ({src_path}:{src_line}): {message}")]
    HclStructure {
        /// Where the offending block starts
        location: SourceLocation,
        /// Description of the structural issue
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Extraction Errors
    // =========================================================================
    /// The same entry is defined twice.
    #[error("Duplicate {kind} '{name}' defined at {first} and {second} ({src_path}:{src_line})")]
    DuplicateDefinition {
        /// What kind of entry collided
        kind: EntryKind,
        /// The colliding key
        name: String,
        /// Location of the first definition
        first: SourceLocation,
        /// Location of the redefinition
        second: SourceLocation,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration parsing error.
    #[error("Failed to parse configuration ({src_path}:{src_line}): {message}")]
    ConfigParse {
        /// Error message
        message: String,
        /// The underlying error (if any)
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}' ({src_path}:{src_line}): {message}")]
    ConfigValue {
        /// The configuration key
        key: String,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Model Server Errors
    // =========================================================================
    /// The model server could not be reached.
    #[error("Model server at '{host}' is unavailable ({src_path}:{src_line}): {message}")]
    ModelUnavailable {
        /// The configured host
        host: String,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// The model server did not answer in time.
    #[error("Model server at '{host}' timed out after {timeout_secs}s ({src_path}:{src_line})")]
    ModelTimeout {
        /// The configured host
        host: String,
        /// The timeout that elapsed
        timeout_secs: u64,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// The model server answered with an error or an unreadable body.
    #[error("Model server returned an error ({src_path}:{src_line}): {message}")]
    ModelResponse {
        /// HTTP status code (if available)
        status: Option<u16>,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Report Errors
    // =========================================================================
    /// Report generation error.
    #[error("Failed to generate report ({src_path}:{src_line}): {message}")]
    ReportGeneration {
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Generic Errors
    // =========================================================================
    /// Internal error (should not happen in normal operation).
    #[error("Internal error ({src_path}:{src_line}): {message}")]
    Internal {
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Multiple errors occurred.
    #[error("Multiple errors occurred ({count} total)")]
    Multiple {
        /// Number of errors
        count: usize,
        /// The individual errors
        errors: Vec<TfAgentError>,
    },
}

fn format_position(line: &Option<usize>, column: &Option<usize>) -> String {
    match (*line, *column) {
        (Some(l), Some(c)) => format!(" at line {l}, column {c}"),
        (Some(l), None) => format!(" at line {l}"),
        _ => String::new(),
    }
}

impl TfAgentError {
    /// Creates an `Io` error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error, src_path: &'static str, src_line: u32) -> Self {
        Self::Io { path: path.into(), source, src_path, src_line }
    }

    /// Creates a `FileRead` error.
    #[must_use]
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error, src_path: &'static str, src_line: u32) -> Self {
        Self::FileRead { path: path.into(), source, src_path, src_line }
    }

    /// Creates an `HclParse` error.
    #[must_use]
    pub fn hcl_parse(file: PathBuf, message: String, line: Option<usize>, column: Option<usize>, src_path: &'static str, src_line: u32) -> Self {
        Self::HclParse { file, message, line, column, src_path, src_line }
    }

    /// Creates a `ConfigParse` error.
    #[must_use]
    pub fn config_parse(message: String, source: Option<Box<dyn std::error::Error + Send + Sync>>, src_path: &'static str, src_line: u32) -> Self {
        Self::ConfigParse { message, source, src_path, src_line }
    }

    /// Creates an `Internal` error.
    #[must_use]
    pub fn internal(message: String, src_path: &'static str, src_line: u32) -> Self {
        Self::Internal { message, src_path, src_line }
    }

    /// Determines if the error only invalidates a single file's contribution,
    /// so the rest of the batch may proceed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::HclParse { .. })
    }

    /// The file this error is about, when there is one.
    #[must_use]
    pub fn file(&self) -> Option<&std::path::Path> {
        match self {
            Self::Io { path, .. } | Self::DirectoryNotFound { path, .. } | Self::FileRead { path, .. } => Some(path),
            Self::HclParse { file, .. } => Some(file),
            Self::HclStructure { location, .. } => Some(&location.file),
            _ => None,
        }
    }

    /// Returns the appropriate exit code for the error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io { source, .. } | Self::FileRead { source, .. }
                if source.kind() == std::io::ErrorKind::PermissionDenied => 13,
            Self::FileRead { .. } => 14,
            Self::DirectoryNotFound { .. } => 15,
            Self::ConfigParse { .. } => 18,
            Self::ConfigValue { .. } => 19,
            Self::Multiple { .. } => 21,
            Self::HclStructure { .. } => 22,
            Self::DuplicateDefinition { .. } => 23,
            Self::ModelUnavailable { .. } | Self::ModelResponse { .. } => 24,
            Self::ModelTimeout { .. } => 25,
            _ => 1,
        }
    }

    /// Consolidates multiple errors into a single `TfAgentError::Multiple` if there's more than one.
    /// Otherwise, returns the single error or `Ok(())` if no errors.
    ///
    /// # Errors
    ///
    /// Returns the collected error(s) when the list is non-empty.
    pub fn collect(mut errors: Vec<Self>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            count => Err(Self::Multiple { count, errors }),
        }
    }
}

/// Extension trait for `Result` to add context to errors.
pub trait ResultExt<T> {
    /// Adds a file path context to an I/O error.
    ///
    /// # Errors
    ///
    /// Propagates the original error as `TfAgentError::Io`.
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;

    /// Converts a general error into a `ConfigParse` error with context.
    ///
    /// # Errors
    ///
    /// Propagates the original error as `TfAgentError::ConfigParse`.
    fn to_config_parse_error(self, message: String) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| TfAgentError::Io {
            path: path.into(),
            source: match e.into().downcast::<std::io::Error>() {
                Ok(io) => *io,
                Err(other) => std::io::Error::new(std::io::ErrorKind::Other, other),
            },
            src_path: file!(),
            src_line: line!(),
        })
    }

    fn to_config_parse_error(self, message: String) -> Result<T> {
        self.map_err(|e| TfAgentError::config_parse(message, Some(e.into()), file!(), line!()))
    }
}

impl From<std::io::Error> for TfAgentError {
    fn from(source: std::io::Error) -> Self {
        // Prefer TfAgentError::io(path, ..) when the path is known
        Self::Io {
            path: PathBuf::new(),
            source,
            src_path: file!(),
            src_line: line!(),
        }
    }
}

impl From<serde_json::Error> for TfAgentError {
    fn from(source: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON serialization/deserialization error: {source}"),
            src_path: file!(),
            src_line: line!(),
        }
    }
}

/// A utility for collecting multiple errors during parsing or processing.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<TfAgentError>,
}

impl ErrorCollector {
    /// Create a new error collector.
    #[must_use]
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add an error to the collection.
    pub fn add(&mut self, error: TfAgentError) {
        self.errors.push(error);
    }

    /// Get the number of collected errors.
    #[must_use]
    pub fn count(&self) -> usize {
        self.errors.len()
    }

    /// Check if there are any errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Hand the collected errors back, ordered by the file they concern.
    #[must_use]
    pub fn into_sorted(mut self) -> Vec<TfAgentError> {
        self.errors
            .sort_by(|a, b| a.file().cmp(&b.file()));
        self.errors
    }

    /// Convert to a Result, returning Multiple error if there are any errors.
    ///
    /// # Errors
    ///
    /// Returns the collected error(s) when any were added.
    pub fn into_result(self) -> Result<()> {
        TfAgentError::collect(self.errors)
    }
}
