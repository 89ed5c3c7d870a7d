//! Schemata errors.
use apollo_compiler::validation::DiagnosticList;
use apollo_compiler::validation::WithErrors;
use displaydoc::Display;
use thiserror::Error;

use crate::resolver::ResolverCall;
use crate::resolver::ResultsPatcher;
use crate::resolver::extended::ExtendedResolver;
use crate::resolver::map::ResolverMap;

/// Type-erased error produced by resolver functions and patchers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while materializing, merging or paring schemas.
#[derive(Error, Display, Debug, Clone)]
#[non_exhaustive]
pub enum SchemataError {
    /// {0}
    Normalization(#[from] NormalizationError),

    /// invalid SDL: {message}
    InvalidSdl {
        /// Diagnostics reported by the GraphQL compiler.
        message: String,
    },

    /// {0}
    Stumble(#[from] ResolverMapStumbleError),

    /// {0}
    InvalidPath(#[from] InvalidPathError),

    /// could not read SDL module '{path}': {reason}
    ModuleLoad { path: String, reason: String },

    /// invalid merge configuration: {message}
    Config { message: String },
}

impl<T> From<WithErrors<T>> for SchemataError {
    fn from(value: WithErrors<T>) -> Self {
        value.errors.into()
    }
}

impl From<DiagnosticList> for SchemataError {
    fn from(value: DiagnosticList) -> Self {
        SchemataError::InvalidSdl {
            message: value.to_string(),
        }
    }
}

/// The input could not be coerced into SDL text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("cannot normalize an empty schema source")]
    Empty,
}

/// A resolver map leaf was neither a resolver nor a nested map.
#[derive(Error, Debug, Clone)]
#[error("resolver map stumbled on `{key}` at [{}]: {message}", .path.join("."))]
pub struct ResolverMapStumbleError {
    /// Key of the offending entry.
    pub key: String,
    /// Textual rendering of the offending entry.
    pub value: String,
    /// Path of the branch holding the entry.
    pub path: Vec<String>,
    pub message: String,
    /// The map being walked when the walk stumbled.
    pub source_map: ResolverMap,
    /// The partially built output map at the time of the failure.
    pub destination_map: ResolverMap,
    #[source]
    pub cause: Option<Box<ResolverMapStumbleError>>,
}

/// A path lookup inside a resolver map failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid path [{}]: no branch named `{segment}`", .path.join("."))]
pub struct InvalidPathError {
    pub path: Vec<String>,
    pub segment: String,
}

/// Failure of a composed resolver invocation.
#[derive(Error, Debug)]
pub enum ExtendedResolverError {
    #[error(transparent)]
    Execution(#[from] WrappedResolverExecutionError),
    #[error(transparent)]
    Patcher(#[from] ResolverResultsPatcherError),
}

/// One entry of an [`ExtendedResolver`] failed.
#[derive(Error, Debug)]
#[error("resolver #{index} of {len} failed: {source}", len = .resolver.len())]
pub struct WrappedResolverExecutionError {
    pub source: BoxError,
    /// The composer that was running.
    pub resolver: ExtendedResolver,
    /// Position of the failing entry in the composer's order.
    pub index: usize,
    /// Call arguments as seen by the failing entry, accumulator included.
    pub call: ResolverCall,
}

/// The results patcher of an [`ExtendedResolver`] failed.
#[derive(Error, Debug)]
#[error("results patcher failed: {source}")]
pub struct ResolverResultsPatcherError {
    pub source: BoxError,
    pub patcher: ResultsPatcher,
    pub call: ResolverCall,
    /// Accumulated results handed to the patcher.
    pub results: serde_json::Value,
}
