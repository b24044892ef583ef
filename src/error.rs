//! Error types for deeper-seeker.
//!
//! Each layer owns a `thiserror` enum. Lower layers return typed values so
//! the orchestrator can always decide between degrading and aborting.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error returned by the CLI layer.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent, provider or pipeline failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Command execution failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Filesystem failure while persisting the report.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the provider adapter, the structured-response parser
/// and the orchestrators.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key is configured for a backend that an operation is bound to.
    #[error("no API key configured for backend '{backend}' (set {env_var})")]
    ApiKeyMissing {
        /// Backend name.
        backend: String,
        /// Environment variable that supplies the key.
        env_var: String,
    },

    /// Backend name in the configuration is not one of the known backends.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Name as written in the configuration.
        name: String,
    },

    /// Transport-level failure talking to an LLM backend.
    #[error("API request failed{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    ApiRequest {
        /// Error description.
        message: String,
        /// HTTP status, when the backend answered.
        status: Option<u16>,
    },

    /// A backend call did not complete within the configured timeout.
    #[error("request timed out after {seconds}s")]
    Timeout {
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// Response was JSON but did not have the expected shape.
    #[error("failed to parse response: {message}")]
    ResponseParse {
        /// What went wrong.
        message: String,
        /// Raw response content for diagnostics.
        content: String,
    },

    /// Response text contained no decodable JSON object.
    #[error("no valid structured data in response ({} bytes)", content.len())]
    NoStructuredData {
        /// Raw response content for diagnostics.
        content: String,
    },

    /// The plan stage produced nothing usable. Fatal to the run.
    #[error("research plan unavailable: {message}")]
    PlanUnavailable {
        /// Reason the plan could not be used.
        message: String,
    },

    /// Pipeline-level failure not covered by the other variants.
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Error description.
        message: String,
    },

    /// Reading the requester's answer failed.
    #[error("interaction failed: {message}")]
    Interaction {
        /// Error description.
        message: String,
    },
}

impl AgentError {
    /// Returns `true` for structured-parse failures, as opposed to
    /// transport or configuration failures.
    #[must_use]
    pub const fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            Self::ResponseParse { .. } | Self::NoStructuredData { .. }
        )
    }

    /// Returns `true` for transport failures (network, HTTP status, timeout).
    #[must_use]
    pub const fn is_transport_failure(&self) -> bool {
        matches!(self, Self::ApiRequest { .. } | Self::Timeout { .. })
    }
}

/// Errors internal to the search client. Never escapes the client: they are
/// rendered into the error shape of a search result.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Connection, TLS or body transfer failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Backend answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// Backend answered with a body that is not the expected JSON.
    #[error("malformed response body: {0}")]
    Decode(String),

    /// Call exceeded the configured timeout.
    #[error("search timed out after {seconds}s")]
    Timeout {
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// The search task was cancelled or panicked.
    #[error("search task failed: {0}")]
    Task(String),
}

/// Configuration resolution errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML or has the wrong shape.
    #[error("invalid config file {path}: {message}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A value is present but not acceptable.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// Dotted config key.
        key: String,
        /// Why the value was rejected.
        message: String,
    },

    /// The search API key is not set.
    #[error("no search API key configured (set EXA_API_KEY)")]
    SearchKeyMissing,
}

/// CLI command errors.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The research query read from stdin was empty.
    #[error("research query cannot be empty")]
    EmptyQuery,

    /// Generic execution failure.
    #[error("{0}")]
    ExecutionFailed(String),
}
