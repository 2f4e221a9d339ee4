//! Error types for tcready

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Input Errors ===
    #[error("tidbcluster is nil, cannot wait for readiness")]
    NilCluster,

    // === Manifest Defects ===
    #[error("pod {namespace}/{pod} has no affinity set")]
    MissingAffinity { namespace: String, pod: String },

    #[error("pod {namespace}/{pod} has malformed pod anti-affinity: {reason}")]
    MalformedAntiAffinity {
        namespace: String,
        pod: String,
        reason: String,
    },

    #[error("pod {namespace}/{pod} has no toleration with key {key}")]
    MissingToleration {
        namespace: String,
        pod: String,
        key: String,
    },

    // === Disaster Tolerance ===
    #[error("disaster tolerance violated by pod {namespace}/{pod}: {reason}")]
    DisasterTolerance {
        namespace: String,
        pod: String,
        reason: String,
    },

    // === Convergence ===
    #[error("tidbcluster {namespace}/{name} not ready after {elapsed:?}: {last_reason}")]
    DeadlineExceeded {
        namespace: String,
        name: String,
        elapsed: Duration,
        last_reason: String,
    },

    #[error("{operation} timed out after {after:?}")]
    FetchTimeout { operation: String, after: Duration },

    // === Platform Errors ===
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Terminates the poll loop immediately; never resolved by waiting.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::NilCluster
                | Error::MissingAffinity { .. }
                | Error::MalformedAntiAffinity { .. }
                | Error::MissingToleration { .. }
                | Error::DisasterTolerance { .. }
                | Error::InvalidConfig(_)
        )
    }

    /// Is this a retryable error?
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Kube(_)
                | Error::NotFound(_)
                | Error::Http(_)
                | Error::Json(_)
                | Error::FetchTimeout { .. }
        )
    }

    /// Whether the kubernetes API reported the object as missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Kube(kube::Error::Api(e)) => e.code == 404,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
