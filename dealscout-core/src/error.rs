//! Error taxonomy for the research pipeline.
//!
//! Errors raised inside a dispatched unit of work are captured at the unit
//! boundary and stored on its run state; they never cross into the control
//! thread. Configuration problems surface synchronously at construction time,
//! before anything can be dispatched.

use thiserror::Error;

/// Search backend failures.
#[derive(Debug, Error, Clone)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Network(String),
    #[error("search backend returned {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("search backend returned an unexpected response shape: {0}")]
    InvalidResponse(String),
}

/// Completion backend failures.
#[derive(Debug, Error, Clone)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Network(String),
    #[error("model backend returned {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("model backend returned an unexpected response shape: {0}")]
    InvalidResponse(String),
    #[error("model authentication failed: {0}")]
    Authentication(String),
}

/// Failures while executing one workflow step.
#[derive(Debug, Error, Clone)]
pub enum StepError {
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Problems detected while assembling clients or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required credential {0}; set it in the environment")]
    MissingCredential(&'static str),
    #[error("invalid workflow definition: {0}")]
    InvalidWorkflow(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Synchronous dispatch rejections. These never touch run state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no company URL set; enter a subject before dispatching")]
    EmptySubject,
    #[error("step index {0} is out of range for this workflow")]
    UnknownStep(usize),
}
