//! Error taxonomy for Herald.
//!
//! Failures raised before sink dispatch (`ConfigError`, `ResolutionError`,
//! `GitReadError`) abort the step. `SinkError`s are collected by the
//! dispatcher into a single `DispatchError` so that one failing sink never
//! stops the others.

use std::fmt;
use std::path::PathBuf;

use crate::dirset::DirSet;

/// Request decoding and validation failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("parsing request: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("source: missing keys: {}", .0.join(", "))]
    MissingSourceKeys(Vec<&'static str>),

    #[error("invalid build state: {0}")]
    InvalidBuildState(String),

    #[error(
        "chat_message_file: wrong format: have: {have}, want: path of the form: <dir>/<file>"
    )]
    WrongMessageFileFormat { have: String },

    #[error("arguments: missing input directory")]
    MissingInputDirectory,

    #[error("empty 'version' field")]
    EmptyVersion,

    #[error("request not loaded")]
    NotLoaded,
}

/// Failures while picking the input directories out of the working root.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("collecting directories in {}: {source}", root.display())]
    CollectDirs {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("put:inputs: missing directory for GitHub repo: have: {have}, GitHub: {owner}/{repo}")]
    MissingRepoDir {
        have: DirSet,
        owner: String,
        repo: String,
    },

    #[error(
        "put:inputs: want only directory for GitHub repo: have: {have}, GitHub: {owner}/{repo}"
    )]
    AmbiguousRepoDir {
        have: DirSet,
        owner: String,
        repo: String,
    },

    #[error(
        "put:inputs: directory for chat_message_file not found: have: {have}, chat_message_file: {file}"
    )]
    MissingMessageDir { have: DirSet, file: String },

    #[error(transparent)]
    GitConfig(#[from] GitReadError),
}

/// Failures reading on-disk git metadata. Each variant names the stage that
/// failed so that a bad configuration can be told apart from a corrupted
/// checkout.
#[derive(Debug, thiserror::Error)]
pub enum GitReadError {
    #[error("parsing .git/config: open {}: {source}", path.display())]
    OpenConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing .git/config: {}: {reason}", path.display())]
    MalformedConfig { path: PathBuf, reason: String },

    #[error("read HEAD: open {}: {source}", path.display())]
    OpenHead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("branch checkout: read SHA file: open {}: {source}", path.display())]
    OpenRef {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("branch checkout: read packed-refs: open {}: {source}", path.display())]
    OpenPackedRefs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("branch checkout: invalid SHA in {}: {sha}", path.display())]
    InvalidRefSha { path: PathBuf, sha: String },

    #[error("detached HEAD: invalid SHA: {0}")]
    InvalidDetachedSha(String),
}

/// Delivery failure of a single notification sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("GitHub commit status: 401 Unauthorized: wrong or expired access token")]
    GitHubUnauthorized,

    #[error(
        "GitHub commit status: 404 Not Found: one of: repository {owner}/{repo} not found, \
         commit {sha} not found, access token lacks the repo:status scope"
    )]
    GitHubNotFound {
        owner: String,
        repo: String,
        sha: String,
    },

    #[error("GitHub commit status: unexpected HTTP status {status}: {body}")]
    GitHubStatus { status: u16, body: String },

    #[error("GitHub commit status: transport: {0}")]
    GitHubTransport(String),

    #[error("Google Chat: read chat_message_file {}: {source}", path.display())]
    ReadMessageFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Google Chat: invalid webhook URL (value redacted)")]
    InvalidWebhook,

    #[error("Google Chat: unexpected HTTP status {status}: {body}")]
    ChatStatus { status: u16, body: String },

    #[error("Google Chat: transport: {0}")]
    ChatTransport(String),
}

/// The sink failures of one dispatch, in dispatch order.
///
/// A single failure renders as that sink's own message; several render as
/// `multiple errors:` followed by one tab-indented line per failure.
#[derive(Debug)]
pub struct DispatchError {
    errors: Vec<SinkError>,
}

impl DispatchError {
    /// Returns `None` when there is nothing to report.
    pub fn from_errors(errors: Vec<SinkError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    pub fn errors(&self) -> &[SinkError] {
        &self.errors
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [only] = self.errors.as_slice() {
            return write!(f, "{only}");
        }
        f.write_str("multiple errors:")?;
        for err in &self.errors {
            write!(f, "\n\t{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DispatchError {}

/// Failure writing a protocol response document.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("{0}")]
    Write(#[from] std::io::Error),

    #[error("encoding output: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Herald domain errors.
#[derive(Debug, thiserror::Error)]
pub enum HeraldError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("git commit: {0}")]
    GitRead(#[from] GitReadError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Result type for Herald domain operations.
pub type Result<T> = std::result::Result<T, HeraldError>;

/// One of the three resource protocol steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Check,
    Get,
    Put,
}

impl Step {
    /// Map the name the executable was invoked as (`check`, `in`, `out`).
    pub fn from_invoked_name(name: &str) -> Option<Self> {
        match name {
            "check" => Some(Step::Check),
            "in" => Some(Step::Get),
            "out" => Some(Step::Put),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Check => "check",
            Step::Get => "get",
            Step::Put => "put",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed protocol step; renders as `<step>: <cause>`.
#[derive(Debug, thiserror::Error)]
#[error("{step}: {source}")]
pub struct StepError {
    pub step: Step,
    #[source]
    pub source: HeraldError,
}

impl StepError {
    pub fn new(step: Step, source: impl Into<HeraldError>) -> Self {
        Self {
            step,
            source: source.into(),
        }
    }
}
