//! Herald Core Library
//!
//! A Concourse resource that reports build state to GitHub commit statuses
//! and Google Chat. Re-exports the components of the `check`, `in` and `out`
//! steps for use by the `herald` binary and by tests.

pub mod dirset;
pub mod domain;
pub mod emitter;
pub mod git;
pub mod obs;
pub mod put;
pub mod resolver;
pub mod settings;
pub mod sink;
pub mod steps;
pub mod telemetry;

pub use dirset::DirSet;

pub use domain::{
    BuildEnvironment, BuildState, ConfigError, DispatchError, GitReadError, HeraldError,
    OutputError, PutParams, PutRequest, ResolutionError, Result, SinkError, Source, Step,
    StepError, Version, REDACTED,
};

pub use emitter::{emit_version, write_json};
pub use git::{GitMetadataReader, GitRemote, HeadCommit};
pub use put::{put, ProdPutter, Putter};
pub use resolver::{collect_input_dirs, resolve_repo, InputResolver, ResolvedRepo};
pub use settings::Settings;
pub use sink::{GitHubCommitStatusSink, GoogleChatSink, SinkDispatcher, Sinker};
pub use steps::{check, get};

pub use obs::StepSpan;
pub use telemetry::{init_tracing, parse_log_level};

/// Herald version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// One-line build identification for the startup log.
pub fn build_info() -> String {
    format!("herald {VERSION}")
}
