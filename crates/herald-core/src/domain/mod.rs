//! Domain models for Herald.
//!
//! - `Source`, `PutParams`, `PutRequest`, `Version`: decoded step requests
//! - `BuildState`: the closed set of reportable states
//! - `BuildEnvironment`: Concourse build metadata
//! - error taxonomy shared by every step

pub mod environment;
pub mod error;
pub mod redact;
pub mod request;
pub mod state;

pub use environment::BuildEnvironment;
pub use error::{
    ConfigError, DispatchError, GitReadError, HeraldError, OutputError, ResolutionError, Result,
    SinkError, Step, StepError,
};
pub use redact::REDACTED;
pub use request::{PutParams, PutRequest, Source, Version};
pub use state::BuildState;
