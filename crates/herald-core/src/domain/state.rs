//! Build state reported to the notification sinks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

/// Outcome of a build step.
///
/// Only the four literals below are accepted, case-sensitively; decoding any
/// other string fails, so an invalid state cannot be constructed. How a state
/// is rendered on the wire is decided by each sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum BuildState {
    Pending,
    Success,
    Failure,
    Error,
}

impl BuildState {
    pub const ALL: [BuildState; 4] = [
        BuildState::Pending,
        BuildState::Success,
        BuildState::Failure,
        BuildState::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildState::Pending => "pending",
            BuildState::Success => "success",
            BuildState::Failure => "failure",
            BuildState::Error => "error",
        }
    }
}

impl FromStr for BuildState {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidBuildState(s.to_string()))
    }
}

impl TryFrom<String> for BuildState {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, ConfigError> {
        s.parse()
    }
}

impl From<BuildState> for &'static str {
    fn from(state: BuildState) -> Self {
        state.as_str()
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
