//! The `check` and `get` steps.
//!
//! The resource is write-only: `check` has no history to discover and `get`
//! fetches nothing. Both still validate the configuration, so a broken
//! `source` is reported on the first `check` rather than on the first `put`.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::error::{ConfigError, HeraldError, Step, StepError};
use crate::domain::{Source, Version};
use crate::emitter;

/// Version returned by `check` before any `put` ran.
pub const DUMMY_VERSION: &str = "dummy";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckRequest {
    pub source: Source,
    #[serde(default)]
    pub version: Option<Version>,
}

/// `get` accepts no parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetParams {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetRequest {
    pub source: Source,
    pub version: Version,
    #[serde(default)]
    pub params: GetParams,
}

#[derive(Debug, Serialize)]
struct GetResponse<'a> {
    version: &'a Version,
}

/// Emit the received version, or a placeholder when there is none.
pub fn check(input: &[u8], out: &mut dyn Write) -> Result<(), StepError> {
    run_check(input, out).map_err(|e| StepError::new(Step::Check, e))
}

fn run_check(input: &[u8], out: &mut dyn Write) -> Result<(), HeraldError> {
    let request: CheckRequest = serde_json::from_slice(input).map_err(ConfigError::from)?;
    request.source.validate()?;
    debug!("source:\n{}", request.source);

    let version = request
        .version
        .unwrap_or_else(|| Version::new(DUMMY_VERSION));
    emitter::write_json(out, &[version])?;
    Ok(())
}

/// Echo back the requested version.
pub fn get(input: &[u8], out: &mut dyn Write) -> Result<(), StepError> {
    run_get(input, out).map_err(|e| StepError::new(Step::Get, e))
}

fn run_get(input: &[u8], out: &mut dyn Write) -> Result<(), HeraldError> {
    let request: GetRequest = serde_json::from_slice(input).map_err(ConfigError::from)?;
    request.source.validate()?;
    if request.version.git_ref.is_empty() {
        return Err(ConfigError::EmptyVersion.into());
    }
    debug!("source:\n{}", request.source);

    emitter::write_json(
        out,
        &GetResponse {
            version: &request.version,
        },
    )?;
    Ok(())
}
