//! The `put` step: validate, resolve, notify, emit.
//!
//! The step runs through the [`Putter`] seam in four phases. Any failure
//! before dispatch aborts the step without contacting a sink; sink failures
//! are aggregated by the dispatcher; a failure writing the response is still
//! fatal although the notifications were already sent.

use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::domain::error::{ConfigError, HeraldError, Step, StepError};
use crate::domain::{BuildEnvironment, PutRequest, Version};
use crate::emitter;
use crate::obs::{self, StepSpan};
use crate::resolver::{resolve_repo, ResolvedRepo};
use crate::settings::Settings;
use crate::sink::{GitHubCommitStatusSink, GoogleChatSink, SinkDispatcher, Sinker};

/// The phases of a `put` step.
pub trait Putter {
    /// Decode and validate the request, and take the working root from
    /// `args`.
    fn load_configuration(&mut self, input: &[u8], args: &[String]) -> Result<(), HeraldError>;

    /// Pick the repository directory (and message file) under the working
    /// root and read its commit.
    fn process_input_dir(&mut self) -> Result<(), HeraldError>;

    /// The sinks to dispatch to, in dispatch order.
    fn sinks(&self) -> Result<Vec<Box<dyn Sinker>>, HeraldError>;

    /// Write the response document.
    fn output(&self, out: &mut dyn Write) -> Result<(), HeraldError>;
}

fn put_error(source: impl Into<HeraldError>) -> StepError {
    StepError::new(Step::Put, source)
}

/// Run every phase of `putter` in order.
pub async fn put(
    putter: &mut dyn Putter,
    input: &[u8],
    out: &mut dyn Write,
    args: &[String],
) -> Result<(), StepError> {
    let _span = StepSpan::enter(Step::Put);
    obs::emit_step_started(Step::Put);

    let result = run_phases(putter, input, out, args).await;
    obs::emit_step_finished(Step::Put, result.is_ok());
    result
}

async fn run_phases(
    putter: &mut dyn Putter,
    input: &[u8],
    out: &mut dyn Write,
    args: &[String],
) -> Result<(), StepError> {
    putter
        .load_configuration(input, args)
        .map_err(put_error)?;
    putter.process_input_dir().map_err(put_error)?;

    let dispatcher = SinkDispatcher::new(putter.sinks().map_err(put_error)?);
    debug!(sinks = ?dispatcher.names(), "dispatching");
    dispatcher.dispatch().await.map_err(put_error)?;

    putter.output(out).map_err(put_error)
}

/// The production [`Putter`].
pub struct ProdPutter {
    settings: Settings,
    env: BuildEnvironment,
    client: reqwest::Client,
    request: Option<PutRequest>,
    input_dir: PathBuf,
    resolved: Option<ResolvedRepo>,
    message_file: Option<PathBuf>,
}

impl ProdPutter {
    pub fn new(settings: Settings, env: BuildEnvironment) -> Self {
        Self::with_client(settings, env, reqwest::Client::new())
    }

    /// Use `client` for every sink.
    pub fn with_client(settings: Settings, env: BuildEnvironment, client: reqwest::Client) -> Self {
        Self {
            settings,
            env,
            client,
            request: None,
            input_dir: PathBuf::new(),
            resolved: None,
            message_file: None,
        }
    }

    pub fn resolved(&self) -> Option<&ResolvedRepo> {
        self.resolved.as_ref()
    }

    fn request(&self) -> Result<&PutRequest, ConfigError> {
        self.request.as_ref().ok_or(ConfigError::NotLoaded)
    }

    fn resolved_repo(&self) -> Result<&ResolvedRepo, ConfigError> {
        self.resolved.as_ref().ok_or(ConfigError::NotLoaded)
    }
}

impl Putter for ProdPutter {
    fn load_configuration(&mut self, input: &[u8], args: &[String]) -> Result<(), HeraldError> {
        let request = PutRequest::parse(input)?;
        debug!("source:\n{}", request.source);
        debug!("params:\n{}", request.params);
        debug!("environment:\n{}", self.env);

        let root = args.first().ok_or(ConfigError::MissingInputDirectory)?;
        self.input_dir = PathBuf::from(root);
        self.request = Some(request);
        Ok(())
    }

    fn process_input_dir(&mut self) -> Result<(), HeraldError> {
        let request = self.request()?;
        let (resolved, message_file) = resolve_repo(
            &self.input_dir,
            &request.source.owner,
            &request.source.repo,
            &request.params.chat_message_file,
        )?;
        info!(
            event = "put.resolved",
            dir = %resolved.directory_name,
            sha = %resolved.sha,
            branch = %resolved.branch,
        );
        self.resolved = Some(resolved);
        self.message_file = message_file;
        Ok(())
    }

    fn sinks(&self) -> Result<Vec<Box<dyn Sinker>>, HeraldError> {
        let request = self.request()?;
        let resolved = self.resolved_repo()?;
        Ok(vec![
            Box::new(GitHubCommitStatusSink::new(
                self.client.clone(),
                &self.settings,
                request,
                &self.env,
                &resolved.sha,
            )),
            Box::new(GoogleChatSink::new(
                self.client.clone(),
                request,
                &self.env,
                resolved,
                self.message_file.clone(),
            )),
        ])
    }

    fn output(&self, out: &mut dyn Write) -> Result<(), HeraldError> {
        let resolved = self.resolved_repo()?;
        emitter::emit_version(out, &Version::new(resolved.sha.clone()))?;
        Ok(())
    }
}
