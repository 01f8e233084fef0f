//! GitHub commit status sink.
//!
//! One `POST /repos/{owner}/{repo}/statuses/{sha}` per invocation. See
//! <https://docs.github.com/en/rest/commits/statuses>.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;

use crate::domain::error::SinkError;
use crate::domain::{BuildEnvironment, BuildState, PutRequest};
use crate::settings::Settings;
use crate::sink::{error_body, Sinker};

const API_VERSION: &str = "2022-11-28";
const MEDIA_TYPE: &str = "application/vnd.github+json";
const AGENT: &str = concat!("herald/", env!("CARGO_PKG_VERSION"));

/// Body of a create-commit-status request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitStatus {
    pub state: BuildState,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target_url: String,
    pub description: String,
    pub context: String,
}

impl CommitStatus {
    pub fn new(request: &PutRequest, env: &BuildEnvironment) -> Self {
        Self {
            state: request.params.state,
            target_url: env.build_url(),
            description: format!("Build {}", env.build_name),
            context: status_context(
                &request.source.context_prefix,
                &request.params.context,
                &env.build_job_name,
            ),
        }
    }
}

/// `<prefix>/<context>`, where context defaults to the job name.
pub fn status_context(prefix: &str, context: &str, job_name: &str) -> String {
    let context = if context.is_empty() { job_name } else { context };
    if prefix.is_empty() {
        context.to_string()
    } else {
        format!("{prefix}/{context}")
    }
}

pub struct GitHubCommitStatusSink {
    client: reqwest::Client,
    api: String,
    access_token: String,
    owner: String,
    repo: String,
    sha: String,
    status: CommitStatus,
}

impl GitHubCommitStatusSink {
    pub fn new(
        client: reqwest::Client,
        settings: &Settings,
        request: &PutRequest,
        env: &BuildEnvironment,
        sha: &str,
    ) -> Self {
        Self {
            client,
            api: settings.github_api.trim_end_matches('/').to_string(),
            access_token: request.source.access_token.clone(),
            owner: request.source.owner.clone(),
            repo: request.source.repo.clone(),
            sha: sha.to_string(),
            status: CommitStatus::new(request, env),
        }
    }

    pub fn status(&self) -> &CommitStatus {
        &self.status
    }

    fn url(&self) -> String {
        format!(
            "{}/repos/{}/{}/statuses/{}",
            self.api, self.owner, self.repo, self.sha
        )
    }
}

#[async_trait]
impl Sinker for GitHubCommitStatusSink {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn send(&self) -> Result<(), SinkError> {
        let url = self.url();
        debug!(
            url = %url,
            state = %self.status.state,
            context = %self.status.context,
            "posting commit status"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header(ACCEPT, MEDIA_TYPE)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(USER_AGENT, AGENT)
            .json(&self.status)
            .send()
            .await
            .map_err(|e| SinkError::GitHubTransport(e.to_string()))?;

        match response.status() {
            StatusCode::CREATED => Ok(()),
            StatusCode::UNAUTHORIZED => Err(SinkError::GitHubUnauthorized),
            StatusCode::NOT_FOUND => Err(SinkError::GitHubNotFound {
                owner: self.owner.clone(),
                repo: self.repo.clone(),
                sha: self.sha.clone(),
            }),
            other => Err(SinkError::GitHubStatus {
                status: other.as_u16(),
                body: error_body(response).await,
            }),
        }
    }
}
