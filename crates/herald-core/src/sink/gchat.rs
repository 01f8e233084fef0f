//! Google Chat space webhook sink.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use tracing::debug;

use crate::domain::error::SinkError;
use crate::domain::{BuildEnvironment, BuildState, PutRequest};
use crate::obs;
use crate::resolver::ResolvedRepo;
use crate::sink::{error_body, Sinker};

const NAME: &str = "google_chat";
const REPLY_OPTION: (&str, &str) = ("messageReplyOption", "REPLY_MESSAGE_FALLBACK_TO_NEW_THREAD");

pub fn state_icon(state: BuildState) -> &'static str {
    match state {
        BuildState::Pending => "🟡",
        BuildState::Success => "🟢",
        BuildState::Failure => "🔴",
        BuildState::Error => "🟠",
    }
}

/// The summary block appended to chat messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub state: BuildState,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub sha: String,
    pub pipeline: String,
    pub job: String,
    pub build_name: String,
    pub build_url: String,
}

impl ChatSummary {
    pub fn new(state: BuildState, repo: &ResolvedRepo, env: &BuildEnvironment) -> Self {
        Self {
            state,
            owner: repo.owner_from_remote.clone(),
            repo: repo.repo_from_remote.clone(),
            branch: repo.branch.clone(),
            sha: repo.sha.clone(),
            pipeline: env.build_pipeline_name.clone(),
            job: env.build_job_name.clone(),
            build_name: env.build_name.clone(),
            build_url: env.build_url(),
        }
    }

    pub fn render(&self) -> String {
        let mut lines = vec![
            format!("{} *{}*", state_icon(self.state), self.state),
            format!("*repo*: {}/{}", self.owner, self.repo),
        ];
        if !self.branch.is_empty() {
            lines.push(format!("*branch*: {}", self.branch));
        }
        lines.push(format!("*commit*: {}", self.sha));
        lines.push(format!("*pipeline*: {}/{}", self.pipeline, self.job));
        if self.build_url.is_empty() {
            lines.push(format!("*build*: {}", self.build_name));
        } else {
            lines.push(format!("*build*: <{}|{}>", self.build_url, self.build_name));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    text: &'a str,
    thread: Thread,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Thread {
    thread_key: String,
}

pub struct GoogleChatSink {
    client: reqwest::Client,
    webhook: String,
    state: BuildState,
    notify: bool,
    chat_message: String,
    message_file: Option<PathBuf>,
    append_summary: bool,
    summary: ChatSummary,
    thread_key: String,
}

impl GoogleChatSink {
    pub fn new(
        client: reqwest::Client,
        request: &PutRequest,
        env: &BuildEnvironment,
        repo: &ResolvedRepo,
        message_file: Option<PathBuf>,
    ) -> Self {
        let state = request.params.state;
        Self {
            client,
            webhook: request.gchat_webhook().to_string(),
            state,
            notify: request.params.requests_chat_message()
                || request.source.notifies_chat_on(state),
            chat_message: request.params.chat_message.clone(),
            message_file,
            append_summary: request.chat_append_summary(),
            summary: ChatSummary::new(state, repo, env),
            thread_key: format!("{} {}", env.build_pipeline_name, repo.sha),
        }
    }

    /// Message text: explicit message, then file contents, then the summary
    /// when asked for or when there is nothing else to say.
    pub async fn compose_text(&self) -> Result<String, SinkError> {
        let mut parts = Vec::new();
        if !self.chat_message.is_empty() {
            parts.push(self.chat_message.clone());
        }
        if let Some(path) = &self.message_file {
            let contents = tokio::fs::read_to_string(path).await.map_err(|source| {
                SinkError::ReadMessageFile {
                    path: path.clone(),
                    source,
                }
            })?;
            parts.push(contents.trim_end().to_string());
        }
        if self.append_summary || parts.is_empty() {
            parts.push(self.summary.render());
        }
        Ok(parts.join("\n\n"))
    }

    fn webhook_url(&self) -> Result<Url, SinkError> {
        let mut url = Url::parse(&self.webhook).map_err(|_| SinkError::InvalidWebhook)?;
        url.query_pairs_mut()
            .append_pair(REPLY_OPTION.0, REPLY_OPTION.1);
        Ok(url)
    }
}

#[async_trait]
impl Sinker for GoogleChatSink {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn send(&self) -> Result<(), SinkError> {
        if self.webhook.is_empty() {
            obs::emit_sink_skipped(NAME, "no webhook configured");
            return Ok(());
        }
        if !self.notify {
            obs::emit_sink_skipped(NAME, "state not in chat_notify_on_states");
            return Ok(());
        }

        let url = self.webhook_url()?;
        let text = self.compose_text().await?;
        debug!(state = %self.state, thread_key = %self.thread_key, "posting chat message");

        let message = ChatMessage {
            text: &text,
            thread: Thread {
                thread_key: self.thread_key.clone(),
            },
        };
        let response = self
            .client
            .post(url)
            .json(&message)
            .send()
            .await
            .map_err(|e| SinkError::ChatTransport(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SinkError::ChatStatus {
                status: status.as_u16(),
                body: error_body(response).await,
            })
        }
    }
}
