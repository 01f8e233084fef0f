//! Notification sinks and their dispatcher.
//!
//! A sink attempts delivery of one notification and either succeeds or
//! returns a terminal error. The built-in set is closed:
//! - `GitHubCommitStatusSink`: commit status on the reported SHA
//! - `GoogleChatSink`: message to a Google Chat space webhook
//!
//! `SinkDispatcher` runs every sink exactly once, sequentially and in
//! registration order, and aggregates the failures.

pub mod gchat;
pub mod github;

use std::time::Instant;

use async_trait::async_trait;

use crate::domain::error::{DispatchError, SinkError};
use crate::obs;

pub use gchat::GoogleChatSink;
pub use github::GitHubCommitStatusSink;

/// Upper bound on the response body quoted in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Something that can attempt delivery of one notification.
#[async_trait]
pub trait Sinker: Send + Sync {
    /// Short, stable name used in logs.
    fn name(&self) -> &'static str;

    async fn send(&self) -> Result<(), SinkError>;
}

/// Runs an ordered list of sinks to completion.
pub struct SinkDispatcher {
    sinks: Vec<Box<dyn Sinker>>,
}

impl SinkDispatcher {
    pub fn new(sinks: Vec<Box<dyn Sinker>>) -> Self {
        Self { sinks }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Send through every sink, even after a failure. Fails when at least one
    /// sink failed, reporting all failures in dispatch order.
    pub async fn dispatch(&self) -> Result<(), DispatchError> {
        let mut errors = Vec::new();
        for sink in &self.sinks {
            let start = Instant::now();
            match sink.send().await {
                Ok(()) => obs::emit_sink_sent(sink.name(), start.elapsed().as_millis() as u64),
                Err(err) => {
                    obs::emit_sink_failed(sink.name(), &err);
                    errors.push(err);
                }
            }
        }
        match DispatchError::from_errors(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Read a response body for an error message, bounded in size.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
