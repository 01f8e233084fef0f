//! Resource configuration and per-step requests.
//!
//! Every structure decodes with `deny_unknown_fields`: a typo in a pipeline
//! definition is a hard error rather than a silently ignored key. `Display`
//! and `Debug` of `Source` and `PutParams` go through the redacting field
//! formatter, so secrets never reach logs or error text.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::redact::{bracketed, write_fields, Field};
use crate::domain::state::BuildState;

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

/// Configuration of the resource, shared by all steps.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Source {
    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub repo: String,

    #[serde(default)]
    pub access_token: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gchat_webhook: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub log_level: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context_prefix: String,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub chat_append_summary: bool,

    /// States that trigger a chat message. Empty means every state.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chat_notify_on_states: Vec<BuildState>,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            access_token: String::new(),
            gchat_webhook: String::new(),
            log_level: String::new(),
            context_prefix: String::new(),
            chat_append_summary: true,
            chat_notify_on_states: Vec::new(),
        }
    }
}

impl Source {
    /// Check the mandatory keys, reporting every missing one at once, sorted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = BTreeSet::new();
        if self.owner.is_empty() {
            missing.insert("owner");
        }
        if self.repo.is_empty() {
            missing.insert("repo");
        }
        if self.access_token.is_empty() {
            missing.insert("access_token");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingSourceKeys(missing.into_iter().collect()))
        }
    }

    /// Whether `state` is one of the states configured to reach the chat.
    pub fn notifies_chat_on(&self, state: BuildState) -> bool {
        self.chat_notify_on_states.is_empty() || self.chat_notify_on_states.contains(&state)
    }

    fn fields(&self) -> Vec<Field> {
        // Exhaustive on purpose: a new field does not compile until classified.
        let Source {
            owner,
            repo,
            access_token,
            gchat_webhook,
            log_level,
            context_prefix,
            chat_append_summary,
            chat_notify_on_states,
        } = self;
        vec![
            Field::public("owner", owner),
            Field::public("repo", repo),
            Field::secret("access_token", access_token),
            Field::secret("gchat_webhook", gchat_webhook),
            Field::public("log_level", log_level),
            Field::public("context_prefix", context_prefix),
            Field::public("chat_append_summary", chat_append_summary),
            Field::public("chat_notify_on_states", bracketed(chat_notify_on_states)),
        ]
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fields(f, &self.fields())
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Parameters of one `put` invocation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PutParams {
    pub state: BuildState,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub chat_message: String,

    /// `<dir>/<file>`, relative to the working root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub chat_message_file: String,

    /// Overrides `Source::chat_append_summary` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_append_summary: Option<bool>,

    /// Overrides `Source::gchat_webhook` when non-empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gchat_webhook: String,
}

impl PutParams {
    pub fn new(state: BuildState) -> Self {
        Self {
            state,
            context: String::new(),
            chat_message: String::new(),
            chat_message_file: String::new(),
            chat_append_summary: None,
            gchat_webhook: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.chat_message_file.is_empty() && self.message_file_parts().is_none() {
            return Err(ConfigError::WrongMessageFileFormat {
                have: self.chat_message_file.clone(),
            });
        }
        Ok(())
    }

    /// Split `chat_message_file` into `(dir, file)`. `None` when unset or
    /// not of the form `<dir>/<file>`.
    pub fn message_file_parts(&self) -> Option<(&str, &str)> {
        let mut parts = self.chat_message_file.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(dir), Some(file), None) if !dir.is_empty() && !file.is_empty() => {
                Some((dir, file))
            }
            _ => None,
        }
    }

    /// Whether a chat message was asked for explicitly, regardless of state.
    pub fn requests_chat_message(&self) -> bool {
        !self.chat_message.is_empty() || !self.chat_message_file.is_empty()
    }

    fn fields(&self) -> Vec<Field> {
        let PutParams {
            state,
            context,
            chat_message,
            chat_message_file,
            chat_append_summary,
            gchat_webhook,
        } = self;
        vec![
            Field::public("state", state),
            Field::public("context", context),
            Field::public("chat_message", chat_message),
            Field::public("chat_message_file", chat_message_file),
            Field::public(
                "chat_append_summary",
                chat_append_summary.map(|v| v.to_string()).unwrap_or_default(),
            ),
            Field::secret("gchat_webhook", gchat_webhook),
        ]
    }
}

impl fmt::Display for PutParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fields(f, &self.fields())
    }
}

impl fmt::Debug for PutParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// The full, validated configuration of one `put` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PutRequest {
    pub source: Source,
    pub params: PutParams,
}

impl PutRequest {
    /// Decode and validate a request body.
    pub fn parse(input: &[u8]) -> Result<Self, ConfigError> {
        let request: PutRequest = serde_json::from_slice(input)?;
        request.source.validate()?;
        request.params.validate()?;
        Ok(request)
    }

    /// The effective chat webhook: the params override wins over the source.
    pub fn gchat_webhook(&self) -> &str {
        if self.params.gchat_webhook.is_empty() {
            &self.source.gchat_webhook
        } else {
            &self.params.gchat_webhook
        }
    }

    pub fn chat_append_summary(&self) -> bool {
        self.params
            .chat_append_summary
            .unwrap_or(self.source.chat_append_summary)
    }
}

/// A resource version as exchanged with Concourse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Version {
    #[serde(rename = "ref")]
    pub git_ref: String,
}

impl Version {
    pub fn new(git_ref: impl Into<String>) -> Self {
        Self {
            git_ref: git_ref.into(),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref: {}", self.git_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_source() -> Source {
        Source {
            owner: "the-owner".to_string(),
            repo: "the-repo".to_string(),
            access_token: "the-token".to_string(),
            ..Source::default()
        }
    }

    #[test]
    fn test_source_validate_only_mandatory_keys() {
        assert!(base_source().validate().is_ok());
    }

    #[test]
    fn test_source_validate_missing_keys_sorted() {
        let err = Source::default().validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "source: missing keys: access_token, owner, repo"
        );

        let source = Source {
            repo: "the-repo".to_string(),
            ..Source::default()
        };
        assert_eq!(
            source.validate().unwrap_err().to_string(),
            "source: missing keys: access_token, owner"
        );
    }

    #[test]
    fn test_source_decode_rejects_unknown_field() {
        let input = r#"{"owner": "o", "repo": "r", "access_token": "t", "hello": "x"}"#;
        let err = serde_json::from_str::<Source>(input).unwrap_err();
        assert!(err.to_string().contains("unknown field `hello`"), "{err}");
    }

    #[test]
    fn test_source_decode_rejects_wrong_type() {
        let err = serde_json::from_str::<Source>(r#"{"owner": 123}"#).unwrap_err();
        assert!(err.to_string().contains("invalid type"), "{err}");
    }

    #[test]
    fn test_source_display_redacts_secrets() {
        let source = Source {
            gchat_webhook: "sensitive-gchat-webhook".to_string(),
            access_token: "sensitive-the-access-token".to_string(),
            log_level: "debug".to_string(),
            context_prefix: "the-prefix".to_string(),
            chat_notify_on_states: vec![BuildState::Success, BuildState::Failure],
            ..base_source()
        };
        let want = "\
owner:                 the-owner
repo:                  the-repo
access_token:          ***REDACTED***
gchat_webhook:         ***REDACTED***
log_level:             debug
context_prefix:        the-prefix
chat_append_summary:   true
chat_notify_on_states: [success failure]";

        assert_eq!(source.to_string(), want);
        assert_eq!(format!("{source:?}"), want);
        assert!(!format!("{source:?}").contains("sensitive"));
    }

    #[test]
    fn test_source_display_empty_secrets_not_marked() {
        let source = Source {
            owner: "the-owner".to_string(),
            ..Source::default()
        };
        let have = source.to_string();
        assert!(
            have.contains(&format!("{:<23}\n", "access_token:")),
            "{have}"
        );
        assert!(!have.contains("REDACTED"));
    }

    #[test]
    fn test_params_display_redacts_webhook() {
        let params = PutParams {
            context: "johnny".to_string(),
            chat_message: "stecchino".to_string(),
            chat_message_file: "dir/msg.txt".to_string(),
            gchat_webhook: "sensitive-gchat-webhook".to_string(),
            ..PutParams::new(BuildState::Pending)
        };
        let want = [
            "state:               pending",
            "context:             johnny",
            "chat_message:        stecchino",
            "chat_message_file:   dir/msg.txt",
            "chat_append_summary: ",
            "gchat_webhook:       ***REDACTED***",
        ]
        .join("\n");

        assert_eq!(params.to_string(), want);
        assert!(!format!("{params:?}").contains("sensitive"));
    }

    #[test]
    fn test_request_debug_never_leaks() {
        let request = PutRequest {
            source: Source {
                gchat_webhook: "sensitive-a".to_string(),
                ..base_source()
            },
            params: PutParams {
                gchat_webhook: "sensitive-b".to_string(),
                ..PutParams::new(BuildState::Error)
            },
        };
        let debug = format!("{request:?}");
        assert!(!debug.contains("sensitive"));
        assert!(!debug.contains("the-token"));
    }

    #[test]
    fn test_message_file_shape() {
        let mut params = PutParams::new(BuildState::Success);
        for ok in ["msgdir/msg.txt", "a/b"] {
            params.chat_message_file = ok.to_string();
            assert!(params.validate().is_ok(), "{ok}");
        }
        for bad in ["msg.txt", "/msg.txt", "dir/", "a/b/c", "/"] {
            params.chat_message_file = bad.to_string();
            let err = params.validate().unwrap_err();
            assert_eq!(
                err.to_string(),
                format!(
                    "chat_message_file: wrong format: have: {bad}, want: path of the form: <dir>/<file>"
                )
            );
        }
    }

    #[test]
    fn test_parse_invalid_state() {
        let input = br#"{"source": {"owner": "o", "repo": "r", "access_token": "t"},
                         "params": {"state": "burnt-pizza"}}"#;
        let err = PutRequest::parse(input).unwrap_err();
        assert!(
            err.to_string()
                .starts_with("parsing request: invalid build state: burnt-pizza"),
            "{err}"
        );
    }

    #[test]
    fn test_parse_unknown_params_field() {
        let input = br#"{"source": {}, "params": {"pizza": "margherita"}}"#;
        let err = PutRequest::parse(input).unwrap_err();
        assert!(err.to_string().contains("unknown field `pizza`"), "{err}");
    }

    #[test]
    fn test_parse_round_trip() {
        let request = PutRequest {
            source: Source {
                gchat_webhook: "https://chat.example/hook".to_string(),
                context_prefix: "ci".to_string(),
                chat_append_summary: false,
                chat_notify_on_states: vec![BuildState::Failure, BuildState::Error],
                ..base_source()
            },
            params: PutParams {
                context: "unit".to_string(),
                chat_message_file: "msgdir/msg.txt".to_string(),
                chat_append_summary: Some(true),
                ..PutParams::new(BuildState::Failure)
            },
        };
        let encoded = serde_json::to_vec(&request).unwrap();
        let decoded = PutRequest::parse(&encoded).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_effective_overrides() {
        let mut request = PutRequest {
            source: Source {
                gchat_webhook: "source-hook".to_string(),
                chat_append_summary: false,
                ..base_source()
            },
            params: PutParams::new(BuildState::Success),
        };
        assert_eq!(request.gchat_webhook(), "source-hook");
        assert!(!request.chat_append_summary());

        request.params.gchat_webhook = "params-hook".to_string();
        request.params.chat_append_summary = Some(true);
        assert_eq!(request.gchat_webhook(), "params-hook");
        assert!(request.chat_append_summary());
    }

    #[test]
    fn test_notifies_chat_on_defaults_to_all() {
        let mut source = base_source();
        assert!(BuildState::ALL.into_iter().all(|s| source.notifies_chat_on(s)));

        source.chat_notify_on_states = vec![BuildState::Failure];
        assert!(source.notifies_chat_on(BuildState::Failure));
        assert!(!source.notifies_chat_on(BuildState::Success));
    }

    #[test]
    fn test_version_display() {
        assert_eq!(Version::new("pizza").to_string(), "ref: pizza");
    }
}
