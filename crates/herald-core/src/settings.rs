//! Process-level settings, resolved once at start.

use tracing::info;

/// Default base URL of the GitHub REST API.
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

/// Environment variable overriding [`DEFAULT_GITHUB_API`].
pub const GITHUB_API_ENV: &str = "HERALD_GITHUB_API";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the commit status API.
    pub github_api: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            github_api: DEFAULT_GITHUB_API.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_override(std::env::var(GITHUB_API_ENV).ok())
    }

    /// Apply an optional endpoint override; an empty value counts as unset.
    pub fn from_override(github_api: Option<String>) -> Self {
        match github_api.filter(|api| !api.is_empty()) {
            Some(api) => {
                info!(event = "settings.endpoint_override", github_api = %api, "endpoint override");
                Self { github_api: api }
            }
            None => Self::default(),
        }
    }
}
