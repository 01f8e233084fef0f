//! Concourse build metadata.
//!
//! Read once from the process environment at start and passed to the sinks;
//! nothing else in the crate reads these variables.

use std::fmt;

use reqwest::Url;

use crate::domain::redact::{write_fields, Field};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnvironment {
    pub build_id: String,
    pub build_name: String,
    pub build_job_name: String,
    pub build_pipeline_name: String,
    pub build_pipeline_instance_vars: String,
    pub build_team_name: String,
    pub build_created_by: String,
    pub atc_external_url: String,
}

impl BuildEnvironment {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Missing variables are empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).unwrap_or_default();
        Self {
            build_id: get("BUILD_ID"),
            build_name: get("BUILD_NAME"),
            build_job_name: get("BUILD_JOB_NAME"),
            build_pipeline_name: get("BUILD_PIPELINE_NAME"),
            build_pipeline_instance_vars: get("BUILD_PIPELINE_INSTANCE_VARS"),
            build_team_name: get("BUILD_TEAM_NAME"),
            build_created_by: get("BUILD_CREATED_BY"),
            atc_external_url: get("ATC_EXTERNAL_URL"),
        }
    }

    /// URL of the build in the Concourse web UI, or empty when the external
    /// URL is unknown.
    pub fn build_url(&self) -> String {
        if self.atc_external_url.is_empty() {
            return String::new();
        }
        let raw = format!(
            "{}/teams/{}/pipelines/{}/jobs/{}/builds/{}",
            self.atc_external_url.trim_end_matches('/'),
            self.build_team_name,
            self.build_pipeline_name,
            self.build_job_name,
            self.build_name,
        );
        match Url::parse(&raw) {
            Ok(mut url) => {
                if !self.build_pipeline_instance_vars.is_empty() {
                    url.query_pairs_mut()
                        .append_pair("vars", &self.build_pipeline_instance_vars);
                }
                url.to_string()
            }
            Err(_) => raw,
        }
    }

    fn fields(&self) -> Vec<Field> {
        let BuildEnvironment {
            build_id,
            build_name,
            build_job_name,
            build_pipeline_name,
            build_pipeline_instance_vars,
            build_team_name,
            build_created_by,
            atc_external_url,
        } = self;
        vec![
            Field::public("build_id", build_id),
            Field::public("build_name", build_name),
            Field::public("build_job_name", build_job_name),
            Field::public("build_pipeline_name", build_pipeline_name),
            Field::public("build_pipeline_instance_vars", build_pipeline_instance_vars),
            Field::public("build_team_name", build_team_name),
            Field::public("build_created_by", build_created_by),
            Field::public("atc_external_url", atc_external_url),
        ]
    }
}

impl fmt::Display for BuildEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fields(f, &self.fields())
    }
}
