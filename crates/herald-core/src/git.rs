//! Git integration utilities for capturing repository state.
//!
//! Everything here reads the on-disk layout of a checkout directly; no git
//! process is spawned and the repository is never modified.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use gix::bstr::ByteSlice;
use regex::Regex;
use tracing::debug;

use crate::domain::error::GitReadError;

/// Owner and repository parsed from a remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRemote {
    pub host: String,
    pub owner: String,
    pub repo: String,
}

fn url_remote_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:https?|ssh|git)://(?:[^@/]+@)?([^/:]+)(?::\d+)?/([\w.-]+)/([\w.-]+?)(?:\.git)?/?$",
        )
        .ok()
    })
    .as_ref()
}

fn scp_remote_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:[\w.-]+@)?([\w.-]+):([\w.-]+)/([\w.-]+?)(?:\.git)?/?$").ok())
        .as_ref()
}

impl GitRemote {
    /// Parse `https://`, `http://`, `ssh://`, `git://` and scp-like
    /// `git@host:owner/repo.git` remotes. Anything else yields `None`.
    pub fn parse(url: &str) -> Option<Self> {
        let url = url.trim();
        let caps = url_remote_re()
            .and_then(|re| re.captures(url))
            .or_else(|| scp_remote_re().and_then(|re| re.captures(url)))?;
        Some(Self {
            host: caps[1].to_string(),
            owner: caps[2].to_string(),
            repo: caps[3].to_string(),
        })
    }

    /// GitHub owner and repository names are case-insensitive.
    pub fn matches(&self, owner: &str, repo: &str) -> bool {
        self.owner.eq_ignore_ascii_case(owner) && self.repo.eq_ignore_ascii_case(repo)
    }
}

/// Parsed `.git/config`.
#[derive(Debug)]
pub struct GitConfig {
    file: gix::config::File<'static>,
}

impl GitConfig {
    /// Parse git config text. `path` is only used for error reporting.
    /// Includes are not followed.
    pub fn parse(text: &str, path: &Path) -> Result<Self, GitReadError> {
        let file = text
            .parse::<gix::config::File<'static>>()
            .map_err(|err| GitReadError::MalformedConfig {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        Ok(Self { file })
    }

    /// Last value of `section.subsection.key`; section and key names are
    /// case-insensitive, subsections are not.
    pub fn get(&self, section: &str, subsection: Option<&str>, key: &str) -> Option<String> {
        self.file
            .string_by(section, subsection.map(|s| s.as_bytes().as_bstr()), key)
            .map(|value| value.to_str_lossy().into_owned())
    }
}

/// Commit currently checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadCommit {
    pub sha: String,
    /// `None` for a detached HEAD.
    pub branch: Option<String>,
}

/// Check that `sha` is a full SHA-1 or SHA-256 object name.
pub fn is_valid_sha(sha: &str) -> bool {
    matches!(sha.len(), 40 | 64) && sha.chars().all(|c| c.is_ascii_hexdigit())
}

/// Reads metadata of the checkout rooted at a working directory.
#[derive(Debug, Clone)]
pub struct GitMetadataReader {
    git_dir: PathBuf,
}

impl GitMetadataReader {
    pub fn new(work_dir: &Path) -> Self {
        Self {
            git_dir: work_dir.join(".git"),
        }
    }

    /// Check whether the working directory holds a `.git` directory.
    pub fn is_repository(&self) -> bool {
        self.git_dir.is_dir()
    }

    pub fn config(&self) -> Result<GitConfig, GitReadError> {
        let path = self.git_dir.join("config");
        let text = std::fs::read_to_string(&path)
            .map_err(|source| GitReadError::OpenConfig {
                path: path.clone(),
                source,
            })?;
        GitConfig::parse(&text, &path)
    }

    /// Owner/repo of the `origin` remote, `None` when there is no origin or
    /// its URL is not recognized.
    pub fn origin(&self) -> Result<Option<GitRemote>, GitReadError> {
        let config = self.config()?;
        let Some(url) = config.get("remote", Some("origin"), "url") else {
            debug!(git_dir = %self.git_dir.display(), "no origin remote");
            return Ok(None);
        };
        let remote = GitRemote::parse(&url);
        if remote.is_none() {
            debug!(git_dir = %self.git_dir.display(), url = %url, "unrecognized remote URL");
        }
        Ok(remote)
    }

    /// Capture the HEAD commit SHA and, for a branch checkout, the branch.
    pub fn head_commit(&self) -> Result<HeadCommit, GitReadError> {
        let head_path = self.git_dir.join("HEAD");
        let head = std::fs::read_to_string(&head_path).map_err(|source| {
            GitReadError::OpenHead {
                path: head_path.clone(),
                source,
            }
        })?;
        let head = head.trim();

        match head.strip_prefix("ref:") {
            Some(refname) => {
                let refname = refname.trim();
                let sha = self.resolve_ref(refname)?;
                let branch = refname
                    .strip_prefix("refs/heads/")
                    .unwrap_or(refname)
                    .to_string();
                Ok(HeadCommit {
                    sha,
                    branch: Some(branch),
                })
            }
            None => {
                if !is_valid_sha(head) {
                    return Err(GitReadError::InvalidDetachedSha(head.to_string()));
                }
                Ok(HeadCommit {
                    sha: head.to_ascii_lowercase(),
                    branch: None,
                })
            }
        }
    }

    /// Resolve a ref through its loose file, falling back to `packed-refs`.
    fn resolve_ref(&self, refname: &str) -> Result<String, GitReadError> {
        let loose = self.git_dir.join(refname);
        match std::fs::read_to_string(&loose) {
            Ok(content) => {
                let sha = content.trim();
                if !is_valid_sha(sha) {
                    return Err(GitReadError::InvalidRefSha {
                        path: loose,
                        sha: sha.to_string(),
                    });
                }
                Ok(sha.to_ascii_lowercase())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                match self.packed_ref(refname)? {
                    Some(sha) => Ok(sha),
                    None => Err(GitReadError::OpenRef {
                        path: loose,
                        source: err,
                    }),
                }
            }
            Err(source) => Err(GitReadError::OpenRef {
                path: loose,
                source,
            }),
        }
    }

    fn packed_ref(&self, refname: &str) -> Result<Option<String>, GitReadError> {
        let path = self.git_dir.join("packed-refs");
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(GitReadError::OpenPackedRefs { path, source }),
        };

        for line in content.lines() {
            // Skip the header and peeled tag lines.
            if line.starts_with('#') || line.starts_with('^') {
                continue;
            }
            let Some((sha, name)) = line.split_once(' ') else {
                continue;
            };
            if name.trim() != refname {
                continue;
            }
            if !is_valid_sha(sha) {
                return Err(GitReadError::InvalidRefSha {
                    path,
                    sha: sha.to_string(),
                });
            }
            return Ok(Some(sha.to_ascii_lowercase()));
        }
        Ok(None)
    }
}
