//! Disambiguation of the input directories of a `put` step.
//!
//! Concourse materializes every `put:inputs:` entry as a directory under the
//! working root. Exactly one of them must be the checkout of the configured
//! GitHub repository; when `chat_message_file` is set, exactly one other
//! directory must carry its directory component.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::dirset::DirSet;
use crate::domain::error::{GitReadError, HeraldError, ResolutionError};
use crate::git::{GitMetadataReader, GitRemote};

/// List the directories directly under `root`, sorted by name.
pub fn collect_input_dirs(root: &Path) -> Result<DirSet, ResolutionError> {
    let collect_err = |source: std::io::Error| ResolutionError::CollectDirs {
        root: root.to_path_buf(),
        source,
    };

    let mut dirs = DirSet::new();
    for entry in std::fs::read_dir(root).map_err(collect_err)? {
        let entry = entry.map_err(collect_err)?;
        if entry.file_type().map_err(collect_err)?.is_dir() {
            dirs.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(dirs)
}

/// Outcome of directory resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInputs {
    /// Name of the repository directory under the working root.
    pub repo_dir: String,
    pub remote: GitRemote,
    /// Full path of the chat message file, when one was requested.
    pub message_file: Option<PathBuf>,
}

/// Everything the sinks need to know about the checkout being reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRepo {
    pub directory_name: String,
    pub owner_from_remote: String,
    pub repo_from_remote: String,
    pub sha: String,
    /// Empty for a detached HEAD.
    pub branch: String,
}

pub struct InputResolver<'a> {
    root: &'a Path,
    owner: &'a str,
    repo: &'a str,
}

impl<'a> InputResolver<'a> {
    pub fn new(root: &'a Path, owner: &'a str, repo: &'a str) -> Self {
        Self { root, owner, repo }
    }

    /// Pick the repository directory and, for a non-empty
    /// `chat_message_file` of the form `<dir>/<file>`, the message file.
    pub fn resolve(
        &self,
        dirs: &DirSet,
        chat_message_file: &str,
    ) -> Result<ResolvedInputs, ResolutionError> {
        let mut candidates = Vec::new();
        for name in dirs.iter() {
            if let Some(remote) = self.matching_remote(name)? {
                candidates.push((name, remote));
            }
        }

        let (repo_dir, remote) = match candidates.len() {
            0 => {
                return Err(ResolutionError::MissingRepoDir {
                    have: dirs.clone(),
                    owner: self.owner.to_string(),
                    repo: self.repo.to_string(),
                })
            }
            1 => candidates.remove(0),
            _ => {
                return Err(ResolutionError::AmbiguousRepoDir {
                    have: dirs.clone(),
                    owner: self.owner.to_string(),
                    repo: self.repo.to_string(),
                })
            }
        };
        debug!(repo_dir = %repo_dir, "resolved repository directory");

        let message_file = if chat_message_file.is_empty() {
            None
        } else {
            let remaining = dirs.without(repo_dir);
            let found = chat_message_file
                .split_once('/')
                .filter(|(dir, _)| remaining.contains(dir));
            let Some((dir, file)) = found else {
                return Err(ResolutionError::MissingMessageDir {
                    have: remaining,
                    file: chat_message_file.to_string(),
                });
            };
            Some(self.root.join(dir).join(file))
        };

        Ok(ResolvedInputs {
            repo_dir: repo_dir.to_string(),
            remote,
            message_file,
        })
    }

    /// The remote of `name` when it is a git checkout of the target repo.
    fn matching_remote(&self, name: &str) -> Result<Option<GitRemote>, GitReadError> {
        let reader = GitMetadataReader::new(&self.root.join(name));
        if !reader.is_repository() {
            debug!(dir = %name, "not a git repository, skipping");
            return Ok(None);
        }
        match reader.origin()? {
            Some(remote) if remote.matches(self.owner, self.repo) => Ok(Some(remote)),
            other => {
                debug!(
                    dir = %name,
                    remote = ?other.map(|r| format!("{}/{}", r.owner, r.repo)),
                    "origin does not match, skipping"
                );
                Ok(None)
            }
        }
    }
}

/// Resolve the inputs under `root` and read the commit of the repository
/// directory.
pub fn resolve_repo(
    root: &Path,
    owner: &str,
    repo: &str,
    chat_message_file: &str,
) -> Result<(ResolvedRepo, Option<PathBuf>), HeraldError> {
    let dirs = collect_input_dirs(root)?;
    let inputs = InputResolver::new(root, owner, repo).resolve(&dirs, chat_message_file)?;
    let head = GitMetadataReader::new(&root.join(&inputs.repo_dir)).head_commit()?;

    let resolved = ResolvedRepo {
        directory_name: inputs.repo_dir,
        owner_from_remote: inputs.remote.owner,
        repo_from_remote: inputs.remote.repo,
        sha: head.sha,
        branch: head.branch.unwrap_or_default(),
    };
    Ok((resolved, inputs.message_file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const URL: &str = "https://github.com/dummy-owner/dummy-repo";

    fn make_repo(root: &Path, name: &str, url: &str) {
        let git = root.join(name).join(".git");
        fs::create_dir_all(git.join("refs/heads")).unwrap();
        fs::write(
            git.join("config"),
            format!("[remote \"origin\"]\n\turl = {url}\n"),
        )
        .unwrap();
        fs::write(git.join("HEAD"), "ref: refs/heads/main\n").unwrap();
    }

    fn resolver(root: &Path) -> InputResolver<'_> {
        InputResolver::new(root, "dummy-owner", "dummy-repo")
    }

    #[test]
    fn test_collect_input_dirs_only_directories() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("b")).unwrap();
        fs::create_dir(root.path().join("a")).unwrap();
        fs::write(root.path().join("file.txt"), "x").unwrap();

        let dirs = collect_input_dirs(root.path()).unwrap();
        assert_eq!(dirs.to_string(), "[a b]");
    }

    #[test]
    fn test_collect_input_dirs_non_existing() {
        let err = collect_input_dirs(Path::new("non-existing")).unwrap_err();
        assert!(
            err.to_string().starts_with("collecting directories in non-existing: "),
            "{err}"
        );
    }

    #[test]
    fn test_single_matching_repo() {
        let root = tempfile::tempdir().unwrap();
        make_repo(root.path(), "a-repo", URL);
        let dirs = collect_input_dirs(root.path()).unwrap();

        let inputs = resolver(root.path()).resolve(&dirs, "").unwrap();
        assert_eq!(inputs.repo_dir, "a-repo");
        assert_eq!(inputs.message_file, None);
    }

    #[test]
    fn test_no_directories() {
        let root = tempfile::tempdir().unwrap();
        let err = resolver(root.path())
            .resolve(&DirSet::new(), "")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "put:inputs: missing directory for GitHub repo: have: [], GitHub: dummy-owner/dummy-repo"
        );
    }

    #[test]
    fn test_non_repo_and_foreign_repo_are_excluded() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("plain")).unwrap();
        make_repo(root.path(), "foreign", "git@github.com:other-owner/other-repo.git");
        let dirs = collect_input_dirs(root.path()).unwrap();

        let err = resolver(root.path()).resolve(&dirs, "").unwrap_err();
        assert_eq!(
            err.to_string(),
            "put:inputs: missing directory for GitHub repo: have: [foreign plain], GitHub: dummy-owner/dummy-repo"
        );
    }

    #[test]
    fn test_two_matching_repos() {
        let root = tempfile::tempdir().unwrap();
        make_repo(root.path(), "dir-1", URL);
        make_repo(root.path(), "dir-2", URL);
        let dirs = collect_input_dirs(root.path()).unwrap();

        let err = resolver(root.path()).resolve(&dirs, "").unwrap_err();
        assert_eq!(
            err.to_string(),
            "put:inputs: want only directory for GitHub repo: have: [dir-1 dir-2], GitHub: dummy-owner/dummy-repo"
        );
    }

    #[test]
    fn test_malformed_config_is_hard_error() {
        let root = tempfile::tempdir().unwrap();
        make_repo(root.path(), "a-repo", URL);
        fs::write(root.path().join("a-repo/.git/config"), "[remote \"origin\"\n").unwrap();
        let dirs = collect_input_dirs(root.path()).unwrap();

        let err = resolver(root.path()).resolve(&dirs, "").unwrap_err();
        assert!(matches!(err, ResolutionError::GitConfig(_)), "{err}");
        assert!(err.to_string().starts_with("parsing .git/config: "));
    }

    #[test]
    fn test_repo_and_message_dir() {
        let root = tempfile::tempdir().unwrap();
        make_repo(root.path(), "a-repo", URL);
        fs::create_dir(root.path().join("msgdir")).unwrap();
        let dirs = collect_input_dirs(root.path()).unwrap();

        let inputs = resolver(root.path())
            .resolve(&dirs, "msgdir/msg.txt")
            .unwrap();
        assert_eq!(inputs.repo_dir, "a-repo");
        assert_eq!(
            inputs.message_file,
            Some(root.path().join("msgdir").join("msg.txt"))
        );
    }

    #[test]
    fn test_message_dir_not_found() {
        let root = tempfile::tempdir().unwrap();
        make_repo(root.path(), "a-repo", URL);
        fs::create_dir(root.path().join("msgdir")).unwrap();
        let dirs = collect_input_dirs(root.path()).unwrap();

        let err = resolver(root.path())
            .resolve(&dirs, "banana/msg.txt")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "put:inputs: directory for chat_message_file not found: have: [msgdir], chat_message_file: banana/msg.txt"
        );
    }

    #[test]
    fn test_message_dir_cannot_be_the_repo_dir() {
        let root = tempfile::tempdir().unwrap();
        make_repo(root.path(), "a-repo", URL);
        let dirs = collect_input_dirs(root.path()).unwrap();

        let err = resolver(root.path())
            .resolve(&dirs, "a-repo/msg.txt")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "put:inputs: directory for chat_message_file not found: have: [], chat_message_file: a-repo/msg.txt"
        );
    }

    #[test]
    fn test_resolve_repo_reads_head() {
        let root = tempfile::tempdir().unwrap();
        make_repo(root.path(), "a-repo", URL);
        let sha = "0123456789abcdef0123456789abcdef01234567";
        fs::write(root.path().join("a-repo/.git/refs/heads/main"), sha).unwrap();

        let (resolved, message_file) =
            resolve_repo(root.path(), "dummy-owner", "dummy-repo", "").unwrap();
        assert_eq!(resolved.directory_name, "a-repo");
        assert_eq!(resolved.owner_from_remote, "dummy-owner");
        assert_eq!(resolved.repo_from_remote, "dummy-repo");
        assert_eq!(resolved.sha, sha);
        assert_eq!(resolved.branch, "main");
        assert_eq!(message_file, None);
    }

    #[test]
    fn test_resolve_repo_broken_checkout() {
        let root = tempfile::tempdir().unwrap();
        make_repo(root.path(), "a-repo", URL);

        let err = resolve_repo(root.path(), "dummy-owner", "dummy-repo", "").unwrap_err();
        assert!(
            err.to_string()
                .starts_with("git commit: branch checkout: read SHA file: open "),
            "{err}"
        );
    }
}
