//! Repository access: line history, commit log and the repository list.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use git2::{BlameOptions, Oid, Repository, Sort};
use regex::Regex;

use crate::errors::{CorpusError, Result};
use crate::types::{BlameLine, CommitInfo};

/// Source of files and version-control history for one repository.
///
/// Implementations must be shareable across extraction workers.
pub trait RepositoryProvider: Send + Sync {
    /// Repository identifier used in annotation records.
    fn name(&self) -> &str;

    /// Root of the checked-out file tree.
    fn root(&self) -> &Path;

    /// Contents of `relative_path` as stored at `revision`.
    ///
    /// Comments are tokenized from these bytes so that their line numbers
    /// address the same file version as [`Self::blame`]. Failures are
    /// reported as `CorpusError::BlameUnavailable`.
    fn read(&self, revision: &str, relative_path: &Path) -> Result<Vec<u8>>;

    /// Full line history of `relative_path` at `revision`.
    ///
    /// The result is ordered and holds exactly one element per physical
    /// line of the file at that revision. Failures are reported as
    /// `CorpusError::BlameUnavailable`.
    fn blame(&self, revision: &str, relative_path: &Path) -> Result<Vec<BlameLine>>;

    /// Commit log reachable from `revision`, newest first.
    fn commits(&self, revision: &str) -> Result<Vec<CommitInfo>>;
}

/// A git checkout on disk.
///
/// A fresh `git2::Repository` handle is opened per query so that workers
/// never contend on a shared handle.
#[derive(Debug, Clone)]
pub struct GitRepository {
    name: String,
    root: PathBuf,
}

impl GitRepository {
    /// Opens the repository at `root`, verifying that it is a git repository.
    pub fn open(name: &str, root: &Path) -> Result<Self> {
        Repository::open(root)?;
        Ok(Self {
            name: name.to_string(),
            root: root.to_path_buf(),
        })
    }

    /// Opens the repository at `root`, naming it after its directory.
    pub fn open_dir(root: &Path) -> Result<Self> {
        let name = root
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_else(|| root.to_string_lossy().to_string());
        Self::open(&name, root)
    }

    fn handle(&self) -> Result<Repository> {
        Ok(Repository::open(&self.root)?)
    }

    fn blob_at<'r>(
        repo: &'r Repository,
        commit: &git2::Commit<'r>,
        relative_path: &Path,
    ) -> Result<git2::Blob<'r>> {
        Ok(commit
            .tree()?
            .get_path(relative_path)?
            .to_object(repo)?
            .peel_to_blob()?)
    }

    fn blame_lines(&self, revision: &str, relative_path: &Path) -> Result<Vec<BlameLine>> {
        let repo = self.handle()?;
        let commit = repo.revparse_single(revision)?.peel_to_commit()?;

        let blob = Self::blob_at(&repo, &commit, relative_path)?;
        let content = String::from_utf8_lossy(blob.content()).into_owned();
        let texts: Vec<&str> = content.lines().collect();

        let mut opts = BlameOptions::new();
        opts.newest_commit(commit.id());
        let blame = repo.blame_file(relative_path, Some(&mut opts))?;

        let mut commits: HashMap<Oid, CommitInfo> = HashMap::new();
        let mut owners: Vec<Option<Oid>> = vec![None; texts.len()];
        for hunk in blame.iter() {
            let oid = hunk.final_commit_id();
            if !commits.contains_key(&oid) {
                let info = commit_info(&repo.find_commit(oid)?);
                commits.insert(oid, info);
            }
            let first = hunk.final_start_line();
            for line in first..first + hunk.lines_in_hunk() {
                match owners.get_mut(line.wrapping_sub(1)) {
                    Some(slot) => *slot = Some(oid),
                    None => {
                        return Err(self.blame_error(
                            relative_path,
                            format!("blame reports line {line} past end of file"),
                        ))
                    }
                }
            }
        }

        texts
            .iter()
            .zip(owners)
            .enumerate()
            .map(|(i, (text, owner))| {
                let commit = owner.and_then(|oid| commits.get(&oid)).ok_or_else(|| {
                    self.blame_error(relative_path, format!("no blame for line {}", i + 1))
                })?;
                Ok(BlameLine {
                    commit: commit.clone(),
                    text: text.to_string(),
                })
            })
            .collect()
    }

    fn blame_error(&self, relative_path: &Path, message: String) -> CorpusError {
        CorpusError::BlameUnavailable {
            message,
            path: relative_path.to_string_lossy().to_string(),
        }
    }
}

impl RepositoryProvider for GitRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, revision: &str, relative_path: &Path) -> Result<Vec<u8>> {
        let read_blob = || -> Result<Vec<u8>> {
            let repo = self.handle()?;
            let commit = repo.revparse_single(revision)?.peel_to_commit()?;
            let blob = Self::blob_at(&repo, &commit, relative_path)?;
            Ok(blob.content().to_vec())
        };
        read_blob().map_err(|e| self.blame_error(relative_path, e.to_string()))
    }

    fn blame(&self, revision: &str, relative_path: &Path) -> Result<Vec<BlameLine>> {
        self.blame_lines(revision, relative_path)
            .map_err(|e| match e {
                CorpusError::BlameUnavailable { .. } => e,
                other => self.blame_error(relative_path, other.to_string()),
            })
    }

    fn commits(&self, revision: &str) -> Result<Vec<CommitInfo>> {
        let repo = self.handle()?;
        let head = repo.revparse_single(revision)?.peel_to_commit()?;

        let mut revwalk = repo.revwalk()?;
        revwalk.push(head.id())?;
        revwalk.set_sorting(Sort::TIME)?;

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = repo.find_commit(oid?)?;
            commits.push(commit_info(&commit));
        }
        Ok(commits)
    }
}

fn commit_info(commit: &git2::Commit<'_>) -> CommitInfo {
    CommitInfo {
        id: commit.id().to_string(),
        author_name: commit.author().name().unwrap_or("").to_string(),
        message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
    }
}

// ---------------------------------------------------------------------------
// Repository list
// ---------------------------------------------------------------------------

static REPO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*/(.*?)\.git$").expect("repository URL pattern is valid")
});

/// One entry of the repository list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    pub url: String,
    pub revision: String,
    pub name: String,
}

impl RepoSpec {
    /// Where the checkout of this repository is expected.
    pub fn checkout_dir(&self, repos_dir: &Path) -> PathBuf {
        repos_dir.join(&self.name)
    }
}

/// Derives a repository name from its URL (`.../name.git`).
pub fn repo_name_from_url(url: &str) -> Option<&str> {
    REPO_URL
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|name| !name.is_empty())
}

/// Parses a repository list: one `url,revision` pair per line.
///
/// Lines starting with `#` and blank lines are ignored.
pub fn parse_repolist(contents: &str) -> Result<Vec<RepoSpec>> {
    let mut specs = Vec::new();
    for (i, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let [url, revision] = fields.as_slice() else {
            return Err(CorpusError::RepoList {
                message: format!("expected 'url,revision', found '{line}'"),
                line: i + 1,
            });
        };
        let name = repo_name_from_url(url).ok_or_else(|| CorpusError::RepoList {
            message: format!("could not interpret '{url}' as repository URL"),
            line: i + 1,
        })?;
        specs.push(RepoSpec {
            url: url.to_string(),
            revision: revision.to_string(),
            name: name.to_string(),
        });
    }
    Ok(specs)
}

/// Reads and parses the repository list at `path`.
pub fn load_repolist(path: &Path) -> Result<Vec<RepoSpec>> {
    let contents = fs::read_to_string(path).map_err(|e| CorpusError::File {
        message: format!("failed to read repository list: {e}"),
        path: path.display().to_string(),
    })?;
    parse_repolist(&contents)
}
