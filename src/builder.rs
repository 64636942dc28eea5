use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::annotate::AuditLog;
use crate::config::{get_config_path, load_config, save_config, CorpusConfig};
use crate::corpus::{CorpusReader, CorpusStats, CorpusWriter, JsonCorpusWriter};
use crate::errors::{CorpusError, Result};
use crate::extract::CommentExtractor;
use crate::repo::{load_repolist, GitRepository, RepoSpec, RepositoryProvider};
use crate::types::NoteKind;

/// Drives corpus builds for one workspace.
///
/// A workspace holds the `.ccc` configuration, the repository list, the
/// repository checkouts, the corpus and the build notes.
pub struct CorpusBuilder {
    config: CorpusConfig,
    workspace: PathBuf,
}

/// Per-repository result of a build.
#[derive(Debug, Clone, Serialize)]
pub struct RepoSummary {
    pub repo: String,
    pub note_kind: NoteKind,
    pub records: usize,
}

/// Result of a corpus build.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildSummary {
    /// Repositories that were processed.
    pub repos: usize,
    /// Repositories skipped because no checkout was found.
    pub skipped: Vec<String>,
    pub files: Vec<RepoSummary>,
    pub duration_ms: u64,
}

impl BuildSummary {
    pub fn total_records(&self) -> usize {
        self.files.iter().map(|f| f.records).sum()
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

impl CorpusBuilder {
    /// Initializes a workspace by writing the default configuration.
    pub fn init(workspace: &Path) -> Result<Self> {
        let config = CorpusConfig::default();
        save_config(workspace, &config)?;
        Ok(Self {
            config,
            workspace: workspace.to_path_buf(),
        })
    }

    /// Opens an initialized workspace.
    pub fn open(workspace: &Path) -> Result<Self> {
        if !Self::is_initialized(workspace) {
            return Err(CorpusError::Config {
                message: format!(
                    "no corpus workspace found at '{}'; run 'ccc init' first",
                    workspace.display()
                ),
            });
        }
        Ok(Self {
            config: load_config(workspace)?,
            workspace: workspace.to_path_buf(),
        })
    }

    /// Creates a builder over an explicit configuration without touching disk.
    pub fn with_config(workspace: &Path, config: CorpusConfig) -> Self {
        Self {
            config,
            workspace: workspace.to_path_buf(),
        }
    }

    pub fn is_initialized(workspace: &Path) -> bool {
        get_config_path(workspace).exists()
    }

    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    pub fn corpus_dir(&self) -> PathBuf {
        self.config.resolve(&self.workspace, &self.config.corpus_dir)
    }

    pub fn repos_dir(&self) -> PathBuf {
        self.config.resolve(&self.workspace, &self.config.repos_dir)
    }

    pub fn build_notes_dir(&self) -> PathBuf {
        self.config
            .resolve(&self.workspace, &self.config.build_notes_dir)
    }

    pub fn reader(&self) -> CorpusReader {
        CorpusReader::new(&self.corpus_dir())
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

impl CorpusBuilder {
    /// Builds the corpus for every repository in the repository list.
    ///
    /// Repositories without a checkout under the repos directory are skipped
    /// with a warning. An empty `kinds` uses the configured note kinds.
    pub fn extract(&self, kinds: &[NoteKind], build_notes: bool) -> Result<BuildSummary> {
        let start = Instant::now();
        let repolist = self.config.resolve(&self.workspace, &self.config.repolist);
        let specs = load_repolist(&repolist)?;
        let kinds = self.requested_kinds(kinds);

        if build_notes && kinds.contains(&NoteKind::Comment) {
            AuditLog::new(&self.build_notes_dir()).reset()?;
        }

        let mut summary = BuildSummary::default();
        for spec in &specs {
            let checkout = spec.checkout_dir(&self.repos_dir());
            if !checkout.join(".git").exists() {
                tracing::warn!(
                    repo = %spec.name,
                    path = %checkout.display(),
                    "no checkout found, skipping repository"
                );
                summary.skipped.push(spec.name.clone());
                continue;
            }
            let repo = GitRepository::open(&spec.name, &checkout)?;
            summary
                .files
                .extend(self.extract_repository(&repo, Some(spec), &kinds, build_notes)?);
            summary.repos += 1;
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            repos = summary.repos,
            skipped = summary.skipped.len(),
            records = summary.total_records(),
            "corpus build finished"
        );
        Ok(summary)
    }

    /// Builds the corpus files of a single repository.
    ///
    /// `spec` overrides the configured revision when given.
    pub fn extract_repository(
        &self,
        repo: &dyn RepositoryProvider,
        spec: Option<&RepoSpec>,
        kinds: &[NoteKind],
        build_notes: bool,
    ) -> Result<Vec<RepoSummary>> {
        let mut config = self.config.clone();
        if let Some(spec) = spec {
            config.revision = spec.revision.clone();
        }
        let extractor = CommentExtractor::new(config, &self.build_notes_dir());
        let writer = JsonCorpusWriter::new(&self.corpus_dir());

        let mut summaries = Vec::new();
        for kind in self.requested_kinds(kinds) {
            let records = match kind {
                NoteKind::Comment => extractor.extract_repository_comments(repo, build_notes)?,
                NoteKind::CommitMessage => extractor.extract_commit_messages(repo)?,
                NoteKind::Documentation => {
                    tracing::warn!(repo = repo.name(), "documentation notes are not extracted");
                    continue;
                }
            };
            writer.write(repo.name(), kind, &records)?;
            summaries.push(RepoSummary {
                repo: repo.name().to_string(),
                note_kind: kind,
                records: records.len(),
            });
        }
        Ok(summaries)
    }

    /// Corpus statistics of the workspace.
    pub fn stats(&self) -> Result<Vec<CorpusStats>> {
        self.reader().stats()
    }

    fn requested_kinds(&self, kinds: &[NoteKind]) -> Vec<NoteKind> {
        let source: &[NoteKind] = if kinds.is_empty() {
            &self.config.note_kinds
        } else {
            kinds
        };
        let mut unique = Vec::new();
        for kind in source {
            if !unique.contains(kind) {
                unique.push(*kind);
            }
        }
        unique
    }
}
