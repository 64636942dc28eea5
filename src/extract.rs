//! Per-file comment extraction and the repository-wide worker pool.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;

use crossbeam::channel;
use walkdir::WalkDir;

use crate::annotate::{AnnotationAssembler, AuditLog, AuditVerdict};
use crate::blame::BlameIndex;
use crate::classify::{is_probably_code_with, trim_comment_as_code};
use crate::config::{should_include_file, CorpusConfig};
use crate::errors::{CorpusError, Result};
use crate::grouper::group_tokens;
use crate::language::{validate_source_text, LanguageAdapter, LanguageRegistry};
use crate::repo::RepositoryProvider;
use crate::types::{AnnotationRecord, CommentBlock, FileOutcome};

/// Extracts annotation records from repositories.
///
/// Owns the language registry, the record assembler and the audit log; all
/// three are shared read-only by the extraction workers.
pub struct CommentExtractor {
    config: CorpusConfig,
    registry: LanguageRegistry,
    assembler: AnnotationAssembler,
    audit: AuditLog,
}

impl CommentExtractor {
    /// Creates an extractor writing audit logs to `audit_dir`.
    pub fn new(config: CorpusConfig, audit_dir: &Path) -> Self {
        Self {
            config,
            registry: LanguageRegistry::new(),
            assembler: AnnotationAssembler::default(),
            audit: AuditLog::new(audit_dir),
        }
    }

    /// Replaces the record assembler (and with it the tagger).
    pub fn with_assembler(mut self, assembler: AnnotationAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    // -----------------------------------------------------------------------
    // Coordinator
    // -----------------------------------------------------------------------

    /// Extracts the natural-language comments of every file in `repo`.
    ///
    /// Files are processed by a pool of workers pulling from a shared queue.
    /// Each result lands in the slot of its file's discovery index, so the
    /// output order does not depend on scheduling. A blame index contract
    /// violation in any file fails the whole repository.
    pub fn extract_repository_comments(
        &self,
        repo: &dyn RepositoryProvider,
        write_audit_logs: bool,
    ) -> Result<Vec<AnnotationRecord>> {
        let start = Instant::now();
        let files = self.discover_files(repo.root());
        let workers = self.config.worker_count().min(files.len().max(1));

        tracing::info!(
            repo = repo.name(),
            files = files.len(),
            workers,
            "extracting comments"
        );

        let slots: Vec<OnceLock<Result<FileOutcome>>> =
            (0..files.len()).map(|_| OnceLock::new()).collect();

        let (sender, receiver) = channel::unbounded::<(usize, &Path)>();
        for (index, path) in files.iter().enumerate() {
            // The receiver is alive until the end of this function.
            let _ = sender.send((index, path.as_path()));
        }
        drop(sender);

        std::thread::scope(|scope| {
            for worker in 0..workers {
                let receiver = receiver.clone();
                let slots = &slots;
                scope.spawn(move || {
                    while let Ok((index, path)) = receiver.recv() {
                        tracing::debug!(worker, index, path = %path.display(), "claimed file");
                        let outcome = self.extract_file(repo, path, write_audit_logs);
                        if slots[index].set(outcome).is_err() {
                            tracing::error!(index, "file slot written twice");
                        }
                    }
                });
            }
        });

        let mut records = Vec::new();
        for (slot, path) in slots.into_iter().zip(&files) {
            let outcome = slot.into_inner().ok_or_else(|| CorpusError::File {
                message: "file was never processed".to_string(),
                path: path.display().to_string(),
            })??;
            records.extend(outcome.into_records());
        }

        tracing::info!(
            repo = repo.name(),
            records = records.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "finished extracting comments"
        );
        Ok(records)
    }

    /// Lists the files of the tree at `root` that pass the include/exclude
    /// filters and the size limit, relative to `root`, in a deterministic
    /// order.
    pub fn discover_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git")
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let rel_str = relative.to_string_lossy().replace('\\', "/");
            if !should_include_file(&rel_str, &self.config) {
                continue;
            }
            match entry.metadata() {
                Ok(metadata) if metadata.len() <= self.config.max_file_size => {
                    files.push(relative.to_path_buf());
                }
                Ok(_) => tracing::debug!(path = %rel_str, "skipping oversized file"),
                Err(_) => continue,
            }
        }
        files
    }

    // -----------------------------------------------------------------------
    // Driver
    // -----------------------------------------------------------------------

    /// Extracts the natural-language comments of one file, as stored at the
    /// configured revision.
    ///
    /// Unparseable, undecodable and untracked files yield a skipped outcome
    /// rather than an error. Only a blame index contract violation (or an
    /// unexpected I/O failure) is returned as `Err`.
    pub fn extract_file(
        &self,
        repo: &dyn RepositoryProvider,
        relative_path: &Path,
        write_audit_logs: bool,
    ) -> Result<FileOutcome> {
        let rel_str = relative_path.to_string_lossy().replace('\\', "/");

        // Tokens and blame must describe the same version of the file.
        let source = match repo.read(&self.config.revision, relative_path) {
            Ok(s) => s,
            Err(e @ CorpusError::BlameUnavailable { .. }) => {
                tracing::warn!(path = %rel_str, error = %e, "skipping file absent from revision");
                return Ok(FileOutcome::NoHistory);
            }
            Err(e) => return Err(e),
        };

        let Some(adapter) = self.registry.detect_source_adapter(relative_path, &source) else {
            tracing::debug!(path = %rel_str, "not parseable as a supported language");
            return Ok(FileOutcome::Unparseable);
        };

        let tokens = match adapter.extract_tokens(&rel_str, &source) {
            Ok(tokens) => tokens,
            Err(e @ CorpusError::Tokenization { .. }) => {
                tracing::debug!(path = %rel_str, error = %e, "skipping undecodable file");
                return Ok(FileOutcome::Unreadable);
            }
            Err(e @ CorpusError::Parse { .. }) => {
                tracing::debug!(path = %rel_str, error = %e, "skipping unparseable file");
                return Ok(FileOutcome::Unparseable);
            }
            Err(e) => return Err(e),
        };

        if tokens.is_empty() {
            return Ok(FileOutcome::Extracted(Vec::new()));
        }

        let blame = match BlameIndex::build(repo, &self.config.revision, relative_path) {
            Ok(blame) => blame,
            Err(e @ CorpusError::BlameUnavailable { .. }) => {
                tracing::warn!(path = %rel_str, error = %e, "skipping file without history");
                return Ok(FileOutcome::NoHistory);
            }
            Err(e) => return Err(e),
        };

        let blocks = group_tokens(&tokens, &blame)?;
        let mut records = Vec::with_capacity(blocks.len());
        for block in &blocks {
            let is_code = is_probably_code_with(&block.text, adapter);
            if write_audit_logs {
                self.audit_block(block, adapter, is_code);
            }
            if !is_code {
                records.push(self.assembler.comment_record(
                    block,
                    adapter.language(),
                    repo.name(),
                    &rel_str,
                )?);
            }
        }

        tracing::debug!(
            path = %rel_str,
            tokens = tokens.len(),
            blocks = blocks.len(),
            records = records.len(),
            "extracted file"
        );
        Ok(FileOutcome::Extracted(records))
    }

    fn audit_block(&self, block: &CommentBlock, adapter: &dyn LanguageAdapter, is_code: bool) {
        if is_code {
            self.audit.record(AuditVerdict::ExcludedCode, &block.text);
        } else if validate_source_text(&trim_comment_as_code(&block.text, adapter), None).is_some()
        {
            self.audit.record(AuditVerdict::IncludedCode, &block.text);
        }
    }

    // -----------------------------------------------------------------------
    // Commit messages
    // -----------------------------------------------------------------------

    /// Emits one record per commit with a non-empty message.
    pub fn extract_commit_messages(
        &self,
        repo: &dyn RepositoryProvider,
    ) -> Result<Vec<AnnotationRecord>> {
        let commits = repo.commits(&self.config.revision)?;
        let records = commits
            .iter()
            .filter(|c| !c.message.is_empty())
            .map(|c| self.assembler.commit_record(c, repo.name()))
            .collect::<Result<Vec<_>>>()?;
        tracing::info!(
            repo = repo.name(),
            commits = commits.len(),
            records = records.len(),
            "extracted commit messages"
        );
        Ok(records)
    }
}
