//! Annotation record assembly, linguistic tagging and build-audit logs.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use parking_lot::Mutex;
use regex::Regex;

use crate::anonymize::{anonymize_id, normalize_string};
use crate::errors::{CorpusError, Result};
use crate::language::strip_comment_delimiters;
use crate::types::{AnnotationRecord, CommentBlock, CommitInfo, Language, NoteKind};

// ---------------------------------------------------------------------------
// Tagging
// ---------------------------------------------------------------------------

/// Sentence segmentation, word tokenization and part-of-speech tagging.
pub trait Tagger: Send + Sync {
    /// Splits `text` into sentences of word tokens.
    fn tokenize(&self, text: &str) -> Vec<Vec<String>>;

    /// Tags one sentence; the result is aligned with `sentence`.
    fn tag(&self, sentence: &[String]) -> Vec<String>;
}

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+(?:['’]\w+)*|[^\w\s]").expect("word pattern is valid"));

/// Placeholder tagger. It segments words and sentences properly but only
/// separates numbers (`NUM`) and punctuation (`PUNCT`) from everything else
/// (`X`), so its `pos` output is not a part-of-speech analysis. Plug a real
/// model in through [`Tagger`].
///
/// Sentences end at `.`, `!` or `?` and at blank lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoarseTagger;

impl Tagger for CoarseTagger {
    fn tokenize(&self, text: &str) -> Vec<Vec<String>> {
        let mut sentences = Vec::new();
        for paragraph in text.split("\n\n") {
            let mut current: Vec<String> = Vec::new();
            for word in WORD.find_iter(paragraph) {
                let word = word.as_str();
                current.push(word.to_string());
                if matches!(word, "." | "!" | "?") {
                    sentences.push(std::mem::take(&mut current));
                }
            }
            if !current.is_empty() {
                sentences.push(current);
            }
        }
        sentences
    }

    fn tag(&self, sentence: &[String]) -> Vec<String> {
        sentence
            .iter()
            .map(|word| {
                let tag = if word.chars().all(|c| c.is_ascii_digit()) {
                    "NUM"
                } else if word.chars().all(|c| !c.is_alphanumeric() && c != '_') {
                    "PUNCT"
                } else {
                    "X"
                };
                tag.to_string()
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Everything needed to build one annotation record.
///
/// Comment notes must carry `file`, `first_line`, `last_line` and `language`.
#[derive(Debug, Clone)]
pub struct NoteDraft {
    pub text: String,
    pub authors: Vec<String>,
    pub revisions: Vec<String>,
    pub note_kind: NoteKind,
    pub repo: String,
    pub file: Option<String>,
    pub first_line: Option<u32>,
    pub last_line: Option<u32>,
    pub language: Option<Language>,
}

/// Builds immutable annotation records and fills their linguistic fields.
pub struct AnnotationAssembler {
    tagger: Box<dyn Tagger>,
}

impl AnnotationAssembler {
    pub fn new(tagger: Box<dyn Tagger>) -> Self {
        Self { tagger }
    }

    /// Validates `draft` and turns it into a record.
    pub fn build(&self, draft: NoteDraft) -> Result<AnnotationRecord> {
        if draft.note_kind == NoteKind::Comment {
            if draft.language.is_none() {
                return Err(CorpusError::InvalidRecord {
                    message: "comment notes require a language".to_string(),
                });
            }
            if draft.first_line.is_none() || draft.last_line.is_none() || draft.file.is_none() {
                return Err(CorpusError::InvalidRecord {
                    message: "comment notes require a file and a line range".to_string(),
                });
            }
        }

        // Comments are tagged without their delimiters.
        let tagged_text = match (draft.note_kind, draft.language) {
            (NoteKind::Comment, Some(language)) => strip_comment_delimiters(&draft.text, language),
            _ => draft.text.clone(),
        };
        let tokens = self.tagger.tokenize(&tagged_text);
        let pos = tokens.iter().map(|s| self.tagger.tag(s)).collect();

        Ok(AnnotationRecord {
            repo: draft.repo,
            authors: draft.authors,
            revisions: draft.revisions,
            note_kind: draft.note_kind,
            file: draft.file,
            first_line: draft.first_line,
            last_line: draft.last_line,
            language: draft.language,
            raw: draft.text,
            tokens,
            pos,
        })
    }

    /// Builds the record of a finalized comment block.
    pub fn comment_record(
        &self,
        block: &CommentBlock,
        language: Language,
        repo: &str,
        path: &str,
    ) -> Result<AnnotationRecord> {
        self.build(NoteDraft {
            text: block.text.clone(),
            authors: block.authors.iter().cloned().collect(),
            revisions: block.revisions.iter().cloned().collect(),
            note_kind: NoteKind::Comment,
            repo: repo.to_string(),
            file: Some(path.to_string()),
            first_line: Some(block.first_line),
            last_line: Some(block.last_line),
            language: Some(language),
        })
    }

    /// Builds the record of a commit message.
    pub fn commit_record(&self, commit: &CommitInfo, repo: &str) -> Result<AnnotationRecord> {
        self.build(NoteDraft {
            text: normalize_string(&commit.message),
            authors: vec![anonymize_id(&commit.author_name)],
            revisions: vec![commit.short_id().to_string()],
            note_kind: NoteKind::CommitMessage,
            repo: repo.to_string(),
            file: None,
            first_line: None,
            last_line: None,
            language: None,
        })
    }
}

impl Default for AnnotationAssembler {
    fn default() -> Self {
        Self::new(Box::new(CoarseTagger))
    }
}

// ---------------------------------------------------------------------------
// Build audit logs
// ---------------------------------------------------------------------------

/// File receiving blocks that were excluded as code.
pub const EXCLUDED_CODE_FILE: &str = "excluded_code.txt";

/// File receiving kept blocks whose text still parses as code.
pub const INCLUDED_CODE_FILE: &str = "included_code.txt";

/// Separator written after every audit entry.
pub fn audit_separator() -> String {
    "<>".repeat(32)
}

/// Which audit log an entry goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditVerdict {
    ExcludedCode,
    IncludedCode,
}

impl AuditVerdict {
    fn file_name(&self) -> &'static str {
        match self {
            AuditVerdict::ExcludedCode => EXCLUDED_CODE_FILE,
            AuditVerdict::IncludedCode => INCLUDED_CODE_FILE,
        }
    }
}

/// Append-only logs of classifier decisions, for human review.
///
/// Shared by all workers; writes are serialized by one lock and never fail
/// the caller.
pub struct AuditLog {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log holding `verdict` entries.
    pub fn path(&self, verdict: AuditVerdict) -> PathBuf {
        self.dir.join(verdict.file_name())
    }

    /// Removes previous logs and recreates the log directory.
    pub fn reset(&self) -> Result<()> {
        let _guard = self.lock.lock();
        if self.dir.is_dir() {
            fs::remove_dir_all(&self.dir)?;
        }
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Appends `text` to the `verdict` log. Failures are logged and dropped.
    pub fn record(&self, verdict: AuditVerdict, text: &str) {
        let _guard = self.lock.lock();
        if let Err(e) = self.append(verdict, text) {
            tracing::warn!(
                log = %self.path(verdict).display(),
                error = %e,
                "failed to write build note"
            );
        }
    }

    fn append(&self, verdict: AuditVerdict, text: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(verdict))?;
        writeln!(file, "{}", text)?;
        writeln!(file, "{}", audit_separator())?;
        Ok(())
    }
}
