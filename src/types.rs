use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Programming languages comments can be extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "c")]
    C,
    #[serde(rename = "c++")]
    Cpp,
    #[serde(rename = "python")]
    Python,
}

#[allow(clippy::should_implement_trait)]
impl Language {
    /// All supported languages, in detection order.
    pub const ALL: [Language; 3] = [Language::C, Language::Cpp, Language::Python];

    /// Returns the string representation of this language.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "c++",
            Language::Python => "python",
        }
    }

    /// Parses a string into a `Language`, returning `None` for unrecognized values.
    pub fn from_str(s: &str) -> Option<Language> {
        match s {
            "c" => Some(Language::C),
            "c++" | "cpp" => Some(Language::Cpp),
            "python" => Some(Language::Python),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of notes (annotations) stored in the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoteKind {
    Comment,
    CommitMessage,
    Documentation,
}

#[allow(clippy::should_implement_trait)]
impl NoteKind {
    pub const ALL: [NoteKind; 3] = [
        NoteKind::Comment,
        NoteKind::CommitMessage,
        NoteKind::Documentation,
    ];

    /// Returns the string representation of this note kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::Comment => "comment",
            NoteKind::CommitMessage => "commit-message",
            NoteKind::Documentation => "documentation",
        }
    }

    /// Parses a string into a `NoteKind`, returning `None` for unrecognized values.
    pub fn from_str(s: &str) -> Option<NoteKind> {
        match s {
            "comment" => Some(NoteKind::Comment),
            "commit-message" => Some(NoteKind::CommitMessage),
            "documentation" => Some(NoteKind::Documentation),
            _ => None,
        }
    }
}

impl std::fmt::Display for NoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A position in a source file. Lines are 1-based, columns 0-based byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A single lexical comment as reported by a language adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub language: Language,
    pub start: Position,
    pub end: Position,
    pub text: String,
}

/// Contiguous comment tokens merged into one logical comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentBlock {
    /// Token texts joined with `\n`, in source order.
    pub text: String,
    pub first_line: u32,
    pub last_line: u32,
    /// Anonymized author ids of every line in `first_line..=last_line`.
    pub authors: BTreeSet<String>,
    /// Short revision ids of every line in `first_line..=last_line`.
    pub revisions: BTreeSet<String>,
}

/// The unit of corpus output: one piece of text plus its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub repo: String,
    pub authors: Vec<String>,
    pub revisions: Vec<String>,
    pub note_kind: NoteKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    pub raw: String,
    /// Sentences of word tokens.
    pub tokens: Vec<Vec<String>>,
    /// Part-of-speech tags aligned with `tokens`.
    pub pos: Vec<Vec<String>>,
}

/// What the extraction driver produced for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Records for every natural-language comment block (possibly none).
    Extracted(Vec<AnnotationRecord>),
    /// The file is not parseable as any supported language.
    Unparseable,
    /// Comment text could not be decoded.
    Unreadable,
    /// No line history could be obtained for the file.
    NoHistory,
}

impl FileOutcome {
    /// Consumes the outcome, returning its records (empty for skipped files).
    pub fn into_records(self) -> Vec<AnnotationRecord> {
        match self {
            FileOutcome::Extracted(records) => records,
            _ => Vec::new(),
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self, FileOutcome::Extracted(_))
    }
}

/// Commit metadata as reported by a repository provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Full hex commit id.
    pub id: String,
    pub author_name: String,
    pub message: String,
}

impl CommitInfo {
    /// First seven hex characters of the commit id.
    pub fn short_id(&self) -> &str {
        short_revision(&self.id)
    }
}

/// One physical line of a file together with the commit that last touched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameLine {
    pub commit: CommitInfo,
    pub text: String,
}

/// Truncates a hex commit id to its seven-character short form.
pub fn short_revision(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}
