use std::path::Path;

use crate::errors::{CorpusError, Result};
use crate::repo::RepositoryProvider;

/// Attribution of one physical line of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameEntry {
    /// 1-based line number.
    pub line: u32,
    /// Display name of the author of the last commit touching the line.
    pub author: String,
    /// Full hex id of that commit.
    pub revision: String,
    /// Text of the line at the queried revision.
    pub text: String,
}

/// Line-indexed view of a file's blame at one revision.
///
/// Built once per file from a single line-history query and read-only
/// afterwards. Lines are addressed 1-based: entry `i` is physical line `i`.
#[derive(Debug, Clone)]
pub struct BlameIndex {
    revision: String,
    path: String,
    entries: Vec<BlameEntry>,
}

impl BlameIndex {
    /// Runs the line-history query for `relative_path` at `revision` and
    /// indexes the result.
    pub fn build(
        repo: &dyn RepositoryProvider,
        revision: &str,
        relative_path: &Path,
    ) -> Result<Self> {
        let lines = repo.blame(revision, relative_path)?;
        let entries = lines
            .into_iter()
            .enumerate()
            .map(|(i, blame_line)| BlameEntry {
                line: i as u32 + 1,
                author: blame_line.commit.author_name,
                revision: blame_line.commit.id,
                text: blame_line.text,
            })
            .collect();

        tracing::trace!(path = %relative_path.display(), revision, "built blame index");

        Ok(Self {
            revision: revision.to_string(),
            path: relative_path.to_string_lossy().to_string(),
            entries,
        })
    }

    /// Creates an index directly from entries. Entry `i` must describe line `i + 1`.
    pub fn from_entries(revision: &str, path: &str, entries: Vec<BlameEntry>) -> Self {
        Self {
            revision: revision.to_string(),
            path: path.to_string(),
            entries,
        }
    }

    /// Number of lines in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entry of 1-based `line`.
    pub fn index(&self, line: i64) -> Result<&BlameEntry> {
        let pos = self.checked_position(line)?;
        Ok(&self.entries[pos])
    }

    /// Returns the entries whose line number is in `start..end`.
    ///
    /// `start` must be a valid line; `end` is clamped to one past the last
    /// line, and an `end` at or before `start` yields an empty slice.
    pub fn slice(&self, start: i64, end: i64) -> Result<&[BlameEntry]> {
        let from = self.checked_position(start)?;
        if end <= start {
            return Ok(&[]);
        }
        let to = ((end - 1) as usize).min(self.entries.len());
        Ok(&self.entries[from..to])
    }

    /// Returns the first entry whose line text contains `needle`.
    pub fn search(&self, needle: &str) -> Option<&BlameEntry> {
        self.entries.iter().find(|e| e.text.contains(needle))
    }

    /// Returns all entries whose line text contains `needle`.
    pub fn find_all(&self, needle: &str) -> Vec<&BlameEntry> {
        self.entries
            .iter()
            .filter(|e| e.text.contains(needle))
            .collect()
    }

    pub fn entries(&self) -> &[BlameEntry] {
        &self.entries
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Maps a 1-based line to a vector position.
    fn checked_position(&self, line: i64) -> Result<usize> {
        if line < 1 || line as u64 > self.entries.len() as u64 {
            return Err(CorpusError::IndexOutOfRange {
                index: line,
                len: self.entries.len(),
            });
        }
        Ok(line as usize - 1)
    }
}
