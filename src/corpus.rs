//! Corpus files: one JSON file per (note kind, repository) pair.
//!
//! File ids have the form `<note-kind>.<repo>.json`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::{CorpusError, Result};
use crate::types::{AnnotationRecord, NoteKind};

const CORPUS_EXTENSION: &str = "json";

/// Sink for the records of one repository and note kind.
pub trait CorpusWriter {
    fn write(&self, repo: &str, kind: NoteKind, records: &[AnnotationRecord]) -> Result<()>;
}

/// Returns the corpus file id for `kind` records of `repo`.
pub fn corpus_file_id(kind: NoteKind, repo: &str) -> String {
    format!("{}.{}.{}", kind.as_str(), repo, CORPUS_EXTENSION)
}

/// Components of a corpus file id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdParts {
    pub kind: NoteKind,
    pub repo: String,
}

/// Splits a corpus file id into its note kind and repository.
pub fn parse_file_id(file_id: &str) -> Option<FileIdParts> {
    let stem = file_id.strip_suffix(CORPUS_EXTENSION)?.strip_suffix('.')?;
    let (kind, repo) = stem.split_once('.')?;
    if repo.is_empty() {
        return None;
    }
    Some(FileIdParts {
        kind: NoteKind::from_str(kind)?,
        repo: repo.to_string(),
    })
}

/// Writes records as pretty-printed JSON arrays, atomically.
pub struct JsonCorpusWriter {
    dir: PathBuf,
}

impl JsonCorpusWriter {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path_for(&self, repo: &str, kind: NoteKind) -> PathBuf {
        self.dir.join(corpus_file_id(kind, repo))
    }
}

impl CorpusWriter for JsonCorpusWriter {
    fn write(&self, repo: &str, kind: NoteKind, records: &[AnnotationRecord]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(repo, kind);
        let tmp_path = path.with_extension("tmp");
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&tmp_path, json).map_err(|e| CorpusError::File {
            message: format!("failed to write corpus file: {e}"),
            path: tmp_path.display().to_string(),
        })?;
        fs::rename(&tmp_path, &path)?;
        tracing::debug!(path = %path.display(), records = records.len(), "wrote corpus file");
        Ok(())
    }
}

/// Selects a sub-corpus. `None` means no restriction.
#[derive(Debug, Clone, Default)]
pub struct CorpusFilter {
    pub kinds: Option<Vec<NoteKind>>,
    pub repos: Option<Vec<String>>,
}

impl CorpusFilter {
    pub fn kind(kind: NoteKind) -> Self {
        Self {
            kinds: Some(vec![kind]),
            repos: None,
        }
    }

    pub fn repo(repo: &str) -> Self {
        Self {
            kinds: None,
            repos: Some(vec![repo.to_string()]),
        }
    }

    fn accepts(&self, parts: &FileIdParts) -> bool {
        self.kinds.as_ref().is_none_or(|k| k.contains(&parts.kind))
            && self.repos.as_ref().is_none_or(|r| r.contains(&parts.repo))
    }
}

/// Word, sentence and note counts of a sub-corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub repo: Option<String>,
    pub kind: Option<NoteKind>,
    pub words: usize,
    pub sents: usize,
    pub notes: usize,
}

/// Read access to a corpus directory.
pub struct CorpusReader {
    dir: PathBuf,
}

impl CorpusReader {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Sorted ids of the corpus files matching `filter`.
    pub fn fileids(&self, filter: &CorpusFilter) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name().to_string_lossy().to_string();
            if let Some(parts) = parse_file_id(&name) {
                if filter.accepts(&parts) {
                    ids.push(name);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Repositories present in the corpus.
    pub fn repos(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .fileids(&CorpusFilter::default())?
            .iter()
            .filter_map(|id| parse_file_id(id))
            .map(|p| p.repo)
            .collect())
    }

    /// Note kinds present in the corpus.
    pub fn kinds(&self) -> Result<BTreeSet<NoteKind>> {
        Ok(self
            .fileids(&CorpusFilter::default())?
            .iter()
            .filter_map(|id| parse_file_id(id))
            .map(|p| p.kind)
            .collect())
    }

    /// All records of the files matching `filter`, in file id order.
    pub fn notes(&self, filter: &CorpusFilter) -> Result<Vec<AnnotationRecord>> {
        let mut notes = Vec::new();
        for id in self.fileids(filter)? {
            let path = self.dir.join(&id);
            let contents = fs::read_to_string(&path)?;
            let records: Vec<AnnotationRecord> =
                serde_json::from_str(&contents).map_err(|e| CorpusError::Parse {
                    message: e.to_string(),
                    path: path.display().to_string(),
                })?;
            notes.extend(records);
        }
        Ok(notes)
    }

    /// All word tokens. A note without tokens contributes one blank word.
    pub fn words(&self, filter: &CorpusFilter) -> Result<Vec<String>> {
        Ok(self.notes(filter)?.iter().flat_map(note_words).collect())
    }

    /// All sentences. A note without tokens contributes one blank sentence.
    pub fn sents(&self, filter: &CorpusFilter) -> Result<Vec<Vec<String>>> {
        Ok(self.notes(filter)?.iter().flat_map(note_sents).collect())
    }

    /// `(word, tag)` pairs of every tagged word.
    pub fn tagged_words(&self, filter: &CorpusFilter) -> Result<Vec<(String, String)>> {
        let mut pairs = Vec::new();
        for note in self.notes(filter)? {
            for (sentence, tags) in note.tokens.iter().zip(&note.pos) {
                pairs.extend(sentence.iter().cloned().zip(tags.iter().cloned()));
            }
        }
        Ok(pairs)
    }

    /// Counts per (repo, kind), per repo, per kind, and for the whole corpus,
    /// in that order.
    pub fn stats(&self) -> Result<Vec<CorpusStats>> {
        let notes = self.notes(&CorpusFilter::default())?;

        let mut by_pair: BTreeMap<(String, NoteKind), CorpusStats> = BTreeMap::new();
        let mut by_repo: BTreeMap<String, CorpusStats> = BTreeMap::new();
        let mut by_kind: BTreeMap<NoteKind, CorpusStats> = BTreeMap::new();
        let mut total = CorpusStats::default();

        for note in &notes {
            let words = note_words(note).len();
            let sents = note_sents(note).len();
            add(
                by_pair
                    .entry((note.repo.clone(), note.note_kind))
                    .or_insert_with(|| CorpusStats {
                        repo: Some(note.repo.clone()),
                        kind: Some(note.note_kind),
                        ..Default::default()
                    }),
                words,
                sents,
            );
            add(
                by_repo.entry(note.repo.clone()).or_insert_with(|| CorpusStats {
                    repo: Some(note.repo.clone()),
                    ..Default::default()
                }),
                words,
                sents,
            );
            add(
                by_kind.entry(note.note_kind).or_insert_with(|| CorpusStats {
                    kind: Some(note.note_kind),
                    ..Default::default()
                }),
                words,
                sents,
            );
            add(&mut total, words, sents);
        }

        Ok(by_pair
            .into_values()
            .chain(by_repo.into_values())
            .chain(by_kind.into_values())
            .chain(std::iter::once(total))
            .collect())
    }
}

fn add(stats: &mut CorpusStats, words: usize, sents: usize) {
    stats.words += words;
    stats.sents += sents;
    stats.notes += 1;
}

fn note_words(note: &AnnotationRecord) -> Vec<String> {
    let words: Vec<String> = note.tokens.iter().flatten().cloned().collect();
    if words.is_empty() {
        vec![" ".to_string()]
    } else {
        words
    }
}

fn note_sents(note: &AnnotationRecord) -> Vec<Vec<String>> {
    if note.tokens.iter().all(|s| s.is_empty()) {
        vec![vec![" ".to_string()]]
    } else {
        note.tokens.clone()
    }
}
