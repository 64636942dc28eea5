use ccc::corpus::*;
use ccc::types::{AnnotationRecord, Language, NoteKind};
use std::fs;
use tempfile::TempDir;

fn record(repo: &str, kind: NoteKind, tokens: Vec<Vec<&str>>) -> AnnotationRecord {
    let to_strings = |s: &Vec<&str>| s.iter().map(|w| w.to_string()).collect::<Vec<_>>();
    let is_comment = kind == NoteKind::Comment;
    AnnotationRecord {
        repo: repo.to_string(),
        authors: vec!["0123456789abcdef".to_string()],
        revisions: vec!["abcdef0".to_string()],
        note_kind: kind,
        file: is_comment.then(|| "a.py".to_string()),
        first_line: is_comment.then_some(1),
        last_line: is_comment.then_some(1),
        language: is_comment.then_some(Language::Python),
        raw: tokens.iter().flatten().cloned().collect::<Vec<_>>().join(" "),
        pos: tokens
            .iter()
            .map(|s| s.iter().map(|_| "X".to_string()).collect::<Vec<_>>())
            .collect(),
        tokens: tokens.iter().map(to_strings).collect(),
    }
}

fn sample_corpus(dir: &std::path::Path) {
    let writer = JsonCorpusWriter::new(dir);
    writer
        .write(
            "alpha",
            NoteKind::Comment,
            &[
                record("alpha", NoteKind::Comment, vec![vec!["Open", "it", "."], vec!["Then", "close"]]),
                record("alpha", NoteKind::Comment, vec![]),
            ],
        )
        .unwrap();
    writer
        .write(
            "alpha",
            NoteKind::CommitMessage,
            &[record("alpha", NoteKind::CommitMessage, vec![vec!["Fix", "bug"]])],
        )
        .unwrap();
    writer
        .write(
            "beta.io",
            NoteKind::Comment,
            &[record("beta.io", NoteKind::Comment, vec![vec!["Hello"]])],
        )
        .unwrap();
}

#[test]
fn test_file_id_round_trip() {
    let id = corpus_file_id(NoteKind::CommitMessage, "beta.io");
    assert_eq!(id, "commit-message.beta.io.json");
    let parts = parse_file_id(&id).unwrap();
    assert_eq!(parts.kind, NoteKind::CommitMessage);
    assert_eq!(parts.repo, "beta.io");
}

#[test]
fn test_parse_file_id_rejects_foreign_names() {
    assert!(parse_file_id("notes.txt").is_none());
    assert!(parse_file_id("unknown.repo.json").is_none());
    assert!(parse_file_id("comment.json").is_none());
    assert!(parse_file_id("comment..json").is_none());
}

#[test]
fn test_writer_replaces_file_atomically() {
    let dir = TempDir::new().unwrap();
    let writer = JsonCorpusWriter::new(dir.path());
    let first = [record("r", NoteKind::Comment, vec![vec!["one"]])];
    let second = [record("r", NoteKind::Comment, vec![vec!["two"]])];
    writer.write("r", NoteKind::Comment, &first).unwrap();
    writer.write("r", NoteKind::Comment, &second).unwrap();

    let path = writer.path_for("r", NoteKind::Comment);
    let stored: Vec<AnnotationRecord> =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(stored, second);
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn test_fileids_and_filters() {
    let dir = TempDir::new().unwrap();
    sample_corpus(dir.path());
    fs::write(dir.path().join("README.md"), "not corpus").unwrap();
    let reader = CorpusReader::new(dir.path());

    assert_eq!(
        reader.fileids(&CorpusFilter::default()).unwrap(),
        vec![
            "comment.alpha.json",
            "comment.beta.io.json",
            "commit-message.alpha.json"
        ]
    );
    assert_eq!(
        reader.fileids(&CorpusFilter::repo("alpha")).unwrap(),
        vec!["comment.alpha.json", "commit-message.alpha.json"]
    );
    let both = CorpusFilter {
        kinds: Some(vec![NoteKind::Comment]),
        repos: Some(vec!["beta.io".to_string()]),
    };
    assert_eq!(reader.fileids(&both).unwrap(), vec!["comment.beta.io.json"]);

    let repos: Vec<String> = reader.repos().unwrap().into_iter().collect();
    assert_eq!(repos, vec!["alpha", "beta.io"]);
    assert!(reader.kinds().unwrap().contains(&NoteKind::CommitMessage));
}

#[test]
fn test_words_sents_and_tagged_words() {
    let dir = TempDir::new().unwrap();
    sample_corpus(dir.path());
    let reader = CorpusReader::new(dir.path());
    let filter = CorpusFilter {
        kinds: Some(vec![NoteKind::Comment]),
        repos: Some(vec!["alpha".to_string()]),
    };

    assert_eq!(
        reader.words(&filter).unwrap(),
        vec!["Open", "it", ".", "Then", "close", " "]
    );
    assert_eq!(
        reader.sents(&filter).unwrap(),
        vec![
            vec!["Open", "it", "."],
            vec!["Then", "close"],
            vec![" "]
        ]
    );
    let tagged = reader.tagged_words(&filter).unwrap();
    assert_eq!(tagged.len(), 5);
    assert_eq!(tagged[0], ("Open".to_string(), "X".to_string()));
}

#[test]
fn test_stats() {
    let dir = TempDir::new().unwrap();
    sample_corpus(dir.path());
    let stats = CorpusReader::new(dir.path()).stats().unwrap();

    let find = |repo: Option<&str>, kind: Option<NoteKind>| {
        stats
            .iter()
            .find(|s| s.repo.as_deref() == repo && s.kind == kind)
            .cloned()
            .unwrap()
    };

    let alpha_comments = find(Some("alpha"), Some(NoteKind::Comment));
    assert_eq!((alpha_comments.notes, alpha_comments.sents, alpha_comments.words), (2, 3, 6));

    let alpha = find(Some("alpha"), None);
    assert_eq!((alpha.notes, alpha.sents, alpha.words), (3, 4, 8));

    let comments = find(None, Some(NoteKind::Comment));
    assert_eq!((comments.notes, comments.words), (3, 7));

    let total = stats.last().unwrap();
    assert_eq!((total.repo.as_deref(), total.kind), (None, None));
    assert_eq!((total.notes, total.sents, total.words), (4, 5, 9));
}

#[test]
fn test_reader_on_missing_directory_is_empty() {
    let dir = TempDir::new().unwrap();
    let reader = CorpusReader::new(&dir.path().join("nothing"));
    assert!(reader.fileids(&CorpusFilter::default()).unwrap().is_empty());
    assert!(reader.notes(&CorpusFilter::default()).unwrap().is_empty());
}
