use std::fs;
use std::path::Path;

use ccc::anonymize::anonymize_id;
use ccc::builder::CorpusBuilder;
use ccc::config::{save_config, CorpusConfig};
use ccc::corpus::{CorpusFilter, CorpusReader};
use ccc::errors::CorpusError;
use ccc::extract::CommentExtractor;
use ccc::repo::{GitRepository, RepositoryProvider};
use ccc::types::{Language, NoteKind};
use git2::{Repository, Signature};
use tempfile::TempDir;

/// Writes `files` into the repository and commits them as `author`.
fn commit(repo: &Repository, author: &str, files: &[(&str, &str)], message: &str) -> String {
    let root = repo.workdir().unwrap().to_path_buf();
    let mut index = repo.index().unwrap();
    for (rel, contents) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        index.add_path(Path::new(rel)).unwrap();
    }
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now(author, &format!("{}@example.com", author.to_lowercase())).unwrap();
    let parents = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().unwrap()],
        Err(_) => Vec::new(),
    };
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
        .unwrap()
        .to_string()
}

const FIRST: &str = "\
import sys

# Parse the command line
# and dispatch to a handler
args = sys.argv
";

const SECOND: &str = "\
import sys

# Parse the command line
# and dispatch to a handler
# for the requested action
args = sys.argv
";

#[test]
fn test_blame_attributes_lines_to_commits() {
    let dir = TempDir::new().unwrap();
    let git = Repository::init(dir.path()).unwrap();
    let first = commit(&git, "Alice", &[("cli.py", FIRST)], "Add cli");
    let second = commit(&git, "Bob", &[("cli.py", SECOND)], "Extend cli comment");

    let repo = GitRepository::open("demo", dir.path()).unwrap();
    let lines = repo.blame("HEAD", Path::new("cli.py")).unwrap();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[2].commit.id, first);
    assert_eq!(lines[4].commit.id, second);
    assert_eq!(lines[4].commit.author_name, "Bob");
    assert_eq!(lines[4].text, "# for the requested action");

    let commits = repo.commits("HEAD").unwrap();
    let ids: Vec<&str> = commits.iter().map(|c| c.id.as_str()).collect();
    assert!(ids.contains(&first.as_str()));
    assert!(ids.contains(&second.as_str()));
}

#[test]
fn test_blame_of_untracked_file_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let git = Repository::init(dir.path()).unwrap();
    commit(&git, "Alice", &[("cli.py", FIRST)], "Add cli");
    fs::write(dir.path().join("scratch.py"), "# scratch\n").unwrap();

    let repo = GitRepository::open("demo", dir.path()).unwrap();
    assert!(matches!(
        repo.blame("HEAD", Path::new("scratch.py")),
        Err(CorpusError::BlameUnavailable { .. })
    ));
}

#[test]
fn test_extract_from_git_repository() {
    let dir = TempDir::new().unwrap();
    let git = Repository::init(dir.path()).unwrap();
    let first = commit(&git, "Alice", &[("cli.py", FIRST)], "Add cli");
    let second = commit(&git, "Bob", &[("cli.py", SECOND)], "Extend cli comment");
    fs::write(dir.path().join("scratch.py"), "# not committed\n").unwrap();

    let repo = GitRepository::open("demo", dir.path()).unwrap();
    let notes = TempDir::new().unwrap();
    let extractor = CommentExtractor::new(CorpusConfig::default(), notes.path());

    let records = extractor.extract_repository_comments(&repo, false).unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.repo, "demo");
    assert_eq!(record.language, Some(Language::Python));
    assert_eq!((record.first_line, record.last_line), (Some(3), Some(5)));

    let mut authors = vec![anonymize_id("Alice"), anonymize_id("Bob")];
    authors.sort();
    assert_eq!(record.authors, authors);
    let mut revisions = vec![first[..7].to_string(), second[..7].to_string()];
    revisions.sort();
    assert_eq!(record.revisions, revisions);

    let messages = extractor.extract_commit_messages(&repo).unwrap();
    let raws: Vec<&str> = messages.iter().map(|r| r.raw.as_str()).collect();
    assert_eq!(messages.len(), 2);
    assert!(raws.contains(&"Add cli"));
    assert!(raws.contains(&"Extend cli comment"));
}

#[test]
fn test_builder_extracts_listed_repositories() {
    let workspace = TempDir::new().unwrap();
    let ws = workspace.path();
    let checkout = ws.join("repos").join("tool");
    fs::create_dir_all(&checkout).unwrap();
    let git = Repository::init(&checkout).unwrap();
    commit(&git, "Alice", &[("cli.py", FIRST)], "Add cli");

    fs::write(
        ws.join("repolist.txt"),
        "# repositories\nhttps://example.com/org/tool.git,HEAD\nhttps://example.com/org/absent.git,main\n",
    )
    .unwrap();
    let builder = CorpusBuilder::init(ws).unwrap();

    let summary = builder.extract(&[], true).unwrap();
    assert_eq!(summary.repos, 1);
    assert_eq!(summary.skipped, vec!["absent"]);
    assert_eq!(summary.total_records(), 2);
    assert!(builder.build_notes_dir().is_dir());

    let reader = CorpusReader::new(&builder.corpus_dir());
    assert_eq!(
        reader.fileids(&CorpusFilter::default()).unwrap(),
        vec!["comment.tool.json", "commit-message.tool.json"]
    );
    let comments = reader.notes(&CorpusFilter::kind(NoteKind::Comment)).unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].raw, "# Parse the command line\n# and dispatch to a handler");
}

#[test]
fn test_builder_open_requires_init() {
    let workspace = TempDir::new().unwrap();
    assert!(matches!(
        CorpusBuilder::open(workspace.path()),
        Err(CorpusError::Config { .. })
    ));
    save_config(workspace.path(), &CorpusConfig::default()).unwrap();
    assert!(CorpusBuilder::open(workspace.path()).is_ok());
}

#[test]
fn test_extract_at_older_revision_uses_that_revision() {
    let dir = TempDir::new().unwrap();
    let git = Repository::init(dir.path()).unwrap();
    let first = commit(
        &git,
        "Alice",
        &[("a.py", "# one\nx = 1\n"), ("b.py", "# fine\ny = 2\n")],
        "Add modules",
    );
    commit(&git, "Bob", &[("a.py", "x = 1\n\n\n# one\n")], "Move comment");

    let repo = GitRepository::open("demo", dir.path()).unwrap();
    assert_eq!(repo.read(&first, Path::new("a.py")).unwrap(), b"# one\nx = 1\n");

    let notes = TempDir::new().unwrap();
    let config = CorpusConfig {
        revision: first.clone(),
        ..CorpusConfig::default()
    };
    let records = CommentExtractor::new(config, notes.path())
        .extract_repository_comments(&repo, false)
        .unwrap();

    let found: Vec<(Option<&str>, Option<u32>)> = records
        .iter()
        .map(|r| (r.file.as_deref(), r.first_line))
        .collect();
    assert_eq!(found, vec![(Some("a.py"), Some(1)), (Some("b.py"), Some(1))]);
    assert_eq!(records[0].authors, vec![anonymize_id("Alice")]);
    assert_eq!(records[0].revisions, vec![first[..7].to_string()]);
}

#[test]
fn test_uncommitted_edits_do_not_shift_lines() {
    let dir = TempDir::new().unwrap();
    let git = Repository::init(dir.path()).unwrap();
    commit(
        &git,
        "Alice",
        &[("a.py", "# one\nx = 1\n"), ("b.py", "# fine\ny = 2\n")],
        "Add modules",
    );
    fs::write(dir.path().join("b.py"), "y = 2\n\n\n\n# edited\n").unwrap();

    let repo = GitRepository::open("demo", dir.path()).unwrap();
    let notes = TempDir::new().unwrap();
    let records = CommentExtractor::new(CorpusConfig::default(), notes.path())
        .extract_repository_comments(&repo, false)
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[1].file.as_deref(), Some("b.py"));
    assert_eq!(records[1].raw, "# fine");
    assert_eq!(records[1].first_line, Some(1));
}

#[test]
fn test_read_of_untracked_file_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let git = Repository::init(dir.path()).unwrap();
    commit(&git, "Alice", &[("cli.py", FIRST)], "Add cli");

    let repo = GitRepository::open("demo", dir.path()).unwrap();
    assert!(matches!(
        repo.read("HEAD", Path::new("scratch.py")),
        Err(CorpusError::BlameUnavailable { .. })
    ));
}
