use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::errors::{CorpusError, Result};
use crate::types::NoteKind;

/// Name of the configuration file stored inside the `.ccc` directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Name of the hidden directory holding corpus builder metadata.
pub const CCC_DIR: &str = ".ccc";

/// Configuration of a corpus workspace.
///
/// Paths are relative to the workspace root unless absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Schema version of the configuration.
    pub version: u32,
    /// Repository list (`url,revision` per line).
    pub repolist: String,
    /// Directory holding one checkout per listed repository.
    pub repos_dir: String,
    /// Directory receiving corpus files.
    pub corpus_dir: String,
    /// Directory receiving build-audit logs.
    pub build_notes_dir: String,
    /// Revision whose blame attributes comments.
    pub revision: String,
    /// Glob patterns for files to extract comments from.
    pub include: Vec<String>,
    /// Glob patterns for files to skip. Exclusion wins over inclusion.
    pub exclude: Vec<String>,
    /// Maximum file size in bytes; larger files are skipped.
    pub max_file_size: u64,
    /// Number of extraction workers; `None` uses the available parallelism.
    pub workers: Option<usize>,
    /// Note kinds extracted when none are requested explicitly.
    pub note_kinds: Vec<NoteKind>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            version: 1,
            repolist: "repolist.txt".to_string(),
            repos_dir: "repos".to_string(),
            corpus_dir: "corpus".to_string(),
            build_notes_dir: "build_notes".to_string(),
            revision: "HEAD".to_string(),
            include: vec![
                "**/*.py".to_string(),
                "**/*.c".to_string(),
                "**/*.h".to_string(),
                "**/*.cpp".to_string(),
                "**/*.cc".to_string(),
                "**/*.hpp".to_string(),
                "**/*.hh".to_string(),
            ],
            exclude: vec![
                ".git/**".to_string(),
                ".ccc/**".to_string(),
                "**/node_modules/**".to_string(),
                "**/__pycache__/**".to_string(),
            ],
            max_file_size: 4_194_304,
            workers: None,
            note_kinds: vec![NoteKind::Comment, NoteKind::CommitMessage],
        }
    }
}

impl CorpusConfig {
    /// Worker count to use, never less than one.
    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }

    /// Resolves a configured path against the workspace root.
    pub fn resolve(&self, workspace: &Path, configured: &str) -> PathBuf {
        let path = Path::new(configured);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            workspace.join(path)
        }
    }
}

/// Returns the path to the `.ccc` directory within the given workspace.
pub fn get_ccc_dir(workspace: &Path) -> PathBuf {
    workspace.join(CCC_DIR)
}

/// Returns the path to the configuration file within the `.ccc` directory.
pub fn get_config_path(workspace: &Path) -> PathBuf {
    get_ccc_dir(workspace).join(CONFIG_FILENAME)
}

/// Reads `.ccc/config.json`, falling back to defaults when it is absent.
pub fn load_config(workspace: &Path) -> Result<CorpusConfig> {
    let path = get_config_path(workspace);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CorpusConfig::default()),
        Err(e) => return Err(config_error("cannot read", &path, e)),
    };
    serde_json::from_str(&contents).map_err(|e| config_error("invalid JSON in", &path, e))
}

/// Writes `.ccc/config.json` through a sibling temp file and a rename.
pub fn save_config(workspace: &Path, config: &CorpusConfig) -> Result<()> {
    let path = get_config_path(workspace);
    let staged = path.with_extension("tmp");
    let json = serde_json::to_vec_pretty(config)?;

    fs::create_dir_all(get_ccc_dir(workspace))
        .and_then(|()| fs::write(&staged, json))
        .map_err(|e| config_error("cannot stage", &staged, e))?;
    fs::rename(&staged, &path).map_err(|e| config_error("cannot replace", &path, e))
}

fn config_error(action: &str, path: &Path, err: impl std::fmt::Display) -> CorpusError {
    CorpusError::Config {
        message: format!("{action} {}: {err}", path.display()),
    }
}

/// True when `file_path` matches an include glob and no exclude glob.
///
/// Malformed patterns never match.
pub fn should_include_file(file_path: &str, config: &CorpusConfig) -> bool {
    let matches_any = |patterns: &[String]| {
        patterns
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .any(|p| p.matches(file_path))
    };
    matches_any(&config.include) && !matches_any(&config.exclude)
}
