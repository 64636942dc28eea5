//! Tree-sitter based language adapters.
//!
//! Each adapter knows how to confirm that a file is written in its language,
//! how to pull comment tokens out of it, and how to strip its comment
//! delimiters from comment text.
mod c_family;
mod python;

use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use tree_sitter::{Parser, Tree};

pub use c_family::CFamilyAdapter;
pub use python::PythonAdapter;

use crate::errors::{CorpusError, Result};
use crate::types::{Language, Position, Token};

/// Node kind used for comments by every supported grammar.
const COMMENT_KIND: &str = "comment";

/// Per-language strategy used by the extraction pipeline.
pub trait LanguageAdapter: Send + Sync {
    /// The language this adapter handles.
    fn language(&self) -> Language;

    /// File extensions this adapter accepts (without leading dot).
    fn extensions(&self) -> &[&str];

    /// The tree-sitter grammar for this language.
    fn grammar(&self) -> tree_sitter::Language;

    /// Removes this language's comment markers from `text`, line by line.
    ///
    /// Applying this twice yields the same text as applying it once.
    fn strip_delimiters(&self, text: &str) -> String;

    /// Whether a snippet of text is valid code in this language.
    fn validate_text(&self, text: &str) -> bool;

    /// Encoding declared by `source`, UTF-8 unless the language has a way to
    /// declare another one. `None` means the declaration names an encoding
    /// that is not supported.
    fn source_encoding(&self, _source: &[u8]) -> Option<&'static Encoding> {
        Some(UTF_8)
    }

    /// Parses `source`, returning `None` if the parser gave up.
    fn parse(&self, source: &[u8]) -> Option<Tree> {
        let mut parser = Parser::new();
        parser.set_language(&self.grammar()).ok()?;
        parser.parse(source, None)
    }

    /// Whether `source` parses without any syntactic diagnostic.
    fn parses_cleanly(&self, source: &[u8]) -> bool {
        self.parse(source)
            .map(|tree| !tree.root_node().has_error())
            .unwrap_or(false)
    }

    /// Extracts all comment tokens of `source` in source order.
    ///
    /// `path` is only used for error reporting. Fails with
    /// `CorpusError::Tokenization` if a comment cannot be decoded in the
    /// file's declared encoding.
    fn extract_tokens(&self, path: &str, source: &[u8]) -> Result<Vec<Token>> {
        let encoding = self
            .source_encoding(source)
            .ok_or_else(|| CorpusError::Tokenization {
                path: path.to_string(),
                line: 1,
            })?;
        let tree = self.parse(source).ok_or_else(|| CorpusError::Parse {
            message: format!("{} parser returned no tree", self.language()),
            path: path.to_string(),
        })?;
        collect_comment_tokens(&tree, source, encoding, self.language(), path)
    }
}

/// Walks `tree` in document order and decodes every comment node.
fn collect_comment_tokens(
    tree: &Tree,
    source: &[u8],
    encoding: &'static Encoding,
    language: Language,
    path: &str,
) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut cursor = tree.walk();

    'walk: loop {
        let node = cursor.node();
        if node.kind() == COMMENT_KIND {
            let start = node.start_position();
            let end = node.end_position();
            let text = encoding
                .decode_without_bom_handling_and_without_replacement(&source[node.byte_range()])
                .ok_or_else(|| CorpusError::Tokenization {
                    path: path.to_string(),
                    line: start.row as u32 + 1,
                })?;
            tokens.push(Token {
                language,
                start: Position::new(start.row as u32 + 1, start.column as u32),
                end: Position::new(end.row as u32 + 1, end.column as u32),
                text: text.into_owned(),
            });
        } else if cursor.goto_first_child() {
            continue;
        }

        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }

    tokens.sort_by_key(|t| t.start);
    Ok(tokens)
}

static C_ADAPTER: CFamilyAdapter = CFamilyAdapter::new(Language::C);
static CPP_ADAPTER: CFamilyAdapter = CFamilyAdapter::new(Language::Cpp);
static PYTHON_ADAPTER: PythonAdapter = PythonAdapter;

/// Returns the built-in adapter for `language`.
pub fn adapter_for(language: Language) -> &'static dyn LanguageAdapter {
    match language {
        Language::C => &C_ADAPTER,
        Language::Cpp => &CPP_ADAPTER,
        Language::Python => &PYTHON_ADAPTER,
    }
}

/// Registry of language adapters.
///
/// Dispatches on file extension; when several adapters accept the same
/// extension they are tried in registration order.
pub struct LanguageRegistry {
    adapters: Vec<&'static dyn LanguageAdapter>,
}

impl LanguageRegistry {
    /// Creates a registry with the built-in adapters (C, C++, Python).
    pub fn new() -> Self {
        Self {
            adapters: Language::ALL.iter().map(|l| adapter_for(*l)).collect(),
        }
    }

    /// Creates a registry from an explicit adapter list.
    pub fn with_adapters(adapters: Vec<&'static dyn LanguageAdapter>) -> Self {
        Self { adapters }
    }

    /// Returns the adapter registered for `language`.
    pub fn adapter(&self, language: Language) -> Option<&'static dyn LanguageAdapter> {
        self.adapters
            .iter()
            .find(|a| a.language() == language)
            .copied()
    }

    /// Returns the adapters that accept the extension of `path`, in order.
    pub fn candidates_for(&self, path: &Path) -> Vec<&'static dyn LanguageAdapter> {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Vec::new();
        };
        self.adapters
            .iter()
            .filter(|a| a.extensions().contains(&ext))
            .copied()
            .collect()
    }

    /// Infers the language of `source` from the extension of `path` and
    /// confirms it with a full parse.
    pub fn detect_source_language(&self, path: &Path, source: &[u8]) -> Option<Language> {
        self.detect_source_adapter(path, source).map(|a| a.language())
    }

    /// Like [`Self::detect_source_language`], returning the confirmed adapter.
    pub fn detect_source_adapter(
        &self,
        path: &Path,
        source: &[u8],
    ) -> Option<&'static dyn LanguageAdapter> {
        self.candidates_for(path)
            .into_iter()
            .find(|a| a.parses_cleanly(source))
    }

    /// Reads the file at `path` and detects its language.
    ///
    /// Returns `None` if the file cannot be read or parsed as any candidate
    /// language.
    pub fn detect_language(&self, path: &Path) -> Option<Language> {
        if self.candidates_for(path).is_empty() {
            return None;
        }
        match std::fs::read(path) {
            Ok(source) => self.detect_source_language(path, &source),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "cannot read file");
                None
            }
        }
    }

    /// Returns all supported file extensions across all adapters.
    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = Vec::new();
        for ext in self.adapters.iter().flat_map(|a| a.extensions().iter()) {
            if !exts.contains(ext) {
                exts.push(*ext);
            }
        }
        exts
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Detects the language of the file at `path` using the built-in adapters.
pub fn detect_language(path: &Path) -> Option<Language> {
    LanguageRegistry::new().detect_language(path)
}

/// Removes the comment delimiters of `language` from `text`.
pub fn strip_comment_delimiters(text: &str, language: Language) -> String {
    adapter_for(language).strip_delimiters(text)
}

/// Whether `text` is valid code in `language`, or in any supported language
/// when `language` is `None`. Returns the first matching language.
pub fn validate_source_text(text: &str, language: Option<Language>) -> Option<Language> {
    match language {
        Some(l) => adapter_for(l).validate_text(text).then_some(l),
        None => Language::ALL
            .iter()
            .copied()
            .find(|l| adapter_for(*l).validate_text(text)),
    }
}
