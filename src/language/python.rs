//! Tree-sitter based Python adapter.

use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::bytes::Regex;

use crate::language::LanguageAdapter;
use crate::types::Language;

/// PEP 263 encoding declaration, e.g. `# -*- coding: latin-1 -*-`.
static CODING_COOKIE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t\x0c]*#.*?coding[:=][ \t]*([-\w.]+)").expect("coding pattern is valid")
});

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Extracts `#` comments from Python source files.
pub struct PythonAdapter;

impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extensions(&self) -> &[&str] {
        &["py"]
    }

    fn grammar(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn strip_delimiters(&self, text: &str) -> String {
        text.split('\n')
            .map(|line| line.trim_start_matches('#'))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn validate_text(&self, text: &str) -> bool {
        self.parses_cleanly(text.as_bytes())
    }

    fn source_encoding(&self, source: &[u8]) -> Option<&'static Encoding> {
        let mut lines = source.split(|b| *b == b'\n');
        let first = lines.next().unwrap_or_default();
        if first.starts_with(UTF8_BOM) {
            return Some(UTF_8);
        }
        if let Some(label) = coding_label(first) {
            return encoding_for_label(label);
        }
        // The second line only counts when the first holds nothing but a comment.
        let first_is_comment = first
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_none_or(|b| *b == b'#');
        match lines.next().and_then(coding_label) {
            Some(label) if first_is_comment => encoding_for_label(label),
            _ => Some(UTF_8),
        }
    }
}

fn coding_label(line: &[u8]) -> Option<&str> {
    let label = CODING_COOKIE.captures(line)?.get(1)?;
    std::str::from_utf8(label.as_bytes()).ok()
}

/// Maps a Python codec name onto an encoding, folding the aliases Python
/// itself normalizes.
fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    let name = label.to_ascii_lowercase().replace('_', "-");
    let family = |canonical: &str| name == canonical || name.starts_with(&format!("{canonical}-"));
    if family("utf-8") || name == "utf8" {
        return Some(UTF_8);
    }
    if family("latin-1") || family("iso-8859-1") || family("iso-latin-1") {
        return Some(WINDOWS_1252);
    }
    Encoding::for_label(label.as_bytes()).or_else(|| Encoding::for_label(name.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{EUC_JP, SHIFT_JIS};

    #[test]
    fn strips_every_leading_hash() {
        let adapter = PythonAdapter;
        assert_eq!(adapter.strip_delimiters("## heading\n# body"), " heading\n body");
    }

    #[test]
    fn keeps_inner_hashes() {
        let adapter = PythonAdapter;
        assert_eq!(adapter.strip_delimiters("# issue #12"), " issue #12");
    }

    #[test]
    fn defaults_to_utf8() {
        assert_eq!(PythonAdapter.source_encoding(b"x = 1\n"), Some(UTF_8));
        assert_eq!(PythonAdapter.source_encoding(b""), Some(UTF_8));
    }

    #[test]
    fn reads_cookie_on_first_two_lines() {
        let adapter = PythonAdapter;
        assert_eq!(
            adapter.source_encoding(b"# -*- coding: latin-1 -*-\nx = 1\n"),
            Some(WINDOWS_1252)
        );
        assert_eq!(
            adapter.source_encoding(b"#!/usr/bin/env python\n# vim: set fileencoding=euc_jp :\n"),
            Some(EUC_JP)
        );
        assert_eq!(
            adapter.source_encoding(b"x = 1\n# coding: shift_jis\n"),
            Some(UTF_8)
        );
        assert_eq!(
            adapter.source_encoding(b"# coding=shift_jis\n"),
            Some(SHIFT_JIS)
        );
    }

    #[test]
    fn unknown_cookie_is_unsupported() {
        assert_eq!(PythonAdapter.source_encoding(b"# coding: klingon\n"), None);
    }
}
