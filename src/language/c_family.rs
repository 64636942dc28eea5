//! Tree-sitter based adapter for C and C++.

use crate::language::LanguageAdapter;
use crate::types::Language;

/// Extracts `//` and `/* */` comments from C and C++ source files.
///
/// Both languages share delimiter handling; only the grammar and the
/// accepted extensions differ.
pub struct CFamilyAdapter {
    language: Language,
}

impl CFamilyAdapter {
    pub const fn new(language: Language) -> Self {
        Self { language }
    }
}

fn is_delimiter(c: char) -> bool {
    c == '/' || c == '*'
}

impl LanguageAdapter for CFamilyAdapter {
    fn language(&self) -> Language {
        self.language
    }

    fn extensions(&self) -> &[&str] {
        match self.language {
            Language::C => &["c", "h"],
            _ => &["cpp", "cc", "hpp", "hh", "h"],
        }
    }

    fn grammar(&self) -> tree_sitter::Language {
        match self.language {
            Language::C => tree_sitter_c::LANGUAGE.into(),
            _ => tree_sitter_cpp::LANGUAGE.into(),
        }
    }

    fn strip_delimiters(&self, text: &str) -> String {
        text.split('\n')
            .map(|line| line.trim_start_matches(is_delimiter).trim_end_matches(is_delimiter))
            .collect::<Vec<_>>()
            .join("\n")
    }

    // Commented-out C/C++ code is not detected yet; snippets never validate.
    fn validate_text(&self, _text: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_and_block_markers() {
        let adapter = CFamilyAdapter::new(Language::C);
        assert_eq!(adapter.strip_delimiters("// note"), " note");
        assert_eq!(adapter.strip_delimiters("/** doc */"), " doc ");
        assert_eq!(
            adapter.strip_delimiters("/* first\n * second\n */"),
            " first\n * second\n "
        );
    }

    #[test]
    fn header_extension_is_shared() {
        assert!(CFamilyAdapter::new(Language::C).extensions().contains(&"h"));
        assert!(CFamilyAdapter::new(Language::Cpp).extensions().contains(&"h"));
        assert!(!CFamilyAdapter::new(Language::C).extensions().contains(&"cpp"));
    }
}
