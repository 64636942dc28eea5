//! Decides whether a comment block is prose or commented-out code.

use crate::language::{adapter_for, LanguageAdapter};
use crate::types::Language;

/// Characters that mark syntactically valid text as probable code.
const CODE_MARKERS: [char; 6] = ['(', ')', '[', ']', '=', '.'];

/// Keyword that marks syntactically valid text as probable code.
const CODE_KEYWORD: &str = "return";

/// Strips comment delimiters and removes the common indentation.
///
/// Indentation is the leading run of spaces or tabs. Blank lines do not
/// count toward the common indentation and come out empty. If the block
/// mixes tabs and spaces the indentation is left untouched.
pub fn trim_comment_as_code(text: &str, adapter: &dyn LanguageAdapter) -> String {
    let stripped = adapter.strip_delimiters(text);
    dedent(&stripped)
}

fn dedent(text: &str) -> String {
    let mut indent_char: Option<char> = None;
    let mut width = usize::MAX;

    for line in text.split('\n').filter(|l| !l.trim().is_empty()) {
        let run: &str = &line[..line.len() - line.trim_start_matches(&[' ', '\t'][..]).len()];
        for c in run.chars() {
            match indent_char {
                None => indent_char = Some(c),
                Some(seen) if seen != c => return text.to_string(),
                Some(_) => {}
            }
        }
        width = width.min(run.len());
    }

    if width == 0 || width == usize::MAX {
        return text.to_string();
    }

    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                &line[width..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn has_code_marker(text: &str) -> bool {
    text.contains(&CODE_MARKERS[..]) || text.contains(CODE_KEYWORD)
}

/// Whether the comment `block_text` is probably commented-out code.
///
/// The text must parse as code in its language *and* contain one of
/// `( ) [ ] = .` or the word `return`; prose that merely happens to parse is
/// kept. C and C++ blocks are never classified as code.
pub fn is_probably_code_with(block_text: &str, adapter: &dyn LanguageAdapter) -> bool {
    let trimmed = trim_comment_as_code(block_text, adapter);
    has_code_marker(&trimmed) && adapter.validate_text(&trimmed)
}

/// [`is_probably_code_with`] using the built-in adapter for `language`.
pub fn is_probably_code(block_text: &str, language: Language) -> bool {
    is_probably_code_with(block_text, adapter_for(language))
}
