//! Merges comment tokens into logical comment blocks.

use std::collections::BTreeSet;

use crate::anonymize::anonymize_id;
use crate::blame::BlameIndex;
use crate::errors::Result;
use crate::types::{short_revision, CommentBlock, Token};

/// Grouper state: either idle or accumulating one block.
#[derive(Debug)]
enum GrouperState {
    Idle,
    Accumulating(CommentBlock),
}

/// Per-file state machine turning a token stream into comment blocks.
///
/// A token extends the current block only if it starts on the line right
/// after the block's last line; anything else finalizes the block. Tokens
/// must arrive in source order.
pub struct CommentGrouper<'a> {
    blame: &'a BlameIndex,
    state: GrouperState,
}

impl<'a> CommentGrouper<'a> {
    pub fn new(blame: &'a BlameIndex) -> Self {
        Self {
            blame,
            state: GrouperState::Idle,
        }
    }

    /// Feeds one token. Returns the block it finalized, if any.
    ///
    /// Fails if the token's lines are outside the blame index, which means
    /// the tokens and the blame index do not describe the same file.
    pub fn push(&mut self, token: &Token) -> Result<Option<CommentBlock>> {
        let (authors, revisions) = attribute(self.blame, token.start.line, token.end.line)?;

        if let GrouperState::Accumulating(block) = &mut self.state {
            if token.start.line == block.last_line + 1 {
                block.text.push('\n');
                block.text.push_str(&token.text);
                block.authors.extend(authors);
                block.revisions.extend(revisions);
                block.last_line = token.end.line;
                return Ok(None);
            }
        }

        let fresh = CommentBlock {
            text: token.text.clone(),
            first_line: token.start.line,
            last_line: token.end.line,
            authors,
            revisions,
        };
        match std::mem::replace(&mut self.state, GrouperState::Accumulating(fresh)) {
            GrouperState::Accumulating(done) => Ok(Some(done)),
            GrouperState::Idle => Ok(None),
        }
    }

    /// Ends the stream, returning the pending block if there is one.
    pub fn finish(self) -> Option<CommentBlock> {
        match self.state {
            GrouperState::Accumulating(block) => Some(block),
            GrouperState::Idle => None,
        }
    }
}

/// Anonymized authors and short revisions of lines `first..=last`.
pub fn attribute(
    blame: &BlameIndex,
    first: u32,
    last: u32,
) -> Result<(BTreeSet<String>, BTreeSet<String>)> {
    let mut authors = BTreeSet::new();
    let mut revisions = BTreeSet::new();
    for entry in blame.slice(first as i64, last as i64 + 1)? {
        authors.insert(anonymize_id(&entry.author));
        revisions.insert(short_revision(&entry.revision).to_string());
    }
    Ok((authors, revisions))
}

/// Groups a whole token stream into blocks, in source order.
pub fn group_tokens(tokens: &[Token], blame: &BlameIndex) -> Result<Vec<CommentBlock>> {
    let mut grouper = CommentGrouper::new(blame);
    let mut blocks = Vec::new();
    for token in tokens {
        if let Some(block) = grouper.push(token)? {
            blocks.push(block);
        }
    }
    blocks.extend(grouper.finish());
    Ok(blocks)
}
