//! Comment attachment side table.
//!
//! Built in one forward pass over a trivia-mode token stream. Comment
//! tokens are removed from the stream; every remaining token gets an entry
//! recording the comments that lead it and the comment trailing it on the
//! same line. Node comment slots are then filled by index lookup.

use crate::error::Span;
use crate::token::{SpannedToken, Token};

/// Own-line comments attach to the following token only when at most one
/// blank line separates them.
pub const MAX_LEADING_DISTANCE: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// Text after the `#`, untrimmed.
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenTrivia {
    pub leading: Vec<Comment>,
    pub trailing: Option<Comment>,
    /// Own-line comments that precede this token but sit too far above it
    /// to belong to it.
    pub detached: Vec<Comment>,
}

#[derive(Debug, Clone, Default)]
pub struct TriviaTable {
    entries: Vec<TokenTrivia>,
}

impl TriviaTable {
    /// Removes comment tokens from `tokens`, returning the remaining tokens
    /// and a table indexed in parallel with them.
    pub fn split(tokens: Vec<SpannedToken>) -> (Vec<SpannedToken>, TriviaTable) {
        let mut significant = Vec::with_capacity(tokens.len());
        let mut entries: Vec<TokenTrivia> = Vec::with_capacity(tokens.len());
        let mut pending: Vec<Comment> = Vec::new();
        let mut last_code: Option<usize> = None;
        let mut newline_since_code = true;

        for st in tokens {
            match st.token {
                Token::Comment(text) => {
                    let comment = Comment { text, span: st.span };
                    match last_code {
                        Some(idx) if !newline_since_code && entries[idx].trailing.is_none() => {
                            entries[idx].trailing = Some(comment);
                        }
                        _ => pending.push(comment),
                    }
                }
                Token::Newline => {
                    newline_since_code = true;
                    entries.push(TokenTrivia::default());
                    significant.push(st);
                }
                _ => {
                    let (leading, detached) = attach_leading(std::mem::take(&mut pending), st.span.line);
                    entries.push(TokenTrivia {
                        leading,
                        trailing: None,
                        detached,
                    });
                    significant.push(st);
                    last_code = Some(significant.len() - 1);
                    newline_since_code = false;
                }
            }
        }

        (significant, TriviaTable { entries })
    }

    pub fn get(&self, index: usize) -> Option<&TokenTrivia> {
        self.entries.get(index)
    }

    pub fn leading(&self, index: usize) -> &[Comment] {
        self.entries.get(index).map(|e| e.leading.as_slice()).unwrap_or(&[])
    }

    pub fn trailing(&self, index: usize) -> Option<&Comment> {
        self.entries.get(index).and_then(|e| e.trailing.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Splits the own-line comments above a token on `line` into the run that
/// is adjacent to it and the earlier ones that are not.
fn attach_leading(mut pending: Vec<Comment>, line: usize) -> (Vec<Comment>, Vec<Comment>) {
    let mut next_line = line;
    let mut cut = pending.len();

    while cut > 0 {
        let comment_line = pending[cut - 1].span.line;
        if next_line.saturating_sub(comment_line) > MAX_LEADING_DISTANCE {
            break;
        }
        next_line = comment_line;
        cut -= 1;
    }

    let leading = pending.split_off(cut);
    (leading, pending)
}

/// Joins comment texts into one block, dropping the single space that
/// conventionally follows `#`.
pub fn join_comments<'a>(comments: impl IntoIterator<Item = &'a Comment>) -> Option<String> {
    let lines: Vec<&str> = comments
        .into_iter()
        .map(|c| c.text.strip_prefix(' ').unwrap_or(&c.text))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
