//! Character-level scanner for JSON-with-comments text.
//!
//! The scanner never builds a tree. It records where structural characters,
//! string literals and comments sit in the raw text so callers can match braces
//! and find keys without being fooled by braces inside strings or comments.
//! Every token carries its byte range and the container nesting depth it lives at
//! (an opening brace and its matching closing brace share the same depth).

use crate::error::{Result, SectionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Colon,
    Comma,
    Str,
    Comment,
    /// Numbers, `true`, `false`, `null`.
    Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub depth: usize,
}

impl Token {
    /// String contents without the surrounding quotes.
    pub fn inner<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start + 1..self.end - 1]
    }

    fn is_structural(&self) -> bool {
        !matches!(self.kind, TokenKind::Comment)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Str,
    StrEscape,
    LineComment,
    BlockComment,
    BlockCommentStar,
    Literal,
}

/// Tokenize `src`, failing when a string or block comment is left open or the
/// braces and brackets do not balance.
pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut stack: Vec<u8> = Vec::new();
    let mut state = State::Code;
    let mut start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        match state {
            State::Code => match b {
                b'{' | b'[' => {
                    let kind = if b == b'{' { TokenKind::OpenBrace } else { TokenKind::OpenBracket };
                    out.push(Token { kind, start: i, end: i + 1, depth: stack.len() });
                    stack.push(b);
                }
                b'}' | b']' => {
                    let want = if b == b'}' { b'{' } else { b'[' };
                    match stack.pop() {
                        Some(open) if open == want => {}
                        Some(_) => {
                            return Err(SectionError::malformed(format!(
                                "mismatched `{}` at byte {}",
                                b as char, i
                            )));
                        }
                        None => {
                            return Err(SectionError::malformed(format!(
                                "unbalanced `{}` at byte {}",
                                b as char, i
                            )));
                        }
                    }
                    let kind = if b == b'}' { TokenKind::CloseBrace } else { TokenKind::CloseBracket };
                    out.push(Token { kind, start: i, end: i + 1, depth: stack.len() });
                }
                b':' => out.push(Token { kind: TokenKind::Colon, start: i, end: i + 1, depth: stack.len() }),
                b',' => out.push(Token { kind: TokenKind::Comma, start: i, end: i + 1, depth: stack.len() }),
                b'"' => {
                    start = i;
                    state = State::Str;
                }
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    start = i;
                    state = State::LineComment;
                    i += 1;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    start = i;
                    state = State::BlockComment;
                    i += 1;
                }
                _ if b.is_ascii_whitespace() => {}
                _ => {
                    start = i;
                    state = State::Literal;
                }
            },
            State::Str => match b {
                b'\\' => state = State::StrEscape,
                b'"' => {
                    out.push(Token { kind: TokenKind::Str, start, end: i + 1, depth: stack.len() });
                    state = State::Code;
                }
                _ => {}
            },
            State::StrEscape => state = State::Str,
            State::LineComment => {
                if b == b'\n' {
                    out.push(Token { kind: TokenKind::Comment, start, end: i, depth: stack.len() });
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if b == b'*' {
                    state = State::BlockCommentStar;
                }
            }
            State::BlockCommentStar => match b {
                b'/' => {
                    out.push(Token { kind: TokenKind::Comment, start, end: i + 1, depth: stack.len() });
                    state = State::Code;
                }
                b'*' => {}
                _ => state = State::BlockComment,
            },
            State::Literal => {
                if b.is_ascii_whitespace() || matches!(b, b'{' | b'}' | b'[' | b']' | b':' | b',' | b'"' | b'/') {
                    out.push(Token { kind: TokenKind::Literal, start, end: i, depth: stack.len() });
                    state = State::Code;
                    // reprocess the delimiter in code state
                    continue;
                }
            }
        }
        i += 1;
    }

    match state {
        State::Code => {}
        State::LineComment => out.push(Token { kind: TokenKind::Comment, start, end: bytes.len(), depth: stack.len() }),
        State::Literal => out.push(Token { kind: TokenKind::Literal, start, end: bytes.len(), depth: stack.len() }),
        State::Str | State::StrEscape => {
            return Err(SectionError::malformed(format!("unterminated string starting at byte {start}")));
        }
        State::BlockComment | State::BlockCommentStar => {
            return Err(SectionError::malformed(format!("unterminated comment starting at byte {start}")));
        }
    }
    if !stack.is_empty() {
        return Err(SectionError::malformed(format!("{} unclosed container(s)", stack.len())));
    }
    Ok(out)
}

/// Remove `//` and `/* */` comments, leaving every other byte in place.
pub fn strip_comments(src: &str) -> Result<String> {
    let tokens = tokenize(src)?;
    let mut out = String::with_capacity(src.len());
    let mut last = 0;
    for t in tokens.iter().filter(|t| t.kind == TokenKind::Comment) {
        out.push_str(&src[last..t.start]);
        last = t.end;
    }
    out.push_str(&src[last..]);
    Ok(out)
}

/// Index of the next non-comment token after `idx`.
pub fn next_structural(tokens: &[Token], idx: usize) -> Option<usize> {
    (idx + 1..tokens.len()).find(|&j| tokens[j].is_structural())
}

/// True when the string token at `idx` is an object key (followed by `:`).
pub fn is_key(tokens: &[Token], idx: usize) -> bool {
    tokens[idx].kind == TokenKind::Str
        && next_structural(tokens, idx).is_some_and(|j| tokens[j].kind == TokenKind::Colon)
}

/// Index of the first token of the value belonging to the key at `key_idx`.
pub fn value_of(tokens: &[Token], key_idx: usize) -> Option<usize> {
    let colon = next_structural(tokens, key_idx)?;
    next_structural(tokens, colon)
}

/// Walk backward from `idx` counting braces, depth starting at 1, and return the
/// `{` that encloses the token.
pub fn enclosing_open_brace(tokens: &[Token], idx: usize) -> Option<usize> {
    let mut depth = 1usize;
    for j in (0..idx).rev() {
        match tokens[j].kind {
            TokenKind::CloseBrace => depth += 1,
            TokenKind::OpenBrace => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
    }
    None
}

/// Walk forward from an opening brace and return its matching `}`.
pub fn matching_close_brace(tokens: &[Token], open_idx: usize) -> Option<usize> {
    if tokens.get(open_idx)?.kind != TokenKind::OpenBrace {
        return None;
    }
    let mut depth = 0usize;
    for (j, t) in tokens.iter().enumerate().skip(open_idx) {
        match t.kind {
            TokenKind::OpenBrace => depth += 1,
            TokenKind::CloseBrace => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
    }
    None
}
