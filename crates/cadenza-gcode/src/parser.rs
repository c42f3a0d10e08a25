use crate::lexer::{LexError, Number, Token, TokenKind, lex};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Statement {
    pub line: usize,
    pub raw: String,
    pub words: Vec<Word>,
    pub comment: Option<String>,
    pub checksum: Option<u8>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Word {
    pub letter: char,
    pub value: Number,
}

impl Statement {
    /// First word addressed by `letter`, if any.
    pub fn word(&self, letter: char) -> Option<&Word> {
        self.words.iter().find(|w| w.letter == letter)
    }

    /// True when the line carries nothing but comments.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Check the XOR checksum of the bytes before `*` against the
    /// transmitted value. Lines without a checksum always pass.
    pub fn checksum_matches(&self) -> bool {
        let Some(expected) = self.checksum else {
            return true;
        };
        let Some((payload, _)) = self.raw.split_once('*') else {
            return false;
        };
        payload.bytes().fold(0u8, |acc, b| acc ^ b) == expected
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, word) in self.words.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}{}", word.letter, word.value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("multiple checksums on line {line}")]
    MultipleChecksums { line: usize },
}

/// Parse G-code from a string using the lexer.
pub fn parse(input: &str) -> Result<Vec<Statement>, ParseError> {
    let lines: Vec<String> = input.lines().map(|l| l.to_string()).collect();
    parse_tokens_with_lines(lex(input), Some(&lines))
}

/// Parse G-code from a token iterator.
pub fn parse_tokens<I>(tokens: I) -> Result<Vec<Statement>, ParseError>
where
    I: IntoIterator<Item = Result<Token, LexError>>,
{
    parse_tokens_with_lines(tokens, None)
}

fn parse_tokens_with_lines<I>(
    tokens: I,
    lines: Option<&[String]>,
) -> Result<Vec<Statement>, ParseError>
where
    I: IntoIterator<Item = Result<Token, LexError>>,
{
    let mut out = Vec::new();
    let mut words = Vec::new();
    let mut comment: Option<String> = None;
    let mut checksum: Option<u8> = None;
    let mut current_line = 1usize;

    let flush = |target_line: usize,
                 words: &mut Vec<Word>,
                 comment: &mut Option<String>,
                 checksum: &mut Option<u8>,
                 out: &mut Vec<Statement>| {
        if words.is_empty() && comment.is_none() && checksum.is_none() {
            return;
        }
        let raw = lines
            .and_then(|ls| ls.get(target_line.saturating_sub(1)))
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default();
        out.push(Statement {
            line: target_line,
            raw,
            words: std::mem::take(words),
            comment: comment.take(),
            checksum: checksum.take(),
        });
    };

    for token in tokens {
        let token = token?;
        current_line = token.line;
        match token.kind {
            TokenKind::Newline => {
                flush(
                    current_line,
                    &mut words,
                    &mut comment,
                    &mut checksum,
                    &mut out,
                );
            }
            TokenKind::Comment(text) => {
                // Several comments on one line are joined
                comment = Some(match comment.take() {
                    Some(prev) => format!("{prev} {text}"),
                    None => text,
                });
            }
            TokenKind::Checksum(value) => {
                if checksum.is_some() {
                    return Err(ParseError::MultipleChecksums { line: current_line });
                }
                checksum = Some(value);
            }
            TokenKind::Word { letter, value } => {
                words.push(Word { letter, value });
            }
        }
    }

    flush(
        current_line,
        &mut words,
        &mut comment,
        &mut checksum,
        &mut out,
    );
    Ok(out)
}
