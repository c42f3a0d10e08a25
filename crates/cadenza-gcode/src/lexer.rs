use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", content = "value")]
pub enum TokenKind {
    /// A letter address followed by its numeric value, e.g. `X-1.5`.
    Word { letter: char, value: Number },
    Comment(String),
    Checksum(u8),
    Newline,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(tag = "kind", content = "value")]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    /// Integer value usable as an op code number (`G1`, `M114`).
    pub fn as_code(self) -> Option<u32> {
        match self {
            Number::Int(v) => u32::try_from(v).ok(),
            Number::Float(_) => None,
        }
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{v}"),
            Number::Float(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at line {line}, column {column}")]
    UnexpectedChar {
        line: usize,
        column: usize,
        ch: char,
    },

    #[error("word '{letter}' has no value at line {line}, column {column}")]
    MissingValue {
        line: usize,
        column: usize,
        letter: char,
    },

    #[error("invalid number '{raw}' at line {line}, column {column}")]
    InvalidNumber {
        line: usize,
        column: usize,
        raw: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    #[error("invalid checksum '{raw}' at line {line}, column {column}")]
    InvalidChecksum {
        line: usize,
        column: usize,
        raw: String,
    },

    #[error("unterminated parenthesized comment starting at line {line}, column {column}")]
    UnterminatedComment { line: usize, column: usize },
}

pub fn lex(input: &str) -> Lexer<'_> {
    Lexer::new(input)
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn pos(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    /// Consume characters up to (not including) the end of the line.
    fn take_line(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.bump();
        }
        text
    }

    fn take_number(&mut self) -> String {
        let mut raw = String::new();
        if let Some(sign @ ('+' | '-')) = self.peek() {
            raw.push(sign);
            self.bump();
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' {
                raw.push(c);
                self.bump();
            } else {
                break;
            }
        }
        raw
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.peek() {
            let (line, column) = self.pos();

            if ch.is_ascii_whitespace() {
                self.bump();
                if ch == '\n' {
                    return Some(Ok(Token {
                        kind: TokenKind::Newline,
                        line,
                        column,
                    }));
                }
                continue;
            }

            if ch == ';' {
                self.bump();
                let text = self.take_line();
                return Some(Ok(Token {
                    kind: TokenKind::Comment(text.trim().to_string()),
                    line,
                    column,
                }));
            }

            if ch == '(' {
                self.bump();
                let mut text = String::new();
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                    if c == ')' {
                        return Some(Ok(Token {
                            kind: TokenKind::Comment(text.trim().to_string()),
                            line,
                            column,
                        }));
                    }
                    text.push(c);
                }
                return Some(Err(LexError::UnterminatedComment { line, column }));
            }

            if ch == '*' {
                self.bump();
                let raw = self.take_line();
                let trimmed = raw.trim();
                return Some(match trimmed.parse::<u8>() {
                    Ok(value) => Ok(Token {
                        kind: TokenKind::Checksum(value),
                        line,
                        column,
                    }),
                    Err(_) => Err(LexError::InvalidChecksum {
                        line,
                        column: column + 1,
                        raw: trimmed.to_string(),
                    }),
                });
            }

            if ch.is_ascii_alphabetic() {
                self.bump();
                let letter = ch.to_ascii_uppercase();
                let start_col = self.column;
                let raw = self.take_number();
                if raw.is_empty() {
                    return Some(Err(LexError::MissingValue {
                        line,
                        column,
                        letter,
                    }));
                }
                return Some(match parse_number(&raw) {
                    Ok(value) => Ok(Token {
                        kind: TokenKind::Word { letter, value },
                        line,
                        column,
                    }),
                    Err(source) => Err(LexError::InvalidNumber {
                        line,
                        column: start_col,
                        raw,
                        source,
                    }),
                });
            }

            return Some(Err(LexError::UnexpectedChar { line, column, ch }));
        }

        None
    }
}

fn parse_number(raw: &str) -> Result<Number, std::num::ParseFloatError> {
    if !raw.contains('.') {
        if let Ok(int) = raw.parse::<i64>() {
            return Ok(Number::Int(int));
        }
    }
    raw.parse::<f64>().map(Number::Float)
}
