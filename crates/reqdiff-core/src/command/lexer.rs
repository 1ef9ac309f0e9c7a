//! Shell-style word splitting for command text
//!
//! Handles single quotes, double quotes with backslash escapes, ANSI-C
//! `$'...'` strings (as emitted by browser "copy as cURL"), and unquoted
//! backslash escapes. Adjacent quoted and unquoted segments form one word.

use thiserror::Error;

/// One shell word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Whether any part of the word was quoted
    pub quoted: bool,
}

impl Token {
    pub fn bare(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
        }
    }

    /// An unquoted word that starts with `-` and is more than a lone dash
    pub fn is_flag(&self) -> bool {
        !self.quoted && self.text.len() > 1 && self.text.starts_with('-')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unterminated {quote} quote")]
pub struct UnterminatedQuote {
    pub quote: char,
}

/// Split text into words, failing on an unterminated quote
pub fn tokenize(input: &str) -> Result<Vec<Token>, UnterminatedQuote> {
    split(input, true)
}

/// Split text into words, closing any unterminated quote at end of input
pub fn tokenize_lenient(input: &str) -> Vec<Token> {
    split(input, false).unwrap_or_default()
}

fn split(input: &str, strict: bool) -> Result<Vec<Token>, UnterminatedQuote> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    tokens.push(Token {
                        text: std::mem::take(&mut current),
                        quoted,
                    });
                    in_word = false;
                    quoted = false;
                }
            }
            '\'' => {
                in_word = true;
                quoted = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None if strict => return Err(UnterminatedQuote { quote: '\'' }),
                        None => break,
                    }
                }
            }
            '"' => {
                in_word = true;
                quoted = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.peek() {
                            Some(&next) if matches!(next, '"' | '\\' | '$' | '`') => {
                                current.push(next);
                                chars.next();
                            }
                            _ => current.push('\\'),
                        },
                        Some(ch) => current.push(ch),
                        None if strict => return Err(UnterminatedQuote { quote: '"' }),
                        None => break,
                    }
                }
            }
            '$' if chars.peek() == Some(&'\'') => {
                chars.next();
                in_word = true;
                quoted = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => current.push('\n'),
                            Some('t') => current.push('\t'),
                            Some('r') => current.push('\r'),
                            Some(other) => current.push(other),
                            None if strict => return Err(UnterminatedQuote { quote: '\'' }),
                            None => current.push('\\'),
                        },
                        Some(ch) => current.push(ch),
                        None if strict => return Err(UnterminatedQuote { quote: '\'' }),
                        None => break,
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(next) => current.push(next),
                    None => current.push('\\'),
                }
            }
            _ => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        tokens.push(Token {
            text: current,
            quoted,
        });
    }

    Ok(tokens)
}

/// Quote a value so [`tokenize`] reads it back as a single identical word
pub fn quote(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
