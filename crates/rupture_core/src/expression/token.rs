//! Tokenization of formula text.
//!
//! Grammar: identifiers `[A-Za-z_][A-Za-z0-9_]*`, numbers `\d*\.\d+|\d+`
//! (no exponent notation), operators `+ - * / ^`, parentheses and commas.
//! Whitespace between tokens is ignored.

use crate::error::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    Ident(&'a str),
    Number(f64),
    /// One of `+ - * / ^`; whether it is enabled is decided by the parser
    Operator(char),
    Comma,
    LParen,
    RParen,
}

pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, SyntaxError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];

        if c.is_ascii() {
            if c.is_ascii_whitespace() {
                i += 1;
                continue;
            }
        } else {
            // Non-ASCII: only whitespace is acceptable
            let ch = input[i..].chars().next().unwrap_or('\u{FFFD}');
            if ch.is_whitespace() {
                i += ch.len_utf8();
                continue;
            }
            return Err(unexpected(input, i, ch));
        }

        match c {
            b'(' => tokens.push(Token::LParen),
            b')' => tokens.push(Token::RParen),
            b',' => tokens.push(Token::Comma),
            b'+' | b'-' | b'*' | b'/' | b'^' => tokens.push(Token::Operator(c as char)),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push(Token::Ident(&input[start..i]));
                continue;
            }
            b'0'..=b'9' | b'.' => {
                let start = i;
                i = scan_number(bytes, i).ok_or_else(|| unexpected(input, start, c as char))?;
                let value = input[start..i]
                    .parse::<f64>()
                    .map_err(|_| unexpected(input, start, c as char))?;
                tokens.push(Token::Number(value));
                continue;
            }
            _ => return Err(unexpected(input, i, c as char)),
        }
        i += 1;
    }

    Ok(tokens)
}

/// Error at byte index `at`, reported as a character offset
fn unexpected(input: &str, at: usize, found: char) -> SyntaxError {
    SyntaxError::UnexpectedCharacter {
        offset: input[..at].chars().count(),
        found,
    }
}

/// Returns the end offset of the number starting at `start`, or `None` when a
/// lone `.` is not followed by a digit.
fn scan_number(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    (i > start).then_some(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_mixed() {
        let tokens = tokenize("sin(x_1, .5) + 12.25^2").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("sin"),
                Token::LParen,
                Token::Ident("x_1"),
                Token::Comma,
                Token::Number(0.5),
                Token::RParen,
                Token::Operator('+'),
                Token::Number(12.25),
                Token::Operator('^'),
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_trailing_dot_is_rejected() {
        // "3." is the number 3 followed by a lone '.'
        assert_eq!(
            tokenize("3."),
            Err(SyntaxError::UnexpectedCharacter {
                offset: 1,
                found: '.'
            })
        );
    }

    #[test]
    fn test_unexpected_character_offset() {
        assert_eq!(
            tokenize("1 + $x"),
            Err(SyntaxError::UnexpectedCharacter {
                offset: 4,
                found: '$'
            })
        );
        assert!(matches!(
            tokenize("2 × 3"),
            Err(SyntaxError::UnexpectedCharacter { offset: 2, found: '×' })
        ));
    }

    #[test]
    fn test_offset_counts_characters_not_bytes() {
        assert_eq!(
            tokenize("\u{A0}$"),
            Err(SyntaxError::UnexpectedCharacter {
                offset: 1,
                found: '$'
            })
        );
        // Each em space is three bytes but one character
        assert!(matches!(
            tokenize("\u{2003}\u{2003}1$"),
            Err(SyntaxError::UnexpectedCharacter { offset: 3, found: '$' })
        ));
    }

    #[test]
    fn test_whitespace_only() {
        assert!(tokenize(" \t\n").unwrap().is_empty());
    }
}
