// SPDX-License-Identifier: MIT

//! Tokenizer for condition expressions

use super::ast::CompareOp;
use super::parser::ConditionError;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
    /// Field path, dots allowed (`review.grade`)
    Path(String),
    Str(String),
    Number(f64),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Op(CompareOp),
    LParen,
    RParen,
}

/// Token plus its byte offset in the source
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Spanned {
    pub token: Token,
    pub pos: usize,
}

pub(super) fn tokenize(input: &str) -> Result<Vec<Spanned>, ConditionError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let token = match c {
            '(' => {
                chars.next();
                Token::LParen
            }
            ')' => {
                chars.next();
                Token::RParen
            }
            '\'' | '"' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some((_, ch)) if ch == c => break,
                        Some((_, ch)) => text.push(ch),
                        None => return Err(ConditionError::UnterminatedString { pos }),
                    }
                }
                Token::Str(text)
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                let followed_by_eq = matches!(chars.peek(), Some(&(_, '=')));
                if followed_by_eq {
                    chars.next();
                }
                let op = match (c, followed_by_eq) {
                    ('=', true) => CompareOp::Eq,
                    ('!', true) => CompareOp::NotEq,
                    ('<', true) => CompareOp::Lte,
                    ('>', true) => CompareOp::Gte,
                    ('<', false) => CompareOp::Lt,
                    ('>', false) => CompareOp::Gt,
                    _ => return Err(ConditionError::UnexpectedChar { pos, ch: c }),
                };
                Token::Op(op)
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut text = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_ascii_digit() || ch == '.' || (ch == '-' && text.is_empty()) {
                        text.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = text
                    .parse::<f64>()
                    .map_err(|_| ConditionError::InvalidNumber { pos, text })?;
                Token::Number(value)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' || ch == '.' {
                        word.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    "contains" => Token::Op(CompareOp::Contains),
                    _ => Token::Path(word),
                }
            }
            other => return Err(ConditionError::UnexpectedChar { pos, ch: other }),
        };
        tokens.push(Spanned { token, pos });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_tokenize_comparison() {
        assert_eq!(
            kinds("review.grade != 'not funny'"),
            vec![
                Token::Path("review.grade".to_string()),
                Token::Op(CompareOp::NotEq),
                Token::Str("not funny".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_keywords_and_numbers() {
        assert_eq!(
            kinds("not (attempts >= -2.5) or done"),
            vec![
                Token::Not,
                Token::LParen,
                Token::Path("attempts".to_string()),
                Token::Op(CompareOp::Gte),
                Token::Number(-2.5),
                Token::RParen,
                Token::Or,
                Token::Path("done".to_string()),
            ]
        );
    }

    #[test]
    fn test_positions_are_byte_offsets() {
        let tokens = tokenize("é == 'x'").unwrap();
        assert_eq!(tokens[1].pos, 3);
    }

    #[test]
    fn test_tokenize_errors() {
        assert_eq!(
            tokenize("a == 'open"),
            Err(ConditionError::UnterminatedString { pos: 5 })
        );
        assert_eq!(
            tokenize("a = 1"),
            Err(ConditionError::UnexpectedChar { pos: 2, ch: '=' })
        );
        assert_eq!(
            tokenize("a == 1..2"),
            Err(ConditionError::InvalidNumber {
                pos: 5,
                text: "1..2".to_string()
            })
        );
    }
}
