// SPDX-License-Identifier: MIT

//! Recursive-descent parser for condition expressions

use thiserror::Error;

use super::ast::{Expression, Literal};
use super::lexer::{tokenize, Spanned, Token};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConditionError {
    #[error("unexpected character '{ch}' at {pos}")]
    UnexpectedChar { pos: usize, ch: char },

    #[error("unterminated string starting at {pos}")]
    UnterminatedString { pos: usize },

    #[error("invalid number '{text}' at {pos}")]
    InvalidNumber { pos: usize, text: String },

    #[error("expected {expected} at {pos}")]
    Unexpected { pos: usize, expected: &'static str },

    #[error("expected {expected} but the condition ended")]
    UnexpectedEnd { expected: &'static str },

    #[error("empty condition")]
    Empty,
}

/// Parse a condition string
pub fn parse(input: &str) -> Result<Expression, ConditionError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ConditionError::Empty);
    }

    let mut parser = Parser { tokens, index: 0 };
    let expr = parser.or_expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(extra) => Err(ConditionError::Unexpected {
            pos: extra.pos,
            expected: "'and', 'or' or end of condition",
        }),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.index)
    }

    fn next(&mut self, expected: &'static str) -> Result<Spanned, ConditionError> {
        let token = self
            .tokens
            .get(self.index)
            .cloned()
            .ok_or(ConditionError::UnexpectedEnd { expected })?;
        self.index += 1;
        Ok(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek().map(|s| &s.token) == Some(token) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn or_expr(&mut self) -> Result<Expression, ConditionError> {
        let mut expr = self.and_expr()?;
        while self.eat(&Token::Or) {
            expr = expr.or(self.and_expr()?);
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> Result<Expression, ConditionError> {
        let mut expr = self.unary()?;
        while self.eat(&Token::And) {
            expr = expr.and(self.unary()?);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expression, ConditionError> {
        if self.eat(&Token::Not) {
            return Ok(self.unary()?.negate());
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expression, ConditionError> {
        let Spanned { token, pos } = self.next("a field, 'true', 'false' or '('")?;
        match token {
            Token::LParen => {
                let inner = self.or_expr()?;
                let close = self.next("')'")?;
                if close.token != Token::RParen {
                    return Err(ConditionError::Unexpected {
                        pos: close.pos,
                        expected: "')'",
                    });
                }
                Ok(inner)
            }
            Token::True => Ok(Expression::Const(true)),
            Token::False => Ok(Expression::Const(false)),
            Token::Path(path) => {
                let op = match self.peek().map(|s| &s.token) {
                    Some(Token::Op(op)) => *op,
                    _ => return Ok(Expression::Truthy(path)),
                };
                self.index += 1;
                let value = self.literal()?;
                Ok(Expression::compare(path, op, value))
            }
            _ => Err(ConditionError::Unexpected {
                pos,
                expected: "a field, 'true', 'false' or '('",
            }),
        }
    }

    fn literal(&mut self) -> Result<Literal, ConditionError> {
        const EXPECTED: &str = "a string, number, boolean or null";
        let Spanned { token, pos } = self.next(EXPECTED)?;
        match token {
            Token::Str(s) => Ok(Literal::String(s)),
            Token::Number(n) => Ok(Literal::Number(n)),
            Token::True => Ok(Literal::Boolean(true)),
            Token::False => Ok(Literal::Boolean(false)),
            Token::Null => Ok(Literal::Null),
            _ => Err(ConditionError::Unexpected {
                pos,
                expected: EXPECTED,
            }),
        }
    }
}
