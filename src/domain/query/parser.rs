//! Lexer and recursive-descent parser for query expressions

use super::{Attribute, CompareOp, PairKind, QueryExpression};
use crate::domain::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    LParen,
    RParen,
    Comma,
    Eq,
    NotEq,
    And,
    Or,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier '{}'", name),
            Self::Str(_) => "string literal".to_string(),
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
            Self::Comma => "','".to_string(),
            Self::Eq => "'='".to_string(),
            Self::NotEq => "'!='".to_string(),
            Self::And => "'AND'".to_string(),
            Self::Or => "'OR'".to_string(),
        }
    }
}

/// A token plus the byte offset it starts at, for error reporting
type Spanned = (Token, usize);

fn tokenize(input: &str) -> Result<Vec<Spanned>, DomainError> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos] as char;

        match c {
            ' ' | '\t' | '\n' | '\r' => pos += 1,
            '(' => {
                tokens.push((Token::LParen, pos));
                pos += 1;
            }
            ')' => {
                tokens.push((Token::RParen, pos));
                pos += 1;
            }
            ',' => {
                tokens.push((Token::Comma, pos));
                pos += 1;
            }
            '=' => {
                tokens.push((Token::Eq, pos));
                pos += 1;
            }
            '!' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    tokens.push((Token::NotEq, pos));
                    pos += 2;
                } else {
                    return Err(DomainError::invalid_query(format!(
                        "Unexpected character '!' at position {}",
                        pos
                    )));
                }
            }
            '"' => {
                let (literal, consumed) = read_string(input, pos)?;
                tokens.push((Token::Str(literal), pos));
                pos += consumed;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = pos;
                while pos < bytes.len() {
                    let c = bytes[pos] as char;
                    if c.is_ascii_alphanumeric() || c == '_' {
                        pos += 1;
                    } else {
                        break;
                    }
                }
                let word = &input[start..pos];
                let token = match word.to_ascii_uppercase().as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    _ => Token::Ident(word.to_string()),
                };
                tokens.push((token, start));
            }
            other => {
                return Err(DomainError::invalid_query(format!(
                    "Unexpected character '{}' at position {}",
                    other, pos
                )));
            }
        }
    }

    Ok(tokens)
}

/// Read a double-quoted string literal starting at `start`; returns the
/// unescaped content and the number of bytes consumed including the quotes
fn read_string(input: &str, start: usize) -> Result<(String, usize), DomainError> {
    let bytes = input.as_bytes();
    let mut literal = String::new();
    let mut pos = start + 1;

    while pos < bytes.len() {
        match bytes[pos] {
            b'"' => return Ok((literal, pos + 1 - start)),
            b'\\' => match bytes.get(pos + 1) {
                Some(b'"') => {
                    literal.push('"');
                    pos += 2;
                }
                Some(b'\\') => {
                    literal.push('\\');
                    pos += 2;
                }
                _ => {
                    return Err(DomainError::invalid_query(format!(
                        "Invalid escape sequence at position {}",
                        pos
                    )));
                }
            },
            _ => {
                // Multi-byte characters pass through untouched
                let ch_start = pos;
                let mut ch_end = pos + 1;
                while ch_end < bytes.len() && !input.is_char_boundary(ch_end) {
                    ch_end += 1;
                }
                literal.push_str(&input[ch_start..ch_end]);
                pos = ch_end;
            }
        }
    }

    Err(DomainError::invalid_query(format!(
        "Unterminated string literal starting at position {}",
        start
    )))
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    input_len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn next(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.pos).cloned();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    fn unexpected(&self, expected: &str) -> DomainError {
        match self.tokens.get(self.pos) {
            Some((token, offset)) => DomainError::invalid_query(format!(
                "Expected {} but found {} at position {}",
                expected,
                token.describe(),
                offset
            )),
            None => DomainError::invalid_query(format!(
                "Expected {} but reached end of input at position {}",
                expected, self.input_len
            )),
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<(), DomainError> {
        match self.peek() {
            Some(found) if *found == token => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn expect_string(&mut self) -> Result<String, DomainError> {
        match self.peek() {
            Some(Token::Str(_)) => match self.next() {
                Some((Token::Str(value), _)) => Ok(value),
                _ => unreachable!(),
            },
            _ => Err(self.unexpected("a string literal")),
        }
    }

    fn parse_expr(&mut self) -> Result<QueryExpression, DomainError> {
        let mut left = self.parse_and()?;

        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = QueryExpression::Or(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<QueryExpression, DomainError> {
        let mut left = self.parse_factor()?;

        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_factor()?;
            left = QueryExpression::And(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<QueryExpression, DomainError> {
        match self.peek() {
            Some(Token::LParen) => {
                self.pos += 1;
                let expr = self.parse_expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(Token::Ident(_)) => self.parse_predicate(),
            _ => Err(self.unexpected("a predicate or '('")),
        }
    }

    fn parse_predicate(&mut self) -> Result<QueryExpression, DomainError> {
        let (name, offset) = match self.next() {
            Some((Token::Ident(name), offset)) => (name, offset),
            _ => unreachable!("caller checked for an identifier"),
        };

        match name.as_str() {
            "name" | "project_name" => {
                let attribute = if name == "name" {
                    Attribute::Name
                } else {
                    Attribute::ProjectName
                };

                let op = match self.peek() {
                    Some(Token::Eq) => {
                        self.pos += 1;
                        CompareOp::Eq
                    }
                    Some(Token::NotEq) => {
                        self.pos += 1;
                        CompareOp::Ne
                    }
                    _ => return Err(self.unexpected("'=' or '!='")),
                };

                let value = self.expect_string()?;

                Ok(QueryExpression::Attribute {
                    attribute,
                    op,
                    value,
                })
            }
            "variable" | "generic_information" => {
                let kind = if name == "variable" {
                    PairKind::Variable
                } else {
                    PairKind::GenericInformation
                };

                self.expect(Token::LParen, "'('")?;
                let entry_name = self.expect_string()?;
                self.expect(Token::Comma, "','")?;
                let value = self.expect_string()?;
                self.expect(Token::RParen, "')'")?;

                Ok(QueryExpression::Pair {
                    kind,
                    name: entry_name,
                    value,
                })
            }
            other => Err(DomainError::invalid_query(format!(
                "Unknown attribute '{}' at position {}: expected name, project_name, variable \
                 or generic_information",
                other, offset
            ))),
        }
    }
}

/// Parse a query expression string into its tree form
pub fn parse_query(input: &str) -> Result<QueryExpression, DomainError> {
    let tokens = tokenize(input)?;

    if tokens.is_empty() {
        return Err(DomainError::invalid_query("Query expression is empty"));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        input_len: input.len(),
    };

    let expr = parser.parse_expr()?;

    if parser.pos < parser.tokens.len() {
        return Err(parser.unexpected("end of input"));
    }

    Ok(expr)
}
