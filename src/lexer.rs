use crate::ast::Operator;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Literal(String),
    Operator(Operator),
    GroupOpen,  // (
    GroupClose, // )
}

/// Characters that end a pending literal.
const OPERATOR_CHARS: &[u8] = b"<>!&|()=*/%+-";

/// Splits an expression source into literal and operator tokens.
///
/// Literals are not delimited; a literal is whatever accumulates between two
/// operator characters, trimmed.
#[derive(Clone)]
pub struct Tokenizer<'a> {
    input: &'a str,
    cursor: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, cursor: 0 }
    }

    /// Byte offset of the next unread character.
    pub fn offset(&self) -> usize {
        self.cursor
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.cursor..]
    }

    fn advance(&mut self, n: usize) {
        self.cursor += n;
    }

    pub fn next_token(&mut self) -> Option<Result<Token>> {
        let rest = self.remaining();
        let literal_len = rest
            .bytes()
            .position(|b| OPERATOR_CHARS.contains(&b))
            .unwrap_or(rest.len());

        let pending = &rest[..literal_len];
        if !pending.trim().is_empty() {
            let start = self.cursor + (pending.len() - pending.trim_start().len());
            self.advance(literal_len);
            return Some(self.literal(pending.trim(), start));
        }
        // Whitespace-only run
        self.advance(literal_len);

        let rest = self.remaining();
        let mut bytes = rest.bytes();
        let first = bytes.next()?;
        let second = bytes.next();

        let (token, width) = match (first, second) {
            (b'<', Some(b'=')) => (Token::Operator(Operator::LessEq), 2),
            (b'>', Some(b'=')) => (Token::Operator(Operator::GreaterEq), 2),
            (b'!', Some(b'=')) => (Token::Operator(Operator::NotEqual), 2),
            (b'=', Some(b'=')) => (Token::Operator(Operator::Equal), 2),
            (b'&', Some(b'&')) => (Token::Operator(Operator::And), 2),
            (b'|', Some(b'|')) => (Token::Operator(Operator::Or), 2),
            (b'<', _) => (Token::Operator(Operator::Less), 1),
            (b'>', _) => (Token::Operator(Operator::Greater), 1),
            (b'!', _) => (Token::Operator(Operator::Not), 1),
            (b'=', _) => (Token::Operator(Operator::Equal), 1),
            (b'&', _) => (Token::Operator(Operator::And), 1),
            (b'|', _) => (Token::Operator(Operator::Or), 1),
            (b'*', _) => (Token::Operator(Operator::Mul), 1),
            (b'/', _) => (Token::Operator(Operator::Div), 1),
            (b'%', _) => (Token::Operator(Operator::Mod), 1),
            (b'+', _) => (Token::Operator(Operator::Add), 1),
            (b'-', _) => (Token::Operator(Operator::Sub), 1),
            (b'(', _) => (Token::GroupOpen, 1),
            (b')', _) => (Token::GroupClose, 1),
            // The literal scan above stops only on operator characters
            _ => return None,
        };
        self.advance(width);
        Some(Ok(token))
    }

    fn literal(&self, text: &str, offset: usize) -> Result<Token> {
        if is_literal(text) {
            Ok(Token::Literal(text.to_string()))
        } else {
            Err(Error::syntax(
                self.input,
                offset,
                format!("`{}` is not a valid literal or identifier", text),
            ))
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// `[A-Za-z0-9_'][A-Za-z0-9_'-]*`
fn is_literal(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let body = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '\'';
    body(first) && chars.all(|c| body(c) || c == '-')
}
