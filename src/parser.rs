use serde::{Deserialize, Serialize};

use crate::ast::{Atom, Operator};
use crate::error::{Error, Result};
use crate::lexer::{Token, Tokenizer};

/// A compiled expression: the atoms in operator-precedence output order,
/// ready to be consumed from the tail by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expression {
    source: String,
    id: String,
    atoms: Vec<Atom>,
}

impl Expression {
    pub fn compile(source: &str) -> Result<Self> {
        let atoms = Compiler::new(source).compile()?;
        Ok(Self {
            source: source.to_string(),
            id: expression_id(source),
            atoms,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The source with all whitespace removed. Two occurrences of the same
    /// expression in one document share this id.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }
}

pub fn expression_id(source: &str) -> String {
    source.chars().filter(|c| !c.is_whitespace()).collect()
}

enum Pending {
    Group(usize),
    Operator(Operator, usize),
}

/// Shunting-yard over the token stream.
struct Compiler<'a> {
    source: &'a str,
    lexer: Tokenizer<'a>,
    output: Vec<(Atom, usize)>,
    stack: Vec<Pending>,
}

impl<'a> Compiler<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            lexer: Tokenizer::new(source),
            output: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn compile(mut self) -> Result<Vec<Atom>> {
        loop {
            let offset = self.lexer.offset();
            let Some(token) = self.lexer.next_token() else {
                break;
            };
            match token? {
                Token::Literal(text) => self.output.push((Atom::Literal(text), offset)),
                Token::Operator(op) => self.push_operator(op, offset),
                Token::GroupOpen => self.stack.push(Pending::Group(offset)),
                Token::GroupClose => self.close_group(offset)?,
            }
        }

        while let Some(pending) = self.stack.pop() {
            match pending {
                Pending::Operator(op, offset) => self.output.push((Atom::Operator(op), offset)),
                Pending::Group(offset) => {
                    return Err(Error::syntax(self.source, offset, "unmatched `(`"));
                }
            }
        }

        self.check_operands()?;
        Ok(self.output.into_iter().map(|(atom, _)| atom).collect())
    }

    fn push_operator(&mut self, op: Operator, offset: usize) {
        // A prefix operator has no left operand, so nothing before it is
        // complete yet.
        if !op.is_prefix() {
            while let Some(Pending::Operator(top, _)) = self.stack.last() {
                if op.precedence() > top.precedence() {
                    break;
                }
                if let Some(Pending::Operator(top, at)) = self.stack.pop() {
                    self.output.push((Atom::Operator(top), at));
                }
            }
        }
        self.stack.push(Pending::Operator(op, offset));
    }

    fn close_group(&mut self, offset: usize) -> Result<()> {
        loop {
            match self.stack.pop() {
                Some(Pending::Operator(op, at)) => self.output.push((Atom::Operator(op), at)),
                Some(Pending::Group(_)) => return Ok(()),
                None => return Err(Error::syntax(self.source, offset, "unmatched `)`")),
            }
        }
    }

    /// Simulates the evaluation stack depth so that every operator finds its
    /// operands and exactly one value remains.
    fn check_operands(&self) -> Result<()> {
        let mut depth = 0usize;
        for (atom, offset) in &self.output {
            match atom {
                Atom::Literal(_) => depth += 1,
                Atom::Operator(op) => {
                    if depth < op.arity() {
                        return Err(Error::syntax(
                            self.source,
                            *offset,
                            format!("operator `{}` is missing an operand", op),
                        ));
                    }
                    depth = depth - op.arity() + 1;
                }
            }
        }
        match depth {
            1 => Ok(()),
            0 => Err(Error::syntax(self.source, 0, "empty expression")),
            _ => Err(Error::syntax(
                self.source,
                0,
                "operands are not joined by an operator",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpn(src: &str) -> Vec<String> {
        Expression::compile(src)
            .unwrap()
            .atoms()
            .iter()
            .map(|atom| match atom {
                Atom::Literal(s) => s.clone(),
                Atom::Operator(op) => op.symbol().to_string(),
            })
            .collect()
    }

    #[test]
    fn multiplication_binds_tighter() {
        assert_eq!(rpn("2 + 3 * 4"), ["2", "3", "4", "*", "+"]);
        assert_eq!(rpn("(2 + 3) * 4"), ["2", "3", "+", "4", "*"]);
    }

    #[test]
    fn same_rank_groups_left_to_right() {
        assert_eq!(rpn("a - b - c"), ["a", "b", "-", "c", "-"]);
        assert_eq!(rpn("a / b % c"), ["a", "b", "/", "c", "%"]);
    }

    #[test]
    fn comparison_is_loosest() {
        assert_eq!(rpn("a > b && c"), ["a", "b", "c", "&&", ">"]);
        assert_eq!(rpn("a + 1 = b"), ["a", "1", "+", "b", "="]);
    }

    #[test]
    fn not_is_prefix() {
        assert_eq!(rpn("!a && b"), ["a", "!", "b", "&&"]);
        assert_eq!(rpn("!!a"), ["a", "!", "!"]);
        assert_eq!(rpn("a && !b"), ["a", "b", "!", "&&"]);
    }

    #[test]
    fn id_strips_whitespace() {
        let expr = Expression::compile(" a >  b ").unwrap();
        assert_eq!(expr.id(), "a>b");
        assert_eq!(expr.source(), " a >  b ");
    }

    #[test]
    fn unbalanced_parentheses_fail() {
        assert!(matches!(
            Expression::compile("(a + b"),
            Err(Error::Syntax { offset: 0, .. })
        ));
        assert!(matches!(
            Expression::compile("a + b)"),
            Err(Error::Syntax { offset: 5, .. })
        ));
    }

    #[test]
    fn missing_operands_fail() {
        assert!(Expression::compile("a +").is_err());
        assert!(Expression::compile("a b").is_err());
        assert!(Expression::compile("f(x)").is_err());
        assert!(Expression::compile("").is_err());
        assert!(Expression::compile("()").is_err());
    }
}
