use std::cmp::Ordering;
use std::collections::HashMap;

use crate::ast::{Atom, Operator};
use crate::parser::Expression;
use crate::value::{parse_number, Scope, Value};

impl Expression {
    /// Evaluates against `scope`. The compiled atoms are only borrowed, so
    /// repeated or concurrent evaluations never interfere.
    pub fn evaluate(&self, scope: &Scope) -> Value {
        Machine::new(self.atoms(), scope).eval()
    }
}

/// Stack machine consuming a compiled atom sequence from its tail.
struct Machine<'a> {
    atoms: &'a [Atom],
    cursor: usize,
    scope: &'a Scope,
}

impl<'a> Machine<'a> {
    fn new(atoms: &'a [Atom], scope: &'a Scope) -> Self {
        Self {
            atoms,
            cursor: atoms.len(),
            scope,
        }
    }

    fn pop(&mut self) -> Option<&'a Atom> {
        self.cursor = self.cursor.checked_sub(1)?;
        self.atoms.get(self.cursor)
    }

    fn eval(&mut self) -> Value {
        match self.pop() {
            // Compilation checks operand counts; an exhausted stack only
            // happens for hand-built sequences.
            None => Value::Null,
            Some(Atom::Literal(text)) => self.literal(text),
            Some(Atom::Operator(Operator::Not)) => Value::Bool(!self.eval().is_truthy()),
            Some(Atom::Operator(op)) => {
                let b = self.eval();
                let a = self.eval();
                apply(*op, &a, &b)
            }
        }
    }

    fn literal(&self, text: &str) -> Value {
        if let Some(n) = parse_number(text) {
            return Value::Number(n);
        }
        if let Some(inner) = quoted(text) {
            return Value::String(inner.to_string());
        }
        match text {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            // Unknown names are 0, not an error
            _ => self
                .scope
                .get(text)
                .cloned()
                .unwrap_or(Value::Number(0.0)),
        }
    }
}

/// `'[A-Za-z0-9_-]*'` → the text between the quotes.
fn quoted(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    inner
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        .then_some(inner)
}

fn apply(op: Operator, a: &Value, b: &Value) -> Value {
    let ordered = |wanted: fn(Ordering) -> bool| {
        Value::Bool(a.loose_cmp(b).is_some_and(wanted))
    };

    match op {
        Operator::Add => Value::Number(a.to_number() + b.to_number()),
        Operator::Sub => Value::Number(a.to_number() - b.to_number()),
        Operator::Mul => Value::Number(a.to_number() * b.to_number()),
        Operator::Div => {
            let divisor = b.to_number();
            if divisor == 0.0 {
                Value::Number(0.0)
            } else {
                Value::Number((a.to_number() / divisor).trunc())
            }
        }
        Operator::Mod => {
            let divisor = b.to_number().trunc();
            if divisor == 0.0 {
                Value::Number(0.0)
            } else {
                Value::Number(a.to_number().trunc() % divisor)
            }
        }
        Operator::And => Value::Bool(a.is_truthy() && b.is_truthy()),
        Operator::Or => Value::Bool(a.is_truthy() || b.is_truthy()),
        Operator::Equal => Value::Bool(a.loose_eq(b)),
        Operator::NotEqual => Value::Bool(!a.loose_eq(b)),
        Operator::Less => ordered(Ordering::is_lt),
        Operator::Greater => ordered(Ordering::is_gt),
        Operator::LessEq => ordered(Ordering::is_le),
        Operator::GreaterEq => ordered(Ordering::is_ge),
        Operator::Not => Value::Bool(!b.is_truthy()),
    }
}

/// Results of the expressions evaluated during one render pass, keyed by
/// expression id.
#[derive(Debug, Default)]
pub struct Memo {
    results: HashMap<String, Value>,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(&mut self, expr: &Expression, scope: &Scope) -> &Value {
        self.results
            .entry(expr.id().to_string())
            .or_insert_with(|| expr.evaluate(scope))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
