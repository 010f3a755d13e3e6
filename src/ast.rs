use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Add,       // +
    Sub,       // -
    Mul,       // *
    Div,       // /
    Mod,       // %
    Equal,     // = or ==
    NotEqual,  // !=
    Less,      // <
    Greater,   // >
    LessEq,    // <=
    GreaterEq, // >=
    Not,       // !
    And,       // & or &&
    Or,        // | or ||
}

impl Operator {
    /// Binding strength used by the expression compiler. Higher binds
    /// tighter.
    pub const fn precedence(self) -> u8 {
        match self {
            Operator::Equal
            | Operator::NotEqual
            | Operator::Less
            | Operator::Greater
            | Operator::LessEq
            | Operator::GreaterEq => 1,
            Operator::And | Operator::Or => 2,
            Operator::Add | Operator::Sub => 3,
            Operator::Mul | Operator::Div | Operator::Mod => 4,
            Operator::Not => 5,
        }
    }

    /// Number of operands consumed from the evaluation stack.
    pub const fn arity(self) -> usize {
        match self {
            Operator::Not => 1,
            _ => 2,
        }
    }

    pub const fn is_prefix(self) -> bool {
        matches!(self, Operator::Not)
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::LessEq => "<=",
            Operator::GreaterEq => ">=",
            Operator::Not => "!",
            Operator::And => "&&",
            Operator::Or => "||",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Smallest unit of a compiled expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Atom {
    /// Number, quoted string, boolean word or variable name; classified at
    /// evaluation time.
    Literal(String),
    Operator(Operator),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaceholderKind {
    If,
    For,
}

/// Marker left in a carved line where a block used to be:
/// `{if:<expr-id>:<index>}` or `{for:<name>:<index>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    pub kind: PlaceholderKind,
    pub key: String,
    pub index: usize,
}

impl Placeholder {
    pub fn new(kind: PlaceholderKind, key: impl Into<String>, index: usize) -> Self {
        Self {
            kind,
            key: key.into(),
            index,
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            PlaceholderKind::If => "if",
            PlaceholderKind::For => "for",
        };
        write!(f, "{{{}:{}:{}}}", tag, self.key, self.index)
    }
}

impl FromStr for Placeholder {
    type Err = ();

    /// Parses a full marker including its braces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')).ok_or(())?;
        let (tag, rest) = inner.split_once(':').ok_or(())?;
        // Ids never contain `:`, so the index is after the last one
        let (key, index) = rest.rsplit_once(':').ok_or(())?;
        let kind = match tag {
            "if" => PlaceholderKind::If,
            "for" => PlaceholderKind::For,
            _ => return Err(()),
        };
        if key.is_empty() {
            return Err(());
        }
        let index = index.parse().map_err(|_| ())?;
        Ok(Placeholder::new(kind, key, index))
    }
}

/// One piece of a compiled line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Segment {
    Text(String),
    Variable(String),
    /// Key into the node's expression table.
    Expression(String),
    Block(Placeholder),
    Include(String),
}
