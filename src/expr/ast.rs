/*!
# Expression AST

The syntax tree of a compiled `$where` body.
*/
use std::fmt::Display;

/// A literal written in the expression source.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Numeric literal; every number is a double, as in the host scripts
    /// these bodies are usually written for.
    Number(f64),
    /// Quoted string with escapes already resolved
    String(String),
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Negate,
    /// `+`
    Plus,
}

/// Infix operators, including the short-circuiting logical ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    /// `==`, which also equates `null` and `undefined`
    Eq,
    /// `!=`
    NotEq,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    /// Map an operator token to its operator.
    pub(crate) fn from_token(token: &str) -> Option<Self> {
        let op = match token {
            "||" => Self::Or,
            "&&" => Self::And,
            "==" => Self::Eq,
            "!=" => Self::NotEq,
            "===" => Self::StrictEq,
            "!==" => Self::StrictNotEq,
            "<" => Self::Lt,
            "<=" => Self::Lte,
            ">" => Self::Gt,
            ">=" => Self::Gte,
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            _ => return None,
        };
        Some(op)
    }

    const fn symbol(self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::StrictEq => "===",
            Self::StrictNotEq => "!==",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value
    Literal(Literal),
    /// A reference to a top-level document field
    Identifier(String),
    /// Property access, e.g. `address.city`
    Member(Box<Self>, String),
    /// Computed access, e.g. `tags[0]` or `doc["key"]`
    Index(Box<Self>, Box<Self>),
    /// Prefix operation
    Unary(UnaryOp, Box<Self>),
    /// Infix operation
    Binary(BinaryOp, Box<Self>, Box<Self>),
}

impl Expr {
    /// Height of the tree; a lone literal or identifier has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Literal(_) | Self::Identifier(_) => 1,
            Self::Member(inner, _) | Self::Unary(_, inner) => 1 + inner.depth(),
            Self::Index(lhs, rhs) | Self::Binary(_, lhs, rhs) => {
                1 + lhs.depth().max(rhs.depth())
            }
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(Literal::Undefined) => write!(f, "undefined"),
            Self::Literal(Literal::Null) => write!(f, "null"),
            Self::Literal(Literal::Bool(b)) => write!(f, "{b}"),
            Self::Literal(Literal::Number(n)) => write!(f, "{n}"),
            Self::Literal(Literal::String(s)) => write!(f, "{s:?}"),
            Self::Identifier(name) => write!(f, "{name}"),
            Self::Member(target, name) => write!(f, "{target}.{name}"),
            Self::Index(target, index) => write!(f, "{target}[{index}]"),
            Self::Unary(op, operand) => {
                let symbol = match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Negate => "-",
                    UnaryOp::Plus => "+",
                };
                write!(f, "{symbol}{operand}")
            }
            Self::Binary(op, lhs, rhs) => {
                write!(f, "({lhs} {} {rhs})", op.symbol())
            }
        }
    }
}
