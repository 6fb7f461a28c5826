/*!
# Expression Parser

Compiles `$where` source text into an [`Expr`] tree using the pest grammar in
`expr/grammar/where.pest`.

Structural limits from [`EvalLimits`] are enforced here, before and after
parsing, so that an oversized or pathologically nested body is rejected
without ever being evaluated:

```rust
use mongrep::expr::{EvalLimits, ExprError, parser};

let limits = EvalLimits { max_depth: 4, ..EvalLimits::default() };
let result = parser::compile("((((((a))))))", &limits);
assert!(matches!(result, Err(ExprError::TooDeep { .. })));
```
*/
use pest::Parser;
use pest_derive::Parser;

use crate::expr::{
    EvalLimits, ExprError,
    ast::{BinaryOp, Expr, Literal, UnaryOp},
};

/// Parser for `$where` expression bodies.
#[derive(Parser)]
#[grammar = "expr/grammar/where.pest"]
pub struct WhereParser;

type Pair<'i> = pest::iterators::Pair<'i, Rule>;

/// Compile an expression body into its syntax tree.
///
/// # Errors
///
/// Returns [`ExprError::SourceTooLong`] or [`ExprError::TooDeep`] when a
/// structural limit is exceeded, and [`ExprError::Syntax`] when the source
/// does not follow the grammar.
pub fn compile(source: &str, limits: &EvalLimits) -> Result<Expr, ExprError> {
    if source.len() > limits.max_source_len {
        return Err(ExprError::SourceTooLong {
            len: source.len(),
            max: limits.max_source_len,
        });
    }
    // Reject deep bracket nesting up front so the recursive descent never
    // sees it.
    if bracket_nesting(source) > limits.max_depth {
        return Err(ExprError::TooDeep { max: limits.max_depth });
    }

    let mut pairs = WhereParser::parse(Rule::program, source)
        .map_err(|e| ExprError::Syntax(e.to_string()))?;
    let program = pairs.next().ok_or_else(unexpected_end)?;
    let expression = program.into_inner().next().ok_or_else(unexpected_end)?;
    let expr = build_expr(expression)?;

    if expr.depth() > limits.max_depth {
        return Err(ExprError::TooDeep { max: limits.max_depth });
    }

    log::trace!("Compiled $where body {source:?} into {expr}");
    Ok(expr)
}

fn unexpected_end() -> ExprError {
    ExprError::Syntax("Unexpected end of expression".to_string())
}

fn unexpected(pair: &Pair<'_>) -> ExprError {
    ExprError::Syntax(format!(
        "Unexpected {:?} at {:?}",
        pair.as_rule(),
        pair.as_str()
    ))
}

/// Build an [`Expr`] from any expression-producing rule.
fn build_expr(pair: Pair<'_>) -> Result<Expr, ExprError> {
    match pair.as_rule() {
        Rule::expression => {
            let inner = pair.into_inner().next().ok_or_else(unexpected_end)?;
            build_expr(inner)
        }
        Rule::or_expr
        | Rule::and_expr
        | Rule::equality
        | Rule::relational
        | Rule::additive
        | Rule::multiplicative => build_infix(pair),
        Rule::unary => build_unary(pair),
        Rule::postfix => build_postfix(pair),
        Rule::identifier => Ok(Expr::Identifier(pair.as_str().to_string())),
        Rule::number => pair
            .as_str()
            .parse::<f64>()
            .map(|n| Expr::Literal(Literal::Number(n)))
            .map_err(|_| unexpected(&pair)),
        Rule::string => {
            let chars = pair.into_inner().next().ok_or_else(unexpected_end)?;
            Ok(Expr::Literal(Literal::String(unescape(chars.as_str()))))
        }
        Rule::boolean => {
            Ok(Expr::Literal(Literal::Bool(pair.as_str() == "true")))
        }
        Rule::null => Ok(Expr::Literal(Literal::Null)),
        Rule::undefined => Ok(Expr::Literal(Literal::Undefined)),
        _ => Err(unexpected(&pair)),
    }
}

/// Left-fold a chain of operands separated by operators of one precedence
/// level, e.g. `a + b - c` becomes `((a + b) - c)`.
fn build_infix(pair: Pair<'_>) -> Result<Expr, ExprError> {
    let mut inner = pair.into_inner();
    let mut lhs = build_expr(inner.next().ok_or_else(unexpected_end)?)?;

    while let Some(op_pair) = inner.next() {
        let op = BinaryOp::from_token(op_pair.as_str())
            .ok_or_else(|| unexpected(&op_pair))?;
        let rhs = build_expr(inner.next().ok_or_else(unexpected_end)?)?;
        lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
    }

    Ok(lhs)
}

fn build_unary(pair: Pair<'_>) -> Result<Expr, ExprError> {
    let mut ops = vec![];
    let mut operand = None;

    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::unary_op => ops.push(match child.as_str() {
                "!" => UnaryOp::Not,
                "-" => UnaryOp::Negate,
                "+" => UnaryOp::Plus,
                _ => return Err(unexpected(&child)),
            }),
            _ => operand = Some(build_expr(child)?),
        }
    }

    let operand = operand.ok_or_else(unexpected_end)?;
    // Innermost operator applies first: `-!a` is `-(!a)`
    Ok(ops
        .into_iter()
        .rev()
        .fold(operand, |expr, op| Expr::Unary(op, Box::new(expr))))
}

fn build_postfix(pair: Pair<'_>) -> Result<Expr, ExprError> {
    let mut inner = pair.into_inner();
    let mut target = build_expr(inner.next().ok_or_else(unexpected_end)?)?;

    for accessor in inner {
        target = match accessor.as_rule() {
            Rule::member => {
                let name = accessor
                    .into_inner()
                    .next()
                    .ok_or_else(unexpected_end)?;
                Expr::Member(Box::new(target), name.as_str().to_string())
            }
            Rule::index => {
                let index = accessor
                    .into_inner()
                    .next()
                    .ok_or_else(unexpected_end)?;
                Expr::Index(Box::new(target), Box::new(build_expr(index)?))
            }
            _ => return Err(unexpected(&accessor)),
        };
    }

    Ok(target)
}

/// Resolve backslash escapes inside a quoted string literal. Unknown escapes
/// stand for the escaped character itself.
fn unescape(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('b') => result.push('\u{8}'),
            Some('f') => result.push('\u{c}'),
            Some('v') => result.push('\u{b}'),
            Some('0') => result.push('\0'),
            Some('u') => {
                let hex: String = chars.clone().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
                {
                    Some(decoded) if hex.len() == 4 => {
                        result.push(decoded);
                        chars.nth(3);
                    }
                    _ => result.push('u'),
                }
            }
            Some(other) => result.push(other),
            None => {}
        }
    }

    result
}

/// Maximum depth of `(`/`[` nesting outside of string literals.
fn bracket_nesting(source: &str) -> usize {
    let mut depth: usize = 0;
    let mut max_depth = 0;
    let mut quote: Option<char> = None;
    let mut chars = source.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(_), '\\') => {
                chars.next();
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, _) => {}
        }
    }

    max_depth
}
