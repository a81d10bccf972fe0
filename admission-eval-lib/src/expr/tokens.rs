//! Lexical scan of expression source
//!
//! The interpreter does not expose its syntax tree, so the two facts the
//! evaluator needs from an expression before running it (where it reads
//! declared variables, and how heavy it is) are recovered from a token scan.

use core::ops::Range;
use regex::Regex;
use std::sync::LazyLock;

static TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?x)
          (?P<string>[rRbB]{0,2}(?:"""(?s:.*?)"""|'''(?s:.*?)'''|"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'))
        | (?P<number>0[xX][0-9a-fA-F]+[uU]?|[0-9]+(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?[uU]?)
        | (?P<ident>[A-Za-z_][A-Za-z0-9_]*)
        | (?P<operator>&&|\|\||==|!=|<=|>=|[<>+\-*/%!?.])
        | (?P<grouping>[()\[\]{},:])
        "#,
    )
    .expect("invalid regex")
});

const VARIABLES: &str = "variables";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Literal(&'a str),
    Ident(&'a str),
    Operator(&'a str),
    Grouping(&'a str),
}

impl Token<'_> {
    /// Whether the token stands for an evaluation step.
    #[must_use]
    pub const fn is_step(&self) -> bool {
        !matches!(self, Self::Grouping(_))
    }
}

/// Split expression source into tokens with their byte ranges, skipping whitespace and anything unrecognized.
fn spanned(source: &str) -> impl Iterator<Item = (Token<'_>, Range<usize>)> {
    TOKEN_REGEX.captures_iter(source).filter_map(|caps| {
        let (token, m) = if let Some(m) = caps.name("string").or_else(|| caps.name("number")) {
            (Token::Literal(m.as_str()), m)
        } else if let Some(m) = caps.name("ident") {
            (Token::Ident(m.as_str()), m)
        } else if let Some(m) = caps.name("operator") {
            (Token::Operator(m.as_str()), m)
        } else {
            let m = caps.name("grouping")?;
            (Token::Grouping(m.as_str()), m)
        };
        Some((token, m.range()))
    })
}

/// Split expression source into tokens, skipping whitespace and anything unrecognized.
pub fn tokenize(source: &str) -> impl Iterator<Item = Token<'_>> {
    spanned(source).map(|(token, _)| token)
}

/// How a variable is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceForm {
    /// `variables.name` or `variables['name']`
    Read,

    /// `has(variables.name)`
    Presence,
}

/// A read of `variables` and the source range it covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableReference {
    pub name: String,
    pub range: Range<usize>,
    pub form: ReferenceForm,
}

/// Every `variables.<name>` and `variables['<name>']` read, in source order.
pub fn variable_references(source: &str) -> Vec<VariableReference> {
    let tokens: Vec<_> = spanned(source).collect();
    let token = |i: usize| tokens.get(i).map(|(t, _)| *t);
    let mut references = Vec::new();

    for (i, (t, range)) in tokens.iter().enumerate() {
        if *t != Token::Ident(VARIABLES) || i.checked_sub(1).and_then(token) == Some(Token::Operator(".")) {
            continue;
        }

        let (name, last) = match (token(i + 1), token(i + 2), token(i + 3)) {
            (Some(Token::Operator(".")), Some(Token::Ident(name)), next) if next != Some(Token::Grouping("(")) => (name, i + 2),
            (Some(Token::Grouping("[")), Some(Token::Literal(literal)), Some(Token::Grouping("]"))) => match string_literal(literal) {
                Some(name) => (name, i + 3),
                None => continue,
            },
            _ => continue,
        };

        let end = tokens[last].1.end;
        let within_has = i >= 2
            && token(i - 2) == Some(Token::Ident("has"))
            && token(i - 1) == Some(Token::Grouping("("))
            && token(last + 1) == Some(Token::Grouping(")"));

        references.push(if within_has {
            VariableReference {
                name: name.to_string(),
                range: tokens[i - 2].1.start..tokens[last + 1].1.end,
                form: ReferenceForm::Presence,
            }
        } else {
            VariableReference {
                name: name.to_string(),
                range: range.start..end,
                form: ReferenceForm::Read,
            }
        });
    }

    references
}

/// The contents of a plain quoted literal that spells an identifier
fn string_literal(literal: &str) -> Option<&str> {
    let inner = literal
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| literal.strip_prefix('"').and_then(|s| s.strip_suffix('"')))?;

    let mut chars = inner.chars();
    let first = chars.next()?;
    ((first.is_ascii_alphabetic() || first == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')).then_some(inner)
}

/// Estimated execution cost: one unit per evaluation step.
pub fn estimate_cost(source: &str) -> u64 {
    tokenize(source).filter(Token::is_step).map(|_| 1).sum()
}
