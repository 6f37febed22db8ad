//! Context expressions and priority evaluation
//!
//! Every item may carry a context expression naming the profile contexts
//! (host roles, hardware classes, profile layers) it applies to. The
//! expression is evaluated against the set of enabled contexts and yields
//! the item's priority:
//!
//! - an empty expression is always active with priority `0`
//! - a context name yields that context's priority, or [`INACTIVE`] when
//!   the context is not enabled
//! - `a && b` is inactive unless both sides are active, otherwise the sum
//!   of both priorities (more specific definitions win)
//! - `a || b` is the larger of both priorities
//! - `!a` is `0` when `a` is inactive, otherwise inactive
//!
//! # Grammar
//!
//! ```text
//! expr  := and ( ("||" | "|" | ",") and )*
//! and   := unary ( ("&&" | "&") unary )*
//! unary := "!" unary | atom
//! atom  := NAME | "true" | "false" | "(" expr ")"
//! ```

use crate::{Item, ModelError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Priority of an item whose context does not apply
pub const INACTIVE: i32 = -1;

/// Priority of an item without a context expression
pub const ALWAYS: i32 = 0;

/// Check whether a string is a valid context name
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && name.chars().all(is_name_char)
        && name != "true"
        && name != "false"
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '/' | '+' | '-')
}

/// Parsed context expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextExpr {
    True,
    False,
    Name(String),
    Not(Box<ContextExpr>),
    And(Box<ContextExpr>, Box<ContextExpr>),
    Or(Box<ContextExpr>, Box<ContextExpr>),
}

impl ContextExpr {
    /// Parse an expression; the empty string parses to `True`
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Ok(ContextExpr::True);
        }

        let mut parser = Parser {
            input,
            tokens,
            pos: 0,
        };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(parser.error(format!("unexpected {}", token)));
        }
        Ok(expr)
    }

    /// Evaluate against a context set
    pub fn evaluate(&self, contexts: &ContextSet) -> i32 {
        match self {
            ContextExpr::True => ALWAYS,
            ContextExpr::False => INACTIVE,
            ContextExpr::Name(name) => contexts.priority_of(name).unwrap_or(INACTIVE),
            ContextExpr::Not(inner) => {
                if inner.evaluate(contexts) < 0 {
                    ALWAYS
                } else {
                    INACTIVE
                }
            }
            ContextExpr::And(lhs, rhs) => {
                let l = lhs.evaluate(contexts);
                let r = rhs.evaluate(contexts);
                if l < 0 || r < 0 {
                    INACTIVE
                } else {
                    l.saturating_add(r)
                }
            }
            ContextExpr::Or(lhs, rhs) => lhs.evaluate(contexts).max(rhs.evaluate(contexts)),
        }
    }

    /// Context names referenced by the expression
    pub fn names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            ContextExpr::True | ContextExpr::False => {}
            ContextExpr::Name(name) => names.push(name),
            ContextExpr::Not(inner) => inner.collect_names(names),
            ContextExpr::And(lhs, rhs) | ContextExpr::Or(lhs, rhs) => {
                lhs.collect_names(names);
                rhs.collect_names(names);
            }
        }
    }
}

impl fmt::Display for ContextExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextExpr::True => write!(f, "true"),
            ContextExpr::False => write!(f, "false"),
            ContextExpr::Name(name) => write!(f, "{}", name),
            ContextExpr::Not(inner) => write!(f, "!{}", inner),
            ContextExpr::And(lhs, rhs) => write!(f, "({} && {})", lhs, rhs),
            ContextExpr::Or(lhs, rhs) => write!(f, "({} || {})", lhs, rhs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Name(String),
    And,
    Or,
    Not,
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(name) => write!(f, "'{}'", name),
            Token::And => write!(f, "'&&'"),
            Token::Or => write!(f, "'||'"),
            Token::Not => write!(f, "'!'"),
            Token::Open => write!(f, "'('"),
            Token::Close => write!(f, "')'"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            '!' => tokens.push(Token::Not),
            ',' => tokens.push(Token::Or),
            '|' => {
                chars.next_if(|(_, c)| *c == '|');
                tokens.push(Token::Or);
            }
            '&' => {
                chars.next_if(|(_, c)| *c == '&');
                tokens.push(Token::And);
            }
            c if is_name_char(c) && c != '-' => {
                let mut end = start + c.len_utf8();
                while let Some((idx, c)) = chars.next_if(|(_, c)| is_name_char(*c)) {
                    end = idx + c.len_utf8();
                }
                tokens.push(Token::Name(input[start..end].to_string()));
            }
            other => {
                return Err(ModelError::Context {
                    expr: input.to_string(),
                    message: format!("unexpected character '{}' at offset {}", other, start),
                })
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn error(&self, message: impl Into<String>) -> ModelError {
        ModelError::Context {
            expr: self.input.to_string(),
            message: message.into(),
        }
    }

    fn parse_or(&mut self) -> Result<ContextExpr> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = ContextExpr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<ContextExpr> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = ContextExpr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<ContextExpr> {
        match self.advance() {
            Some(Token::Not) => Ok(ContextExpr::Not(Box::new(self.parse_unary()?))),
            Some(Token::Open) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::Close) => Ok(inner),
                    Some(token) => Err(self.error(format!("expected ')', found {}", token))),
                    None => Err(self.error("unbalanced '('")),
                }
            }
            Some(Token::Name(name)) => Ok(match name.as_str() {
                "true" => ContextExpr::True,
                "false" => ContextExpr::False,
                _ => ContextExpr::Name(name),
            }),
            Some(token) => Err(self.error(format!("unexpected {}", token))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

/// The set of enabled contexts and their priorities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextSet {
    contexts: IndexMap<String, i32>,
}

impl ContextSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context set from profile layers; later layers get higher
    /// priorities, starting at 1
    pub fn from_layers<I, S>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for (idx, name) in layers.into_iter().enumerate() {
            let priority = i32::try_from(idx + 1)
                .map_err(|_| ModelError::validation("context", "too many layers"))?;
            set.enable(name, priority)?;
        }
        Ok(set)
    }

    /// Enable a context with the given priority
    pub fn enable(&mut self, name: impl Into<String>, priority: i32) -> Result<()> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(ModelError::validation(
                "context",
                format!("'{}' is not a valid context name", name),
            ));
        }
        if priority <= 0 {
            return Err(ModelError::validation(
                "context",
                format!("priority of '{}' must be positive, got {}", name, priority),
            ));
        }
        self.contexts.insert(name, priority);
        Ok(())
    }

    /// Disable a context
    pub fn disable(&mut self, name: &str) -> bool {
        self.contexts.shift_remove(name).is_some()
    }

    pub fn priority_of(&self, name: &str) -> Option<i32> {
        self.contexts.get(name).copied()
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.contexts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.contexts.iter().map(|(name, p)| (name.as_str(), *p))
    }

    /// Evaluate an expression string
    pub fn evaluate(&self, expr: &str) -> Result<i32> {
        let priority = ContextExpr::parse(expr)?.evaluate(self);
        trace!(expr, priority, "evaluated context");
        Ok(priority)
    }

    /// Evaluate the context expression of an item
    pub fn evaluate_item<T: Item + ?Sized>(&self, item: &T) -> Result<i32> {
        self.evaluate(item.context())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn contexts() -> ContextSet {
        ContextSet::from_layers(["base", "laptop", "site/berlin"]).unwrap()
    }

    #[test]
    fn test_empty_expression_always_active() {
        assert_eq!(contexts().evaluate("").unwrap(), ALWAYS);
        assert_eq!(contexts().evaluate("   ").unwrap(), ALWAYS);
    }

    #[test]
    fn test_names() {
        let set = contexts();
        assert_eq!(set.evaluate("base").unwrap(), 1);
        assert_eq!(set.evaluate("site/berlin").unwrap(), 3);
        assert_eq!(set.evaluate("server").unwrap(), INACTIVE);
    }

    #[test]
    fn test_operators() {
        let set = contexts();
        assert_eq!(set.evaluate("base && laptop").unwrap(), 3);
        assert_eq!(set.evaluate("base & server").unwrap(), INACTIVE);
        assert_eq!(set.evaluate("server || laptop").unwrap(), 2);
        assert_eq!(set.evaluate("server, base").unwrap(), 1);
        assert_eq!(set.evaluate("!server").unwrap(), ALWAYS);
        assert_eq!(set.evaluate("!base").unwrap(), INACTIVE);
        assert_eq!(set.evaluate("(server | laptop) && !desktop").unwrap(), 2);
    }

    #[test]
    fn test_keywords() {
        let set = contexts();
        assert_eq!(set.evaluate("true").unwrap(), ALWAYS);
        assert_eq!(set.evaluate("false").unwrap(), INACTIVE);
        assert_eq!(set.evaluate("false || laptop").unwrap(), 2);
    }

    #[test]
    fn test_malformed() {
        let set = contexts();
        assert_matches!(set.evaluate("base &&"), Err(ModelError::Context { .. }));
        assert_matches!(set.evaluate("(base"), Err(ModelError::Context { .. }));
        assert_matches!(set.evaluate("base)"), Err(ModelError::Context { .. }));
        assert_matches!(set.evaluate("base $ laptop"), Err(ModelError::Context { .. }));
        assert_matches!(set.evaluate("base laptop"), Err(ModelError::Context { .. }));
    }

    #[test]
    fn test_parse_display() {
        let expr = ContextExpr::parse("a && !b || c").unwrap();
        assert_eq!(expr.to_string(), "((a && !b) || c)");
        assert_eq!(expr.names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_enable_validation() {
        let mut set = ContextSet::new();
        assert!(set.enable("laptop", 0).is_err());
        assert!(set.enable("-laptop", 1).is_err());
        assert!(set.enable("true", 1).is_err());
        set.enable("laptop", 4).unwrap();
        assert!(set.is_enabled("laptop"));
        assert!(set.disable("laptop"));
        assert!(set.is_empty());
    }
}
