//! Boolean and threshold expressions over identities.
//!
//! Expressions are evaluated against a predicate telling whether a given
//! identity is satisfied (typically: it produced a valid signature). An
//! expression can never be satisfied by an empty signer set: empty
//! conjunctions, empty disjunctions and zero thresholds are invalid and
//! evaluate to `false`.
//!
//! ## Text form
//!
//! ```text
//! expr  := and ('|' and)*
//! and   := atom ('&' atom)*
//! atom  := identity | '(' expr ')' | N 'of' '(' expr (',' expr)* ')'
//! ```
//!
//! For example `ed25519:ab.. & (2 of (ed25519:cd.., ed25519:ef.., darc:01..))`.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use omniledger_core::canonical::{bytes, uint};
use omniledger_core::Identity;

use crate::error::{DarcError, Result};

/// Deepest nesting of parentheses and thresholds the text parser accepts.
pub const MAX_PARSE_DEPTH: usize = 64;

/// A formula over identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expression {
    /// Satisfied by this identity alone.
    Id(Identity),
    /// Satisfied when every sub-expression is.
    And(Vec<Expression>),
    /// Satisfied when any sub-expression is.
    Or(Vec<Expression>),
    /// Satisfied when at least `threshold` sub-expressions are.
    Threshold { threshold: usize, of: Vec<Expression> },
}

impl Expression {
    /// Any one of the given identities suffices.
    pub fn any_of(identities: &[Identity]) -> Self {
        match identities {
            [single] => Expression::Id(*single),
            many => Expression::Or(many.iter().copied().map(Expression::Id).collect()),
        }
    }

    /// All of the given identities are required.
    pub fn all_of(identities: &[Identity]) -> Self {
        match identities {
            [single] => Expression::Id(*single),
            many => Expression::And(many.iter().copied().map(Expression::Id).collect()),
        }
    }

    /// `threshold` of the given identities are required.
    pub fn threshold(threshold: usize, identities: &[Identity]) -> Self {
        Expression::Threshold {
            threshold,
            of: identities.iter().copied().map(Expression::Id).collect(),
        }
    }

    /// Check structural validity.
    pub fn validate(&self) -> Result<()> {
        match self {
            Expression::Id(_) => Ok(()),
            Expression::And(items) | Expression::Or(items) => {
                if items.is_empty() {
                    return Err(DarcError::InvalidExpression(
                        "empty conjunction or disjunction".into(),
                    ));
                }
                items.iter().try_for_each(Expression::validate)
            }
            Expression::Threshold { threshold, of } => {
                if *threshold == 0 || *threshold > of.len() {
                    return Err(DarcError::InvalidExpression(format!(
                        "threshold {} out of range 1..={}",
                        threshold,
                        of.len()
                    )));
                }
                of.iter().try_for_each(Expression::validate)
            }
        }
    }

    /// Evaluate against a predicate over identities.
    pub fn evaluate(&self, satisfied: &dyn Fn(&Identity) -> bool) -> bool {
        match self {
            Expression::Id(id) => satisfied(id),
            Expression::And(items) => {
                !items.is_empty() && items.iter().all(|e| e.evaluate(satisfied))
            }
            Expression::Or(items) => items.iter().any(|e| e.evaluate(satisfied)),
            Expression::Threshold { threshold, of } => {
                *threshold > 0 && of.iter().filter(|e| e.evaluate(satisfied)).count() >= *threshold
            }
        }
    }

    /// Every identity mentioned anywhere in the expression.
    pub fn identities(&self) -> BTreeSet<Identity> {
        let mut out = BTreeSet::new();
        self.collect_identities(&mut out);
        out
    }

    fn collect_identities(&self, out: &mut BTreeSet<Identity>) {
        match self {
            Expression::Id(id) => {
                out.insert(*id);
            }
            Expression::And(items) | Expression::Or(items) => {
                items.iter().for_each(|e| e.collect_identities(out))
            }
            Expression::Threshold { of, .. } => of.iter().for_each(|e| e.collect_identities(out)),
        }
    }

    /// Canonical CBOR value: `[tag, ...]`.
    pub fn to_canonical_value(&self) -> Value {
        let list = |items: &[Expression]| {
            Value::Array(items.iter().map(Expression::to_canonical_value).collect())
        };
        match self {
            Expression::Id(id) => Value::Array(vec![uint(0), bytes(&id.canonical_bytes())]),
            Expression::And(items) => Value::Array(vec![uint(1), list(items)]),
            Expression::Or(items) => Value::Array(vec![uint(2), list(items)]),
            Expression::Threshold { threshold, of } => {
                Value::Array(vec![uint(3), uint(*threshold as u64), list(of)])
            }
        }
    }

    fn fmt_atom(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::And(items) | Expression::Or(items) if items.len() > 1 => {
                write!(f, "({})", self)
            }
            _ => write!(f, "{}", self),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, items: &[Expression], sep: &str| {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                item.fmt_atom(f)?;
            }
            Ok(())
        };
        match self {
            Expression::Id(id) => write!(f, "{}", id),
            Expression::And(items) => join(f, items, " & "),
            Expression::Or(items) => join(f, items, " | "),
            Expression::Threshold { threshold, of } => {
                write!(f, "{} of (", threshold)?;
                for (i, item) in of.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl FromStr for Expression {
    type Err = DarcError;

    fn from_str(s: &str) -> Result<Self> {
        let tokens = tokenize(s);
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(DarcError::InvalidExpression(format!(
                "unexpected trailing input in {s:?}"
            )));
        }
        Ok(expr)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Comma,
    And,
    Or,
    Word(String),
}

fn tokenize(s: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if !word.is_empty() {
            tokens.push(Token::Word(std::mem::take(word)));
        }
    };

    for c in s.chars() {
        let token = match c {
            '(' => Some(Token::Open),
            ')' => Some(Token::Close),
            ',' => Some(Token::Comma),
            '&' => Some(Token::And),
            '|' => Some(Token::Or),
            c if c.is_whitespace() => None,
            c => {
                word.push(c);
                continue;
            }
        };
        flush(&mut word, &mut tokens);
        if let Some(token) = token {
            tokens.push(token);
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(ref t) if *t == expected => Ok(()),
            other => Err(DarcError::InvalidExpression(format!(
                "expected {expected:?}, found {other:?}"
            ))),
        }
    }

    fn expr(&mut self) -> Result<Expression> {
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            return Err(DarcError::InvalidExpression(format!(
                "nested deeper than {MAX_PARSE_DEPTH}"
            )));
        }
        let expr = self.or();
        self.depth -= 1;
        expr
    }

    fn or(&mut self) -> Result<Expression> {
        let mut items = vec![self.and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            items.push(self.and()?);
        }
        Ok(collapse(items, Expression::Or))
    }

    fn and(&mut self) -> Result<Expression> {
        let mut items = vec![self.atom()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            items.push(self.atom()?);
        }
        Ok(collapse(items, Expression::And))
    }

    fn atom(&mut self) -> Result<Expression> {
        match self.next() {
            Some(Token::Open) => {
                let inner = self.expr()?;
                self.expect(Token::Close)?;
                Ok(inner)
            }
            Some(Token::Word(word)) if word.chars().all(|c| c.is_ascii_digit()) => {
                let threshold: usize = word
                    .parse()
                    .map_err(|_| DarcError::InvalidExpression(format!("bad threshold {word}")))?;
                self.expect(Token::Word("of".into()))?;
                self.expect(Token::Open)?;
                let mut of = vec![self.expr()?];
                while self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                    of.push(self.expr()?);
                }
                self.expect(Token::Close)?;
                Ok(Expression::Threshold { threshold, of })
            }
            Some(Token::Word(word)) => Ok(Expression::Id(word.parse::<Identity>()?)),
            other => Err(DarcError::InvalidExpression(format!(
                "expected identity or '(', found {other:?}"
            ))),
        }
    }
}

fn collapse(mut items: Vec<Expression>, wrap: fn(Vec<Expression>) -> Expression) -> Expression {
    if items.len() == 1 {
        items.remove(0)
    } else {
        wrap(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniledger_core::{Ed25519PublicKey, Keypair, Signer};

    fn ids(n: u8) -> Vec<Identity> {
        (1..=n)
            .map(|i| Keypair::from_seed(&[i; 32]).identity())
            .collect()
    }

    fn present(set: &[Identity]) -> impl Fn(&Identity) -> bool + '_ {
        move |id| set.contains(id)
    }

    #[test]
    fn test_or_and_threshold() {
        let all = ids(3);
        let or = Expression::any_of(&all);
        let and = Expression::all_of(&all);
        let two = Expression::threshold(2, &all);

        assert!(or.evaluate(&present(&all[..1])));
        assert!(!and.evaluate(&present(&all[..2])));
        assert!(and.evaluate(&present(&all)));
        assert!(!two.evaluate(&present(&all[2..])));
        assert!(two.evaluate(&present(&all[1..])));
    }

    #[test]
    fn test_empty_set_never_satisfies() {
        let all = ids(2);
        for expr in [
            Expression::any_of(&all),
            Expression::all_of(&all),
            Expression::threshold(1, &all),
            Expression::And(vec![]),
            Expression::Or(vec![]),
        ] {
            assert!(!expr.evaluate(&present(&[])), "{expr}");
        }
    }

    #[test]
    fn test_validate_rejects_degenerate_shapes() {
        let all = ids(2);
        assert!(Expression::And(vec![]).validate().is_err());
        assert!(Expression::Or(vec![]).validate().is_err());
        assert!(Expression::threshold(0, &all).validate().is_err());
        assert!(Expression::threshold(3, &all).validate().is_err());
        assert!(Expression::threshold(2, &all).validate().is_ok());
    }

    #[test]
    fn test_zero_threshold_fails_closed() {
        let all = ids(2);
        assert!(!Expression::threshold(0, &all).evaluate(&present(&all)));
    }

    #[test]
    fn test_text_roundtrip() {
        let all = ids(4);
        let expr = Expression::And(vec![
            Expression::Id(all[0]),
            Expression::Or(vec![Expression::Id(all[1]), Expression::Id(all[2])]),
            Expression::threshold(1, &all[2..]),
        ]);
        let text = expr.to_string();
        let parsed: Expression = text.parse().unwrap();
        assert_eq!(parsed, expr);
    }

    #[test]
    fn test_parse_precedence() {
        let all = ids(3);
        let text = format!("{} | {} & {}", all[0], all[1], all[2]);
        let parsed: Expression = text.parse().unwrap();
        assert_eq!(
            parsed,
            Expression::Or(vec![
                Expression::Id(all[0]),
                Expression::And(vec![Expression::Id(all[1]), Expression::Id(all[2])]),
            ])
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<Expression>().is_err());
        assert!("(ed25519:00".parse::<Expression>().is_err());
        assert!("2 (a, b)".parse::<Expression>().is_err());
        let id = Identity::Ed25519(Ed25519PublicKey::from_bytes([1; 32]));
        assert!(format!("{id} {id}").parse::<Expression>().is_err());
    }

    #[test]
    fn test_parse_depth_is_bounded() {
        let id = Identity::Ed25519(Ed25519PublicKey::from_bytes([1; 32]));
        let nested = |n: usize| format!("{}{id}{}", "(".repeat(n), ")".repeat(n));

        assert_eq!(
            nested(MAX_PARSE_DEPTH - 1).parse::<Expression>().unwrap(),
            Expression::Id(id)
        );
        assert!(matches!(
            nested(MAX_PARSE_DEPTH).parse::<Expression>(),
            Err(DarcError::InvalidExpression(_))
        ));
        assert!("(".repeat(100_000).parse::<Expression>().is_err());
    }

    #[test]
    fn test_identities_collected() {
        let all = ids(3);
        let expr = Expression::Or(vec![
            Expression::Id(all[0]),
            Expression::threshold(1, &all[1..]),
        ]);
        assert_eq!(expr.identities().len(), 3);
    }

    #[test]
    fn test_canonical_value_distinguishes_shapes() {
        let all = ids(2);
        let and = omniledger_core::encode_canonical(&Expression::all_of(&all).to_canonical_value());
        let or = omniledger_core::encode_canonical(&Expression::any_of(&all).to_canonical_value());
        assert_ne!(and, or);
    }
}
