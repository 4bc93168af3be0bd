//! Rule sets: the mapping from action names to expressions.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use omniledger_core::canonical::text;
use omniledger_core::Identity;

use crate::error::{DarcError, Result};
use crate::expression::Expression;

/// Action that authorizes a new version of a document.
pub const EVOLVE_ACTION: &str = "invoke:evolve";

/// Rule consulted when the document is used as a delegated identity, and as
/// the bootstrap fallback when a document spawns itself.
pub const SIGN_ACTION: &str = "_sign";

/// Action name for spawning an instance of the given contract kind.
pub fn spawn_action(contract_kind: &str) -> String {
    format!("spawn:{contract_kind}")
}

/// Action name for invoking the given command.
pub fn invoke_action(command: &str) -> String {
    format!("invoke:{command}")
}

/// Action names mapped to the expressions that authorize them.
///
/// Keys are unique and kept in byte order. Mutations return a new rule set
/// and leave the original untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rules(BTreeMap<String, Expression>);

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard starting rule set: owners may evolve, signers may sign.
    pub fn init(owners: &[Identity], signers: &[Identity]) -> Self {
        let mut rules = BTreeMap::new();
        rules.insert(EVOLVE_ACTION.to_string(), Expression::any_of(owners));
        rules.insert(SIGN_ACTION.to_string(), Expression::any_of(signers));
        Self(rules)
    }

    pub fn get(&self, action: &str) -> Option<&Expression> {
        self.0.get(action)
    }

    pub fn contains(&self, action: &str) -> bool {
        self.0.contains_key(action)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in action-name byte order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expression)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Add a rule for an action that has none yet.
    pub fn with_rule(&self, action: impl Into<String>, expr: Expression) -> Result<Self> {
        let action = action.into();
        if self.0.contains_key(&action) {
            return Err(DarcError::RuleExists { action });
        }
        let mut next = self.0.clone();
        next.insert(action, expr);
        Ok(Self(next))
    }

    /// Replace the expression of an existing rule.
    pub fn with_updated_rule(&self, action: impl Into<String>, expr: Expression) -> Result<Self> {
        let action = action.into();
        if !self.0.contains_key(&action) {
            return Err(DarcError::RuleNotFound { action });
        }
        let mut next = self.0.clone();
        next.insert(action, expr);
        Ok(Self(next))
    }

    /// Drop the rule for an action.
    pub fn without_rule(&self, action: &str) -> Result<Self> {
        let mut next = self.0.clone();
        next.remove(action).ok_or_else(|| DarcError::RuleNotFound {
            action: action.to_string(),
        })?;
        Ok(Self(next))
    }

    /// Validate every expression.
    pub fn validate(&self) -> Result<()> {
        for (action, expr) in &self.0 {
            expr.validate().map_err(|e| {
                DarcError::InvalidExpression(format!("rule {action}: {e}"))
            })?;
        }
        Ok(())
    }

    /// Canonical value: `[[action, expression], ...]` in action-name byte order.
    pub fn to_canonical_value(&self) -> Value {
        Value::Array(
            self.0
                .iter()
                .map(|(action, expr)| Value::Array(vec![text(action), expr.to_canonical_value()]))
                .collect(),
        )
    }
}

impl FromIterator<(String, Expression)> for Rules {
    fn from_iter<I: IntoIterator<Item = (String, Expression)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
