// 🏷️ Risk Rules - Rules as Data
// Declarative when/then rules, grouped into packages and loaded from JSON

use serde::{Deserialize, Serialize};

use crate::entities::{AlertType, Decision, Severity};
use crate::error::{Result, RiskError};
use crate::facts::{Fact, FactKind, FactValue};

// ============================================================================
// PACKAGES
// ============================================================================

/// Which pipeline a rule set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RulePackage {
    Transaction,
    Credit,
    Loan,
    Profile,
}

impl RulePackage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RulePackage::Transaction => "TRANSACTION",
            RulePackage::Credit => "CREDIT",
            RulePackage::Loan => "LOAN",
            RulePackage::Profile => "PROFILE",
        }
    }
}

// ============================================================================
// CONDITIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    pub value: FactValue,
}

/// Some(equal) for comparable values, None on a type mismatch
fn values_equal(actual: &FactValue, expected: &FactValue) -> Option<bool> {
    match (actual, expected) {
        (FactValue::Bool(a), FactValue::Bool(b)) => Some(a == b),
        (FactValue::Number(a), FactValue::Number(b)) => Some((a - b).abs() < 1e-9),
        (FactValue::Text(a), FactValue::Text(b)) => Some(a.eq_ignore_ascii_case(b)),
        _ => None,
    }
}

impl Condition {
    pub fn new(field: &str, op: Operator, value: FactValue) -> Self {
        Condition {
            field: field.to_string(),
            op,
            value,
        }
    }

    /// Missing fields and type mismatches never match
    pub fn matches(&self, fact: &Fact) -> bool {
        let Some(actual) = fact.get(&self.field) else {
            return false;
        };

        match self.op {
            Operator::Eq => values_equal(&actual, &self.value) == Some(true),
            Operator::Ne => values_equal(&actual, &self.value) == Some(false),
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
                let (Some(a), Some(b)) = (actual.as_number(), self.value.as_number()) else {
                    return false;
                };
                match self.op {
                    Operator::Gt => a > b,
                    Operator::Gte => a >= b,
                    Operator::Lt => a < b,
                    _ => a <= b,
                }
            }
            Operator::In | Operator::NotIn => {
                let FactValue::List(items) = &self.value else {
                    return false;
                };
                let comparable: Vec<bool> = items
                    .iter()
                    .filter_map(|item| values_equal(&actual, item))
                    .collect();
                if comparable.is_empty() {
                    return false;
                }
                let found = comparable.iter().any(|eq| *eq);
                if self.op == Operator::In {
                    found
                } else {
                    !found
                }
            }
        }
    }
}

// ============================================================================
// PATTERNS & ACTIONS
// ============================================================================

/// Matches facts of one kind satisfying every condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub fact: FactKind,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Pattern {
    pub fn matches(&self, fact: &Fact) -> bool {
        fact.kind() == self.fact && self.conditions.iter().all(|c| c.matches(fact))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Add risk points (may be negative)
    AddScore { points: f64 },

    /// Raise an alert; message may use {kind.field} placeholders
    RaiseAlert {
        alert_type: AlertType,
        severity: Severity,
        message: String,
    },

    SetDecision {
        decision: Decision,
        #[serde(default)]
        reason: Option<String>,
    },

    AddReason { reason: String },

    /// Credit score contribution, recorded as a named factor
    AdjustCredit { factor: String, points: i32 },

    /// Interest rate premium (percentage points)
    AdjustRate {
        delta: f64,
        #[serde(default)]
        reason: Option<String>,
    },
}

impl Action {
    fn templates(&self) -> Vec<&str> {
        match self {
            Action::RaiseAlert { message, .. } => vec![message.as_str()],
            Action::SetDecision {
                reason: Some(reason),
                ..
            }
            | Action::AdjustRate {
                reason: Some(reason),
                ..
            } => vec![reason.as_str()],
            Action::AddReason { reason } => vec![reason.as_str()],
            Action::AdjustCredit { factor, .. } => vec![factor.as_str()],
            _ => vec![],
        }
    }
}

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRule {
    /// Rule ID for tracking
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Higher fires first
    #[serde(default = "default_salience")]
    pub salience: i32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    pub when: Vec<Pattern>,
    pub then: Vec<Action>,
}

fn default_salience() -> i32 {
    0
}

fn default_enabled() -> bool {
    true
}

impl RiskRule {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(RiskError::invalid_rule("<unnamed>", "rule id must not be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(RiskError::invalid_rule(&self.id, "rule name must not be empty"));
        }
        if self.when.is_empty() {
            return Err(RiskError::invalid_rule(&self.id, "rule has no patterns"));
        }
        if self.then.is_empty() {
            return Err(RiskError::invalid_rule(&self.id, "rule has no actions"));
        }

        for pattern in &self.when {
            for condition in &pattern.conditions {
                if !pattern.fact.has_field(&condition.field) {
                    return Err(RiskError::invalid_rule(
                        &self.id,
                        format!("unknown field '{}' on {}", condition.field, pattern.fact),
                    ));
                }
                match (condition.op, &condition.value) {
                    (Operator::In | Operator::NotIn, FactValue::List(_)) => {}
                    (Operator::In | Operator::NotIn, _) => {
                        return Err(RiskError::invalid_rule(
                            &self.id,
                            format!("'{}' needs a list value", condition.field),
                        ));
                    }
                    (Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte, v)
                        if v.as_number().is_none() =>
                    {
                        return Err(RiskError::invalid_rule(
                            &self.id,
                            format!("'{}' compares against a non-number", condition.field),
                        ));
                    }
                    _ => {}
                }
            }
        }

        for action in &self.then {
            for template in action.templates() {
                for (kind, field) in placeholders(template) {
                    let parsed = FactKind::parse(&kind);
                    let patterns = parsed
                        .map(|k| self.when.iter().filter(|p| p.fact == k).count())
                        .unwrap_or(0);
                    match parsed {
                        // A placeholder renders from one fact, so its kind must be joined once
                        Some(_) if patterns > 1 => {
                            return Err(RiskError::invalid_rule(
                                &self.id,
                                format!(
                                    "placeholder {{{}.{}}} is ambiguous: {} patterns bind {}",
                                    kind, field, patterns, kind
                                ),
                            ));
                        }
                        Some(k) if patterns == 1 && k.has_field(&field) => {}
                        _ => {
                            return Err(RiskError::invalid_rule(
                                &self.id,
                                format!("placeholder {{{}.{}}} is not bound", kind, field),
                            ));
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

// ============================================================================
// RULE SET (one JSON file)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub package: RulePackage,

    #[serde(default)]
    pub description: Option<String>,

    pub rules: Vec<RiskRule>,
}

impl RuleSet {
    pub fn from_json(json: &str) -> Result<Self> {
        let set: RuleSet = serde_json::from_str(json)?;
        for rule in &set.rules {
            rule.validate()?;
        }
        Ok(set)
    }
}

// ============================================================================
// MESSAGE TEMPLATES
// ============================================================================

/// (kind, field) pairs referenced as {kind.field}
fn placeholders(template: &str) -> Vec<(String, String)> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        if let Some((kind, field)) = after[..end].split_once('.') {
            found.push((kind.to_string(), field.to_string()));
        }
        rest = &after[end + 1..];
    }
    found
}

/// Replace {kind.field} with values from the bound facts; unknown ones are left as-is.
///
/// Each placeholder reads the first bound fact of its kind. `RiskRule::validate`
/// rejects templates whose kind is bound by more than one pattern.
pub fn render_template(template: &str, bound: &[&Fact]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let inner = &after[..end];
        let value = inner.split_once('.').and_then(|(kind, field)| {
            let kind = FactKind::parse(kind)?;
            bound
                .iter()
                .find(|f| f.kind() == kind)
                .and_then(|f| f.get(field))
        });

        match value {
            Some(v) => out.push_str(&v.to_string()),
            None => {
                out.push('{');
                out.push_str(inner);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Account, AccountType, Channel, Transaction, TransactionType};

    fn tx_fact(amount: f64) -> Fact {
        Fact::Transaction(Transaction::new(
            "TX1",
            "ACC001",
            amount,
            TransactionType::Transfer,
            Channel::Online,
        ))
    }

    fn large_amount_rule() -> RiskRule {
        RiskRule {
            id: "TX_LARGE".to_string(),
            name: "Large amount".to_string(),
            description: None,
            salience: 10,
            enabled: true,
            when: vec![Pattern {
                fact: FactKind::Transaction,
                conditions: vec![Condition::new(
                    "amount",
                    Operator::Gte,
                    FactValue::Number(50_000.0),
                )],
            }],
            then: vec![Action::RaiseAlert {
                alert_type: AlertType::LargeAmount,
                severity: Severity::High,
                message: "Amount {transaction.amount} {transaction.currency}".to_string(),
            }],
        }
    }

    #[test]
    fn test_numeric_conditions() {
        let fact = tx_fact(9_500.0);
        assert!(Condition::new("amount", Operator::Gte, FactValue::Number(9_000.0)).matches(&fact));
        assert!(Condition::new("amount", Operator::Lt, FactValue::Number(10_000.0)).matches(&fact));
        assert!(!Condition::new("amount", Operator::Gt, FactValue::Number(9_500.0)).matches(&fact));
        assert!(Condition::new("amount", Operator::Lte, FactValue::Number(9_500.0)).matches(&fact));
    }

    #[test]
    fn test_text_conditions_ignore_case() {
        let fact = tx_fact(1.0);
        assert!(Condition::new("channel", Operator::Eq, FactValue::Text("online".into())).matches(&fact));
        assert!(Condition::new("channel", Operator::Ne, FactValue::Text("ATM".into())).matches(&fact));

        let any_of = FactValue::List(vec![
            FactValue::Text("ATM".into()),
            FactValue::Text("ONLINE".into()),
        ]);
        assert!(Condition::new("channel", Operator::In, any_of.clone()).matches(&fact));
        assert!(!Condition::new("channel", Operator::NotIn, any_of).matches(&fact));
    }

    #[test]
    fn test_missing_field_and_type_mismatch_never_match() {
        let fact = tx_fact(1.0);
        // merchant_category is None on this transaction
        assert!(!Condition::new("merchant_category", Operator::Ne, FactValue::Text("X".into())).matches(&fact));
        // Bool vs number
        assert!(!Condition::new("international", Operator::Eq, FactValue::Number(0.0)).matches(&fact));
        assert!(!Condition::new("international", Operator::Ne, FactValue::Number(0.0)).matches(&fact));
        // Ordering on text
        assert!(!Condition::new("channel", Operator::Gt, FactValue::Number(1.0)).matches(&fact));
    }

    #[test]
    fn test_pattern_checks_kind() {
        let pattern = Pattern {
            fact: FactKind::Account,
            conditions: vec![],
        };
        assert!(!pattern.matches(&tx_fact(1.0)));
        assert!(pattern.matches(&Fact::Account(Account::new("A", "C", AccountType::Savings, 1.0))));
    }

    #[test]
    fn test_validate_accepts_good_rule() {
        assert!(large_amount_rule().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_field() {
        let mut rule = large_amount_rule();
        rule.when[0].conditions[0].field = "amt".to_string();
        let err = rule.validate().unwrap_err();
        assert!(err.to_string().contains("unknown field 'amt'"));
    }

    #[test]
    fn test_validate_rejects_unbound_placeholder() {
        let mut rule = large_amount_rule();
        rule.then = vec![Action::AddReason {
            reason: "Balance {account.balance}".to_string(),
        }];
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_placeholder_on_self_join() {
        let mut rule = large_amount_rule();
        rule.when.push(Pattern {
            fact: FactKind::Account,
            conditions: vec![],
        });
        rule.when.push(Pattern {
            fact: FactKind::Account,
            conditions: vec![],
        });
        rule.then = vec![Action::AddReason {
            reason: "Account {account.account_number}".to_string(),
        }];
        let err = rule.validate().unwrap_err();
        assert!(err.to_string().contains("ambiguous"));

        // The same join is fine when nothing renders from the joined kind
        rule.then = vec![Action::AddReason {
            reason: "Amount {transaction.amount}".to_string(),
        }];
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_operands() {
        let mut rule = large_amount_rule();
        rule.when[0].conditions[0] = Condition::new("channel", Operator::In, FactValue::Text("ATM".into()));
        assert!(rule.validate().is_err());

        let mut rule = large_amount_rule();
        rule.when[0].conditions[0] = Condition::new("amount", Operator::Gt, FactValue::Text("big".into()));
        assert!(rule.validate().is_err());

        let mut rule = large_amount_rule();
        rule.then.clear();
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_render_template() {
        let fact = tx_fact(75_000.0);
        let rendered = render_template("Amount {transaction.amount} {transaction.currency}", &[&fact]);
        assert_eq!(rendered, "Amount 75000 USD");

        // Unbound and malformed placeholders survive untouched
        assert_eq!(render_template("{account.balance} {oops", &[&fact]), "{account.balance} {oops");
    }

    #[test]
    fn test_rule_json_roundtrip_shape() {
        let json = r#"{
            "package": "TRANSACTION",
            "rules": [{
                "id": "TX_NIGHT",
                "name": "Night time",
                "salience": 50,
                "when": [{"fact": "transaction", "conditions": [
                    {"field": "night_time", "op": "eq", "value": true},
                    {"field": "amount", "op": "gte", "value": 5000}
                ]}],
                "then": [
                    {"type": "add_score", "points": 15},
                    {"type": "set_decision", "decision": "REVIEW"}
                ]
            }]
        }"#;

        let set = RuleSet::from_json(json).unwrap();
        assert_eq!(set.package, RulePackage::Transaction);
        assert_eq!(set.rules[0].salience, 50);
        assert!(set.rules[0].enabled);
        assert_eq!(set.rules[0].then[0], Action::AddScore { points: 15.0 });
    }
}
