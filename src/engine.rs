// ⚙️ Rule Engine - working memory, agenda, firing
//
// Services only see the InferenceEngine trait. RuleEngine is the built-in
// implementation: match every rule against working memory, order activations
// by salience, fire each exactly once. No truth maintenance, no re-evaluation
// after firing.

use anyhow::{Context as AnyhowContext, Result as AnyResult};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::entities::{AlertType, Decision, ScoreFactor, Severity};
use crate::error::{Result, RiskError};
use crate::facts::{Fact, FactKind};
use crate::rules::{render_template, Action, RiskRule, RulePackage, RuleSet};

const TRANSACTION_RULES: &str = include_str!("../rules/transaction_rules.json");
const CREDIT_RULES: &str = include_str!("../rules/credit_rules.json");
const LOAN_RULES: &str = include_str!("../rules/loan_rules.json");
const PROFILE_RULES: &str = include_str!("../rules/profile_rules.json");

// ============================================================================
// WORKING MEMORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FactHandle(usize);

/// Per-request fact store; built, fired against, dropped
#[derive(Debug, Default)]
pub struct WorkingMemory {
    facts: Vec<Fact>,
}

impl WorkingMemory {
    pub fn new() -> Self {
        WorkingMemory { facts: Vec::new() }
    }

    pub fn insert(&mut self, fact: Fact) -> FactHandle {
        self.facts.push(fact);
        FactHandle(self.facts.len() - 1)
    }

    pub fn get(&self, handle: FactHandle) -> Option<&Fact> {
        self.facts.get(handle.0)
    }

    pub fn facts_of(&self, kind: FactKind) -> impl Iterator<Item = (FactHandle, &Fact)> {
        self.facts
            .iter()
            .enumerate()
            .filter(move |(_, f)| f.kind() == kind)
            .map(|(i, f)| (FactHandle(i), f))
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

// ============================================================================
// INFERENCE OUTPUT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiredRule {
    pub rule_id: String,
    pub rule_name: String,
    pub salience: i32,
}

/// An alert a rule asked for; the service turns it into a RiskAlert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertSpec {
    pub rule_id: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    pub account_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Inference {
    pub fired: Vec<FiredRule>,
    pub score_delta: f64,
    pub alerts: Vec<AlertSpec>,

    /// Most restrictive decision any rule set; None when no rule decided
    pub decision: Option<Decision>,
    pub reasons: Vec<String>,
    pub credit_factors: Vec<ScoreFactor>,
    pub rate_adjustment: f64,
}

impl Inference {
    pub fn fired_rule_ids(&self) -> Vec<String> {
        self.fired.iter().map(|f| f.rule_id.clone()).collect()
    }

    pub fn has_fired(&self, rule_id: &str) -> bool {
        self.fired.iter().any(|f| f.rule_id == rule_id)
    }

    fn push_reason(&mut self, reason: String) {
        if !self.reasons.contains(&reason) {
            self.reasons.push(reason);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSummary {
    pub id: String,
    pub name: String,
    pub package: RulePackage,
    pub salience: i32,
    pub enabled: bool,
    pub description: Option<String>,
}

// ============================================================================
// ENGINE TRAIT
// ============================================================================

pub trait InferenceEngine: Send + Sync {
    /// Fire every rule of `package` that matches `memory`
    fn fire_all(&self, package: RulePackage, memory: &WorkingMemory) -> Inference;

    fn summaries(&self) -> Vec<RuleSummary>;
}

// ============================================================================
// RULE ENGINE
// ============================================================================

struct Activation<'a> {
    rule: &'a RiskRule,
    order: usize,
    facts: Vec<FactHandle>,
}

#[derive(Debug)]
pub struct RuleEngine {
    sets: Vec<RuleSet>,
}

impl RuleEngine {
    /// Create engine from rule sets; rule ids must be unique across sets
    pub fn from_sets(sets: Vec<RuleSet>) -> Result<Self> {
        let mut seen = HashSet::new();
        for set in &sets {
            for rule in &set.rules {
                rule.validate()?;
                if !seen.insert(rule.id.clone()) {
                    return Err(RiskError::invalid_rule(&rule.id, "duplicate rule id"));
                }
            }
        }
        Ok(RuleEngine { sets })
    }

    /// The four packages shipped in rules/
    pub fn with_default_rules() -> Result<Self> {
        let sets = [TRANSACTION_RULES, CREDIT_RULES, LOAN_RULES, PROFILE_RULES]
            .iter()
            .map(|json| RuleSet::from_json(json))
            .collect::<Result<Vec<_>>>()?;
        Self::from_sets(sets)
    }

    /// Load rules from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AnyResult<Self> {
        let set = load_rule_set(path.as_ref())?;
        Ok(Self::from_sets(vec![set])?)
    }

    /// Load every *.json rule set in a directory (sorted by file name)
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> AnyResult<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).with_context(|| format!("Failed to read rules directory: {:?}", dir))? {
            let path = entry
                .with_context(|| format!("Failed to read entry in rules directory: {:?}", dir))?
                .path();
            if path.extension().map(|ext| ext == "json").unwrap_or(false) {
                paths.push(path);
            }
        }
        paths.sort();

        let sets = paths
            .iter()
            .map(|p| load_rule_set(p))
            .collect::<AnyResult<Vec<_>>>()?;

        if sets.is_empty() {
            anyhow::bail!("No rule files found in {:?}", dir);
        }

        let engine = Self::from_sets(sets)?;
        tracing::info!(dir = ?dir, rules = engine.rule_count(), "loaded rule sets");
        Ok(engine)
    }

    /// Get number of rules loaded
    pub fn rule_count(&self) -> usize {
        self.sets.iter().map(|s| s.rules.len()).sum()
    }

    fn rules_in(&self, package: RulePackage) -> impl Iterator<Item = &RiskRule> {
        self.sets
            .iter()
            .filter(move |s| s.package == package)
            .flat_map(|s| s.rules.iter())
            .filter(|r| r.enabled)
    }

    /// All fact combinations satisfying the rule's patterns; a fact binds at most one pattern
    fn match_rule(rule: &RiskRule, memory: &WorkingMemory) -> Vec<Vec<FactHandle>> {
        let mut combos: Vec<Vec<FactHandle>> = vec![Vec::new()];

        for pattern in &rule.when {
            let candidates: Vec<FactHandle> = memory
                .facts_of(pattern.fact)
                .filter(|(_, fact)| pattern.matches(fact))
                .map(|(handle, _)| handle)
                .collect();

            let mut next = Vec::new();
            for combo in &combos {
                for handle in &candidates {
                    if combo.contains(handle) {
                        continue;
                    }
                    let mut extended = combo.clone();
                    extended.push(*handle);
                    next.push(extended);
                }
            }
            combos = next;
            if combos.is_empty() {
                break;
            }
        }

        combos
    }

    fn agenda<'a>(&'a self, package: RulePackage, memory: &WorkingMemory) -> Vec<Activation<'a>> {
        let mut activations: Vec<Activation<'a>> = self
            .rules_in(package)
            .enumerate()
            .flat_map(|(order, rule)| {
                Self::match_rule(rule, memory)
                    .into_iter()
                    .map(move |facts| Activation { rule, order, facts })
            })
            .collect();

        // Salience first, then declaration order, then fact order
        activations.sort_by(|a, b| {
            b.rule
                .salience
                .cmp(&a.rule.salience)
                .then(a.order.cmp(&b.order))
                .then(a.facts.cmp(&b.facts))
        });
        activations
    }

    fn fire(activation: &Activation<'_>, memory: &WorkingMemory, out: &mut Inference) {
        let bound: Vec<&Fact> = activation
            .facts
            .iter()
            .filter_map(|h| memory.get(*h))
            .collect();
        let rule = activation.rule;

        for action in &rule.then {
            match action {
                Action::AddScore { points } => out.score_delta += points,
                Action::RaiseAlert {
                    alert_type,
                    severity,
                    message,
                } => {
                    let account_number = bound
                        .iter()
                        .find(|f| f.kind() == FactKind::Account)
                        .or_else(|| bound.iter().find(|f| f.kind() == FactKind::Transaction))
                        .and_then(|f| f.get("account_number"))
                        .map(|v| v.to_string());
                    out.alerts.push(AlertSpec {
                        rule_id: rule.id.clone(),
                        alert_type: *alert_type,
                        severity: *severity,
                        message: render_template(message, &bound),
                        account_number,
                    });
                }
                Action::SetDecision { decision, reason } => {
                    out.decision = Some(match out.decision {
                        Some(current) => current.most_restrictive(*decision),
                        None => *decision,
                    });
                    if let Some(reason) = reason {
                        out.push_reason(render_template(reason, &bound));
                    }
                }
                Action::AddReason { reason } => out.push_reason(render_template(reason, &bound)),
                Action::AdjustCredit { factor, points } => out.credit_factors.push(ScoreFactor {
                    name: render_template(factor, &bound),
                    impact: *points,
                }),
                Action::AdjustRate { delta, reason } => {
                    out.rate_adjustment += delta;
                    if let Some(reason) = reason {
                        out.push_reason(render_template(reason, &bound));
                    }
                }
            }
        }

        out.fired.push(FiredRule {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            salience: rule.salience,
        });
    }
}

impl InferenceEngine for RuleEngine {
    fn fire_all(&self, package: RulePackage, memory: &WorkingMemory) -> Inference {
        let mut inference = Inference::default();
        let agenda = self.agenda(package, memory);

        for activation in &agenda {
            Self::fire(activation, memory, &mut inference);
        }

        tracing::debug!(
            package = package.as_str(),
            facts = memory.len(),
            fired = inference.fired.len(),
            "rules fired"
        );
        inference
    }

    fn summaries(&self) -> Vec<RuleSummary> {
        self.sets
            .iter()
            .flat_map(|set| {
                set.rules.iter().map(move |rule| RuleSummary {
                    id: rule.id.clone(),
                    name: rule.name.clone(),
                    package: set.package,
                    salience: rule.salience,
                    enabled: rule.enabled,
                    description: rule.description.clone(),
                })
            })
            .collect()
    }
}

fn load_rule_set(path: &Path) -> AnyResult<RuleSet> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules file: {:?}", path))?;

    RuleSet::from_json(&content).with_context(|| format!("Failed to parse rules file: {:?}", path))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Account, AccountType, Channel, Transaction, TransactionType};
    use crate::facts::FactValue;
    use crate::rules::{Condition, Operator, Pattern};

    fn rule(id: &str, salience: i32, when: Vec<Pattern>, then: Vec<Action>) -> RiskRule {
        RiskRule {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            salience,
            enabled: true,
            when,
            then,
        }
    }

    fn account_pattern(conditions: Vec<Condition>) -> Pattern {
        Pattern {
            fact: FactKind::Account,
            conditions,
        }
    }

    fn overdrawn() -> Condition {
        Condition::new("overdrawn", Operator::Eq, FactValue::Bool(true))
    }

    fn engine(rules: Vec<RiskRule>) -> RuleEngine {
        RuleEngine::from_sets(vec![RuleSet {
            package: RulePackage::Profile,
            description: None,
            rules,
        }])
        .unwrap()
    }

    fn memory_with_accounts(balances: &[f64]) -> WorkingMemory {
        let mut memory = WorkingMemory::new();
        for (i, balance) in balances.iter().enumerate() {
            memory.insert(Fact::Account(Account::new(
                &format!("ACC{}", i),
                "CUST001",
                AccountType::Checking,
                *balance,
            )));
        }
        memory
    }

    #[test]
    fn test_working_memory() {
        let mut memory = WorkingMemory::new();
        assert!(memory.is_empty());

        let handle = memory.insert(Fact::Account(Account::new("A", "C", AccountType::Savings, 1.0)));
        memory.insert(Fact::Transaction(Transaction::new(
            "T",
            "A",
            1.0,
            TransactionType::Deposit,
            Channel::Branch,
        )));

        assert_eq!(memory.len(), 2);
        assert_eq!(memory.get(handle).map(|f| f.kind()), Some(FactKind::Account));
        assert_eq!(memory.facts_of(FactKind::Transaction).count(), 1);
        assert_eq!(memory.facts_of(FactKind::Loan).count(), 0);
    }

    #[test]
    fn test_rule_fires_once_per_matching_fact() {
        let engine = engine(vec![rule(
            "OVERDRAWN",
            0,
            vec![account_pattern(vec![overdrawn()])],
            vec![Action::AddScore { points: 10.0 }],
        )]);

        let inference = engine.fire_all(RulePackage::Profile, &memory_with_accounts(&[-5.0, 20.0, -1.0]));
        assert_eq!(inference.fired.len(), 2);
        assert_eq!(inference.score_delta, 20.0);
    }

    #[test]
    fn test_salience_orders_agenda() {
        let engine = engine(vec![
            rule("LOW", 1, vec![account_pattern(vec![])], vec![Action::AddScore { points: 1.0 }]),
            rule("HIGH", 100, vec![account_pattern(vec![])], vec![Action::AddScore { points: 1.0 }]),
            rule("ALSO_LOW", 1, vec![account_pattern(vec![])], vec![Action::AddScore { points: 1.0 }]),
        ]);

        let inference = engine.fire_all(RulePackage::Profile, &memory_with_accounts(&[1.0]));
        assert_eq!(inference.fired_rule_ids(), vec!["HIGH", "LOW", "ALSO_LOW"]);
    }

    #[test]
    fn test_other_packages_and_disabled_rules_do_not_fire() {
        let mut disabled = rule("OFF", 0, vec![account_pattern(vec![])], vec![Action::AddScore { points: 5.0 }]);
        disabled.enabled = false;
        let engine = engine(vec![disabled]);

        let memory = memory_with_accounts(&[1.0]);
        assert!(engine.fire_all(RulePackage::Profile, &memory).fired.is_empty());
        assert!(engine.fire_all(RulePackage::Credit, &memory).fired.is_empty());
    }

    #[test]
    fn test_join_binds_distinct_facts() {
        // Two account patterns: pairs of distinct overdrawn accounts
        let engine = engine(vec![rule(
            "TWO_OVERDRAWN",
            0,
            vec![account_pattern(vec![overdrawn()]), account_pattern(vec![overdrawn()])],
            vec![Action::AddScore { points: 1.0 }],
        )]);

        let one = engine.fire_all(RulePackage::Profile, &memory_with_accounts(&[-1.0]));
        assert!(one.fired.is_empty());

        let two = engine.fire_all(RulePackage::Profile, &memory_with_accounts(&[-1.0, -2.0]));
        assert_eq!(two.fired.len(), 2);
    }

    #[test]
    fn test_decision_is_most_restrictive() {
        let engine = engine(vec![
            rule(
                "REJECTS",
                10,
                vec![account_pattern(vec![])],
                vec![Action::SetDecision {
                    decision: Decision::Reject,
                    reason: Some("Account {account.account_number} rejected".to_string()),
                }],
            ),
            rule(
                "REVIEWS",
                0,
                vec![account_pattern(vec![])],
                vec![Action::SetDecision {
                    decision: Decision::Review,
                    reason: None,
                }],
            ),
        ]);

        let inference = engine.fire_all(RulePackage::Profile, &memory_with_accounts(&[1.0]));
        assert_eq!(inference.decision, Some(Decision::Reject));
        assert_eq!(inference.reasons, vec!["Account ACC0 rejected"]);
    }

    #[test]
    fn test_alerts_carry_account_and_rendered_message() {
        let engine = engine(vec![rule(
            "ALERT",
            0,
            vec![account_pattern(vec![overdrawn()])],
            vec![
                Action::RaiseAlert {
                    alert_type: AlertType::Overdraft,
                    severity: Severity::Medium,
                    message: "Balance {account.balance}".to_string(),
                },
                Action::AdjustCredit {
                    factor: "Overdrawn account".to_string(),
                    points: -40,
                },
                Action::AdjustRate {
                    delta: 0.5,
                    reason: None,
                },
            ],
        )]);

        let inference = engine.fire_all(RulePackage::Profile, &memory_with_accounts(&[-50.0]));
        assert_eq!(inference.alerts.len(), 1);
        assert_eq!(inference.alerts[0].message, "Balance -50");
        assert_eq!(inference.alerts[0].account_number.as_deref(), Some("ACC0"));
        assert_eq!(inference.credit_factors[0].impact, -40);
        assert_eq!(inference.rate_adjustment, 0.5);
    }

    #[test]
    fn test_duplicate_rule_ids_rejected() {
        let a = rule("SAME", 0, vec![account_pattern(vec![])], vec![Action::AddScore { points: 1.0 }]);
        let result = RuleEngine::from_sets(vec![RuleSet {
            package: RulePackage::Profile,
            description: None,
            rules: vec![a.clone(), a],
        }]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_rules_load() {
        let engine = RuleEngine::with_default_rules().unwrap();
        let summaries = engine.summaries();

        assert_eq!(summaries.len(), engine.rule_count());
        for package in [
            RulePackage::Transaction,
            RulePackage::Credit,
            RulePackage::Loan,
            RulePackage::Profile,
        ] {
            assert!(
                summaries.iter().any(|s| s.package == package),
                "no rules for {}",
                package.as_str()
            );
        }
    }

    #[test]
    fn test_from_dir_missing() {
        assert!(RuleEngine::from_dir("/definitely/not/a/rules/dir").is_err());
    }

    #[test]
    fn test_from_dir_loads_every_file_and_surfaces_failures() {
        let dir = std::env::temp_dir().join(format!("risk-rules-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("credit_rules.json"), CREDIT_RULES).unwrap();
        fs::write(dir.join("loan_rules.json"), LOAN_RULES).unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let loaded = RuleEngine::from_dir(&dir).unwrap();
        let expected = RuleSet::from_json(CREDIT_RULES).unwrap().rules.len()
            + RuleSet::from_json(LOAN_RULES).unwrap().rules.len();
        assert_eq!(loaded.rule_count(), expected);

        // An unreadable rule file fails the load instead of being skipped
        fs::create_dir(dir.join("profile_rules.json")).unwrap();
        let err = RuleEngine::from_dir(&dir).unwrap_err();
        assert!(format!("{:#}", err).contains("profile_rules.json"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
