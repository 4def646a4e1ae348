// Services - assemble facts, fire a rule package, turn the inference into records
//
// Every service is cheap to clone: it only holds the shared engine handle and
// a copy of the scoring thresholds.

pub mod credit_scoring;
pub mod loan_approval;
pub mod risk_profile;
pub mod transaction_monitoring;

pub use credit_scoring::CreditScorer;
pub use loan_approval::{LoanDecision, LoanUnderwriter};
pub use risk_profile::{AccountSummary, RiskProfile, RiskProfiler};
pub use transaction_monitoring::{TransactionMonitor, TransactionResult};

use std::sync::Arc;

use crate::config::ScoringConfig;
use crate::engine::{Inference, InferenceEngine, RuleEngine, RuleSummary};
use crate::entities::{RiskAssessment, SubjectType};
use crate::error::Result;

/// Fold an inference into a fresh assessment, then apply the score thresholds
pub(crate) fn assessment_from(
    inference: &Inference,
    subject_type: SubjectType,
    subject_id: &str,
    customer_id: &str,
    scoring: &ScoringConfig,
) -> RiskAssessment {
    let mut assessment = RiskAssessment::new(subject_type, subject_id, customer_id);
    assessment.add_score(inference.score_delta);
    for reason in &inference.reasons {
        assessment.add_reason(reason.clone());
    }
    assessment.fired_rules = inference.fired_rule_ids();
    if let Some(decision) = inference.decision {
        assessment.escalate(decision);
    }
    assessment.apply_thresholds(scoring.review_score, scoring.reject_score);
    assessment
}

/// Entry point bundling all four services over one engine
#[derive(Clone)]
pub struct RiskControl {
    engine: Arc<dyn InferenceEngine>,
    scoring: ScoringConfig,
}

impl RiskControl {
    pub fn new(engine: Arc<dyn InferenceEngine>, scoring: ScoringConfig) -> Self {
        RiskControl { engine, scoring }
    }

    /// Built-in rule packages
    pub fn with_default_rules(scoring: ScoringConfig) -> Result<Self> {
        let engine = RuleEngine::with_default_rules()?;
        Ok(Self::new(Arc::new(engine), scoring))
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub fn transactions(&self) -> TransactionMonitor {
        TransactionMonitor::new(self.engine.clone(), self.scoring.clone())
    }

    pub fn credit(&self) -> CreditScorer {
        CreditScorer::new(self.engine.clone(), self.scoring.clone())
    }

    pub fn loans(&self) -> LoanUnderwriter {
        LoanUnderwriter::new(self.engine.clone(), self.scoring.clone())
    }

    pub fn profiles(&self) -> RiskProfiler {
        RiskProfiler::new(self.engine.clone(), self.scoring.clone())
    }

    pub fn rules(&self) -> Vec<RuleSummary> {
        self.engine.summaries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FiredRule;
    use crate::entities::{Decision, RiskLevel};

    fn inference(score: f64, decision: Option<Decision>) -> Inference {
        Inference {
            fired: vec![FiredRule {
                rule_id: "R1".to_string(),
                rule_name: "Rule one".to_string(),
                salience: 0,
            }],
            score_delta: score,
            decision,
            reasons: vec!["because".to_string()],
            ..Inference::default()
        }
    }

    #[test]
    fn test_thresholds_escalate() {
        let scoring = ScoringConfig::default();

        let low = assessment_from(&inference(10.0, None), SubjectType::Customer, "C", "C", &scoring);
        assert_eq!(low.decision, Decision::Approve);
        assert_eq!(low.fired_rules, vec!["R1"]);

        let review = assessment_from(&inference(45.0, None), SubjectType::Customer, "C", "C", &scoring);
        assert_eq!(review.decision, Decision::Review);

        let reject = assessment_from(&inference(140.0, None), SubjectType::Customer, "C", "C", &scoring);
        assert_eq!(reject.decision, Decision::Reject);
        assert_eq!(reject.risk_score, 100.0);
        assert_eq!(reject.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_rule_decision_is_never_relaxed_by_low_score() {
        let scoring = ScoringConfig::default();
        let assessment = assessment_from(
            &inference(0.0, Some(Decision::Reject)),
            SubjectType::Loan,
            "L",
            "C",
            &scoring,
        );
        assert_eq!(assessment.decision, Decision::Reject);
        assert_eq!(assessment.reasons, vec!["because"]);
    }

    #[test]
    fn test_facade_lists_rules() {
        let control = RiskControl::with_default_rules(ScoringConfig::default()).unwrap();
        assert!(!control.rules().is_empty());
        assert_eq!(control.scoring().reject_score, 70.0);
    }
}
