// 🧮 Risk Assessment - aggregated outcome of one rule run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::RiskAlert;

pub const MAX_RISK_SCORE: f64 = 100.0;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 25.0 {
            RiskLevel::Low
        } else if score < 50.0 {
            RiskLevel::Medium
        } else if score < 75.0 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

/// Ordered from least to most restrictive
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    #[default]
    Approve,
    Review,
    Reject,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "APPROVE",
            Decision::Review => "REVIEW",
            Decision::Reject => "REJECT",
        }
    }

    pub fn most_restrictive(self, other: Decision) -> Decision {
        self.max(other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubjectType {
    Transaction,
    Loan,
    Customer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub assessment_id: String,
    pub subject_type: SubjectType,
    pub subject_id: String,
    pub customer_id: String,

    /// 0..=100
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub decision: Decision,
    pub reasons: Vec<String>,

    /// Rule ids in firing order
    pub fired_rules: Vec<String>,
    pub alerts: Vec<RiskAlert>,
    pub assessed_at: DateTime<Utc>,
}

impl RiskAssessment {
    pub fn new(subject_type: SubjectType, subject_id: &str, customer_id: &str) -> Self {
        RiskAssessment {
            assessment_id: uuid::Uuid::new_v4().to_string(),
            subject_type,
            subject_id: subject_id.to_string(),
            customer_id: customer_id.to_string(),
            risk_score: 0.0,
            risk_level: RiskLevel::Low,
            decision: Decision::Approve,
            reasons: Vec::new(),
            fired_rules: Vec::new(),
            alerts: Vec::new(),
            assessed_at: Utc::now(),
        }
    }

    /// Add points; the score stays within 0..=100 and the level follows it
    pub fn add_score(&mut self, points: f64) {
        self.risk_score = (self.risk_score + points).clamp(0.0, MAX_RISK_SCORE);
        self.risk_level = RiskLevel::from_score(self.risk_score);
    }

    pub fn add_reason(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        if !self.reasons.contains(&reason) {
            self.reasons.push(reason);
        }
    }

    /// A decision can only become more restrictive
    pub fn escalate(&mut self, decision: Decision) {
        self.decision = self.decision.most_restrictive(decision);
    }

    /// Escalate by score against review/reject thresholds
    pub fn apply_thresholds(&mut self, review_score: f64, reject_score: f64) {
        if self.risk_score >= reject_score {
            self.escalate(Decision::Reject);
        } else if self.risk_score >= review_score {
            self.escalate(Decision::Review);
        }
    }

    pub fn is_high_risk(&self) -> bool {
        self.risk_level >= RiskLevel::High
    }

    pub fn requires_manual_review(&self) -> bool {
        self.decision == Decision::Review
    }
}
