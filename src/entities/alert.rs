// 🚨 Risk Alert Entity - raised by fired rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    LargeAmount,
    UnusualTime,
    HighVelocity,
    DailyLimit,
    International,
    Structuring,
    Duplicate,
    Overdraft,
    DormantAccount,
    CreditLimit,
    NewCustomer,
    RoundAmount,
    Blacklist,
    AccountFrozen,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LargeAmount => "LARGE_AMOUNT",
            AlertType::UnusualTime => "UNUSUAL_TIME",
            AlertType::HighVelocity => "HIGH_VELOCITY",
            AlertType::DailyLimit => "DAILY_LIMIT",
            AlertType::International => "INTERNATIONAL",
            AlertType::Structuring => "STRUCTURING",
            AlertType::Duplicate => "DUPLICATE",
            AlertType::Overdraft => "OVERDRAFT",
            AlertType::DormantAccount => "DORMANT_ACCOUNT",
            AlertType::CreditLimit => "CREDIT_LIMIT",
            AlertType::NewCustomer => "NEW_CUSTOMER",
            AlertType::RoundAmount => "ROUND_AMOUNT",
            AlertType::Blacklist => "BLACKLIST",
            AlertType::AccountFrozen => "ACCOUNT_FROZEN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    #[default]
    Open,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Open => "OPEN",
            AlertStatus::Acknowledged => "ACKNOWLEDGED",
            AlertStatus::Resolved => "RESOLVED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "OPEN" => Some(AlertStatus::Open),
            "ACKNOWLEDGED" => Some(AlertStatus::Acknowledged),
            "RESOLVED" => Some(AlertStatus::Resolved),
            _ => None,
        }
    }

    /// Alerts only move forward: OPEN → ACKNOWLEDGED → RESOLVED
    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Open, AlertStatus::Acknowledged)
                | (AlertStatus::Open, AlertStatus::Resolved)
                | (AlertStatus::Acknowledged, AlertStatus::Resolved)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub alert_id: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    pub customer_id: String,
    pub transaction_id: Option<String>,
    pub account_number: Option<String>,

    /// Rule that raised the alert
    pub rule_id: Option<String>,

    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
}

impl RiskAlert {
    pub fn builder(alert_type: AlertType, severity: Severity) -> RiskAlertBuilder {
        RiskAlertBuilder {
            alert_type,
            severity,
            message: String::new(),
            customer_id: String::new(),
            transaction_id: None,
            account_number: None,
            rule_id: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == AlertStatus::Open
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

pub struct RiskAlertBuilder {
    alert_type: AlertType,
    severity: Severity,
    message: String,
    customer_id: String,
    transaction_id: Option<String>,
    account_number: Option<String>,
    rule_id: Option<String>,
}

impl RiskAlertBuilder {
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = customer_id.into();
        self
    }

    pub fn transaction(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn account(mut self, account_number: impl Into<String>) -> Self {
        self.account_number = Some(account_number.into());
        self
    }

    pub fn rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    pub fn build(self) -> RiskAlert {
        RiskAlert {
            alert_id: uuid::Uuid::new_v4().to_string(),
            alert_type: self.alert_type,
            severity: self.severity,
            message: self.message,
            customer_id: self.customer_id,
            transaction_id: self.transaction_id,
            account_number: self.account_number,
            rule_id: self.rule_id,
            status: AlertStatus::Open,
            created_at: Utc::now(),
        }
    }
}
