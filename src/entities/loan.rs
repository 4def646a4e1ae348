// 🏦 Loan Application Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

pub const LARGE_LOAN_THRESHOLD: f64 = 500_000.0;

/// Terms longer than this (months) are long-term
pub const LONG_TERM_MONTHS: u32 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanPurpose {
    Home,
    Auto,
    Personal,
    Education,
    Business,
}

impl LoanPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanPurpose::Home => "HOME",
            LoanPurpose::Auto => "AUTO",
            LoanPurpose::Personal => "PERSONAL",
            LoanPurpose::Education => "EDUCATION",
            LoanPurpose::Business => "BUSINESS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    #[default]
    Pending,
    Approved,
    ManualReview,
    Rejected,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "PENDING",
            LoanStatus::Approved => "APPROVED",
            LoanStatus::ManualReview => "MANUAL_REVIEW",
            LoanStatus::Rejected => "REJECTED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    #[serde(default = "new_application_id")]
    pub application_id: String,
    pub customer_id: String,
    pub amount: f64,
    pub term_months: u32,
    pub purpose: LoanPurpose,

    /// Appraised collateral, 0 for unsecured loans
    #[serde(default)]
    pub collateral_value: f64,

    #[serde(default)]
    pub status: LoanStatus,

    /// Annual rate in percent, set once a decision allows the loan
    #[serde(default)]
    pub interest_rate: Option<f64>,

    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

fn new_application_id() -> String {
    format!("LOAN-{}", uuid::Uuid::new_v4())
}

impl LoanApplication {
    pub fn new(customer_id: &str, amount: f64, term_months: u32, purpose: LoanPurpose) -> Self {
        LoanApplication {
            application_id: new_application_id(),
            customer_id: customer_id.to_string(),
            amount,
            term_months,
            purpose,
            collateral_value: 0.0,
            status: LoanStatus::Pending,
            interest_rate: None,
            submitted_at: Utc::now(),
        }
    }

    pub fn with_collateral(mut self, collateral_value: f64) -> Self {
        self.collateral_value = collateral_value;
        self
    }

    pub fn is_secured(&self) -> bool {
        self.collateral_value > 0.0
    }

    pub fn loan_to_value(&self) -> Option<f64> {
        if self.is_secured() {
            Some(self.amount / self.collateral_value)
        } else {
            None
        }
    }

    pub fn is_large_loan(&self) -> bool {
        self.amount >= LARGE_LOAN_THRESHOLD
    }

    pub fn is_long_term(&self) -> bool {
        self.term_months > LONG_TERM_MONTHS
    }

    /// Fixed monthly installment for a fully amortizing loan
    pub fn monthly_payment(&self, annual_rate_percent: f64) -> f64 {
        let n = self.term_months.max(1) as f64;
        let r = annual_rate_percent / 100.0 / 12.0;
        if r <= 0.0 {
            return self.amount / n;
        }
        self.amount * r / (1.0 - (1.0 + r).powf(-n))
    }

    pub fn validate(&self) -> Result<()> {
        if self.application_id.trim().is_empty() {
            return Err(RiskError::validation("application_id must not be empty"));
        }
        if self.customer_id.trim().is_empty() {
            return Err(RiskError::validation("customer_id must not be empty"));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(RiskError::validation("loan amount must be positive"));
        }
        if self.term_months == 0 || self.term_months > 480 {
            return Err(RiskError::validation(format!(
                "term_months {} outside 1..=480",
                self.term_months
            )));
        }
        if self.collateral_value < 0.0 || !self.collateral_value.is_finite() {
            return Err(RiskError::validation("collateral_value must be >= 0"));
        }
        Ok(())
    }
}
