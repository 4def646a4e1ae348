// 👤 Customer Entity - applicant and account holder
//
// Predicates are plain threshold checks on the customer's own fields.
// Rules read them through the fact layer by name (e.g. "high_debt").

use serde::{Deserialize, Serialize};

use crate::entities::RiskLevel;
use crate::error::{Result, RiskError};

/// Debt-to-income ratio above which a customer is considered over-leveraged
pub const HIGH_DEBT_RATIO: f64 = 0.5;

/// Annual income at or above which a customer is high-income
pub const HIGH_INCOME_THRESHOLD: f64 = 100_000.0;

/// Credit history shorter than this (months) is "short"
pub const SHORT_CREDIT_HISTORY_MONTHS: u32 = 24;

/// Relationship shorter than this (months) makes a new customer
pub const NEW_CUSTOMER_MONTHS: u32 = 6;

// ============================================================================
// EMPLOYMENT STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentStatus {
    Employed,
    SelfEmployed,
    Unemployed,
    Retired,
    Student,
}

impl EmploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentStatus::Employed => "EMPLOYED",
            EmploymentStatus::SelfEmployed => "SELF_EMPLOYED",
            EmploymentStatus::Unemployed => "UNEMPLOYED",
            EmploymentStatus::Retired => "RETIRED",
            EmploymentStatus::Student => "STUDENT",
        }
    }
}

// ============================================================================
// CUSTOMER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub name: String,
    pub age: u32,

    /// Gross annual income
    pub annual_income: f64,

    /// Sum of monthly repayments on existing debt
    #[serde(default)]
    pub monthly_debt_payments: f64,

    #[serde(default)]
    pub credit_history_months: u32,

    pub employment_status: EmploymentStatus,

    /// How long the customer has banked with us
    #[serde(default)]
    pub relationship_months: u32,

    #[serde(default)]
    pub kyc_verified: bool,

    #[serde(default)]
    pub blacklisted: bool,

    /// Last risk level computed by a profile run
    #[serde(default)]
    pub risk_level: RiskLevel,
}

impl Customer {
    pub fn new(
        customer_id: &str,
        name: &str,
        age: u32,
        annual_income: f64,
        employment_status: EmploymentStatus,
    ) -> Self {
        Customer {
            customer_id: customer_id.to_string(),
            name: name.to_string(),
            age,
            annual_income,
            monthly_debt_payments: 0.0,
            credit_history_months: 0,
            employment_status,
            relationship_months: 0,
            kyc_verified: false,
            blacklisted: false,
            risk_level: RiskLevel::Low,
        }
    }

    /// Annualised debt service over annual income.
    ///
    /// Without income the ratio is 0 for a debt-free customer and unbounded otherwise.
    pub fn debt_to_income(&self) -> f64 {
        let annual_debt = self.monthly_debt_payments * 12.0;
        if self.annual_income <= 0.0 {
            if annual_debt > 0.0 {
                return f64::INFINITY;
            }
            return 0.0;
        }
        annual_debt / self.annual_income
    }

    pub fn is_high_debt(&self) -> bool {
        self.debt_to_income() > HIGH_DEBT_RATIO
    }

    pub fn is_high_income(&self) -> bool {
        self.annual_income >= HIGH_INCOME_THRESHOLD
    }

    pub fn is_young(&self) -> bool {
        self.age < 25
    }

    pub fn is_senior(&self) -> bool {
        self.age >= 65
    }

    pub fn has_short_credit_history(&self) -> bool {
        self.credit_history_months < SHORT_CREDIT_HISTORY_MONTHS
    }

    pub fn is_new_customer(&self) -> bool {
        self.relationship_months < NEW_CUSTOMER_MONTHS
    }

    pub fn is_employed(&self) -> bool {
        matches!(
            self.employment_status,
            EmploymentStatus::Employed | EmploymentStatus::SelfEmployed
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.customer_id.trim().is_empty() {
            return Err(RiskError::validation("customer_id must not be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(RiskError::validation("customer name must not be empty"));
        }
        if !(18..=120).contains(&self.age) {
            return Err(RiskError::validation(format!(
                "customer age {} outside 18..=120",
                self.age
            )));
        }
        if self.annual_income < 0.0 || !self.annual_income.is_finite() {
            return Err(RiskError::validation("annual_income must be >= 0"));
        }
        if self.monthly_debt_payments < 0.0 || !self.monthly_debt_payments.is_finite() {
            return Err(RiskError::validation("monthly_debt_payments must be >= 0"));
        }
        Ok(())
    }
}
