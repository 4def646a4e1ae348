// 💳 Account Entity - balance holder referenced by transactions
//
// An account belongs to a customer through customer_id (no object graph).
// Credit accounts carry a credit_limit; their debt shows up as a negative balance.

use serde::{Deserialize, Serialize};

use crate::entities::Transaction;
use crate::error::{Result, RiskError};

/// Balance under which a (non-negative) account is considered low
pub const LOW_BALANCE_THRESHOLD: f64 = 1_000.0;

/// Balance at or above which an account is considered high
pub const HIGH_BALANCE_THRESHOLD: f64 = 100_000.0;

/// Credit utilization at or above which an account is near its limit
pub const NEAR_CREDIT_LIMIT_RATIO: f64 = 0.9;

/// Days without activity after which an account is dormant
pub const DORMANT_DAYS_THRESHOLD: u32 = 90;

// ============================================================================
// ACCOUNT TYPE / STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Checking account (debit card, daily transactions)
    Checking,

    /// Savings account (interest-bearing)
    Savings,

    /// Credit card (credit line)
    Credit,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "CHECKING",
            AccountType::Savings => "SAVINGS",
            AccountType::Credit => "CREDIT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    #[default]
    Active,
    Frozen,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Frozen => "FROZEN",
            AccountStatus::Closed => "CLOSED",
        }
    }
}

// ============================================================================
// ACCOUNT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_number: String,

    /// Owner (foreign key to Customer)
    pub customer_id: String,

    pub account_type: AccountType,

    /// Current balance; negative means overdrawn or credit in use
    pub balance: f64,

    /// Credit line, 0 when the account has none
    #[serde(default)]
    pub credit_limit: f64,

    /// Currency (ISO 4217 code: USD, EUR, MXN, etc.)
    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default)]
    pub status: AccountStatus,

    /// Days since the last transaction
    #[serde(default)]
    pub dormant_days: u32,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Account {
    pub fn new(
        account_number: &str,
        customer_id: &str,
        account_type: AccountType,
        balance: f64,
    ) -> Self {
        Account {
            account_number: account_number.to_string(),
            customer_id: customer_id.to_string(),
            account_type,
            balance,
            credit_limit: 0.0,
            currency: default_currency(),
            status: AccountStatus::Active,
            dormant_days: 0,
        }
    }

    pub fn with_credit_limit(mut self, credit_limit: f64) -> Self {
        self.credit_limit = credit_limit;
        self
    }

    pub fn is_overdrawn(&self) -> bool {
        self.balance < 0.0
    }

    pub fn has_low_balance(&self) -> bool {
        self.balance >= 0.0 && self.balance < LOW_BALANCE_THRESHOLD
    }

    pub fn has_high_balance(&self) -> bool {
        self.balance >= HIGH_BALANCE_THRESHOLD
    }

    /// Share of the credit line in use (0.0 when there is no credit line)
    pub fn credit_utilization(&self) -> f64 {
        if self.credit_limit <= 0.0 {
            return 0.0;
        }
        (-self.balance).max(0.0) / self.credit_limit
    }

    pub fn is_near_credit_limit(&self) -> bool {
        self.credit_limit > 0.0 && self.credit_utilization() >= NEAR_CREDIT_LIMIT_RATIO
    }

    pub fn is_dormant(&self) -> bool {
        self.dormant_days >= DORMANT_DAYS_THRESHOLD
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Book an approved transaction against this account
    pub fn apply(&mut self, tx: &Transaction) {
        self.balance += tx.signed_amount();
        self.dormant_days = 0;
    }

    /// Mask account number (show only last 4 digits)
    ///
    /// Example: "1234567890" → "*7890"
    pub fn mask_account_number(full_number: &str) -> String {
        let chars: Vec<char> = full_number.chars().collect();
        if chars.len() <= 4 {
            return full_number.to_string();
        }
        let last4: String = chars[chars.len() - 4..].iter().collect();
        format!("*{}", last4)
    }

    pub fn validate(&self) -> Result<()> {
        if self.account_number.trim().is_empty() {
            return Err(RiskError::validation("account_number must not be empty"));
        }
        if self.customer_id.trim().is_empty() {
            return Err(RiskError::validation("account customer_id must not be empty"));
        }
        if !self.balance.is_finite() {
            return Err(RiskError::validation("balance must be a finite number"));
        }
        if self.credit_limit < 0.0 || !self.credit_limit.is_finite() {
            return Err(RiskError::validation("credit_limit must be >= 0"));
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
