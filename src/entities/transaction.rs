// 💸 Transaction Entity - a money movement submitted for screening

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, RiskError};

/// Amount at or above which a transaction is "large"
pub const LARGE_AMOUNT_THRESHOLD: f64 = 50_000.0;

/// Night window (UTC hours, end exclusive)
pub const NIGHT_START_HOUR: u32 = 0;
pub const NIGHT_END_HOUR: u32 = 6;

// ============================================================================
// ENUMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    Payment,
    Purchase,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::Payment => "PAYMENT",
            TransactionType::Purchase => "PURCHASE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Online,
    Mobile,
    Atm,
    Branch,
    Pos,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Online => "ONLINE",
            Channel::Mobile => "MOBILE",
            Channel::Atm => "ATM",
            Channel::Branch => "BRANCH",
            Channel::Pos => "POS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Approved,
    UnderReview,
    Rejected,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Approved => "APPROVED",
            TransactionStatus::UnderReview => "UNDER_REVIEW",
            TransactionStatus::Rejected => "REJECTED",
        }
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub account_number: String,

    /// Resolved from the account when omitted
    #[serde(default)]
    pub customer_id: Option<String>,

    /// Always positive; direction comes from transaction_type
    pub amount: f64,

    #[serde(default = "default_currency")]
    pub currency: String,

    pub transaction_type: TransactionType,
    pub channel: Channel,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// ISO 3166 country where the transaction originated
    #[serde(default = "default_country")]
    pub country: String,

    #[serde(default)]
    pub international: bool,

    #[serde(default)]
    pub merchant_category: Option<String>,

    #[serde(default)]
    pub counterparty: Option<String>,

    #[serde(default)]
    pub status: TransactionStatus,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_country() -> String {
    "US".to_string()
}

impl Transaction {
    pub fn new(
        transaction_id: &str,
        account_number: &str,
        amount: f64,
        transaction_type: TransactionType,
        channel: Channel,
    ) -> Self {
        Transaction {
            transaction_id: transaction_id.to_string(),
            account_number: account_number.to_string(),
            customer_id: None,
            amount,
            currency: default_currency(),
            transaction_type,
            channel,
            timestamp: Utc::now(),
            country: default_country(),
            international: false,
            merchant_category: None,
            counterparty: None,
            status: TransactionStatus::Pending,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_large_amount(&self) -> bool {
        self.amount >= LARGE_AMOUNT_THRESHOLD
    }

    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }

    pub fn is_night_time(&self) -> bool {
        (NIGHT_START_HOUR..NIGHT_END_HOUR).contains(&self.hour())
    }

    /// Whole thousands, a common structuring tell
    pub fn is_round_amount(&self) -> bool {
        self.amount >= 1_000.0 && self.amount % 1_000.0 == 0.0
    }

    pub fn is_cash_withdrawal(&self) -> bool {
        self.transaction_type == TransactionType::Withdrawal && self.channel == Channel::Atm
    }

    /// Money leaving the account
    pub fn is_debit(&self) -> bool {
        self.transaction_type != TransactionType::Deposit
    }

    pub fn signed_amount(&self) -> f64 {
        if self.is_debit() {
            -self.amount
        } else {
            self.amount
        }
    }

    /// Content hash for duplicate detection.
    /// Ignores transaction_id and timestamp: resubmissions get new ids.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{:.2}|{}|{}",
            self.account_number,
            self.transaction_type.as_str(),
            self.amount,
            self.counterparty.as_deref().unwrap_or(""),
            self.merchant_category.as_deref().unwrap_or(""),
        ));
        format!("{:x}", hasher.finalize())
    }

    pub fn validate(&self) -> Result<()> {
        if self.transaction_id.trim().is_empty() {
            return Err(RiskError::validation("transaction_id must not be empty"));
        }
        if self.account_number.trim().is_empty() {
            return Err(RiskError::validation("account_number must not be empty"));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(RiskError::validation(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}
