// 🧩 Facts - what the rule engine sees
//
// Every entity (plus a few derived summaries) becomes a Fact. Rules address
// fact fields by name; predicates are exposed under their short names, e.g.
// Account::is_overdrawn() → "overdrawn".

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::{Account, CreditScore, Customer, LoanApplication, Transaction};

// ============================================================================
// FACT VALUE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<FactValue>),
}

impl FactValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FactValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FactValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FactValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactValue::Bool(b) => write!(f, "{}", b),
            FactValue::Number(n) if n.is_finite() && n.fract() == 0.0 => write!(f, "{:.0}", n),
            FactValue::Number(n) if n.is_finite() => write!(f, "{:.2}", n),
            FactValue::Number(n) => write!(f, "{}", n),
            FactValue::Text(s) => write!(f, "{}", s),
            FactValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

fn num(value: impl Into<f64>) -> Option<FactValue> {
    Some(FactValue::Number(value.into()))
}

fn flag(value: bool) -> Option<FactValue> {
    Some(FactValue::Bool(value))
}

fn text(value: &str) -> Option<FactValue> {
    Some(FactValue::Text(value.to_string()))
}

// ============================================================================
// DERIVED FACTS
// ============================================================================

/// Recent activity of the transaction's customer, current transaction included
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub customer_id: String,
    pub transactions_last_hour: u32,
    pub transactions_last_24h: u32,
    pub amount_last_24h: f64,
    pub distinct_countries_24h: u32,

    /// Same fingerprint seen inside the duplicate window
    pub duplicate: bool,
}

impl TransactionStats {
    /// Stats for a customer with no history besides this transaction
    pub fn first(tx: &Transaction, customer_id: &str) -> Self {
        TransactionStats {
            customer_id: customer_id.to_string(),
            transactions_last_hour: 1,
            transactions_last_24h: 1,
            amount_last_24h: tx.amount,
            distinct_countries_24h: 1,
            duplicate: false,
        }
    }
}

/// Loan affordability derived from an application and the applicant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affordability {
    pub monthly_payment: f64,
    pub payment_to_income: f64,
    pub debt_to_income_after_loan: f64,
    pub loan_to_income: f64,
}

impl Affordability {
    pub fn assess(loan: &LoanApplication, customer: &Customer, annual_rate_percent: f64) -> Self {
        let monthly_payment = loan.monthly_payment(annual_rate_percent);
        let ratio = |numerator: f64| {
            if customer.annual_income > 0.0 {
                numerator / customer.annual_income
            } else if numerator > 0.0 {
                f64::INFINITY
            } else {
                0.0
            }
        };

        Affordability {
            monthly_payment,
            payment_to_income: ratio(monthly_payment * 12.0),
            debt_to_income_after_loan: ratio(
                (customer.monthly_debt_payments + monthly_payment) * 12.0,
            ),
            loan_to_income: ratio(loan.amount),
        }
    }
}

/// Alert and transaction counts feeding a customer risk profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerActivity {
    pub customer_id: String,
    pub open_alerts: u32,
    pub critical_alerts: u32,
    pub high_alerts: u32,
    pub transactions_last_30d: u32,
    pub rejected_transactions_30d: u32,
}

// ============================================================================
// FACT KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    Customer,
    Account,
    Transaction,
    Stats,
    Loan,
    Credit,
    Affordability,
    Activity,
}

impl FactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactKind::Customer => "customer",
            FactKind::Account => "account",
            FactKind::Transaction => "transaction",
            FactKind::Stats => "stats",
            FactKind::Loan => "loan",
            FactKind::Credit => "credit",
            FactKind::Affordability => "affordability",
            FactKind::Activity => "activity",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "customer" => Some(FactKind::Customer),
            "account" => Some(FactKind::Account),
            "transaction" => Some(FactKind::Transaction),
            "stats" => Some(FactKind::Stats),
            "loan" => Some(FactKind::Loan),
            "credit" => Some(FactKind::Credit),
            "affordability" => Some(FactKind::Affordability),
            "activity" => Some(FactKind::Activity),
            _ => None,
        }
    }

    /// Field names rules may reference for this kind
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            FactKind::Customer => &[
                "customer_id",
                "name",
                "age",
                "annual_income",
                "monthly_debt_payments",
                "credit_history_months",
                "employment_status",
                "relationship_months",
                "kyc_verified",
                "blacklisted",
                "risk_level",
                "debt_to_income",
                "high_debt",
                "high_income",
                "young",
                "senior",
                "short_credit_history",
                "new_customer",
                "employed",
            ],
            FactKind::Account => &[
                "account_number",
                "customer_id",
                "account_type",
                "balance",
                "credit_limit",
                "currency",
                "status",
                "dormant_days",
                "overdrawn",
                "low_balance",
                "high_balance",
                "credit_utilization",
                "near_credit_limit",
                "dormant",
                "active",
            ],
            FactKind::Transaction => &[
                "transaction_id",
                "account_number",
                "customer_id",
                "amount",
                "currency",
                "transaction_type",
                "channel",
                "country",
                "international",
                "merchant_category",
                "hour",
                "large_amount",
                "night_time",
                "round_amount",
                "cash_withdrawal",
                "debit",
            ],
            FactKind::Stats => &[
                "customer_id",
                "transactions_last_hour",
                "transactions_last_24h",
                "amount_last_24h",
                "distinct_countries_24h",
                "duplicate",
            ],
            FactKind::Loan => &[
                "application_id",
                "customer_id",
                "amount",
                "term_months",
                "purpose",
                "collateral_value",
                "secured",
                "loan_to_value",
                "large_loan",
                "long_term",
            ],
            FactKind::Credit => &["customer_id", "score", "grade", "prime", "subprime"],
            FactKind::Affordability => &[
                "monthly_payment",
                "payment_to_income",
                "debt_to_income_after_loan",
                "loan_to_income",
            ],
            FactKind::Activity => &[
                "customer_id",
                "open_alerts",
                "critical_alerts",
                "high_alerts",
                "transactions_last_30d",
                "rejected_transactions_30d",
            ],
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields().contains(&field)
    }
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// FACT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Fact {
    Customer(Customer),
    Account(Account),
    Transaction(Transaction),
    Stats(TransactionStats),
    Loan(LoanApplication),
    Credit(CreditScore),
    Affordability(Affordability),
    Activity(CustomerActivity),
}

impl Fact {
    pub fn kind(&self) -> FactKind {
        match self {
            Fact::Customer(_) => FactKind::Customer,
            Fact::Account(_) => FactKind::Account,
            Fact::Transaction(_) => FactKind::Transaction,
            Fact::Stats(_) => FactKind::Stats,
            Fact::Loan(_) => FactKind::Loan,
            Fact::Credit(_) => FactKind::Credit,
            Fact::Affordability(_) => FactKind::Affordability,
            Fact::Activity(_) => FactKind::Activity,
        }
    }

    /// Field or predicate by name; None when unknown or not applicable
    pub fn get(&self, field: &str) -> Option<FactValue> {
        match self {
            Fact::Customer(c) => customer_field(c, field),
            Fact::Account(a) => account_field(a, field),
            Fact::Transaction(t) => transaction_field(t, field),
            Fact::Stats(s) => stats_field(s, field),
            Fact::Loan(l) => loan_field(l, field),
            Fact::Credit(c) => credit_field(c, field),
            Fact::Affordability(a) => affordability_field(a, field),
            Fact::Activity(a) => activity_field(a, field),
        }
    }
}

fn customer_field(c: &Customer, field: &str) -> Option<FactValue> {
    match field {
        "customer_id" => text(&c.customer_id),
        "name" => text(&c.name),
        "age" => num(c.age),
        "annual_income" => num(c.annual_income),
        "monthly_debt_payments" => num(c.monthly_debt_payments),
        "credit_history_months" => num(c.credit_history_months),
        "employment_status" => text(c.employment_status.as_str()),
        "relationship_months" => num(c.relationship_months),
        "kyc_verified" => flag(c.kyc_verified),
        "blacklisted" => flag(c.blacklisted),
        "risk_level" => text(c.risk_level.as_str()),
        "debt_to_income" => num(c.debt_to_income()),
        "high_debt" => flag(c.is_high_debt()),
        "high_income" => flag(c.is_high_income()),
        "young" => flag(c.is_young()),
        "senior" => flag(c.is_senior()),
        "short_credit_history" => flag(c.has_short_credit_history()),
        "new_customer" => flag(c.is_new_customer()),
        "employed" => flag(c.is_employed()),
        _ => None,
    }
}

fn account_field(a: &Account, field: &str) -> Option<FactValue> {
    match field {
        "account_number" => text(&a.account_number),
        "customer_id" => text(&a.customer_id),
        "account_type" => text(a.account_type.as_str()),
        "balance" => num(a.balance),
        "credit_limit" => num(a.credit_limit),
        "currency" => text(&a.currency),
        "status" => text(a.status.as_str()),
        "dormant_days" => num(a.dormant_days),
        "overdrawn" => flag(a.is_overdrawn()),
        "low_balance" => flag(a.has_low_balance()),
        "high_balance" => flag(a.has_high_balance()),
        "credit_utilization" => num(a.credit_utilization()),
        "near_credit_limit" => flag(a.is_near_credit_limit()),
        "dormant" => flag(a.is_dormant()),
        "active" => flag(a.is_active()),
        _ => None,
    }
}

fn transaction_field(t: &Transaction, field: &str) -> Option<FactValue> {
    match field {
        "transaction_id" => text(&t.transaction_id),
        "account_number" => text(&t.account_number),
        "customer_id" => t.customer_id.as_deref().and_then(text),
        "amount" => num(t.amount),
        "currency" => text(&t.currency),
        "transaction_type" => text(t.transaction_type.as_str()),
        "channel" => text(t.channel.as_str()),
        "country" => text(&t.country),
        "international" => flag(t.international),
        "merchant_category" => t.merchant_category.as_deref().and_then(text),
        "hour" => num(t.hour()),
        "large_amount" => flag(t.is_large_amount()),
        "night_time" => flag(t.is_night_time()),
        "round_amount" => flag(t.is_round_amount()),
        "cash_withdrawal" => flag(t.is_cash_withdrawal()),
        "debit" => flag(t.is_debit()),
        _ => None,
    }
}

fn stats_field(s: &TransactionStats, field: &str) -> Option<FactValue> {
    match field {
        "customer_id" => text(&s.customer_id),
        "transactions_last_hour" => num(s.transactions_last_hour),
        "transactions_last_24h" => num(s.transactions_last_24h),
        "amount_last_24h" => num(s.amount_last_24h),
        "distinct_countries_24h" => num(s.distinct_countries_24h),
        "duplicate" => flag(s.duplicate),
        _ => None,
    }
}

fn loan_field(l: &LoanApplication, field: &str) -> Option<FactValue> {
    match field {
        "application_id" => text(&l.application_id),
        "customer_id" => text(&l.customer_id),
        "amount" => num(l.amount),
        "term_months" => num(l.term_months),
        "purpose" => text(l.purpose.as_str()),
        "collateral_value" => num(l.collateral_value),
        "secured" => flag(l.is_secured()),
        "loan_to_value" => l.loan_to_value().map(FactValue::Number),
        "large_loan" => flag(l.is_large_loan()),
        "long_term" => flag(l.is_long_term()),
        _ => None,
    }
}

fn credit_field(c: &CreditScore, field: &str) -> Option<FactValue> {
    match field {
        "customer_id" => text(&c.customer_id),
        "score" => num(c.score),
        "grade" => text(c.grade.as_str()),
        "prime" => flag(c.is_prime()),
        "subprime" => flag(c.is_subprime()),
        _ => None,
    }
}

fn affordability_field(a: &Affordability, field: &str) -> Option<FactValue> {
    match field {
        "monthly_payment" => num(a.monthly_payment),
        "payment_to_income" => num(a.payment_to_income),
        "debt_to_income_after_loan" => num(a.debt_to_income_after_loan),
        "loan_to_income" => num(a.loan_to_income),
        _ => None,
    }
}

fn activity_field(a: &CustomerActivity, field: &str) -> Option<FactValue> {
    match field {
        "customer_id" => text(&a.customer_id),
        "open_alerts" => num(a.open_alerts),
        "critical_alerts" => num(a.critical_alerts),
        "high_alerts" => num(a.high_alerts),
        "transactions_last_30d" => num(a.transactions_last_30d),
        "rejected_transactions_30d" => num(a.rejected_transactions_30d),
        _ => None,
    }
}
