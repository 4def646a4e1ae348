// 👤 Risk Profile - customer-level view over accounts, credit and alert history

use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;

use crate::config::ScoringConfig;
use crate::db::{self, Event};
use crate::engine::{InferenceEngine, WorkingMemory};
use crate::entities::{Account, CreditScore, Customer, RiskAlert, RiskAssessment, SubjectType};
use crate::error::Result;
use crate::facts::{CustomerActivity, Fact};
use crate::rules::RulePackage;
use crate::services::{assessment_from, CreditScorer};

/// Alerts included in a profile
pub const RECENT_ALERT_LIMIT: usize = 20;

/// Account plus the predicates the rules see
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    #[serde(flatten)]
    pub account: Account,
    pub overdrawn: bool,
    pub low_balance: bool,
    pub high_balance: bool,
    pub near_credit_limit: bool,
    pub dormant: bool,
    pub credit_utilization: f64,
}

impl From<Account> for AccountSummary {
    fn from(account: Account) -> Self {
        AccountSummary {
            overdrawn: account.is_overdrawn(),
            low_balance: account.has_low_balance(),
            high_balance: account.has_high_balance(),
            near_credit_limit: account.is_near_credit_limit(),
            dormant: account.is_dormant(),
            credit_utilization: account.credit_utilization(),
            account,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskProfile {
    pub customer: Customer,
    pub credit_score: CreditScore,
    pub accounts: Vec<AccountSummary>,
    pub activity: CustomerActivity,
    pub recent_alerts: Vec<RiskAlert>,
    pub assessment: RiskAssessment,
}

#[derive(Clone)]
pub struct RiskProfiler {
    engine: Arc<dyn InferenceEngine>,
    scoring: ScoringConfig,
}

impl RiskProfiler {
    pub fn new(engine: Arc<dyn InferenceEngine>, scoring: ScoringConfig) -> Self {
        RiskProfiler { engine, scoring }
    }

    /// Build the profile and store the resulting risk level on the customer
    pub fn profile(&self, conn: &Connection, customer_id: &str) -> Result<RiskProfile> {
        let mut customer = db::require_customer(conn, customer_id)?;
        let accounts = db::accounts_for_customer(conn, customer_id)?;
        let credit = CreditScorer::new(self.engine.clone(), self.scoring.clone())
            .score(&customer, &accounts);
        let activity =
            db::activity_counts(conn, customer_id, Utc::now() - self.scoring.activity_window())?;

        let mut memory = WorkingMemory::new();
        memory.insert(Fact::Customer(customer.clone()));
        for account in &accounts {
            memory.insert(Fact::Account(account.clone()));
        }
        memory.insert(Fact::Credit(credit.clone()));
        memory.insert(Fact::Activity(activity.clone()));

        let inference = self.engine.fire_all(RulePackage::Profile, &memory);
        let assessment = assessment_from(
            &inference,
            SubjectType::Customer,
            customer_id,
            customer_id,
            &self.scoring,
        );

        let previous = customer.risk_level;
        customer.risk_level = assessment.risk_level;

        let db_tx = conn.unchecked_transaction()?;
        db::upsert_customer(&db_tx, &customer)?;
        if previous != customer.risk_level {
            db::insert_event(
                &db_tx,
                &Event::new(
                    "risk_level_changed",
                    "customer",
                    customer_id,
                    serde_json::json!({
                        "from": previous,
                        "to": customer.risk_level,
                        "risk_score": assessment.risk_score,
                    }),
                    "risk_profiler",
                ),
            )?;
        }
        db_tx.commit()?;

        let recent_alerts = db::alerts_for_customer(conn, customer_id, None, RECENT_ALERT_LIMIT)?;

        tracing::info!(
            customer_id = %customer_id,
            risk_level = customer.risk_level.as_str(),
            risk_score = assessment.risk_score,
            "risk profile built"
        );

        Ok(RiskProfile {
            customer,
            credit_score: credit,
            accounts: accounts.into_iter().map(AccountSummary::from).collect(),
            activity,
            recent_alerts,
            assessment,
        })
    }
}
