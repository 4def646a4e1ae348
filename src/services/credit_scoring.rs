// 📈 Credit Scoring - base score plus CREDIT rule adjustments

use rusqlite::Connection;
use std::sync::Arc;

use crate::config::ScoringConfig;
use crate::db;
use crate::engine::{InferenceEngine, WorkingMemory};
use crate::entities::{Account, CreditScore, Customer};
use crate::error::Result;
use crate::facts::Fact;
use crate::rules::RulePackage;

#[derive(Clone)]
pub struct CreditScorer {
    engine: Arc<dyn InferenceEngine>,
    scoring: ScoringConfig,
}

impl CreditScorer {
    pub fn new(engine: Arc<dyn InferenceEngine>, scoring: ScoringConfig) -> Self {
        CreditScorer { engine, scoring }
    }

    pub fn score(&self, customer: &Customer, accounts: &[Account]) -> CreditScore {
        let mut memory = WorkingMemory::new();
        memory.insert(Fact::Customer(customer.clone()));
        for account in accounts {
            memory.insert(Fact::Account(account.clone()));
        }

        let inference = self.engine.fire_all(RulePackage::Credit, &memory);
        let score = CreditScore::compute(
            &customer.customer_id,
            self.scoring.base_credit_score,
            inference.credit_factors,
        );

        tracing::debug!(
            customer_id = %customer.customer_id,
            score = score.score,
            grade = score.grade.as_str(),
            "credit scored"
        );
        score
    }

    pub fn score_customer(&self, conn: &Connection, customer_id: &str) -> Result<CreditScore> {
        let customer = db::require_customer(conn, customer_id)?;
        let accounts = db::accounts_for_customer(conn, customer_id)?;
        Ok(self.score(&customer, &accounts))
    }
}
