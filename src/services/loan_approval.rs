// 🏦 Loan Approval - affordability, LOAN rules, pricing

use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;

use crate::config::ScoringConfig;
use crate::db::{self, Event};
use crate::engine::{InferenceEngine, WorkingMemory};
use crate::entities::{
    CreditScore, Customer, Decision, LoanApplication, LoanStatus, RiskAssessment, SubjectType,
};
use crate::error::{Result, RiskError};
use crate::facts::{Affordability, Fact};
use crate::rules::RulePackage;
use crate::services::{assessment_from, CreditScorer};

#[derive(Debug, Clone, Serialize)]
pub struct LoanDecision {
    pub application: LoanApplication,
    pub credit_score: CreditScore,
    pub affordability: Affordability,
    pub assessment: RiskAssessment,
}

#[derive(Clone)]
pub struct LoanUnderwriter {
    engine: Arc<dyn InferenceEngine>,
    scoring: ScoringConfig,
}

fn status_for(decision: Decision) -> LoanStatus {
    match decision {
        Decision::Approve => LoanStatus::Approved,
        Decision::Review => LoanStatus::ManualReview,
        Decision::Reject => LoanStatus::Rejected,
    }
}

fn round_rate(rate: f64) -> f64 {
    (rate * 100.0).round() / 100.0
}

impl LoanUnderwriter {
    pub fn new(engine: Arc<dyn InferenceEngine>, scoring: ScoringConfig) -> Self {
        LoanUnderwriter { engine, scoring }
    }

    /// Decide and price an application; rejected loans get no rate
    pub fn assess(
        &self,
        application: &LoanApplication,
        customer: &Customer,
        credit: &CreditScore,
    ) -> LoanDecision {
        let affordability =
            Affordability::assess(application, customer, self.scoring.base_interest_rate);

        let mut memory = WorkingMemory::new();
        memory.insert(Fact::Customer(customer.clone()));
        memory.insert(Fact::Loan(application.clone()));
        memory.insert(Fact::Credit(credit.clone()));
        memory.insert(Fact::Affordability(affordability.clone()));

        let inference = self.engine.fire_all(RulePackage::Loan, &memory);
        let assessment = assessment_from(
            &inference,
            SubjectType::Loan,
            &application.application_id,
            &customer.customer_id,
            &self.scoring,
        );

        let mut application = application.clone();
        application.status = status_for(assessment.decision);
        application.interest_rate = match assessment.decision {
            Decision::Reject => None,
            _ => Some(round_rate(
                (self.scoring.base_interest_rate + inference.rate_adjustment).max(0.0),
            )),
        };

        LoanDecision {
            application,
            credit_score: credit.clone(),
            affordability,
            assessment,
        }
    }

    pub fn apply(&self, conn: &Connection, application: LoanApplication) -> Result<LoanDecision> {
        application.validate()?;

        if db::get_loan_application(conn, &application.application_id)?.is_some() {
            return Err(RiskError::Conflict(format!(
                "Loan application {} already exists",
                application.application_id
            )));
        }

        let customer = db::require_customer(conn, &application.customer_id)?;
        let accounts = db::accounts_for_customer(conn, &customer.customer_id)?;
        let credit = CreditScorer::new(self.engine.clone(), self.scoring.clone())
            .score(&customer, &accounts);

        let decision = self.assess(&application, &customer, &credit);

        let db_tx = conn.unchecked_transaction()?;
        db::insert_loan_application(&db_tx, &decision.application)?;
        db::insert_event(
            &db_tx,
            &Event::new(
                "loan_decided",
                "loan_application",
                &decision.application.application_id,
                serde_json::json!({
                    "status": decision.application.status,
                    "interest_rate": decision.application.interest_rate,
                    "credit_score": credit.score,
                    "risk_score": decision.assessment.risk_score,
                    "fired_rules": decision.assessment.fired_rules,
                }),
                "loan_underwriter",
            ),
        )?;
        db_tx.commit()?;

        tracing::info!(
            application_id = %decision.application.application_id,
            customer_id = %customer.customer_id,
            status = decision.application.status.as_str(),
            credit_score = credit.score,
            "loan application decided"
        );

        Ok(decision)
    }
}
