// 🔍 Transaction Monitoring
//
// assess() is pure: facts in, assessment out. process() wraps it with the
// store: resolve account/customer, compute velocity stats, book the result.

use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;

use crate::config::ScoringConfig;
use crate::db::{self, Event};
use crate::engine::{InferenceEngine, WorkingMemory};
use crate::entities::{
    Account, Customer, Decision, RiskAlert, RiskAssessment, SubjectType, Transaction,
    TransactionStatus,
};
use crate::error::{Result, RiskError};
use crate::facts::{Fact, TransactionStats};
use crate::rules::RulePackage;
use crate::services::assessment_from;

#[derive(Debug, Clone, Serialize)]
pub struct TransactionResult {
    pub transaction: Transaction,
    pub assessment: RiskAssessment,
}

#[derive(Clone)]
pub struct TransactionMonitor {
    engine: Arc<dyn InferenceEngine>,
    scoring: ScoringConfig,
}

fn status_for(decision: Decision) -> TransactionStatus {
    match decision {
        Decision::Approve => TransactionStatus::Approved,
        Decision::Review => TransactionStatus::UnderReview,
        Decision::Reject => TransactionStatus::Rejected,
    }
}

impl TransactionMonitor {
    pub fn new(engine: Arc<dyn InferenceEngine>, scoring: ScoringConfig) -> Self {
        TransactionMonitor { engine, scoring }
    }

    pub fn assess(
        &self,
        tx: &Transaction,
        account: &Account,
        customer: &Customer,
        stats: &TransactionStats,
    ) -> RiskAssessment {
        let mut memory = WorkingMemory::new();
        memory.insert(Fact::Customer(customer.clone()));
        memory.insert(Fact::Account(account.clone()));
        memory.insert(Fact::Transaction(tx.clone()));
        memory.insert(Fact::Stats(stats.clone()));

        let inference = self.engine.fire_all(RulePackage::Transaction, &memory);
        let mut assessment = assessment_from(
            &inference,
            SubjectType::Transaction,
            &tx.transaction_id,
            &customer.customer_id,
            &self.scoring,
        );

        assessment.alerts = inference
            .alerts
            .iter()
            .map(|spec| {
                RiskAlert::builder(spec.alert_type, spec.severity)
                    .message(spec.message.clone())
                    .customer(customer.customer_id.clone())
                    .transaction(tx.transaction_id.clone())
                    .account(
                        spec.account_number
                            .clone()
                            .unwrap_or_else(|| tx.account_number.clone()),
                    )
                    .rule(spec.rule_id.clone())
                    .build()
            })
            .collect();

        assessment
    }

    /// Screen, then persist transaction, alerts, balance and audit event in one transaction
    pub fn process(&self, conn: &Connection, mut tx: Transaction) -> Result<TransactionResult> {
        tx.validate()?;

        if db::transaction_exists(conn, &tx.transaction_id)? {
            return Err(RiskError::Conflict(format!(
                "Transaction {} already processed",
                tx.transaction_id
            )));
        }

        let mut account = db::get_account(conn, &tx.account_number)?
            .ok_or_else(|| RiskError::not_found("Account", tx.account_number.clone()))?;

        match &tx.customer_id {
            Some(claimed) if *claimed != account.customer_id => {
                return Err(RiskError::validation(format!(
                    "Account {} does not belong to customer {}",
                    tx.account_number, claimed
                )));
            }
            _ => tx.customer_id = Some(account.customer_id.clone()),
        }

        let customer = db::require_customer(conn, &account.customer_id)?;
        let stats = db::transaction_stats(conn, &tx, &customer.customer_id, &self.scoring)?;

        let assessment = self.assess(&tx, &account, &customer, &stats);
        tx.status = status_for(assessment.decision);

        let approved = tx.status == TransactionStatus::Approved;
        if approved {
            account.apply(&tx);
        }

        let db_tx = conn.unchecked_transaction()?;
        db::insert_transaction(&db_tx, &tx, &customer.customer_id)?;
        for alert in &assessment.alerts {
            db::insert_alert(&db_tx, alert)?;
        }
        if approved {
            db::upsert_account(&db_tx, &account)?;
        }
        db::insert_event(
            &db_tx,
            &Event::new(
                "transaction_screened",
                "transaction",
                &tx.transaction_id,
                serde_json::json!({
                    "decision": assessment.decision,
                    "risk_score": assessment.risk_score,
                    "fired_rules": assessment.fired_rules,
                    "alerts": assessment.alerts.len(),
                }),
                "transaction_monitor",
            ),
        )?;
        db_tx.commit()?;

        tracing::info!(
            transaction_id = %tx.transaction_id,
            customer_id = %customer.customer_id,
            decision = assessment.decision.as_str(),
            risk_score = assessment.risk_score,
            alerts = assessment.alerts.len(),
            "transaction screened"
        );

        Ok(TransactionResult {
            transaction: tx,
            assessment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RuleEngine;
    use crate::entities::{AlertStatus, AlertType, Channel, RiskLevel, TransactionType};
    use crate::seed::{demo_accounts, demo_customers, seed_demo_data};
    use chrono::{TimeZone, Utc};

    fn monitor() -> TransactionMonitor {
        TransactionMonitor::new(
            Arc::new(RuleEngine::with_default_rules().unwrap()),
            ScoringConfig::default(),
        )
    }

    fn afternoon_tx(id: &str, account: &str, amount: f64, kind: TransactionType) -> Transaction {
        Transaction::new(id, account, amount, kind, Channel::Online)
            .at(Utc.with_ymd_and_hms(2024, 6, 3, 14, 0, 0).unwrap())
    }

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        seed_demo_data(&conn).unwrap();
        conn
    }

    #[test]
    fn test_ordinary_purchase_is_approved() {
        let customer = &demo_customers()[0];
        let account = &demo_accounts()[0];
        let tx = afternoon_tx("TX1", "ACC001", 100.0, TransactionType::Purchase);

        let assessment = monitor().assess(&tx, account, customer, &TransactionStats::first(&tx, "CUST001"));

        assert_eq!(assessment.decision, Decision::Approve);
        assert_eq!(assessment.risk_score, 0.0);
        assert!(assessment.alerts.is_empty());
        assert!(assessment.fired_rules.is_empty());
    }

    #[test]
    fn test_large_amount_raises_alert() {
        let customer = &demo_customers()[0];
        let account = &demo_accounts()[0];
        let tx = afternoon_tx("TX2", "ACC001", 75_000.0, TransactionType::Transfer);

        let assessment = monitor().assess(&tx, account, customer, &TransactionStats::first(&tx, "CUST001"));

        assert_eq!(assessment.risk_score, 30.0);
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
        assert_eq!(assessment.decision, Decision::Approve);
        assert_eq!(assessment.alerts.len(), 1);

        let alert = &assessment.alerts[0];
        assert_eq!(alert.alert_type, AlertType::LargeAmount);
        assert_eq!(alert.message, "Large transaction amount 75000 USD");
        assert_eq!(alert.transaction_id.as_deref(), Some("TX2"));
        assert_eq!(alert.rule_id.as_deref(), Some("TX_LARGE_AMOUNT"));
    }

    #[test]
    fn test_structuring_with_velocity_goes_to_review() {
        let customer = &demo_customers()[0];
        let account = &demo_accounts()[0];
        let tx = afternoon_tx("TX3", "ACC001", 9_500.0, TransactionType::Transfer);
        let stats = TransactionStats {
            customer_id: "CUST001".to_string(),
            transactions_last_hour: 5,
            transactions_last_24h: 5,
            amount_last_24h: 40_000.0,
            distinct_countries_24h: 1,
            duplicate: false,
        };

        let assessment = monitor().assess(&tx, account, customer, &stats);

        // structuring 30 + velocity 25
        assert_eq!(assessment.risk_score, 55.0);
        assert_eq!(assessment.decision, Decision::Review);
        assert_eq!(assessment.fired_rules, vec!["TX_STRUCTURING", "TX_HIGH_VELOCITY"]);
    }

    #[test]
    fn test_duplicate_forces_review() {
        let customer = &demo_customers()[0];
        let account = &demo_accounts()[0];
        let tx = afternoon_tx("TX4", "ACC001", 50.0, TransactionType::Purchase);
        let mut stats = TransactionStats::first(&tx, "CUST001");
        stats.duplicate = true;

        let assessment = monitor().assess(&tx, account, customer, &stats);
        assert_eq!(assessment.risk_score, 20.0);
        assert_eq!(assessment.decision, Decision::Review);
        assert!(assessment.reasons.contains(&"Possible duplicate transaction".to_string()));
    }

    #[test]
    fn test_process_books_approved_transaction() {
        let conn = seeded();
        let tx = Transaction::new("TX10", "ACC001", 100.0, TransactionType::Purchase, Channel::Pos);

        let result = monitor().process(&conn, tx).unwrap();

        assert_eq!(result.transaction.status, TransactionStatus::Approved);
        assert_eq!(result.transaction.customer_id.as_deref(), Some("CUST001"));
        assert_eq!(db::get_account(&conn, "ACC001").unwrap().unwrap().balance, 149_900.0);

        let stored = db::get_transaction(&conn, "TX10").unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Approved);
        assert_eq!(db::get_events_for_entity(&conn, "transaction", "TX10").unwrap().len(), 1);
    }

    #[test]
    fn test_process_rejects_blacklisted_without_moving_money() {
        let conn = seeded();
        let tx = Transaction::new("TX11", "ACC004", 500.0, TransactionType::Withdrawal, Channel::Branch);

        let result = monitor().process(&conn, tx).unwrap();

        assert_eq!(result.assessment.decision, Decision::Reject);
        assert_eq!(result.transaction.status, TransactionStatus::Rejected);
        assert_eq!(db::get_account(&conn, "ACC004").unwrap().unwrap().balance, 25_000.0);

        let alerts = db::alerts_for_customer(&conn, "CUST003", Some(AlertStatus::Open), 10).unwrap();
        let types: Vec<AlertType> = alerts.iter().map(|a| a.alert_type).collect();
        assert!(types.contains(&AlertType::Blacklist));
        assert!(types.contains(&AlertType::DormantAccount));
        assert!(alerts.iter().all(|a| a.account_number.as_deref() == Some("ACC004")));
    }

    #[test]
    fn test_process_detects_velocity_from_history() {
        let conn = seeded();
        let monitor = monitor();

        let mut last = None;
        for (i, amount) in [100.0, 200.0, 300.0, 400.0, 500.0].iter().enumerate() {
            let tx = Transaction::new(
                &format!("VEL{}", i),
                "ACC001",
                *amount,
                TransactionType::Purchase,
                Channel::Online,
            );
            last = Some(monitor.process(&conn, tx).unwrap());
        }

        let last = last.unwrap();
        assert!(last.assessment.fired_rules.contains(&"TX_HIGH_VELOCITY".to_string()));
        assert!(last
            .assessment
            .alerts
            .iter()
            .any(|a| a.alert_type == AlertType::HighVelocity));
    }

    #[test]
    fn test_process_errors() {
        let conn = seeded();
        let monitor = monitor();

        let tx = Transaction::new("TX20", "ACC001", 10.0, TransactionType::Purchase, Channel::Pos);
        monitor.process(&conn, tx.clone()).unwrap();
        assert!(matches!(monitor.process(&conn, tx), Err(RiskError::Conflict(_))));

        let unknown = Transaction::new("TX21", "ACC999", 10.0, TransactionType::Purchase, Channel::Pos);
        assert!(matches!(
            monitor.process(&conn, unknown),
            Err(RiskError::NotFound { .. })
        ));

        let mut wrong_owner = Transaction::new("TX22", "ACC001", 10.0, TransactionType::Purchase, Channel::Pos);
        wrong_owner.customer_id = Some("CUST002".to_string());
        assert!(matches!(
            monitor.process(&conn, wrong_owner),
            Err(RiskError::Validation(_))
        ));

        let negative = Transaction::new("TX23", "ACC001", -5.0, TransactionType::Purchase, Channel::Pos);
        assert!(matches!(
            monitor.process(&conn, negative),
            Err(RiskError::Validation(_))
        ));
    }
}
