// 🗄️ Storage - SQLite + WAL
//
// Each record is stored as a JSON payload next to the columns we query on.
// Timestamps are written with ts(): fixed-width RFC 3339 (millis, Z) so that
// string comparison in SQL follows time order.

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::ScoringConfig;
use crate::entities::{
    Account, AlertStatus, Customer, LoanApplication, RiskAlert, Severity, Transaction,
    TransactionStatus,
};
use crate::error::{Result, RiskError};
use crate::facts::{CustomerActivity, TransactionStats};

/// Canonical timestamp format for every stored time column
pub fn ts(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn decode_all<T: DeserializeOwned>(payloads: Vec<String>) -> Result<Vec<T>> {
    payloads
        .iter()
        .map(|p| serde_json::from_str(p).map_err(RiskError::from))
        .collect()
}

fn payload_column(row: &Row<'_>) -> rusqlite::Result<String> {
    row.get(0)
}

// ============================================================================
// EVENTS (audit trail)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Open (or create) a database file and make sure the schema exists
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let conn = Connection::open(path)?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery (in-memory databases stay on "memory")
    let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS customers (
            customer_id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS accounts (
            account_number TEXT PRIMARY KEY,
            customer_id TEXT NOT NULL,
            payload TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS transactions (
            transaction_id TEXT PRIMARY KEY,
            account_number TEXT NOT NULL,
            customer_id TEXT NOT NULL,
            amount REAL NOT NULL,
            country TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            status TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            payload TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS alerts (
            alert_id TEXT PRIMARY KEY,
            customer_id TEXT NOT NULL,
            severity TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            payload TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS loan_applications (
            application_id TEXT PRIMARY KEY,
            customer_id TEXT NOT NULL,
            status TEXT NOT NULL,
            submitted_at TEXT NOT NULL,
            payload TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_accounts_customer ON accounts(customer_id);
        CREATE INDEX IF NOT EXISTS idx_tx_customer_time ON transactions(customer_id, timestamp);
        CREATE INDEX IF NOT EXISTS idx_tx_fingerprint ON transactions(fingerprint, timestamp);
        CREATE INDEX IF NOT EXISTS idx_alerts_customer ON alerts(customer_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_loans_customer ON loan_applications(customer_id);
        CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);
        CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);",
    )?;

    Ok(())
}

// ============================================================================
// CUSTOMERS & ACCOUNTS
// ============================================================================

pub fn upsert_customer(conn: &Connection, customer: &Customer) -> Result<()> {
    conn.execute(
        "INSERT INTO customers (customer_id, payload, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(customer_id) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
        params![
            customer.customer_id,
            serde_json::to_string(customer)?,
            ts(Utc::now())
        ],
    )?;
    Ok(())
}

pub fn get_customer(conn: &Connection, customer_id: &str) -> Result<Option<Customer>> {
    let payload: Option<String> = conn
        .query_row(
            "SELECT payload FROM customers WHERE customer_id = ?1",
            params![customer_id],
            payload_column,
        )
        .optional()?;

    payload
        .map(|p| serde_json::from_str(&p).map_err(RiskError::from))
        .transpose()
}

/// Like get_customer, but a missing customer is an error
pub fn require_customer(conn: &Connection, customer_id: &str) -> Result<Customer> {
    get_customer(conn, customer_id)?.ok_or_else(|| RiskError::not_found("Customer", customer_id))
}

pub fn upsert_account(conn: &Connection, account: &Account) -> Result<()> {
    conn.execute(
        "INSERT INTO accounts (account_number, customer_id, payload, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(account_number) DO UPDATE SET
            customer_id = excluded.customer_id,
            payload = excluded.payload,
            updated_at = excluded.updated_at",
        params![
            account.account_number,
            account.customer_id,
            serde_json::to_string(account)?,
            ts(Utc::now())
        ],
    )?;
    Ok(())
}

pub fn get_account(conn: &Connection, account_number: &str) -> Result<Option<Account>> {
    let payload: Option<String> = conn
        .query_row(
            "SELECT payload FROM accounts WHERE account_number = ?1",
            params![account_number],
            payload_column,
        )
        .optional()?;

    payload
        .map(|p| serde_json::from_str(&p).map_err(RiskError::from))
        .transpose()
}

pub fn accounts_for_customer(conn: &Connection, customer_id: &str) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(
        "SELECT payload FROM accounts WHERE customer_id = ?1 ORDER BY account_number",
    )?;
    let payloads = stmt
        .query_map(params![customer_id], payload_column)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    decode_all(payloads)
}

// ============================================================================
// TRANSACTIONS
// ============================================================================

/// Store a screened transaction; the id must be new
pub fn insert_transaction(conn: &Connection, tx: &Transaction, customer_id: &str) -> Result<()> {
    let result = conn.execute(
        "INSERT INTO transactions (
            transaction_id, account_number, customer_id, amount, country,
            fingerprint, status, timestamp, payload
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            tx.transaction_id,
            tx.account_number,
            customer_id,
            tx.amount,
            tx.country,
            tx.fingerprint(),
            tx.status.as_str(),
            ts(tx.timestamp),
            serde_json::to_string(tx)?,
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(e) if is_constraint_violation(&e) => Err(RiskError::Conflict(format!(
            "Transaction {} already processed",
            tx.transaction_id
        ))),
        Err(e) => Err(e.into()),
    }
}

pub fn get_transaction(conn: &Connection, transaction_id: &str) -> Result<Option<Transaction>> {
    let payload: Option<String> = conn
        .query_row(
            "SELECT payload FROM transactions WHERE transaction_id = ?1",
            params![transaction_id],
            payload_column,
        )
        .optional()?;

    payload
        .map(|p| serde_json::from_str(&p).map_err(RiskError::from))
        .transpose()
}

pub fn transaction_exists(conn: &Connection, transaction_id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM transactions WHERE transaction_id = ?1)",
        params![transaction_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Velocity figures for `tx`, counting stored history plus `tx` itself.
/// Rejected transactions count as attempts but not toward the moved amount.
pub fn transaction_stats(
    conn: &Connection,
    tx: &Transaction,
    customer_id: &str,
    scoring: &ScoringConfig,
) -> Result<TransactionStats> {
    let now = ts(tx.timestamp);
    let rejected = TransactionStatus::Rejected.as_str();

    let last_hour: i64 = conn.query_row(
        "SELECT COUNT(*) FROM transactions
         WHERE customer_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3",
        params![customer_id, ts(tx.timestamp - scoring.velocity_window()), now],
        |row| row.get(0),
    )?;

    let day_start = ts(tx.timestamp - scoring.daily_window());
    let (last_24h, amount_24h): (i64, f64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status != ?4 THEN amount ELSE 0 END), 0)
         FROM transactions
         WHERE customer_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3",
        params![customer_id, day_start, now, rejected],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let other_countries: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT country) FROM transactions
         WHERE customer_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3 AND country != ?4",
        params![customer_id, day_start, now, tx.country],
        |row| row.get(0),
    )?;

    let duplicate: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM transactions
         WHERE fingerprint = ?1 AND timestamp >= ?2 AND timestamp <= ?3)",
        params![
            tx.fingerprint(),
            ts(tx.timestamp - scoring.duplicate_window()),
            now
        ],
        |row| row.get(0),
    )?;

    Ok(TransactionStats {
        customer_id: customer_id.to_string(),
        transactions_last_hour: last_hour as u32 + 1,
        transactions_last_24h: last_24h as u32 + 1,
        amount_last_24h: amount_24h + tx.amount,
        distinct_countries_24h: other_countries as u32 + 1,
        duplicate,
    })
}

// ============================================================================
// ALERTS
// ============================================================================

pub fn insert_alert(conn: &Connection, alert: &RiskAlert) -> Result<()> {
    conn.execute(
        "INSERT INTO alerts (alert_id, customer_id, severity, status, created_at, payload)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            alert.alert_id,
            alert.customer_id,
            alert.severity.as_str(),
            alert.status.as_str(),
            ts(alert.created_at),
            serde_json::to_string(alert)?,
        ],
    )?;
    Ok(())
}

pub fn get_alert(conn: &Connection, alert_id: &str) -> Result<Option<RiskAlert>> {
    let payload: Option<String> = conn
        .query_row(
            "SELECT payload FROM alerts WHERE alert_id = ?1",
            params![alert_id],
            payload_column,
        )
        .optional()?;

    payload
        .map(|p| serde_json::from_str(&p).map_err(RiskError::from))
        .transpose()
}

/// Newest first
pub fn alerts_for_customer(
    conn: &Connection,
    customer_id: &str,
    status: Option<AlertStatus>,
    limit: usize,
) -> Result<Vec<RiskAlert>> {
    let mut stmt = conn.prepare(
        "SELECT payload FROM alerts
         WHERE customer_id = ?1 AND (?2 IS NULL OR status = ?2)
         ORDER BY created_at DESC, alert_id
         LIMIT ?3",
    )?;
    let payloads = stmt
        .query_map(
            params![customer_id, status.map(|s| s.as_str()), limit as i64],
            payload_column,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    decode_all(payloads)
}

/// Move an alert forward (OPEN → ACKNOWLEDGED → RESOLVED)
pub fn update_alert_status(conn: &Connection, alert_id: &str, next: AlertStatus) -> Result<RiskAlert> {
    let mut alert = get_alert(conn, alert_id)?.ok_or_else(|| RiskError::not_found("Alert", alert_id))?;

    if !alert.status.can_transition_to(next) {
        return Err(RiskError::validation(format!(
            "Alert {} cannot move from {} to {}",
            alert_id,
            alert.status.as_str(),
            next.as_str()
        )));
    }

    alert.status = next;
    conn.execute(
        "UPDATE alerts SET status = ?2, payload = ?3 WHERE alert_id = ?1",
        params![alert_id, next.as_str(), serde_json::to_string(&alert)?],
    )?;
    Ok(alert)
}

// ============================================================================
// LOAN APPLICATIONS
// ============================================================================

pub fn insert_loan_application(conn: &Connection, application: &LoanApplication) -> Result<()> {
    let result = conn.execute(
        "INSERT INTO loan_applications (application_id, customer_id, status, submitted_at, payload)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            application.application_id,
            application.customer_id,
            application.status.as_str(),
            ts(application.submitted_at),
            serde_json::to_string(application)?,
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(e) if is_constraint_violation(&e) => Err(RiskError::Conflict(format!(
            "Loan application {} already exists",
            application.application_id
        ))),
        Err(e) => Err(e.into()),
    }
}

pub fn get_loan_application(conn: &Connection, application_id: &str) -> Result<Option<LoanApplication>> {
    let payload: Option<String> = conn
        .query_row(
            "SELECT payload FROM loan_applications WHERE application_id = ?1",
            params![application_id],
            payload_column,
        )
        .optional()?;

    payload
        .map(|p| serde_json::from_str(&p).map_err(RiskError::from))
        .transpose()
}

// ============================================================================
// ACTIVITY
// ============================================================================

/// Alert and transaction counts since `since`; critical/high exclude resolved alerts
pub fn activity_counts(
    conn: &Connection,
    customer_id: &str,
    since: DateTime<Utc>,
) -> Result<CustomerActivity> {
    let (open, critical, high): (i64, i64, i64) = conn.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN status = ?2 THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status != ?3 AND severity = ?4 THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status != ?3 AND severity = ?5 THEN 1 ELSE 0 END), 0)
         FROM alerts WHERE customer_id = ?1 AND created_at >= ?6",
        params![
            customer_id,
            AlertStatus::Open.as_str(),
            AlertStatus::Resolved.as_str(),
            Severity::Critical.as_str(),
            Severity::High.as_str(),
            ts(since),
        ],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    let (recent, rejected): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = ?3 THEN 1 ELSE 0 END), 0)
         FROM transactions WHERE customer_id = ?1 AND timestamp >= ?2",
        params![customer_id, ts(since), TransactionStatus::Rejected.as_str()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(CustomerActivity {
        customer_id: customer_id.to_string(),
        open_alerts: open as u32,
        critical_alerts: critical as u32,
        high_alerts: high as u32,
        transactions_last_30d: recent as u32,
        rejected_transactions_30d: rejected as u32,
    })
}

// ============================================================================
// EVENTS
// ============================================================================

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            ts(event.timestamp),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC, id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
                actor: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(events)
}

// ============================================================================
// CSV
// ============================================================================

/// Read transactions for batch screening (header row = Transaction field names)
pub fn load_csv(csv_path: &Path) -> anyhow::Result<Vec<Transaction>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file: {:?}", csv_path))?;

    let mut transactions = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let transaction: Transaction =
            result.with_context(|| format!("Failed to deserialize transaction on row {}", line + 2))?;
        transactions.push(transaction);
    }

    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        AccountType, AlertType, Channel, EmploymentStatus, LoanPurpose, TransactionType,
    };
    use chrono::{Duration, TimeZone};
    use std::io::Write;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 14, 0, 0).unwrap()
    }

    fn tx(id: &str, amount: f64, at: DateTime<Utc>) -> Transaction {
        Transaction::new(id, "ACC001", amount, TransactionType::Transfer, Channel::Online).at(at)
    }

    #[test]
    fn test_ts_is_fixed_width_and_ordered() {
        let a = ts(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
        let b = ts(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap() + Duration::milliseconds(5));
        assert_eq!(a, "2024-01-01T09:00:00.000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn test_customer_and_account_upsert() {
        let conn = conn();
        let mut customer = Customer::new("CUST001", "Ada", 40, 90_000.0, EmploymentStatus::Employed);
        upsert_customer(&conn, &customer).unwrap();

        customer.blacklisted = true;
        upsert_customer(&conn, &customer).unwrap();
        assert!(get_customer(&conn, "CUST001").unwrap().unwrap().blacklisted);
        assert!(get_customer(&conn, "NOPE").unwrap().is_none());
        assert!(matches!(
            require_customer(&conn, "NOPE"),
            Err(RiskError::NotFound { .. })
        ));

        upsert_account(&conn, &Account::new("ACC002", "CUST001", AccountType::Savings, 5.0)).unwrap();
        upsert_account(&conn, &Account::new("ACC001", "CUST001", AccountType::Checking, 10.0)).unwrap();
        upsert_account(&conn, &Account::new("ACC009", "CUST009", AccountType::Checking, 10.0)).unwrap();

        let accounts = accounts_for_customer(&conn, "CUST001").unwrap();
        let numbers: Vec<&str> = accounts.iter().map(|a| a.account_number.as_str()).collect();
        assert_eq!(numbers, vec!["ACC001", "ACC002"]);
        assert_eq!(get_account(&conn, "ACC002").unwrap().unwrap().balance, 5.0);
    }

    #[test]
    fn test_duplicate_transaction_id_is_conflict() {
        let conn = conn();
        let t = tx("TX1", 100.0, base_time());
        insert_transaction(&conn, &t, "CUST001").unwrap();
        assert!(transaction_exists(&conn, "TX1").unwrap());

        let err = insert_transaction(&conn, &t, "CUST001").unwrap_err();
        assert!(matches!(err, RiskError::Conflict(_)));
        assert_eq!(get_transaction(&conn, "TX1").unwrap().unwrap().amount, 100.0);
    }

    #[test]
    fn test_transaction_stats_windows() {
        let conn = conn();
        let scoring = ScoringConfig::default();
        let now = base_time();

        // 2 in the last hour, 1 earlier today, 1 two days ago
        insert_transaction(&conn, &tx("A", 1_000.0, now - Duration::minutes(10)), "CUST001").unwrap();
        let mut abroad = tx("B", 2_000.0, now - Duration::minutes(50));
        abroad.country = "FR".to_string();
        insert_transaction(&conn, &abroad, "CUST001").unwrap();
        let mut rejected = tx("C", 5_000.0, now - Duration::hours(5));
        rejected.status = TransactionStatus::Rejected;
        insert_transaction(&conn, &rejected, "CUST001").unwrap();
        insert_transaction(&conn, &tx("D", 9_999.0, now - Duration::days(2)), "CUST001").unwrap();
        // Someone else's activity
        insert_transaction(&conn, &tx("E", 7.0, now - Duration::minutes(1)), "CUST002").unwrap();

        let current = tx("NEW", 500.0, now);
        let stats = transaction_stats(&conn, &current, "CUST001", &scoring).unwrap();

        assert_eq!(stats.transactions_last_hour, 3);
        assert_eq!(stats.transactions_last_24h, 4);
        assert_eq!(stats.amount_last_24h, 3_500.0);
        assert_eq!(stats.distinct_countries_24h, 2);
        assert!(!stats.duplicate);
    }

    #[test]
    fn test_duplicate_detection_uses_fingerprint_and_window() {
        let conn = conn();
        let scoring = ScoringConfig::default();
        let now = base_time();

        insert_transaction(&conn, &tx("FIRST", 250.0, now - Duration::minutes(3)), "CUST001").unwrap();

        let again = tx("SECOND", 250.0, now);
        assert!(transaction_stats(&conn, &again, "CUST001", &scoring).unwrap().duplicate);

        let later = tx("THIRD", 250.0, now + Duration::minutes(30));
        assert!(!transaction_stats(&conn, &later, "CUST001", &scoring).unwrap().duplicate);

        let different = tx("FOURTH", 251.0, now);
        assert!(!transaction_stats(&conn, &different, "CUST001", &scoring).unwrap().duplicate);
    }

    #[test]
    fn test_alert_lifecycle() {
        let conn = conn();
        let alert = RiskAlert::builder(AlertType::LargeAmount, Severity::High)
            .message("big")
            .customer("CUST001")
            .build();
        insert_alert(&conn, &alert).unwrap();

        let open = alerts_for_customer(&conn, "CUST001", Some(AlertStatus::Open), 10).unwrap();
        assert_eq!(open.len(), 1);

        let updated = update_alert_status(&conn, &alert.alert_id, AlertStatus::Resolved).unwrap();
        assert_eq!(updated.status, AlertStatus::Resolved);
        assert!(alerts_for_customer(&conn, "CUST001", Some(AlertStatus::Open), 10)
            .unwrap()
            .is_empty());
        assert_eq!(alerts_for_customer(&conn, "CUST001", None, 10).unwrap().len(), 1);

        // No going back
        let err = update_alert_status(&conn, &alert.alert_id, AlertStatus::Open).unwrap_err();
        assert!(matches!(err, RiskError::Validation(_)));

        let err = update_alert_status(&conn, "missing", AlertStatus::Resolved).unwrap_err();
        assert!(matches!(err, RiskError::NotFound { .. }));
    }

    #[test]
    fn test_alerts_newest_first_with_limit() {
        let conn = conn();
        for minutes in [5, 1, 3] {
            let mut alert = RiskAlert::builder(AlertType::Overdraft, Severity::Low)
                .message(format!("{} minutes ago", minutes))
                .customer("CUST001")
                .build();
            alert.created_at = base_time() - Duration::minutes(minutes);
            insert_alert(&conn, &alert).unwrap();
        }

        let alerts = alerts_for_customer(&conn, "CUST001", None, 2).unwrap();
        let messages: Vec<&str> = alerts.iter().map(|a| a.message.as_str()).collect();
        assert_eq!(messages, vec!["1 minutes ago", "3 minutes ago"]);
    }

    #[test]
    fn test_activity_counts() {
        let conn = conn();
        let now = base_time();

        for (severity, status) in [
            (Severity::Critical, AlertStatus::Open),
            (Severity::High, AlertStatus::Acknowledged),
            (Severity::Critical, AlertStatus::Resolved),
            (Severity::Low, AlertStatus::Open),
        ] {
            let mut alert = RiskAlert::builder(AlertType::LargeAmount, severity)
                .customer("CUST001")
                .build();
            alert.status = status;
            insert_alert(&conn, &alert).unwrap();
        }

        // Unresolved but older than the window
        let mut stale = RiskAlert::builder(AlertType::Blacklist, Severity::Critical)
            .customer("CUST001")
            .build();
        stale.created_at = now - Duration::days(90);
        insert_alert(&conn, &stale).unwrap();

        let mut rejected = tx("R", 10.0, now - Duration::days(1));
        rejected.status = TransactionStatus::Rejected;
        insert_transaction(&conn, &rejected, "CUST001").unwrap();
        insert_transaction(&conn, &tx("OK", 10.0, now - Duration::days(2)), "CUST001").unwrap();
        insert_transaction(&conn, &tx("OLD", 10.0, now - Duration::days(60)), "CUST001").unwrap();

        let activity = activity_counts(&conn, "CUST001", now - Duration::days(30)).unwrap();
        assert_eq!(activity.open_alerts, 2);
        assert_eq!(activity.critical_alerts, 1);
        assert_eq!(activity.high_alerts, 1);
        assert_eq!(activity.transactions_last_30d, 2);
        assert_eq!(activity.rejected_transactions_30d, 1);
    }

    #[test]
    fn test_loan_application_roundtrip_and_conflict() {
        let conn = conn();
        let application = LoanApplication::new("CUST001", 20_000.0, 48, LoanPurpose::Auto);
        insert_loan_application(&conn, &application).unwrap();

        let stored = get_loan_application(&conn, &application.application_id)
            .unwrap()
            .unwrap();
        assert_eq!(stored, application);
        assert!(matches!(
            insert_loan_application(&conn, &application),
            Err(RiskError::Conflict(_))
        ));
        assert!(get_loan_application(&conn, "LOAN-missing").unwrap().is_none());
    }

    #[test]
    fn test_event_log() {
        let conn = conn();

        let event = Event::new(
            "transaction_screened",
            "transaction",
            "TX1",
            serde_json::json!({"decision": "APPROVE"}),
            "test_actor",
        );

        insert_event(&conn, &event).unwrap();

        let events = get_events_for_entity(&conn, "transaction", "TX1").unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "transaction_screened");
        assert_eq!(events[0].actor, "test_actor");
        assert_eq!(events[0].data["decision"], "APPROVE");
    }

    #[test]
    fn test_load_csv() {
        let path = std::env::temp_dir().join(format!("risk-control-{}.csv", uuid::Uuid::new_v4()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(
                file,
                "transaction_id,account_number,amount,transaction_type,channel,timestamp,country,international"
            )
            .unwrap();
            writeln!(file, "TX1,ACC001,120.5,PURCHASE,POS,2024-06-03T14:00:00Z,US,false").unwrap();
            writeln!(file, "TX2,ACC002,9500,TRANSFER,ONLINE,2024-06-03T02:30:00Z,DE,true").unwrap();
        }

        let transactions = load_csv(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].transaction_type, TransactionType::Purchase);
        assert_eq!(transactions[1].hour(), 2);
        assert!(transactions[1].international);
        assert_eq!(transactions[1].currency, "USD");
    }
}
