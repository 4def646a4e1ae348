// 🌱 Demo data
//
// CUST001  healthy, long history; ACC001 checking with a high balance
// CUST002  over-leveraged, short history; ACC002 credit line near its limit,
//          ACC003 checking slightly overdrawn
// CUST003  blacklisted; ACC004 dormant savings

use rusqlite::Connection;

use crate::db::{upsert_account, upsert_customer};
use crate::entities::{Account, AccountType, Customer, EmploymentStatus};
use crate::error::Result;

pub fn demo_customers() -> Vec<Customer> {
    let mut healthy = Customer::new("CUST001", "Alice Johnson", 42, 120_000.0, EmploymentStatus::Employed);
    healthy.monthly_debt_payments = 1_500.0;
    healthy.credit_history_months = 180;
    healthy.relationship_months = 96;
    healthy.kyc_verified = true;

    let mut leveraged = Customer::new("CUST002", "Bob Smith", 23, 36_000.0, EmploymentStatus::SelfEmployed);
    leveraged.monthly_debt_payments = 1_800.0;
    leveraged.credit_history_months = 14;
    leveraged.relationship_months = 4;
    leveraged.kyc_verified = true;

    let mut blacklisted = Customer::new("CUST003", "Carol White", 51, 60_000.0, EmploymentStatus::Employed);
    blacklisted.monthly_debt_payments = 500.0;
    blacklisted.credit_history_months = 72;
    blacklisted.relationship_months = 30;
    blacklisted.kyc_verified = true;
    blacklisted.blacklisted = true;

    vec![healthy, leveraged, blacklisted]
}

pub fn demo_accounts() -> Vec<Account> {
    let mut dormant = Account::new("ACC004", "CUST003", AccountType::Savings, 25_000.0);
    dormant.dormant_days = 120;

    vec![
        Account::new("ACC001", "CUST001", AccountType::Checking, 150_000.0),
        Account::new("ACC002", "CUST002", AccountType::Credit, -950.0).with_credit_limit(1_000.0),
        Account::new("ACC003", "CUST002", AccountType::Checking, -50.0),
        dormant,
    ]
}

/// Upsert the demo set; running it twice leaves the same rows
pub fn seed_demo_data(conn: &Connection) -> Result<()> {
    let db_tx = conn.unchecked_transaction()?;
    let customers = demo_customers();
    let accounts = demo_accounts();

    for customer in &customers {
        upsert_customer(&db_tx, customer)?;
    }
    for account in &accounts {
        upsert_account(&db_tx, account)?;
    }
    db_tx.commit()?;

    tracing::info!(
        customers = customers.len(),
        accounts = accounts.len(),
        "seeded demo data"
    );
    Ok(())
}
