// Entity Models
// Plain records that are assembled into facts for the rule engine.
//
// Relationships are by string id (customer_id, account_number) and are
// resolved by the services, never held as references.

pub mod account;
pub mod alert;
pub mod assessment;
pub mod credit;
pub mod customer;
pub mod loan;
pub mod transaction;

pub use account::{Account, AccountStatus, AccountType};
pub use alert::{AlertStatus, AlertType, RiskAlert, RiskAlertBuilder, Severity};
pub use assessment::{Decision, RiskAssessment, RiskLevel, SubjectType};
pub use credit::{CreditGrade, CreditScore, ScoreFactor};
pub use customer::{Customer, EmploymentStatus};
pub use loan::{LoanApplication, LoanPurpose, LoanStatus};
pub use transaction::{Channel, Transaction, TransactionStatus, TransactionType};
