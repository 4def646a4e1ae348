// Risk Control - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod db;
pub mod engine;
pub mod entities;
pub mod error;
pub mod facts;
pub mod logging;
pub mod rules;
pub mod seed;
pub mod services;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::{AppConfig, ScoringConfig, ServerConfig};
pub use db::{
    Event,
    load_csv, open, setup_database, insert_event, get_events_for_entity,
};
pub use engine::{Inference, InferenceEngine, RuleEngine, RuleSummary, WorkingMemory};
pub use entities::{
    Account, AccountStatus, AccountType,
    AlertStatus, AlertType, RiskAlert, Severity,
    CreditGrade, CreditScore, ScoreFactor,
    Customer, EmploymentStatus,
    Decision, RiskAssessment, RiskLevel, SubjectType,
    LoanApplication, LoanPurpose, LoanStatus,
    Channel, Transaction, TransactionStatus, TransactionType,
};
pub use error::{Result, RiskError};
pub use facts::{Affordability, CustomerActivity, Fact, FactKind, FactValue, TransactionStats};
pub use rules::{RiskRule, RulePackage, RuleSet};
pub use services::{
    AccountSummary, CreditScorer, LoanDecision, LoanUnderwriter,
    RiskControl, RiskProfile, RiskProfiler, TransactionMonitor, TransactionResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
