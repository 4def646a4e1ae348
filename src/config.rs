// ⚙️ Configuration
// Defaults → optional JSON file (RISK_CONTROL_CONFIG) → env overrides

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "RISK_CONTROL_CONFIG";
pub const BIND_ENV: &str = "RISK_CONTROL_BIND";
pub const DB_ENV: &str = "RISK_CONTROL_DB";
pub const RULES_DIR_ENV: &str = "RISK_CONTROL_RULES_DIR";

// ============================================================================
// SERVER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Insert the demo customers/accounts on startup
    #[serde(default)]
    pub seed_demo_data: bool,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("risk_control.db")
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: default_bind_addr(),
            database_path: default_database_path(),
            seed_demo_data: false,
        }
    }
}

// ============================================================================
// SCORING
// ============================================================================

/// Decision thresholds and look-back windows used by the services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Risk score at which a decision becomes at least REVIEW
    #[serde(default = "default_review_score")]
    pub review_score: f64,

    /// Risk score at which a decision becomes REJECT
    #[serde(default = "default_reject_score")]
    pub reject_score: f64,

    #[serde(default = "default_base_credit_score")]
    pub base_credit_score: u32,

    /// Annual rate in percent before rule adjustments
    #[serde(default = "default_base_interest_rate")]
    pub base_interest_rate: f64,

    #[serde(default = "default_velocity_window_minutes")]
    pub velocity_window_minutes: i64,

    #[serde(default = "default_daily_window_hours")]
    pub daily_window_hours: i64,

    #[serde(default = "default_duplicate_window_minutes")]
    pub duplicate_window_minutes: i64,

    #[serde(default = "default_activity_window_days")]
    pub activity_window_days: i64,
}

fn default_review_score() -> f64 {
    40.0
}

fn default_reject_score() -> f64 {
    70.0
}

fn default_base_credit_score() -> u32 {
    650
}

fn default_base_interest_rate() -> f64 {
    5.0
}

fn default_velocity_window_minutes() -> i64 {
    60
}

fn default_daily_window_hours() -> i64 {
    24
}

fn default_duplicate_window_minutes() -> i64 {
    10
}

fn default_activity_window_days() -> i64 {
    30
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            review_score: default_review_score(),
            reject_score: default_reject_score(),
            base_credit_score: default_base_credit_score(),
            base_interest_rate: default_base_interest_rate(),
            velocity_window_minutes: default_velocity_window_minutes(),
            daily_window_hours: default_daily_window_hours(),
            duplicate_window_minutes: default_duplicate_window_minutes(),
            activity_window_days: default_activity_window_days(),
        }
    }
}

impl ScoringConfig {
    pub fn velocity_window(&self) -> Duration {
        Duration::minutes(self.velocity_window_minutes)
    }

    pub fn daily_window(&self) -> Duration {
        Duration::hours(self.daily_window_hours)
    }

    pub fn duplicate_window(&self) -> Duration {
        Duration::minutes(self.duplicate_window_minutes)
    }

    pub fn activity_window(&self) -> Duration {
        Duration::days(self.activity_window_days)
    }
}

// ============================================================================
// APP CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Load rule packages from here instead of the built-in set
    #[serde(default)]
    pub rules_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Defaults, then the file named by RISK_CONTROL_CONFIG, then env overrides
    pub fn load() -> Result<Self> {
        let mut config = match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => AppConfig::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Override fields from a key lookup (the process env in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(BIND_ENV) {
            self.server.bind_addr = bind;
        }
        if let Some(db) = lookup(DB_ENV) {
            self.server.database_path = PathBuf::from(db);
        }
        if let Some(dir) = lookup(RULES_DIR_ENV) {
            self.rules_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> Result<()> {
        let s = &self.scoring;

        if !(0.0..=100.0).contains(&s.review_score) || !(0.0..=100.0).contains(&s.reject_score) {
            anyhow::bail!("Score thresholds must be within 0..=100");
        }
        if s.review_score > s.reject_score {
            anyhow::bail!(
                "review_score ({}) must not exceed reject_score ({})",
                s.review_score,
                s.reject_score
            );
        }
        if !(300..=850).contains(&s.base_credit_score) {
            anyhow::bail!("base_credit_score must be within 300..=850");
        }
        if !s.base_interest_rate.is_finite() || s.base_interest_rate < 0.0 {
            anyhow::bail!("base_interest_rate must be a non-negative number");
        }
        if s.velocity_window_minutes <= 0
            || s.daily_window_hours <= 0
            || s.duplicate_window_minutes <= 0
            || s.activity_window_days <= 0
        {
            anyhow::bail!("Look-back windows must be positive");
        }
        if self.server.bind_addr.trim().is_empty() {
            anyhow::bail!("bind_addr must not be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.scoring.review_score, 40.0);
        assert_eq!(config.scoring.reject_score, 70.0);
        assert_eq!(config.scoring.base_credit_score, 650);
        assert_eq!(config.scoring.velocity_window(), Duration::minutes(60));
        assert!(config.rules_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{"scoring": {"reject_score": 80}, "server": {"seed_demo_data": true}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.scoring.reject_score, 80.0);
        assert_eq!(config.scoring.review_score, 40.0);
        assert!(config.server.seed_demo_data);
        assert_eq!(config.server.database_path, PathBuf::from("risk_control.db"));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [(BIND_ENV, "127.0.0.1:8080"), (RULES_DIR_ENV, "/etc/rules")]
            .into_iter()
            .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.rules_dir, Some(PathBuf::from("/etc/rules")));
        assert_eq!(config.server.database_path, PathBuf::from("risk_control.db"));
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = AppConfig::default();
        config.scoring.review_score = 90.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.scoring.duplicate_window_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_missing() {
        assert!(AppConfig::from_file("/no/such/config.json").is_err());
    }
}
