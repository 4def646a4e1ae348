// 📈 Credit Score Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_CREDIT_SCORE: u32 = 300;
pub const MAX_CREDIT_SCORE: u32 = 850;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditGrade {
    VeryPoor,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl CreditGrade {
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 750 => CreditGrade::Excellent,
            s if s >= 700 => CreditGrade::Good,
            s if s >= 650 => CreditGrade::Fair,
            s if s >= 600 => CreditGrade::Poor,
            _ => CreditGrade::VeryPoor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CreditGrade::VeryPoor => "VERY_POOR",
            CreditGrade::Poor => "POOR",
            CreditGrade::Fair => "FAIR",
            CreditGrade::Good => "GOOD",
            CreditGrade::Excellent => "EXCELLENT",
        }
    }
}

/// One named contribution to a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub name: String,
    pub impact: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditScore {
    pub customer_id: String,
    pub score: u32,
    pub grade: CreditGrade,
    pub factors: Vec<ScoreFactor>,
    pub calculated_at: DateTime<Utc>,
}

impl CreditScore {
    /// Base score plus factor impacts, clamped into the valid range
    pub fn compute(customer_id: &str, base: u32, factors: Vec<ScoreFactor>) -> Self {
        let raw: i64 = base as i64 + factors.iter().map(|f| f.impact as i64).sum::<i64>();
        let score = raw.clamp(MIN_CREDIT_SCORE as i64, MAX_CREDIT_SCORE as i64) as u32;

        CreditScore {
            customer_id: customer_id.to_string(),
            score,
            grade: CreditGrade::from_score(score),
            factors,
            calculated_at: Utc::now(),
        }
    }

    pub fn is_prime(&self) -> bool {
        self.score >= 700
    }

    pub fn is_subprime(&self) -> bool {
        self.score < 600
    }
}
