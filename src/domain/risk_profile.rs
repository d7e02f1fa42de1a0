//! User risk profile and transaction velocity inputs.
//!
//! Both are read-only inputs to screening, produced by the profiling and
//! velocity pipelines and fetched through the repository/cache seams.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::screening::RiskLevel;

/// A user's standing AML risk assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRiskProfile {
    pub id: Uuid,
    pub user_id: Uuid,

    // Overall assessment
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub last_assessment: DateTime<Utc>,
    pub next_review_date: DateTime<Utc>,

    // Sub-scores, each 0-100
    pub country_risk: u32,
    pub occupation_risk: u32,
    pub transaction_risk: u32,
    pub behavioral_risk: u32,
    pub relationship_risk: u32,

    // Flags
    pub is_pep: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pep_details: Option<PepDetails>,
    pub is_high_net_worth: bool,

    // Sanctions
    pub has_ofac_match: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ofac_match_details: String,

    // Transaction patterns
    pub avg_monthly_volume: f64,
    pub avg_transaction_amt: f64,
    pub tx_count_last_30_days: u32,

    // Countries
    pub primary_countries: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub high_risk_countries: Vec<String>,

    // History
    pub sar_count: u32,
    pub investigation_count: u32,
    pub blocked_tx_count: u32,

    // Watchlist status
    pub on_watchlist: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub watchlist_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watchlist_added_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Detailed PEP classification attached to a profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PepDetails {
    /// domestic, foreign, or international_org
    pub category: String,
    pub position: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub risk_multiplier: f64,
}

impl UserRiskProfile {
    /// Weighted mean of the sub-scores, PEP-multiplied, capped at 100.
    /// Weights: country 0.20, occupation 0.15, transaction 0.25,
    /// behavioral 0.25, relationship 0.15.
    pub fn overall_risk(&self) -> u32 {
        let mut score = f64::from(self.country_risk) * 0.20
            + f64::from(self.occupation_risk) * 0.15
            + f64::from(self.transaction_risk) * 0.25
            + f64::from(self.behavioral_risk) * 0.25
            + f64::from(self.relationship_risk) * 0.15;

        if self.is_pep {
            if let Some(details) = &self.pep_details {
                score *= details.risk_multiplier;
            }
        }

        score.min(100.0) as u32
    }

    pub fn is_high_risk(&self) -> bool {
        self.risk_level == RiskLevel::High || self.risk_level == RiskLevel::Critical
    }

    pub fn requires_enhanced_due_diligence(&self) -> bool {
        self.is_pep || self.has_ofac_match || self.is_high_risk() || self.on_watchlist
    }

    /// True when the profile is due for manual review
    pub fn needs_review(&self) -> bool {
        Utc::now() > self.next_review_date || self.has_ofac_match
    }

    pub fn to_summary(&self) -> RiskProfileSummary {
        RiskProfileSummary {
            user_id: self.user_id,
            risk_score: self.risk_score,
            risk_level: self.risk_level,
            is_pep: self.is_pep,
            on_watchlist: self.on_watchlist,
            has_ofac_match: self.has_ofac_match,
        }
    }
}

/// Lean profile DTO for internal services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskProfileSummary {
    pub user_id: Uuid,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub is_pep: bool,
    pub on_watchlist: bool,
    pub has_ofac_match: bool,
}

/// Per-user transaction velocity metrics with rolling baselines
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VelocityData {
    pub user_id: Uuid,

    pub tx_count_hour: u32,
    pub amount_hour: f64,

    pub tx_count_day: u32,
    pub amount_day: f64,

    pub tx_count_week: u32,
    pub amount_week: f64,

    pub tx_count_month: u32,
    pub amount_month: f64,

    pub avg_daily_tx_count: f64,
    pub avg_daily_amount: f64,
    pub std_dev_daily_amount: f64,

    pub updated_at: DateTime<Utc>,
}
