//! Screening result types: decisions, risk levels, match records, risk
//! factors and detected patterns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal decision of a screening call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScreeningDecision {
    Approved,
    Suspicious,
    Blocked,
    Pending,
}

/// Risk severity classification of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// How a watchlist candidate was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    Exact,
    Fuzzy,
    Alias,
}

/// Risk level is a pure function of the score
pub fn risk_level_for_score(score: u32) -> RiskLevel {
    match score {
        80.. => RiskLevel::Critical,
        60..=79 => RiskLevel::High,
        30..=59 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

/// Decision is a pure function of the score, absent hard overrides
pub fn decision_for_score(score: u32) -> ScreeningDecision {
    match score {
        80.. => ScreeningDecision::Blocked,
        50..=79 => ScreeningDecision::Suspicious,
        _ => ScreeningDecision::Approved,
    }
}

/// A match against the OFAC sanctions list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfacMatch {
    pub matched: bool,
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub match_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MatchType>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sdn_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sdn_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub program: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub matched_field: String,
    pub check_duration_ms: u64,
}

impl OfacMatch {
    /// Non-match placeholder used when the check short-circuits
    pub fn no_match() -> Self {
        OfacMatch::default()
    }

    /// True for the exact-match case that triggers the hard override
    pub fn is_exact(&self) -> bool {
        self.matched && self.match_type == Some(MatchType::Exact)
    }
}

/// A match against the PEP database
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PepMatch {
    pub matched: bool,
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub match_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MatchType>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pep_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pep_position: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pep_country: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub risk_category: String,
    pub check_duration_ms: u64,
}

impl PepMatch {
    pub fn no_match() -> Self {
        PepMatch::default()
    }
}

fn is_zero_f64(v: &f64) -> bool {
    *v == 0.0
}

/// A factor contributing points to the risk score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor: String,
    /// Points added to the risk score
    pub weight: i32,
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details: String,
}

impl RiskFactor {
    pub fn new(factor: impl Into<String>, weight: i32, description: impl Into<String>) -> Self {
        Self {
            factor: factor.into(),
            weight,
            description: description.into(),
            details: String::new(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}

/// Suspicious pattern categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternType {
    Structuring,
    RapidCycling,
    GeoConcentration,
    VelocitySpike,
    MixingLayering,
    Smurfing,
    RoundTripping,
    UnusualTime,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Structuring => "STRUCTURING",
            PatternType::RapidCycling => "RAPID_CYCLING",
            PatternType::GeoConcentration => "GEO_CONCENTRATION",
            PatternType::VelocitySpike => "VELOCITY_SPIKE",
            PatternType::MixingLayering => "MIXING_LAYERING",
            PatternType::Smurfing => "SMURFING",
            PatternType::RoundTripping => "ROUND_TRIPPING",
            PatternType::UnusualTime => "UNUSUAL_TIME",
        }
    }
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected money-laundering pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern_type: PatternType,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_tx_ids: Vec<Uuid>,
    pub detected_at: DateTime<Utc>,
}

/// The assembled outcome of one screening call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub user_id: Uuid,

    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub decision: ScreeningDecision,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ofac_match: Option<OfacMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pep_match: Option<PepMatch>,
    pub risk_factors: Vec<RiskFactor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pattern_matches: Vec<PatternMatch>,

    pub screening_duration_ms: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScreeningResult {
    /// True if the result warrants investigation
    pub fn is_high_risk(&self) -> bool {
        self.risk_score >= 60
            || self.decision == ScreeningDecision::Blocked
            || self.decision == ScreeningDecision::Suspicious
    }

    /// True if an investigation should be opened downstream
    pub fn requires_investigation(&self) -> bool {
        matches!(
            self.decision,
            ScreeningDecision::Suspicious | ScreeningDecision::Blocked
        )
    }

    pub fn has_ofac_match(&self) -> bool {
        self.ofac_match.as_ref().map_or(false, |m| m.matched)
    }

    pub fn has_pep_match(&self) -> bool {
        self.pep_match.as_ref().map_or(false, |m| m.matched)
    }

    /// True when the score crosses the configured SAR review threshold
    pub fn requires_sar_review(&self, sar_threshold: f64) -> bool {
        f64::from(self.risk_score) >= sar_threshold
    }

    /// True when the transaction amount crosses the CTR filing threshold
    pub fn requires_ctr(&self, amount: f64, ctr_threshold: f64) -> bool {
        amount >= ctr_threshold
    }
}
