//! Transaction input types and the screening request/response envelopes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::screening::{RiskLevel, ScreeningDecision, ScreeningResult};

/// Movement type of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Transfer,
    Deposit,
    Withdrawal,
    Payment,
    /// Unrecognized type from upstream; treated as neutral by all predicates
    #[serde(other)]
    Unknown,
}

impl Default for TransactionType {
    fn default() -> Self {
        TransactionType::Unknown
    }
}

/// Direction of funds relative to the screened account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Inbound,
    Outbound,
    /// Unrecognized direction; counterparty derivation falls back to sender
    #[serde(other)]
    Unknown,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Unknown
    }
}

/// A transaction to be screened, as received from the transaction service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Uuid,

    // Movement
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub direction: Direction,
    pub amount: f64,
    pub currency: String,

    // Parties
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sender_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sender_account: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sender_country: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sender_bank: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub receiver_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub receiver_account: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub receiver_country: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub receiver_bank: String,

    // Context
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reference: String,
    #[serde(default)]
    pub channel: String,

    // Device / session
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub device_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub geo_location: String,

    // Timestamps
    pub initiated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Name of the counterparty: the receiver for outbound movements, the
    /// sender otherwise.
    pub fn counterparty_name(&self) -> &str {
        match self.direction {
            Direction::Outbound => &self.receiver_name,
            _ => &self.sender_name,
        }
    }

    /// Country of the counterparty, same derivation as the name
    pub fn counterparty_country(&self) -> &str {
        match self.direction {
            Direction::Outbound => &self.receiver_country,
            _ => &self.sender_country,
        }
    }

    /// True when both party countries are known and differ
    pub fn is_cross_border(&self) -> bool {
        !self.sender_country.is_empty()
            && !self.receiver_country.is_empty()
            && self.sender_country != self.receiver_country
    }

    /// True when the amount meets the threshold. NaN amounts never qualify.
    pub fn is_high_value(&self, threshold: f64) -> bool {
        self.amount >= threshold
    }
}

/// Event envelope published by the transaction service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionCreatedEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "payload")]
    pub transaction: Transaction,
}

/// Priority hint on a screening request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Normal,
    High,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// A request to screen a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningRequest {
    pub transaction: Transaction,
    pub requester_id: Uuid,
    #[serde(default)]
    pub priority: Priority,
    /// Forces cache collaborators to bypass their cached entries. The exact
    /// semantics belong to the cache implementation, not the engine.
    #[serde(default)]
    pub bypass_cache: bool,
}

/// Lean response DTO for synchronous screening callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningResponse {
    pub screening_id: Uuid,
    pub transaction_id: Uuid,
    pub decision: ScreeningDecision,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub processing_time_ms: u64,

    pub ofac_match: bool,
    pub pep_match: bool,
    pub pattern_detected: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risk_factors: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ScreeningResponse {
    /// Flatten a full screening result into the response DTO
    pub fn from_result(result: &ScreeningResult) -> Self {
        Self {
            screening_id: result.id,
            transaction_id: result.transaction_id,
            decision: result.decision,
            risk_score: result.risk_score,
            risk_level: result.risk_level,
            processing_time_ms: result.screening_duration_ms,
            ofac_match: result.has_ofac_match(),
            pep_match: result.has_pep_match(),
            pattern_detected: !result.pattern_matches.is_empty(),
            risk_factors: result
                .risk_factors
                .iter()
                .map(|f| f.factor.clone())
                .collect(),
            errors: Vec::new(),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.decision == ScreeningDecision::Approved
    }

    pub fn is_blocked(&self) -> bool {
        self.decision == ScreeningDecision::Blocked
    }

    /// True when the transaction needs manual review
    pub fn needs_review(&self) -> bool {
        self.decision == ScreeningDecision::Suspicious
    }
}
