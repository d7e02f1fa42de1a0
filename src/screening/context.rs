//! Per-request screening context.
//!
//! One context lives for the duration of one screening call. The five
//! concurrent checks write their findings here under a single mutex owned by
//! the engine; the scorer consumes the context after the join barrier.

use chrono::{DateTime, Utc};
use std::time::Instant;
use uuid::Uuid;

use crate::domain::{
    OfacMatch, PatternMatch, PepMatch, RiskFactor, Transaction, UserRiskProfile, VelocityData,
};

/// Intermediate results of one screening call
pub struct ScreeningContext {
    pub transaction: Transaction,
    pub screening_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub start: Instant,

    // Written by the concurrent checks
    pub ofac_result: Option<OfacMatch>,
    pub pep_result: Option<PepMatch>,
    pub risk_profile: Option<UserRiskProfile>,
    pub velocity_data: Option<VelocityData>,
    pub pattern_matches: Vec<PatternMatch>,
    pub risk_factors: Vec<RiskFactor>,
}

impl ScreeningContext {
    pub fn new(transaction: Transaction) -> Self {
        Self {
            transaction,
            screening_id: Uuid::new_v4(),
            started_at: Utc::now(),
            start: Instant::now(),
            ofac_result: None,
            pep_result: None,
            risk_profile: None,
            velocity_data: None,
            pattern_matches: Vec::new(),
            risk_factors: Vec::new(),
        }
    }

    pub fn add_factor(&mut self, factor: RiskFactor) {
        self.risk_factors.push(factor);
    }

    /// Milliseconds elapsed since the context was created
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
