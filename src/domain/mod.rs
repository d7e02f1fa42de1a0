//! Domain model for transaction screening.
//!
//! These are the types that cross the service boundary: the transaction
//! received from upstream, the screening result handed to downstream
//! workflows, and the read-only risk inputs (user profile, velocity data).

pub mod risk_profile;
pub mod screening;
pub mod transaction;

pub use risk_profile::{PepDetails, RiskProfileSummary, UserRiskProfile, VelocityData};
pub use screening::{
    decision_for_score, risk_level_for_score, MatchType, OfacMatch, PatternMatch, PatternType,
    PepMatch, RiskFactor, RiskLevel, ScreeningDecision, ScreeningResult,
};
pub use transaction::{
    Direction, Priority, ScreeningRequest, ScreeningResponse, Transaction, TransactionCreatedEvent,
    TransactionType,
};
