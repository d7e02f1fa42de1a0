//! amlscreen - real-time AML transaction screening.
//!
//! For each candidate transaction the engine fans out five independent risk
//! checks under a strict latency budget, combines their findings into a
//! 0-100 risk score, classifies the score into a risk level and a terminal
//! decision, and emits a structured screening result for downstream
//! workflows:
//! - matching: name normalization, Jaro-Winkler similarity, and the
//!   OFAC / PEP checkers with their in-memory indexes
//! - patterns: the detector seam plus the default rule set (structuring,
//!   rapid cycling, velocity spikes, geographic concentration)
//! - screening: the risk scoring model and the parallel-check engine
//! - cache / repository: injected collaborator seams with in-memory
//!   implementations for tests and embedders
//!
//! The crate owns no durable state; persistence, transport and filing
//! generation belong to the services around it.

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod matching;
pub mod patterns;
pub mod repository;
pub mod screening;
pub mod telemetry;

// Re-export the types most embedders need
pub use config::{ComplianceConfig, Config, PatternsConfig, ScreeningConfig};
pub use domain::{
    MatchType, OfacMatch, PatternMatch, PatternType, PepMatch, RiskFactor, RiskLevel,
    ScreeningDecision, ScreeningRequest, ScreeningResponse, ScreeningResult, Transaction,
    UserRiskProfile, VelocityData,
};
pub use error::{Error, Result};
pub use matching::{OfacChecker, OfacEntry, PepChecker, PepEntry};
pub use patterns::{PatternDetector, RulePatternDetector};
pub use screening::{Engine, RiskCalculator};
