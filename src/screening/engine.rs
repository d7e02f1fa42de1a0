//! The screening engine: bounded-latency parallel check fan-out.
//!
//! `screen` launches the five checks (OFAC, PEP, risk profile, velocity,
//! patterns) concurrently, each capped by the screening deadline, then scores
//! whatever the checks managed to contribute. A failed or timed-out check
//! leaves its context field unset and the scorer treats it as neutral; the
//! caller always receives a complete result.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::VelocityCache;
use crate::config::ScreeningConfig;
use crate::domain::{
    decision_for_score, risk_level_for_score, RiskFactor, RiskLevel, ScreeningDecision,
    ScreeningRequest, ScreeningResponse, ScreeningResult, Transaction,
};
use crate::error::Result;
use crate::matching::{OfacChecker, PepChecker};
use crate::patterns::PatternDetector;
use crate::repository::RiskProfileRepository;
use crate::telemetry::EngineMetrics;

use super::context::ScreeningContext;
use super::risk::RiskCalculator;

// Soft per-check latency targets; exceeding one logs a warning and nothing
// else.
const OFAC_SOFT_TARGET_MS: u64 = 1;
const PEP_SOFT_TARGET_MS: u64 = 5;
const PROFILE_SOFT_TARGET_MS: u64 = 50;
const PATTERNS_SOFT_TARGET_MS: u64 = 100;

/// Points contributed per pattern at full confidence
const PATTERN_MAX_WEIGHT: f64 = 30.0;

/// The core screening engine
pub struct Engine {
    ofac: Arc<OfacChecker>,
    pep: Arc<PepChecker>,
    risk: RiskCalculator,
    patterns: Arc<dyn PatternDetector>,
    velocity_cache: Arc<dyn VelocityCache>,
    profile_repo: Arc<dyn RiskProfileRepository>,
    cfg: ScreeningConfig,
    metrics: EngineMetrics,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ofac: Arc<OfacChecker>,
        pep: Arc<PepChecker>,
        risk: RiskCalculator,
        patterns: Arc<dyn PatternDetector>,
        velocity_cache: Arc<dyn VelocityCache>,
        profile_repo: Arc<dyn RiskProfileRepository>,
        cfg: ScreeningConfig,
    ) -> Self {
        Self {
            ofac,
            pep,
            risk,
            patterns,
            velocity_cache,
            profile_repo,
            cfg,
            metrics: EngineMetrics::new(),
        }
    }

    /// Screen a transaction. Individual check failures are absorbed; only
    /// programming bugs propagate.
    pub async fn screen(&self, tx: Transaction) -> Result<ScreeningResult> {
        let transaction_id = tx.id;
        let user_id = tx.user_id;
        let counterparty = tx.counterparty_name().to_string();

        info!(
            transaction_id = %transaction_id,
            user_id = %user_id,
            "screening started"
        );

        let ctx = Mutex::new(ScreeningContext::new(tx));
        let budget = self.cfg.max_screening_latency;

        let (ofac, pep, profile, velocity, patterns) = tokio::join!(
            timeout(budget, self.run_ofac_check(&counterparty, &ctx)),
            timeout(budget, self.run_pep_check(&counterparty, &ctx)),
            timeout(budget, self.fetch_risk_profile(user_id, &ctx)),
            timeout(budget, self.fetch_velocity(user_id, &ctx)),
            timeout(budget, self.detect_patterns(user_id, &ctx)),
        );

        for (check, timed_out) in [
            ("ofac", ofac.is_err()),
            ("pep", pep.is_err()),
            ("risk_profile", profile.is_err()),
            ("velocity", velocity.is_err()),
            ("patterns", patterns.is_err()),
        ] {
            if timed_out {
                warn!(
                    check,
                    budget_ms = budget.as_millis() as u64,
                    "check exceeded the screening deadline; continuing with partial context"
                );
            }
        }

        // Score and assemble under the context lock so no late writer can
        // interleave with the scorer.
        let result = {
            let mut ctx = ctx.lock();
            let score = self.risk.calculate(&mut ctx);

            let mut result = ScreeningResult {
                id: ctx.screening_id,
                transaction_id: ctx.transaction.id,
                user_id: ctx.transaction.user_id,
                risk_score: score,
                risk_level: risk_level_for_score(score),
                decision: decision_for_score(score),
                ofac_match: ctx.ofac_result.clone(),
                pep_match: ctx.pep_result.clone(),
                risk_factors: ctx.risk_factors.clone(),
                pattern_matches: ctx.pattern_matches.clone(),
                screening_duration_ms: ctx.elapsed_ms(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };

            // Hard override: an exact sanctions hit always blocks
            if result.ofac_match.as_ref().map_or(false, |m| m.is_exact()) {
                result.risk_score = 100;
                result.risk_level = RiskLevel::Critical;
                result.decision = ScreeningDecision::Blocked;
            }

            result
        };

        let duration_ms = result.screening_duration_ms;
        self.metrics.record_screening(duration_ms);

        if duration_ms > budget.as_millis() as u64 {
            warn!(
                duration_ms,
                budget_ms = budget.as_millis() as u64,
                "full screening exceeded the latency budget"
            );
        }

        info!(
            transaction_id = %transaction_id,
            decision = ?result.decision,
            risk_score = result.risk_score,
            duration_ms,
            "screening completed"
        );

        Ok(result)
    }

    /// Screen via the request envelope, producing the lean response DTO
    pub async fn screen_request(&self, request: ScreeningRequest) -> Result<ScreeningResponse> {
        let result = self.screen(request.transaction).await?;
        Ok(ScreeningResponse::from_result(&result))
    }

    pub fn screening_count(&self) -> u64 {
        self.metrics.screening_count()
    }

    pub fn average_latency_ms(&self) -> f64 {
        self.metrics.average_latency_ms()
    }

    async fn run_ofac_check(&self, counterparty: &str, ctx: &Mutex<ScreeningContext>) {
        if counterparty.is_empty() {
            return;
        }

        match self.ofac.check(counterparty).await {
            Ok(result) => {
                let matched = result.matched;
                let duration_ms = result.check_duration_ms;

                {
                    let mut ctx = ctx.lock();
                    if matched {
                        ctx.add_factor(
                            RiskFactor::new(
                                "OFAC_MATCH",
                                50,
                                "Counterparty matches OFAC sanctions list",
                            )
                            .with_details(result.sdn_name.clone()),
                        );
                    }
                    ctx.ofac_result = Some(result);
                }

                debug!(matched, duration_ms, "ofac check completed");
                if duration_ms > OFAC_SOFT_TARGET_MS {
                    warn!(
                        check = "ofac",
                        duration_ms,
                        threshold_ms = OFAC_SOFT_TARGET_MS,
                        "check latency above target"
                    );
                }
            }
            Err(e) => warn!(error = %e, "ofac check failed"),
        }
    }

    async fn run_pep_check(&self, counterparty: &str, ctx: &Mutex<ScreeningContext>) {
        if counterparty.is_empty() {
            return;
        }

        match self.pep.check(counterparty).await {
            Ok(result) => {
                let matched = result.matched;
                let duration_ms = result.check_duration_ms;

                {
                    let mut ctx = ctx.lock();
                    if matched {
                        ctx.add_factor(
                            RiskFactor::new(
                                "PEP_MATCH",
                                30,
                                "Counterparty is a Politically Exposed Person",
                            )
                            .with_details(result.pep_position.clone()),
                        );
                    }
                    ctx.pep_result = Some(result);
                }

                debug!(matched, duration_ms, "pep check completed");
                if duration_ms > PEP_SOFT_TARGET_MS {
                    warn!(
                        check = "pep",
                        duration_ms,
                        threshold_ms = PEP_SOFT_TARGET_MS,
                        "check latency above target"
                    );
                }
            }
            Err(e) => warn!(error = %e, "pep check failed"),
        }
    }

    async fn fetch_risk_profile(&self, user_id: Uuid, ctx: &Mutex<ScreeningContext>) {
        let start = std::time::Instant::now();

        let profile = match self.profile_repo.get_by_user_id(user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                debug!(user_id = %user_id, "no risk profile on record");
                return;
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch risk profile");
                return;
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        {
            let mut ctx = ctx.lock();

            if profile.on_watchlist {
                ctx.add_factor(
                    RiskFactor::new("USER_WATCHLIST", 25, "User is on internal watchlist")
                        .with_details(profile.watchlist_reason.clone()),
                );
            }
            if profile.is_pep {
                ctx.add_factor(RiskFactor::new(
                    "USER_PEP",
                    20,
                    "User is a Politically Exposed Person",
                ));
            }
            if profile.sar_count > 0 {
                ctx.add_factor(RiskFactor::new(
                    "PRIOR_SARS",
                    15,
                    "User has prior SAR filings",
                ));
            }

            ctx.risk_profile = Some(profile);
        }

        if duration_ms > PROFILE_SOFT_TARGET_MS {
            warn!(
                check = "risk_profile",
                duration_ms,
                threshold_ms = PROFILE_SOFT_TARGET_MS,
                "check latency above target"
            );
        }
    }

    async fn fetch_velocity(&self, user_id: Uuid, ctx: &Mutex<ScreeningContext>) {
        match self.velocity_cache.get_velocity(user_id).await {
            Ok(Some(velocity)) => {
                ctx.lock().velocity_data = Some(velocity);
            }
            Ok(None) => debug!(user_id = %user_id, "no velocity data available"),
            Err(e) => debug!(error = %e, "velocity lookup failed"),
        }
    }

    async fn detect_patterns(&self, user_id: Uuid, ctx: &Mutex<ScreeningContext>) {
        let start = std::time::Instant::now();

        let tx = ctx.lock().transaction.clone();

        let matches = match self.patterns.detect_patterns(user_id, &tx).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!(error = %e, "pattern detection failed");
                return;
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        {
            let mut ctx = ctx.lock();
            for pattern in &matches {
                let weight = (pattern.confidence * PATTERN_MAX_WEIGHT) as i32;
                ctx.add_factor(RiskFactor::new(
                    pattern.pattern_type.as_str(),
                    weight,
                    pattern.description.clone(),
                ));
                warn!(
                    user_id = %user_id,
                    pattern = %pattern.pattern_type,
                    confidence = pattern.confidence,
                    "suspicious pattern detected"
                );
            }
            ctx.pattern_matches = matches;
        }

        if duration_ms > PATTERNS_SOFT_TARGET_MS {
            warn!(
                check = "patterns",
                duration_ms,
                threshold_ms = PATTERNS_SOFT_TARGET_MS,
                "check latency above target"
            );
        }
    }
}
