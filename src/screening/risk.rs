//! Risk scoring model.
//!
//! The calculator consumes the screening context after the parallel checks
//! have finished. Transaction features (country risk, cross-border, value
//! tiers, velocity ratios, profile contribution) are added exactly once,
//! here, each materialized as a risk factor so the result explains its own
//! score. Check-contributed factors (matches, watchlist flags, patterns) are
//! summed as-is.

use std::collections::HashSet;

use crate::config::PatternsConfig;
use crate::domain::{RiskFactor, UserRiskProfile, VelocityData};

use super::context::ScreeningContext;

/// Moderate velocity ratio that still adds points below the spike multiplier
const MODERATE_VELOCITY_RATIO: f64 = 5.0;

/// Per-factor weighting and cap used by [`RiskCalculator::score_factors`]
fn factor_weighting(factor: &str) -> Option<(i32, f64)> {
    let (max_score, weight) = match factor {
        "OFAC_MATCH" => (100, 1.0),
        "PEP_MATCH" => (40, 0.8),
        "USER_WATCHLIST" => (30, 0.7),
        "USER_PEP" => (25, 0.6),
        "PRIOR_SARS" => (20, 0.5),
        "HIGH_RISK_COUNTRY" => (20, 0.5),
        "HIGH_AMOUNT" => (15, 0.4),
        "VELOCITY_SPIKE" => (20, 0.5),
        "STRUCTURING" => (35, 0.8),
        "RAPID_CYCLING" => (30, 0.7),
        "GEO_CONCENTRATION" => (20, 0.5),
        "MIXING_LAYERING" => (35, 0.8),
        "SMURFING" => (30, 0.7),
        "UNUSUAL_TIME" => (10, 0.3),
        "CROSS_BORDER" => (10, 0.3),
        _ => return None,
    };
    Some((max_score, weight))
}

/// Computes the 0-100 risk score from a populated screening context
pub struct RiskCalculator {
    cfg: PatternsConfig,
    high_risk_countries: HashSet<String>,
}

impl RiskCalculator {
    pub fn new(cfg: PatternsConfig) -> Self {
        let high_risk_countries = cfg.high_risk_countries.iter().cloned().collect();
        Self {
            cfg,
            high_risk_countries,
        }
    }

    /// Score the context. Appends the transaction-feature factors it derives,
    /// then sums every factor weight and clamps to [0, 100].
    pub fn calculate(&self, ctx: &mut ScreeningContext) -> u32 {
        let mut features: Vec<RiskFactor> = Vec::new();

        let tx = &ctx.transaction;

        // Counterparty in a high-risk jurisdiction
        let country = tx.counterparty_country();
        if !country.is_empty() && self.high_risk_countries.contains(country) {
            features.push(
                RiskFactor::new(
                    "HIGH_RISK_COUNTRY",
                    20,
                    "Counterparty is in a high-risk jurisdiction",
                )
                .with_details(country),
            );
        }

        // Cross-border movement
        if tx.is_cross_border() {
            features.push(RiskFactor::new(
                "CROSS_BORDER",
                5,
                "Transaction crosses borders",
            ));
        }

        // High-value tiers; the larger tier supersedes the smaller
        if tx.is_high_value(50_000.0) {
            features.push(RiskFactor::new(
                "HIGH_AMOUNT",
                15,
                "Transaction amount at or above $50,000",
            ));
        } else if tx.is_high_value(10_000.0) {
            features.push(RiskFactor::new(
                "HIGH_AMOUNT",
                10,
                "Transaction amount at or above $10,000",
            ));
        }

        if let Some(velocity) = &ctx.velocity_data {
            features.extend(self.velocity_factors(velocity, tx.amount));
        }

        if let Some(profile) = &ctx.risk_profile {
            if let Some(factor) = Self::profile_factor(profile) {
                features.push(factor);
            }
        }

        for factor in features {
            ctx.add_factor(factor);
        }

        let total: i64 = ctx.risk_factors.iter().map(|f| i64::from(f.weight)).sum();
        total.clamp(0, 100) as u32
    }

    /// Standalone scoring of a factor list against the default weighting
    /// table; unknown factors pass through unweighted.
    pub fn score_factors(factors: &[RiskFactor]) -> u32 {
        let mut total: i64 = 0;
        for factor in factors {
            let contribution = match factor_weighting(&factor.factor) {
                Some((max_score, weight)) => {
                    let scaled = (f64::from(factor.weight) * weight) as i32;
                    i64::from(scaled.min(max_score))
                }
                None => i64::from(factor.weight),
            };
            total += contribution;
        }
        total.clamp(0, 100) as u32
    }

    fn velocity_factors(&self, velocity: &VelocityData, amount: f64) -> Vec<RiskFactor> {
        let mut factors = Vec::new();

        if velocity.avg_daily_amount > 0.0 {
            let ratio = (velocity.amount_day + amount) / velocity.avg_daily_amount;
            if ratio >= self.cfg.velocity_spike_multiplier {
                factors.push(
                    RiskFactor::new("VELOCITY_SPIKE", 20, "Daily volume far above baseline")
                        .with_details(format!("{:.1}x baseline", ratio)),
                );
            } else if ratio >= MODERATE_VELOCITY_RATIO {
                factors.push(
                    RiskFactor::new("VELOCITY_SPIKE", 10, "Daily volume above baseline")
                        .with_details(format!("{:.1}x baseline", ratio)),
                );
            }
        }

        if velocity.avg_daily_tx_count > 0.0 {
            let tx_ratio = f64::from(velocity.tx_count_day + 1) / velocity.avg_daily_tx_count;
            if tx_ratio >= self.cfg.velocity_spike_multiplier {
                factors.push(
                    RiskFactor::new(
                        "TX_COUNT_SPIKE",
                        10,
                        "Daily transaction count far above baseline",
                    )
                    .with_details(format!("{:.1}x baseline", tx_ratio)),
                );
            }
        }

        factors
    }

    fn profile_factor(profile: &UserRiskProfile) -> Option<RiskFactor> {
        let base = (profile.country_risk
            + profile.occupation_risk
            + profile.transaction_risk
            + profile.behavioral_risk
            + profile.relationship_risk)
            / 5;

        let mut weight = base / 5;

        if profile.blocked_tx_count > 0 {
            weight += (profile.blocked_tx_count * 5).min(15);
        }
        if profile.investigation_count > 0 {
            weight += (profile.investigation_count * 3).min(10);
        }

        if weight == 0 {
            return None;
        }

        Some(
            RiskFactor::new(
                "PROFILE_RISK",
                weight as i32,
                "Standing risk profile contribution",
            )
            .with_details(format!(
                "base {} blocked {} investigations {}",
                base, profile.blocked_tx_count, profile.investigation_count
            )),
        )
    }
}
