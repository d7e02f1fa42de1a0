//! Suspicious pattern detection.
//!
//! The engine depends only on [`PatternDetector`]; [`RulePatternDetector`]
//! is the default rule set. It keeps a short rolling window of each user's
//! transactions (fed by the caller via `record_transaction`) and consults the
//! velocity cache for baseline comparisons.
//!
//! Smurfing, mixing/layering, round-tripping and unusual-time detection are
//! accepted by the type system but have no default rules; those remain with
//! the analytics pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::cache::VelocityCache;
use crate::config::PatternsConfig;
use crate::domain::{Direction, PatternMatch, PatternType, Transaction};
use crate::error::Result;

/// How much history the rule window keeps per user
const HISTORY_RETENTION_DAYS: i64 = 7;

/// Amounts this close below the reporting threshold count as structuring
const STRUCTURING_BAND: f64 = 0.9;

/// Detects suspicious patterns for a user's transaction
#[async_trait]
pub trait PatternDetector: Send + Sync {
    async fn detect_patterns(&self, user_id: Uuid, tx: &Transaction) -> Result<Vec<PatternMatch>>;
}

#[derive(Debug, Clone)]
struct TransactionRecord {
    id: Uuid,
    amount: f64,
    direction: Direction,
    counterparty_country: String,
    at: DateTime<Utc>,
}

impl TransactionRecord {
    fn from_tx(tx: &Transaction) -> Self {
        Self {
            id: tx.id,
            amount: tx.amount,
            direction: tx.direction,
            counterparty_country: tx.counterparty_country().to_string(),
            at: tx.initiated_at,
        }
    }
}

/// Default rule-based detector
pub struct RulePatternDetector {
    cfg: PatternsConfig,
    velocity: Arc<dyn VelocityCache>,
    history: DashMap<Uuid, Vec<TransactionRecord>>,
}

impl RulePatternDetector {
    pub fn new(cfg: PatternsConfig, velocity: Arc<dyn VelocityCache>) -> Self {
        Self {
            cfg,
            velocity,
            history: DashMap::new(),
        }
    }

    /// Feed a screened transaction into the rolling window. Callers invoke
    /// this after screening so the current transaction never matches itself.
    pub fn record_transaction(&self, tx: &Transaction) {
        let cutoff = Utc::now() - Duration::days(HISTORY_RETENTION_DAYS);
        let mut window = self.history.entry(tx.user_id).or_default();
        window.push(TransactionRecord::from_tx(tx));
        window.retain(|r| r.at >= cutoff);
    }

    /// Structuring: enough transactions in the rolling window, each sitting
    /// just below the reporting threshold.
    fn detect_structuring(
        &self,
        window: &[TransactionRecord],
        tx: &Transaction,
    ) -> Option<PatternMatch> {
        let threshold = self.cfg.structuring_threshold;
        let cutoff = tx.initiated_at - Duration::hours(self.cfg.structuring_window_hours as i64);

        let sub_threshold =
            |amount: f64| amount < threshold && amount >= threshold * STRUCTURING_BAND;

        let mut related: Vec<Uuid> = window
            .iter()
            .filter(|r| r.at >= cutoff && sub_threshold(r.amount))
            .map(|r| r.id)
            .collect();

        let mut count = related.len();
        if sub_threshold(tx.amount) {
            count += 1;
        }

        if count < self.cfg.structuring_min_tx_count {
            return None;
        }

        related.push(tx.id);
        Some(PatternMatch {
            pattern_type: PatternType::Structuring,
            confidence: 0.9,
            description: format!(
                "{} transactions within {}h each just below the {:.0} reporting threshold",
                count, self.cfg.structuring_window_hours, threshold
            ),
            related_tx_ids: related,
            detected_at: Utc::now(),
        })
    }

    /// Rapid cycling: an outbound transfer shortly after an inbound one of
    /// near-equal value.
    fn detect_rapid_cycling(
        &self,
        window: &[TransactionRecord],
        tx: &Transaction,
    ) -> Option<PatternMatch> {
        if tx.direction != Direction::Outbound || tx.amount <= 0.0 {
            return None;
        }

        let cutoff = tx.initiated_at - Duration::minutes(self.cfg.rapid_cycling_window_mins as i64);

        let inbound = window.iter().find(|r| {
            r.direction == Direction::Inbound && r.at >= cutoff && r.amount > 0.0 && {
                let ratio = (tx.amount.min(r.amount)) / (tx.amount.max(r.amount));
                ratio >= self.cfg.rapid_cycling_threshold
            }
        })?;

        Some(PatternMatch {
            pattern_type: PatternType::RapidCycling,
            confidence: 0.8,
            description: format!(
                "outbound {:.2} within {}min of near-equal inbound {:.2}",
                tx.amount, self.cfg.rapid_cycling_window_mins, inbound.amount
            ),
            related_tx_ids: vec![inbound.id, tx.id],
            detected_at: Utc::now(),
        })
    }

    /// Velocity spike: today's volume plus this transaction far above the
    /// user's daily baseline.
    async fn detect_velocity_spike(&self, user_id: Uuid, tx: &Transaction) -> Option<PatternMatch> {
        let velocity = match self.velocity.get_velocity(user_id).await {
            Ok(Some(v)) => v,
            Ok(None) => return None,
            Err(e) => {
                debug!(error = %e, "velocity unavailable for pattern detection");
                return None;
            }
        };

        if velocity.avg_daily_amount <= 0.0 {
            return None;
        }

        let ratio = (velocity.amount_day + tx.amount) / velocity.avg_daily_amount;
        if ratio < self.cfg.velocity_spike_multiplier {
            return None;
        }

        let confidence = if ratio >= 2.0 * self.cfg.velocity_spike_multiplier {
            0.9
        } else {
            0.75
        };

        Some(PatternMatch {
            pattern_type: PatternType::VelocitySpike,
            confidence,
            description: format!(
                "daily volume {:.1}x the {:.2} baseline",
                ratio, velocity.avg_daily_amount
            ),
            related_tx_ids: vec![tx.id],
            detected_at: Utc::now(),
        })
    }

    /// Geographic concentration: most of the user's recent volume routed to
    /// one country.
    fn detect_geo_concentration(
        &self,
        window: &[TransactionRecord],
        tx: &Transaction,
    ) -> Option<PatternMatch> {
        let country = tx.counterparty_country();
        if country.is_empty() {
            return None;
        }

        let mut total = tx.amount;
        let mut to_country = tx.amount;
        let mut count = 1usize;

        for record in window {
            if record.amount <= 0.0 {
                continue;
            }
            total += record.amount;
            count += 1;
            if record.counterparty_country == country {
                to_country += record.amount;
            }
        }

        if count < 3 || total <= 0.0 {
            return None;
        }

        let share = to_country / total;
        if share < self.cfg.geo_concentration_threshold {
            return None;
        }

        Some(PatternMatch {
            pattern_type: PatternType::GeoConcentration,
            confidence: share.min(1.0),
            description: format!(
                "{:.0}% of recent volume routed to {}",
                share * 100.0,
                country
            ),
            related_tx_ids: vec![tx.id],
            detected_at: Utc::now(),
        })
    }
}

#[async_trait]
impl PatternDetector for RulePatternDetector {
    async fn detect_patterns(&self, user_id: Uuid, tx: &Transaction) -> Result<Vec<PatternMatch>> {
        let window: Vec<TransactionRecord> = self
            .history
            .get(&user_id)
            .map(|w| w.clone())
            .unwrap_or_default();

        let mut matches = Vec::new();

        if let Some(m) = self.detect_structuring(&window, tx) {
            matches.push(m);
        }
        if let Some(m) = self.detect_rapid_cycling(&window, tx) {
            matches.push(m);
        }
        if let Some(m) = self.detect_velocity_spike(user_id, tx).await {
            matches.push(m);
        }
        if let Some(m) = self.detect_geo_concentration(&window, tx) {
            matches.push(m);
        }

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryVelocityCache;
    use crate::domain::{TransactionType, VelocityData};

    fn tx(user_id: Uuid, amount: f64, direction: Direction, country: &str) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            user_id,
            account_id: Uuid::new_v4(),
            tx_type: TransactionType::Transfer,
            direction,
            amount,
            currency: "USD".to_string(),
            sender_name: "Sender".to_string(),
            sender_account: String::new(),
            sender_country: if direction == Direction::Outbound {
                "US".to_string()
            } else {
                country.to_string()
            },
            sender_bank: String::new(),
            receiver_name: "Receiver".to_string(),
            receiver_account: String::new(),
            receiver_country: if direction == Direction::Outbound {
                country.to_string()
            } else {
                "US".to_string()
            },
            receiver_bank: String::new(),
            description: String::new(),
            reference: String::new(),
            channel: "API".to_string(),
            ip_address: String::new(),
            device_id: String::new(),
            geo_location: String::new(),
            initiated_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    fn detector() -> RulePatternDetector {
        RulePatternDetector::new(PatternsConfig::default(), Arc::new(MemoryVelocityCache::new()))
    }

    #[tokio::test]
    async fn structuring_fires_on_clustered_sub_threshold_amounts() {
        let detector = detector();
        let user = Uuid::new_v4();

        for _ in 0..4 {
            detector.record_transaction(&tx(user, 9_500.0, Direction::Outbound, "US"));
        }

        let current = tx(user, 9_500.0, Direction::Outbound, "US");
        let matches = detector.detect_patterns(user, &current).await.unwrap();

        let structuring = matches
            .iter()
            .find(|m| m.pattern_type == PatternType::Structuring)
            .expect("structuring match");
        assert_eq!(structuring.confidence, 0.9);
        assert_eq!(structuring.related_tx_ids.len(), 5);
    }

    #[tokio::test]
    async fn structuring_ignores_amounts_outside_band() {
        let detector = detector();
        let user = Uuid::new_v4();

        // Far below the band: ordinary activity
        for _ in 0..4 {
            detector.record_transaction(&tx(user, 2_000.0, Direction::Outbound, "US"));
        }

        let current = tx(user, 2_000.0, Direction::Outbound, "US");
        let matches = detector.detect_patterns(user, &current).await.unwrap();
        assert!(matches
            .iter()
            .all(|m| m.pattern_type != PatternType::Structuring));
    }

    #[tokio::test]
    async fn rapid_cycling_pairs_inbound_with_outbound() {
        let detector = detector();
        let user = Uuid::new_v4();

        detector.record_transaction(&tx(user, 10_000.0, Direction::Inbound, "DE"));

        let current = tx(user, 9_500.0, Direction::Outbound, "DE");
        let matches = detector.detect_patterns(user, &current).await.unwrap();

        let cycling = matches
            .iter()
            .find(|m| m.pattern_type == PatternType::RapidCycling)
            .expect("rapid cycling match");
        assert_eq!(cycling.related_tx_ids.len(), 2);
    }

    #[tokio::test]
    async fn rapid_cycling_requires_near_equal_value() {
        let detector = detector();
        let user = Uuid::new_v4();

        detector.record_transaction(&tx(user, 10_000.0, Direction::Inbound, "DE"));

        let current = tx(user, 2_000.0, Direction::Outbound, "DE");
        let matches = detector.detect_patterns(user, &current).await.unwrap();
        assert!(matches
            .iter()
            .all(|m| m.pattern_type != PatternType::RapidCycling));
    }

    #[tokio::test]
    async fn velocity_spike_against_baseline() {
        let velocity = Arc::new(MemoryVelocityCache::new());
        let user = Uuid::new_v4();
        velocity.seed(VelocityData {
            user_id: user,
            amount_day: 8_000.0,
            avg_daily_amount: 500.0,
            avg_daily_tx_count: 40.0,
            ..VelocityData::default()
        });

        let detector = RulePatternDetector::new(PatternsConfig::default(), velocity);
        let current = tx(user, 2_500.0, Direction::Outbound, "US");
        let matches = detector.detect_patterns(user, &current).await.unwrap();

        let spike = matches
            .iter()
            .find(|m| m.pattern_type == PatternType::VelocitySpike)
            .expect("velocity spike match");
        // ratio 21 >= 2 * multiplier
        assert_eq!(spike.confidence, 0.9);
    }

    #[tokio::test]
    async fn geo_concentration_on_dominant_corridor() {
        let detector = detector();
        let user = Uuid::new_v4();

        detector.record_transaction(&tx(user, 5_000.0, Direction::Outbound, "NG"));
        detector.record_transaction(&tx(user, 6_000.0, Direction::Outbound, "NG"));
        detector.record_transaction(&tx(user, 500.0, Direction::Outbound, "GB"));

        let current = tx(user, 7_000.0, Direction::Outbound, "NG");
        let matches = detector.detect_patterns(user, &current).await.unwrap();

        let geo = matches
            .iter()
            .find(|m| m.pattern_type == PatternType::GeoConcentration)
            .expect("geo concentration match");
        assert!(geo.confidence >= 0.8);
        assert!(geo.description.contains("NG"));
    }

    #[tokio::test]
    async fn quiet_history_yields_no_patterns() {
        let detector = detector();
        let user = Uuid::new_v4();

        detector.record_transaction(&tx(user, 250.0, Direction::Outbound, "US"));

        let current = tx(user, 300.0, Direction::Outbound, "US");
        let matches = detector.detect_patterns(user, &current).await.unwrap();
        assert!(matches.is_empty());
    }
}
