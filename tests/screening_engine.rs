//! End-to-end screening engine scenarios with in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use amlscreen::cache::{
    MemoryPepCache, MemorySanctionsCache, MemoryVelocityCache, SanctionsCache, VelocityCache,
};
use amlscreen::config::{PatternsConfig, ScreeningConfig};
use amlscreen::domain::{
    Direction, MatchType, PatternMatch, PatternType, RiskLevel, ScreeningDecision, Transaction,
    TransactionType, UserRiskProfile, VelocityData,
};
use amlscreen::error::Result;
use amlscreen::patterns::{PatternDetector, RulePatternDetector};
use amlscreen::repository::MemoryRiskProfileRepository;
use amlscreen::{Engine, OfacChecker, OfacEntry, PepChecker, PepEntry, RiskCalculator};

fn transaction(amount: f64, counterparty: &str, receiver_country: &str) -> Transaction {
    Transaction {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        account_id: Uuid::new_v4(),
        tx_type: TransactionType::Payment,
        direction: Direction::Outbound,
        amount,
        currency: "USD".to_string(),
        sender_name: "Account Holder".to_string(),
        sender_account: "ACC-1".to_string(),
        sender_country: "US".to_string(),
        sender_bank: "First Bank".to_string(),
        receiver_name: counterparty.to_string(),
        receiver_account: "ACC-2".to_string(),
        receiver_country: receiver_country.to_string(),
        receiver_bank: "Other Bank".to_string(),
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

fn low_risk_profile(user_id: Uuid) -> UserRiskProfile {
    UserRiskProfile {
        id: Uuid::new_v4(),
        user_id,
        risk_score: 5,
        risk_level: RiskLevel::Low,
        last_assessment: Utc::now(),
        next_review_date: Utc::now() + chrono::Duration::days(180),
        country_risk: 10,
        occupation_risk: 10,
        transaction_risk: 10,
        behavioral_risk: 10,
        relationship_risk: 10,
        is_pep: false,
        pep_details: None,
        is_high_net_worth: false,
        has_ofac_match: false,
        ofac_match_details: String::new(),
        avg_monthly_volume: 5_000.0,
        avg_transaction_amt: 300.0,
        tx_count_last_30_days: 15,
        primary_countries: vec!["US".to_string()],
        high_risk_countries: Vec::new(),
        sar_count: 0,
        investigation_count: 0,
        blocked_tx_count: 0,
        on_watchlist: false,
        watchlist_reason: String::new(),
        watchlist_added_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

struct Harness {
    engine: Engine,
    sanctions: Arc<MemorySanctionsCache>,
    velocity: Arc<MemoryVelocityCache>,
    profiles: Arc<MemoryRiskProfileRepository>,
    detector: Arc<RulePatternDetector>,
}

async fn harness() -> Harness {
    harness_with(ScreeningConfig::default(), None).await
}

async fn harness_with(
    screening_cfg: ScreeningConfig,
    detector_override: Option<Arc<dyn PatternDetector>>,
) -> Harness {
    let sanctions = Arc::new(MemorySanctionsCache::new());
    sanctions
        .load(vec![
            OfacEntry::new("SDN-001", "John Doe", "Individual", "SDGT")
                .with_aliases(vec!["Johnny Doe".to_string()]),
            OfacEntry::new("SDN-002", "Shadow Exports Ltd", "Entity", "SDNT"),
        ])
        .await;

    let peps = Arc::new(MemoryPepCache::new());
    peps.load(vec![PepEntry::new(
        "PEP-001",
        "Vladimir Putin",
        "Head of State",
        "RU",
        "foreign",
    )])
    .await;

    let velocity = Arc::new(MemoryVelocityCache::new());
    let profiles = Arc::new(MemoryRiskProfileRepository::new());

    let patterns_cfg = PatternsConfig::default();
    let detector = Arc::new(RulePatternDetector::new(
        patterns_cfg.clone(),
        velocity.clone() as Arc<dyn VelocityCache>,
    ));

    let ofac = Arc::new(OfacChecker::new(
        sanctions.clone(),
        screening_cfg.fuzzy_match_threshold,
    ));
    ofac.load_index().await.unwrap();

    let pep = Arc::new(PepChecker::new(
        peps.clone(),
        screening_cfg.fuzzy_match_threshold,
    ));
    pep.load_index().await.unwrap();

    let engine = Engine::new(
        ofac,
        pep,
        RiskCalculator::new(patterns_cfg),
        detector_override.unwrap_or_else(|| detector.clone() as Arc<dyn PatternDetector>),
        velocity.clone(),
        profiles.clone(),
        screening_cfg,
    );

    Harness {
        engine,
        sanctions,
        velocity,
        profiles,
        detector,
    }
}

#[tokio::test]
async fn clean_domestic_payment_is_approved() {
    let h = harness().await;

    let tx = transaction(250.0, "Maria Gonzalez", "US");
    h.profiles.insert(low_risk_profile(tx.user_id));

    let result = h.engine.screen(tx).await.unwrap();

    assert_eq!(result.decision, ScreeningDecision::Approved);
    assert_eq!(result.risk_level, RiskLevel::Low);
    assert!(result.risk_score < 30);
    assert!(!result.has_ofac_match());
    assert!(!result.has_pep_match());
    assert!(result.pattern_matches.is_empty());
}

#[tokio::test]
async fn ofac_exact_hit_always_blocks() {
    let h = harness().await;

    // Tiny amount: the override ignores everything else
    let tx = transaction(10.0, "John Doe", "US");
    let result = h.engine.screen(tx).await.unwrap();

    assert_eq!(result.decision, ScreeningDecision::Blocked);
    assert_eq!(result.risk_score, 100);
    assert_eq!(result.risk_level, RiskLevel::Critical);

    let ofac = result.ofac_match.as_ref().expect("ofac result");
    assert!(ofac.matched);
    assert_eq!(ofac.match_type, Some(MatchType::Exact));
    assert_eq!(ofac.match_score, 1.0);
}

#[tokio::test]
async fn ofac_hit_survives_normalization() {
    let h = harness().await;

    let tx = transaction(10.0, "Mr. JOHN DOE!!", "US");
    let result = h.engine.screen(tx).await.unwrap();

    assert_eq!(result.decision, ScreeningDecision::Blocked);
    assert!(result.has_ofac_match());
}

#[tokio::test]
async fn pep_fuzzy_hit_with_high_amount_is_suspicious() {
    let h = harness().await;

    let tx = transaction(75_000.0, "Vladmir Putn", "GB");
    let result = h.engine.screen(tx).await.unwrap();

    let pep = result.pep_match.as_ref().expect("pep result");
    assert!(pep.matched);
    assert_eq!(pep.match_type, Some(MatchType::Fuzzy));
    assert!(pep.match_score >= 0.85);

    let weight_of = |tag: &str| {
        result
            .risk_factors
            .iter()
            .find(|f| f.factor == tag)
            .map(|f| f.weight)
    };
    assert_eq!(weight_of("PEP_MATCH"), Some(30));
    assert_eq!(weight_of("HIGH_AMOUNT"), Some(15));
    assert_eq!(weight_of("CROSS_BORDER"), Some(5));

    assert_eq!(result.decision, ScreeningDecision::Suspicious);
}

#[tokio::test]
async fn structuring_pattern_raises_decision() {
    let h = harness().await;
    let user_id = Uuid::new_v4();

    // Four prior just-below-threshold payments in the window
    for _ in 0..4 {
        let mut prior = transaction(9_500.0, "Various Recipients", "GB");
        prior.user_id = user_id;
        h.detector.record_transaction(&prior);
    }

    let mut tx = transaction(9_500.0, "Final Recipient", "IR");
    tx.user_id = user_id;
    let result = h.engine.screen(tx).await.unwrap();

    let structuring = result
        .risk_factors
        .iter()
        .find(|f| f.factor == "STRUCTURING")
        .expect("structuring factor");
    assert_eq!(structuring.weight, 27); // 0.9 confidence x 30

    assert!(result
        .pattern_matches
        .iter()
        .any(|m| m.pattern_type == PatternType::Structuring));
    assert_ne!(result.decision, ScreeningDecision::Approved);
}

#[tokio::test]
async fn velocity_spike_contributes_twenty_points() {
    let h = harness().await;

    let mut tx = transaction(2_500.0, "Maria Gonzalez", "US");
    tx.sender_country = "US".to_string();
    h.velocity.seed(VelocityData {
        user_id: tx.user_id,
        amount_day: 8_000.0,
        avg_daily_amount: 500.0,
        avg_daily_tx_count: 100.0,
        ..VelocityData::default()
    });

    let result = h.engine.screen(tx).await.unwrap();

    // ratio (8000 + 2500) / 500 = 21 >= 10x multiplier
    assert!(result
        .risk_factors
        .iter()
        .any(|f| f.factor == "VELOCITY_SPIKE" && f.weight == 20));
}

/// Detector that sleeps past any reasonable deadline
struct SlowDetector;

#[async_trait]
impl PatternDetector for SlowDetector {
    async fn detect_patterns(&self, _user_id: Uuid, tx: &Transaction) -> Result<Vec<PatternMatch>> {
        tokio::time::sleep(Duration::from_millis(400)).await;
        Ok(vec![PatternMatch {
            pattern_type: PatternType::Smurfing,
            confidence: 1.0,
            description: "too late to matter".to_string(),
            related_tx_ids: vec![tx.id],
            detected_at: Utc::now(),
        }])
    }
}

#[tokio::test]
async fn deadline_exceeded_detector_yields_partial_result() {
    let cfg = ScreeningConfig {
        max_screening_latency: Duration::from_millis(200),
        ..ScreeningConfig::default()
    };
    let h = harness_with(cfg, Some(Arc::new(SlowDetector))).await;

    let tx = transaction(250.0, "Maria Gonzalez", "US");
    h.profiles.insert(low_risk_profile(tx.user_id));

    let result = h.engine.screen(tx).await.unwrap();

    // The slow detector contributed nothing; the fast checks did
    assert!(result.pattern_matches.is_empty());
    assert!(result.ofac_match.is_some());
    assert!(result.pep_match.is_some());
    assert!(result.risk_score < 30);
    assert_eq!(result.decision, ScreeningDecision::Approved);
    assert!(result.screening_duration_ms >= 200);
}

/// Collaborators that always fail, to prove per-check isolation
struct FailingDetector;

#[async_trait]
impl PatternDetector for FailingDetector {
    async fn detect_patterns(
        &self,
        _user_id: Uuid,
        _tx: &Transaction,
    ) -> Result<Vec<PatternMatch>> {
        Err(amlscreen::Error::Pattern("rules engine offline".to_string()))
    }
}

#[tokio::test]
async fn failing_detector_never_fails_screening() {
    let h = harness_with(ScreeningConfig::default(), Some(Arc::new(FailingDetector))).await;

    let tx = transaction(250.0, "Maria Gonzalez", "US");
    let result = h.engine.screen(tx).await.unwrap();

    assert!(result.pattern_matches.is_empty());
    assert_eq!(result.decision, ScreeningDecision::Approved);
}

#[tokio::test]
async fn empty_counterparty_skips_watchlist_checks() {
    let h = harness().await;

    let mut tx = transaction(250.0, "", "US");
    tx.receiver_name = String::new();
    let result = h.engine.screen(tx).await.unwrap();

    // Checks short-circuited: no match objects at all
    assert!(result.ofac_match.is_none());
    assert!(result.pep_match.is_none());
    assert_eq!(result.decision, ScreeningDecision::Approved);
}

#[tokio::test]
async fn watchlisted_user_profile_adds_factors() {
    let h = harness().await;

    let tx = transaction(250.0, "Maria Gonzalez", "US");
    let mut profile = low_risk_profile(tx.user_id);
    profile.on_watchlist = true;
    profile.watchlist_reason = "prior structuring review".to_string();
    profile.sar_count = 2;
    h.profiles.insert(profile);

    let result = h.engine.screen(tx).await.unwrap();

    let tags: Vec<&str> = result
        .risk_factors
        .iter()
        .map(|f| f.factor.as_str())
        .collect();
    assert!(tags.contains(&"USER_WATCHLIST"));
    assert!(tags.contains(&"PRIOR_SARS"));
}

#[tokio::test]
async fn telemetry_tracks_screenings() {
    let h = harness().await;

    assert_eq!(h.engine.screening_count(), 0);

    for _ in 0..3 {
        let tx = transaction(250.0, "Maria Gonzalez", "US");
        h.engine.screen(tx).await.unwrap();
    }

    assert_eq!(h.engine.screening_count(), 3);
}

#[tokio::test]
async fn screen_request_produces_response_dto() {
    let h = harness().await;

    let tx = transaction(75_000.0, "Vladmir Putn", "GB");
    let request = amlscreen::ScreeningRequest {
        transaction: tx,
        requester_id: Uuid::new_v4(),
        priority: amlscreen::domain::Priority::High,
        bypass_cache: false,
    };

    let response = h.engine.screen_request(request).await.unwrap();

    assert!(response.pep_match);
    assert!(!response.ofac_match);
    assert!(response.needs_review());
    assert!(response.risk_factors.contains(&"PEP_MATCH".to_string()));
}

#[tokio::test]
async fn refreshed_index_is_visible_to_next_screening() {
    let h = harness().await;

    let tx = transaction(250.0, "Newly Designated", "US");
    let result = h.engine.screen(tx).await.unwrap();
    assert!(!result.has_ofac_match());

    // List update lands, index refresh tick runs
    h.sanctions
        .set_entries(
            vec![OfacEntry::new(
                "SDN-003",
                "Newly Designated",
                "Individual",
                "SDGT",
            )],
            Duration::from_secs(3600),
        )
        .await
        .unwrap();

    let tx = transaction(250.0, "Newly Designated", "US");
    let result = h.engine.screen(tx).await.unwrap();
    // Cache-tier exact lookup catches the new entry even before load_index
    assert!(result.has_ofac_match());
    assert_eq!(result.decision, ScreeningDecision::Blocked);
}
