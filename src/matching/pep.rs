//! Politically Exposed Person screening.
//!
//! Same lookup ladder as the sanctions checker, plus a risk categorization of
//! the matched person and an associate listing for link analysis.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::PepCache;
use crate::domain::{MatchType, PepMatch};
use crate::error::Result;

use super::normalize::normalize_name;
use super::similarity::jaro_winkler;

/// Positions that always categorize as HIGH_RISK_PEP while active
const HIGH_RISK_POSITIONS: [&str; 5] = [
    "head of state",
    "head of government",
    "minister",
    "military general",
    "senior judge",
];

/// A politically exposed person entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PepEntry {
    pub id: String,
    pub name: String,
    pub normalized_name: String,
    pub position: String,
    pub country: String,
    /// domestic, foreign, or international_org
    pub category: String,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Known family members and close associates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub associates: Vec<String>,
}

impl PepEntry {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        position: impl Into<String>,
        country: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let normalized_name = normalize_name(&name);
        Self {
            id: id.into(),
            name,
            normalized_name,
            position: position.into(),
            country: country.into(),
            category: category.into(),
            is_active: true,
            start_date: None,
            end_date: None,
            aliases: Vec::new(),
            associates: Vec::new(),
        }
    }
}

#[derive(Clone)]
struct Indexed {
    entry: Arc<PepEntry>,
    via_alias: bool,
}

/// PEP checker. Target: a few milliseconds per lookup.
pub struct PepChecker {
    cache: Arc<dyn PepCache>,
    threshold: f64,
    pep_index: RwLock<HashMap<String, Indexed>>,
}

impl PepChecker {
    pub fn new(cache: Arc<dyn PepCache>, threshold: f64) -> Self {
        Self {
            cache,
            threshold,
            pep_index: RwLock::new(HashMap::new()),
        }
    }

    /// Screen a name against the PEP list
    pub async fn check(&self, name: &str) -> Result<PepMatch> {
        let start = Instant::now();

        if name.is_empty() {
            return Ok(PepMatch::no_match());
        }

        let normalized = normalize_name(name);

        // 1. In-memory index
        if let Some(indexed) = self.exact_match(&normalized) {
            let match_type = if indexed.via_alias {
                MatchType::Alias
            } else {
                MatchType::Exact
            };
            return Ok(Self::matched(
                &indexed.entry,
                1.0,
                match_type,
                start.elapsed().as_millis() as u64,
            ));
        }

        // 2. Exact lookup through the cache
        match self.cache.get_by_exact_name(&normalized).await {
            Ok(Some(entry)) => {
                return Ok(Self::matched(
                    &entry,
                    1.0,
                    MatchType::Exact,
                    start.elapsed().as_millis() as u64,
                ));
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "pep exact cache lookup failed"),
        }

        // 3. Fuzzy candidates
        match self
            .cache
            .get_by_fuzzy_name(&normalized, self.threshold)
            .await
        {
            Ok(candidates) if !candidates.is_empty() => {
                let best = &candidates[0];
                let similarity = jaro_winkler(&normalized, &best.normalized_name);
                return Ok(Self::matched(
                    best,
                    similarity,
                    MatchType::Fuzzy,
                    start.elapsed().as_millis() as u64,
                ));
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "pep fuzzy cache lookup failed"),
        }

        let mut result = PepMatch::no_match();
        result.check_duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    /// Screen a name and also return the matched entry's known associates
    pub async fn check_with_associates(&self, name: &str) -> Result<(PepMatch, Vec<String>)> {
        let result = self.check(name).await?;

        if result.matched {
            let normalized = normalize_name(name);
            if let Some(indexed) = self.exact_match(&normalized) {
                return Ok((result, indexed.entry.associates.clone()));
            }
            if let Ok(Some(entry)) = self.cache.get_by_exact_name(&normalized).await {
                return Ok((result, entry.associates));
            }
        }

        Ok((result, Vec::new()))
    }

    /// Load all entries from the cache and atomically rebuild the index
    pub async fn load_index(&self) -> Result<usize> {
        let entries = self.cache.get_all_entries().await?;

        let mut index = HashMap::with_capacity(entries.len() * 2);
        for entry in entries {
            let entry = Arc::new(entry);
            for alias in &entry.aliases {
                index.insert(
                    normalize_name(alias),
                    Indexed {
                        entry: Arc::clone(&entry),
                        via_alias: true,
                    },
                );
            }
            index.insert(
                entry.normalized_name.clone(),
                Indexed {
                    entry: Arc::clone(&entry),
                    via_alias: false,
                },
            );
        }

        let count = index.len();
        *self.pep_index.write() = index;

        info!(keys = count, "pep index loaded");
        Ok(count)
    }

    fn exact_match(&self, normalized: &str) -> Option<Indexed> {
        self.pep_index.read().get(normalized).cloned()
    }

    /// Spawn the periodic index refresh, mirroring the sanctions checker
    pub fn spawn_refresh(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let checker = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = checker.load_index().await {
                    warn!(error = %e, "pep index refresh failed");
                }
            }
        })
    }

    fn matched(entry: &PepEntry, score: f64, match_type: MatchType, duration_ms: u64) -> PepMatch {
        PepMatch {
            matched: true,
            match_score: score,
            match_type: Some(match_type),
            pep_name: entry.name.clone(),
            pep_position: entry.position.clone(),
            pep_country: entry.country.clone(),
            risk_category: risk_category(entry).to_string(),
            check_duration_ms: duration_ms,
        }
    }
}

/// Categorize a matched PEP, rules evaluated top-down
fn risk_category(entry: &PepEntry) -> &'static str {
    if !entry.is_active {
        return "FORMER_PEP";
    }
    if HIGH_RISK_POSITIONS
        .iter()
        .any(|p| p.eq_ignore_ascii_case(&entry.position))
    {
        return "HIGH_RISK_PEP";
    }
    if entry.category == "foreign" {
        return "FOREIGN_PEP";
    }
    "DOMESTIC_PEP"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryPepCache;

    fn entries() -> Vec<PepEntry> {
        let mut president = PepEntry::new(
            "PEP-001",
            "Vladimir Putin",
            "Head of State",
            "RU",
            "foreign",
        );
        president.associates = vec!["Close Associate One".to_string()];

        let mut former = PepEntry::new("PEP-002", "Gerhard Older", "Minister", "DE", "foreign");
        former.is_active = false;

        let local = PepEntry::new("PEP-003", "Jane Councilwoman", "City Council", "US", "domestic");

        let foreign = PepEntry::new("PEP-004", "Pierre Deputy", "Deputy", "FR", "foreign");

        vec![president, former, local, foreign]
    }

    async fn checker_with_index() -> PepChecker {
        let cache = Arc::new(MemoryPepCache::new());
        cache.load(entries()).await;
        let checker = PepChecker::new(cache, 0.85);
        checker.load_index().await.unwrap();
        checker
    }

    #[tokio::test]
    async fn exact_hit_categorizes_high_risk() {
        let checker = checker_with_index().await;
        let result = checker.check("Vladimir Putin").await.unwrap();

        assert!(result.matched);
        assert_eq!(result.match_type, Some(MatchType::Exact));
        assert_eq!(result.risk_category, "HIGH_RISK_PEP");
    }

    #[tokio::test]
    async fn inactive_pep_is_former() {
        let checker = checker_with_index().await;
        let result = checker.check("Gerhard Older").await.unwrap();

        assert!(result.matched);
        assert_eq!(result.risk_category, "FORMER_PEP");
    }

    #[tokio::test]
    async fn foreign_category_without_high_risk_position() {
        let checker = checker_with_index().await;
        let result = checker.check("Pierre Deputy").await.unwrap();

        assert!(result.matched);
        assert_eq!(result.risk_category, "FOREIGN_PEP");
    }

    #[tokio::test]
    async fn domestic_fallback() {
        let checker = checker_with_index().await;
        let result = checker.check("Jane Councilwoman").await.unwrap();

        assert!(result.matched);
        assert_eq!(result.risk_category, "DOMESTIC_PEP");
    }

    #[tokio::test]
    async fn fuzzy_hit_carries_similarity() {
        let checker = checker_with_index().await;
        let result = checker.check("Vladmir Putn").await.unwrap();

        assert!(result.matched);
        assert_eq!(result.match_type, Some(MatchType::Fuzzy));
        assert!(result.match_score >= 0.85 && result.match_score < 1.0);
        assert_eq!(result.pep_name, "Vladimir Putin");
    }

    #[tokio::test]
    async fn associates_returned_on_match() {
        let checker = checker_with_index().await;
        let (result, associates) = checker.check_with_associates("Vladimir Putin").await.unwrap();

        assert!(result.matched);
        assert_eq!(associates, vec!["Close Associate One".to_string()]);
    }

    #[tokio::test]
    async fn no_match_for_unlisted_name() {
        let checker = checker_with_index().await;
        let result = checker.check("Random Citizen").await.unwrap();

        assert!(!result.matched);
        assert!(result.risk_category.is_empty());
    }
}
