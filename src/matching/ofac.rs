//! OFAC sanctions screening.
//!
//! The checker keeps an in-memory index of normalized names (primary and
//! alias) so the hot path never touches the network. The injected cache is
//! the fallback for exact lookups and the source of fuzzy candidates.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::SanctionsCache;
use crate::domain::{MatchType, OfacMatch};
use crate::error::Result;

use super::normalize::normalize_name;
use super::similarity::jaro_winkler;

/// An entry from the OFAC SDN list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfacEntry {
    pub entity_id: String,
    pub name: String,
    /// Individual, Entity, Vessel, Aircraft
    #[serde(rename = "type")]
    pub sdn_type: String,
    /// Sanctions program (SDGT, SDNT, ...)
    pub program: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remarks: String,
    pub normalized_name: String,
}

impl OfacEntry {
    pub fn new(
        entity_id: impl Into<String>,
        name: impl Into<String>,
        sdn_type: impl Into<String>,
        program: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let normalized_name = normalize_name(&name);
        Self {
            entity_id: entity_id.into(),
            name,
            sdn_type: sdn_type.into(),
            program: program.into(),
            aliases: Vec::new(),
            addresses: Vec::new(),
            remarks: String::new(),
            normalized_name,
        }
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }
}

/// An index slot: the entry plus whether this key is one of its aliases.
/// Aliases are extra keys pointing at the parent entry, not records of their
/// own.
#[derive(Clone)]
struct Indexed {
    entry: Arc<OfacEntry>,
    via_alias: bool,
}

/// OFAC sanctions checker. Target: sub-millisecond on the index hit path.
pub struct OfacChecker {
    cache: Arc<dyn SanctionsCache>,
    threshold: f64,
    exact_index: RwLock<HashMap<String, Indexed>>,
}

impl OfacChecker {
    pub fn new(cache: Arc<dyn SanctionsCache>, threshold: f64) -> Self {
        Self {
            cache,
            threshold,
            exact_index: RwLock::new(HashMap::new()),
        }
    }

    /// Screen a name against the sanctions list.
    ///
    /// Collaborator failures downgrade to the next lookup tier and finally to
    /// a non-match; they never fail the caller.
    pub async fn check(&self, name: &str) -> Result<OfacMatch> {
        let start = Instant::now();

        if name.is_empty() {
            return Ok(OfacMatch::no_match());
        }

        let normalized = normalize_name(name);

        // 1. In-memory index, primary or alias key
        if let Some(indexed) = self.exact_match(&normalized) {
            let (match_type, matched_field) = if indexed.via_alias {
                (MatchType::Alias, "alias")
            } else {
                (MatchType::Exact, "name")
            };
            return Ok(OfacMatch {
                matched: true,
                match_score: 1.0,
                match_type: Some(match_type),
                sdn_name: indexed.entry.name.clone(),
                sdn_type: indexed.entry.sdn_type.clone(),
                program: indexed.entry.program.clone(),
                matched_field: matched_field.to_string(),
                check_duration_ms: start.elapsed().as_millis() as u64,
            });
        }

        // 2. Exact lookup through the cache
        match self.cache.get_by_exact_name(&normalized).await {
            Ok(Some(entry)) => {
                return Ok(OfacMatch {
                    matched: true,
                    match_score: 1.0,
                    match_type: Some(MatchType::Exact),
                    sdn_name: entry.name,
                    sdn_type: entry.sdn_type,
                    program: entry.program,
                    matched_field: "name".to_string(),
                    check_duration_ms: start.elapsed().as_millis() as u64,
                });
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "ofac exact cache lookup failed"),
        }

        // 3. Fuzzy candidates above the threshold
        match self
            .cache
            .get_by_fuzzy_name(&normalized, self.threshold)
            .await
        {
            Ok(candidates) if !candidates.is_empty() => {
                let best = &candidates[0];
                let similarity = jaro_winkler(&normalized, &best.normalized_name);
                return Ok(OfacMatch {
                    matched: true,
                    match_score: similarity,
                    match_type: Some(MatchType::Fuzzy),
                    sdn_name: best.name.clone(),
                    sdn_type: best.sdn_type.clone(),
                    program: best.program.clone(),
                    matched_field: "name".to_string(),
                    check_duration_ms: start.elapsed().as_millis() as u64,
                });
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "ofac fuzzy cache lookup failed"),
        }

        let mut result = OfacMatch::no_match();
        result.check_duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    /// Screen a batch of names concurrently
    pub async fn check_batch(&self, names: &[String]) -> HashMap<String, OfacMatch> {
        let checks = names.iter().map(|name| async move {
            match self.check(name).await {
                Ok(result) => Some((name.clone(), result)),
                Err(e) => {
                    warn!(name = %name, error = %e, "batch ofac check failed");
                    None
                }
            }
        });

        join_all(checks).await.into_iter().flatten().collect()
    }

    /// Load all entries from the cache and atomically rebuild the index.
    /// Readers keep the previous index until the swap.
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
            // Primary name wins over a colliding alias key
            index.insert(
                entry.normalized_name.clone(),
                Indexed {
                    entry: Arc::clone(&entry),
                    via_alias: false,
                },
            );
        }

        let count = index.len();
        *self.exact_index.write() = index;

        info!(keys = count, "ofac index loaded");
        Ok(count)
    }

    fn exact_match(&self, normalized: &str) -> Option<Indexed> {
        let hit = self.exact_index.read().get(normalized).cloned();
        if hit.is_some() {
            debug!(name = %normalized, "ofac index hit");
        }
        hit
    }

    /// Spawn the periodic index refresh. Refresh failures are logged and
    /// retried on the next tick; the previous index stays in service.
    pub fn spawn_refresh(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let checker = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = checker.load_index().await {
                    warn!(error = %e, "ofac index refresh failed");
                }
            }
        })
    }
}
