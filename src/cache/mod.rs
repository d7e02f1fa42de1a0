//! Injected cache collaborators and their in-memory implementations.
//!
//! The engine only depends on the traits here; production deployments back
//! them with Redis, while the in-memory variants serve tests and embedders.
//! Cache failures are always recoverable: checks log and continue without
//! the cached input.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::domain::VelocityData;
use crate::error::Result;
use crate::matching::normalize::normalize_name;
use crate::matching::similarity::jaro_winkler;
use crate::matching::{OfacEntry, PepEntry};

/// Sanctions list cache surface
#[async_trait]
pub trait SanctionsCache: Send + Sync {
    /// Exact lookup by normalized name
    async fn get_by_exact_name(&self, name: &str) -> Result<Option<OfacEntry>>;
    /// Candidates whose similarity to `name` meets `threshold`, best first
    async fn get_by_fuzzy_name(&self, name: &str, threshold: f64) -> Result<Vec<OfacEntry>>;
    async fn get_all_entries(&self) -> Result<Vec<OfacEntry>>;
    async fn set_entries(&self, entries: Vec<OfacEntry>, ttl: Duration) -> Result<()>;
    async fn get_last_update(&self) -> Result<Option<DateTime<Utc>>>;
    async fn set_last_update(&self, t: DateTime<Utc>) -> Result<()>;
}

/// PEP list cache surface
#[async_trait]
pub trait PepCache: Send + Sync {
    async fn get_by_exact_name(&self, name: &str) -> Result<Option<PepEntry>>;
    async fn get_by_fuzzy_name(&self, name: &str, threshold: f64) -> Result<Vec<PepEntry>>;
    async fn get_all_entries(&self) -> Result<Vec<PepEntry>>;
    async fn set_entries(&self, entries: Vec<PepEntry>, ttl: Duration) -> Result<()>;
    async fn get_last_update(&self) -> Result<Option<DateTime<Utc>>>;
    async fn set_last_update(&self, t: DateTime<Utc>) -> Result<()>;
}

/// Per-user velocity counters
#[async_trait]
pub trait VelocityCache: Send + Sync {
    async fn get_velocity(&self, user_id: Uuid) -> Result<Option<VelocityData>>;
    /// Record one more transaction of `amount` against every rolling window
    async fn increment_velocity(&self, user_id: Uuid, amount: f64) -> Result<()>;
}

/// In-memory sanctions cache. Entries are indexed under their normalized
/// primary name and every normalized alias; the alias keys resolve to the
/// parent entry. TTLs are accepted for interface parity and ignored.
pub struct MemorySanctionsCache {
    entries: DashMap<String, OfacEntry>,
    last_update: RwLock<Option<DateTime<Utc>>>,
}

impl MemorySanctionsCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            last_update: RwLock::new(None),
        }
    }

    /// Convenience loader for tests and embedders
    pub async fn load(&self, entries: Vec<OfacEntry>) {
        self.replace(entries);
    }

    fn replace(&self, entries: Vec<OfacEntry>) {
        self.entries.clear();
        for entry in entries {
            for alias in &entry.aliases {
                self.entries.insert(normalize_name(alias), entry.clone());
            }
            self.entries
                .insert(entry.normalized_name.clone(), entry.clone());
        }
        *self.last_update.write() = Some(Utc::now());
    }
}

impl Default for MemorySanctionsCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SanctionsCache for MemorySanctionsCache {
    async fn get_by_exact_name(&self, name: &str) -> Result<Option<OfacEntry>> {
        Ok(self.entries.get(name).map(|e| e.clone()))
    }

    async fn get_by_fuzzy_name(&self, name: &str, threshold: f64) -> Result<Vec<OfacEntry>> {
        let mut scored: Vec<(f64, OfacEntry)> = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        for entry in self.entries.iter() {
            if seen.contains(&entry.entity_id) {
                continue;
            }
            let mut score = jaro_winkler(name, &entry.normalized_name);
            for alias in &entry.aliases {
                score = score.max(jaro_winkler(name, &normalize_name(alias)));
            }
            if score >= threshold {
                seen.push(entry.entity_id.clone());
                scored.push((score, entry.clone()));
            }
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().map(|(_, e)| e).collect())
    }

    async fn get_all_entries(&self) -> Result<Vec<OfacEntry>> {
        let mut seen: Vec<String> = Vec::new();
        let mut all = Vec::new();
        for entry in self.entries.iter() {
            if !seen.contains(&entry.entity_id) {
                seen.push(entry.entity_id.clone());
                all.push(entry.clone());
            }
        }
        Ok(all)
    }

    async fn set_entries(&self, entries: Vec<OfacEntry>, _ttl: Duration) -> Result<()> {
        self.replace(entries);
        Ok(())
    }

    async fn get_last_update(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(*self.last_update.read())
    }

    async fn set_last_update(&self, t: DateTime<Utc>) -> Result<()> {
        *self.last_update.write() = Some(t);
        Ok(())
    }
}

/// In-memory PEP cache, mirror of [`MemorySanctionsCache`]
pub struct MemoryPepCache {
    entries: DashMap<String, PepEntry>,
    last_update: RwLock<Option<DateTime<Utc>>>,
}

impl MemoryPepCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            last_update: RwLock::new(None),
        }
    }

    pub async fn load(&self, entries: Vec<PepEntry>) {
        self.replace(entries);
    }

    fn replace(&self, entries: Vec<PepEntry>) {
        self.entries.clear();
        for entry in entries {
            for alias in &entry.aliases {
                self.entries.insert(normalize_name(alias), entry.clone());
            }
            self.entries
                .insert(entry.normalized_name.clone(), entry.clone());
        }
        *self.last_update.write() = Some(Utc::now());
    }
}

impl Default for MemoryPepCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PepCache for MemoryPepCache {
    async fn get_by_exact_name(&self, name: &str) -> Result<Option<PepEntry>> {
        Ok(self.entries.get(name).map(|e| e.clone()))
    }

    async fn get_by_fuzzy_name(&self, name: &str, threshold: f64) -> Result<Vec<PepEntry>> {
        let mut scored: Vec<(f64, PepEntry)> = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        for entry in self.entries.iter() {
            if seen.contains(&entry.id) {
                continue;
            }
            let mut score = jaro_winkler(name, &entry.normalized_name);
            for alias in &entry.aliases {
                score = score.max(jaro_winkler(name, &normalize_name(alias)));
            }
            if score >= threshold {
                seen.push(entry.id.clone());
                scored.push((score, entry.clone()));
            }
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().map(|(_, e)| e).collect())
    }

    async fn get_all_entries(&self) -> Result<Vec<PepEntry>> {
        let mut seen: Vec<String> = Vec::new();
        let mut all = Vec::new();
        for entry in self.entries.iter() {
            if !seen.contains(&entry.id) {
                seen.push(entry.id.clone());
                all.push(entry.clone());
            }
        }
        Ok(all)
    }

    async fn set_entries(&self, entries: Vec<PepEntry>, _ttl: Duration) -> Result<()> {
        self.replace(entries);
        Ok(())
    }

    async fn get_last_update(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(*self.last_update.read())
    }

    async fn set_last_update(&self, t: DateTime<Utc>) -> Result<()> {
        *self.last_update.write() = Some(t);
        Ok(())
    }
}

/// In-memory velocity counters keyed by user
pub struct MemoryVelocityCache {
    data: DashMap<Uuid, VelocityData>,
}

impl MemoryVelocityCache {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Seed a user's velocity record, typically with baselines, for tests
    pub fn seed(&self, velocity: VelocityData) {
        self.data.insert(velocity.user_id, velocity);
    }
}

impl Default for MemoryVelocityCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VelocityCache for MemoryVelocityCache {
    async fn get_velocity(&self, user_id: Uuid) -> Result<Option<VelocityData>> {
        Ok(self.data.get(&user_id).map(|v| v.clone()))
    }

    async fn increment_velocity(&self, user_id: Uuid, amount: f64) -> Result<()> {
        let mut entry = self.data.entry(user_id).or_insert_with(|| VelocityData {
            user_id,
            ..VelocityData::default()
        });

        entry.tx_count_hour += 1;
        entry.amount_hour += amount;
        entry.tx_count_day += 1;
        entry.amount_day += amount;
        entry.tx_count_week += 1;
        entry.amount_week += amount;
        entry.tx_count_month += 1;
        entry.amount_month += amount;
        entry.updated_at = Utc::now();

        Ok(())
    }
}

/// Test double whose every operation fails, for failure-isolation tests
pub struct FailingSanctionsCache;

#[async_trait]
impl SanctionsCache for FailingSanctionsCache {
    async fn get_by_exact_name(&self, _name: &str) -> Result<Option<OfacEntry>> {
        Err(crate::error::Error::cache("sanctions cache unavailable"))
    }

    async fn get_by_fuzzy_name(&self, _name: &str, _threshold: f64) -> Result<Vec<OfacEntry>> {
        Err(crate::error::Error::cache("sanctions cache unavailable"))
    }

    async fn get_all_entries(&self) -> Result<Vec<OfacEntry>> {
        Err(crate::error::Error::cache("sanctions cache unavailable"))
    }

    async fn set_entries(&self, _entries: Vec<OfacEntry>, _ttl: Duration) -> Result<()> {
        Err(crate::error::Error::cache("sanctions cache unavailable"))
    }

    async fn get_last_update(&self) -> Result<Option<DateTime<Utc>>> {
        Err(crate::error::Error::cache("sanctions cache unavailable"))
    }

    async fn set_last_update(&self, _t: DateTime<Utc>) -> Result<()> {
        Err(crate::error::Error::cache("sanctions cache unavailable"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fuzzy_lookup_orders_by_score() {
        let cache = MemorySanctionsCache::new();
        cache
            .load(vec![
                OfacEntry::new("1", "John Doe", "Individual", "SDGT"),
                OfacEntry::new("2", "Jon Doe", "Individual", "SDNT"),
                OfacEntry::new("3", "Completely Different", "Entity", "CYBER"),
            ])
            .await;

        let candidates = cache.get_by_fuzzy_name("jhon doe", 0.85).await.unwrap();
        assert!(candidates.len() >= 2);
        // Both Does rank above threshold; the unrelated entity is filtered out
        assert!(candidates.iter().all(|c| c.name != "Completely Different"));
    }

    #[tokio::test]
    async fn alias_resolves_to_parent_entry() {
        let cache = MemorySanctionsCache::new();
        cache
            .load(vec![OfacEntry::new("1", "John Doe", "Individual", "SDGT")
                .with_aliases(vec!["Johnny Doe".to_string()])])
            .await;

        let hit = cache.get_by_exact_name("johnny doe").await.unwrap();
        assert_eq!(hit.unwrap().name, "John Doe");
    }

    #[tokio::test]
    async fn set_entries_replaces_store() {
        let cache = MemorySanctionsCache::new();
        cache
            .load(vec![OfacEntry::new("1", "John Doe", "Individual", "SDGT")])
            .await;
        cache
            .set_entries(
                vec![OfacEntry::new("2", "New Entry", "Entity", "SDNT")],
                Duration::from_secs(3600),
            )
            .await
            .unwrap();

        assert!(cache.get_by_exact_name("john doe").await.unwrap().is_none());
        assert!(cache.get_by_exact_name("new entry").await.unwrap().is_some());
        assert!(cache.get_last_update().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn velocity_increment_updates_all_windows() {
        let cache = MemoryVelocityCache::new();
        let user = Uuid::new_v4();

        cache.increment_velocity(user, 100.0).await.unwrap();
        cache.increment_velocity(user, 50.0).await.unwrap();

        let velocity = cache.get_velocity(user).await.unwrap().unwrap();
        assert_eq!(velocity.tx_count_day, 2);
        assert_eq!(velocity.amount_day, 150.0);
        assert_eq!(velocity.tx_count_month, 2);
        assert_eq!(velocity.amount_month, 150.0);
    }

    #[tokio::test]
    async fn missing_velocity_is_none() {
        let cache = MemoryVelocityCache::new();
        assert!(cache
            .get_velocity(Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
    }
}
