//! The Domain Catalog: an in-memory immutable snapshot of curated foreign
//! domains, materialized at startup from Postgres. Reload is offline (process
//! restart); in-flight requests hold their own `Arc` clone of the snapshot
//! they started with, so a future hot-reload can swap the pointer without
//! disturbing work already underway.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use tracing::info;

use crate::cache::{self, CacheStore};
use crate::db::Database;
use crate::models::collision::Intensity;
use crate::models::domain::{Domain, DomainTier};

/// An immutable view of the catalog as of one load. Cheap to clone (it's
/// wrapped in an `Arc` by `CatalogHandle`) and safe to share across tasks.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    domains: Vec<Domain>,
    by_name: HashMap<String, usize>,
}

impl CatalogSnapshot {
    pub fn new(domains: Vec<Domain>) -> Self {
        let by_name = domains
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i))
            .collect();
        Self { domains, by_name }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Domain> {
        self.by_name.get(name).map(|&i| &self.domains[i])
    }

    pub fn all(&self) -> &[Domain] {
        &self.domains
    }

    /// Domains admitting `intensity`, optionally restricted to one tier.
    pub fn filtered(
        &self,
        tier: Option<DomainTier>,
        intensity: Intensity,
    ) -> impl Iterator<Item = &Domain> {
        self.domains.iter().filter(move |d| {
            d.admits(intensity) && tier.map(|t| d.domain_tier() == t).unwrap_or(true)
        })
    }

    pub fn by_tier(&self, tier: DomainTier) -> impl Iterator<Item = &Domain> {
        self.domains.iter().filter(move |d| d.domain_tier() == tier)
    }
}

/// Handle shared via `AppState`. A plain `RwLock<Arc<_>>` is sufficient at
/// this scale — no need for an `arc-swap` dependency to get atomic pointer
/// swaps, since reads only need to clone the `Arc` once per request.
pub struct CatalogHandle {
    inner: RwLock<Arc<CatalogSnapshot>>,
}

impl CatalogHandle {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            inner: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Cheap: clones the `Arc`, not the snapshot. Call once per request.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.inner
            .read()
            .expect("catalog lock poisoned")
            .clone()
    }

    pub fn swap(&self, snapshot: CatalogSnapshot) {
        *self.inner.write().expect("catalog lock poisoned") = Arc::new(snapshot);
    }
}

/// Loads the catalog from the `domains` table and warms the basic/premium
/// tier cache entries (`collision:domains:{tier}`) from the freshly loaded
/// snapshot so the first request per tier does not miss.
pub async fn load(db: &dyn Database, cache: &dyn CacheStore, cache_ttl_seconds: u64) -> Result<CatalogHandle> {
    let rows = db.load_domains().await?;

    info!(count = rows.len(), "catalog loaded");

    let snapshot = CatalogSnapshot::new(rows);

    for tier in [DomainTier::Basic, DomainTier::Premium] {
        let entries: Vec<&Domain> = snapshot.by_tier(tier).collect();
        let key = format!("collision:domains:{}", tier.as_str());
        if let Err(e) = cache::set_json_ex(cache, &key, &entries, cache_ttl_seconds).await {
            tracing::warn!(error = %e, tier = tier.as_str(), "failed to warm domain cache");
        }
    }

    Ok(CatalogHandle::new(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn domain(name: &str, intensities: &[&str], tier: &str) -> Domain {
        Domain {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: "Science".to_string(),
            description: "desc".to_string(),
            keywords: vec![],
            examples: vec![],
            intensities: intensities.iter().map(|s| s.to_string()).collect(),
            tier: tier.to_string(),
        }
    }

    #[test]
    fn test_lookup_by_name() {
        let snap = CatalogSnapshot::new(vec![domain("Biomimicry", &["gentle"], "basic")]);
        assert!(snap.get("Biomimicry").is_some());
        assert!(snap.get("Nonexistent").is_none());
    }

    #[test]
    fn test_filtered_respects_intensity_and_tier() {
        let snap = CatalogSnapshot::new(vec![
            domain("Biomimicry", &["gentle", "moderate"], "basic"),
            domain("Quantum Physics", &["radical"], "premium"),
        ]);
        let radical: Vec<_> = snap.filtered(None, Intensity::Radical).collect();
        assert_eq!(radical.len(), 1);
        assert_eq!(radical[0].name, "Quantum Physics");

        let basic_gentle: Vec<_> = snap
            .filtered(Some(DomainTier::Basic), Intensity::Gentle)
            .collect();
        assert_eq!(basic_gentle.len(), 1);
    }

    #[test]
    fn test_handle_snapshot_reflects_swap() {
        let handle = CatalogHandle::new(CatalogSnapshot::empty());
        assert!(handle.snapshot().is_empty());
        handle.swap(CatalogSnapshot::new(vec![domain("X", &["gentle"], "basic")]));
        assert!(!handle.snapshot().is_empty());
    }
}
