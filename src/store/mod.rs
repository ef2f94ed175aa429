//! In-memory entity store for assets, catalog items and try-on jobs.
//!
//! Lives for the lifetime of the process. Each job sits behind its own
//! mutex so status updates on one job never wait on another.

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::models::asset::Asset;
use crate::models::catalog::{CatalogFilter, CatalogItem};
use crate::models::job::{JobStatus, TryOnJob};

/// An asset record together with its bytes. Cloning shares the buffer.
#[derive(Debug, Clone)]
pub struct StoredAsset {
    pub asset: Asset,
    pub data: Bytes,
}

/// A job plus its insertion sequence, used to break `created_at` ties.
#[derive(Debug, Clone)]
struct JobSlot {
    seq: u64,
    job: Arc<Mutex<TryOnJob>>,
}

#[derive(Debug, Default)]
struct Catalog {
    items: Vec<CatalogItem>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Default)]
pub struct EntityStore {
    assets: RwLock<HashMap<Uuid, StoredAsset>>,
    catalog: RwLock<Catalog>,
    jobs: RwLock<HashMap<Uuid, JobSlot>>,
    next_seq: AtomicU64,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Assets ---

    pub async fn put_asset(&self, asset: Asset, data: impl Into<Bytes>) {
        let stored = StoredAsset {
            asset,
            data: data.into(),
        };
        self.assets.write().await.insert(stored.asset.id, stored);
    }

    pub async fn get_asset(&self, id: Uuid) -> Option<StoredAsset> {
        self.assets.read().await.get(&id).cloned()
    }

    // --- Catalog ---

    /// Insert a catalog item. Re-inserting an existing id replaces it in
    /// place and keeps its original position.
    pub async fn put_catalog_item(&self, item: CatalogItem) {
        let mut catalog = self.catalog.write().await;
        match catalog.index.get(&item.id).copied() {
            Some(pos) => catalog.items[pos] = item,
            None => {
                let pos = catalog.items.len();
                catalog.index.insert(item.id.clone(), pos);
                catalog.items.push(item);
            }
        }
    }

    pub async fn get_catalog_item(&self, id: &str) -> Option<CatalogItem> {
        let catalog = self.catalog.read().await;
        catalog
            .index
            .get(id)
            .map(|&pos| catalog.items[pos].clone())
    }

    pub async fn catalog_len(&self) -> usize {
        self.catalog.read().await.items.len()
    }

    /// Catalog items matching every supplied predicate, in insertion order.
    pub async fn filter_catalog(&self, filter: &CatalogFilter) -> Vec<CatalogItem> {
        let category = active_predicate(filter.category.as_deref());
        let gender = active_predicate(filter.gender.as_deref());
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let catalog = self.catalog.read().await;
        catalog
            .items
            .iter()
            .filter(|item| {
                category
                    .as_deref()
                    .map_or(true, |c| item.category.to_lowercase() == c)
            })
            .filter(|item| {
                gender.as_deref().map_or(true, |g| {
                    item.gender
                        .as_deref()
                        .is_some_and(|ig| ig.to_lowercase() == g)
                })
            })
            .filter(|item| {
                search.as_deref().map_or(true, |s| {
                    item.title.to_lowercase().contains(s)
                        || item
                            .description
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(s))
                })
            })
            .cloned()
            .collect()
    }

    // --- Jobs ---

    pub async fn insert_job(&self, job: TryOnJob) {
        let id = job.id;
        let slot = JobSlot {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            job: Arc::new(Mutex::new(job)),
        };
        self.jobs.write().await.insert(id, slot);
    }

    /// Snapshot of a job.
    pub async fn get_job(&self, id: Uuid) -> Option<TryOnJob> {
        let slot = self.jobs.read().await.get(&id).cloned()?;
        let job = slot.job.lock().await;
        Some(job.clone())
    }

    /// Run `f` against a job while holding that job's lock.
    ///
    /// Returns `None` if the job does not exist. Whatever `f` decides to
    /// write is atomic with respect to every other update on the same job.
    pub async fn update_job<F, R>(&self, id: Uuid, f: F) -> Option<R>
    where
        F: FnOnce(&mut TryOnJob) -> R,
    {
        let slot = self.jobs.read().await.get(&id).cloned()?;
        let mut job = slot.job.lock().await;
        Some(f(&mut job))
    }

    /// Jobs sharing a session key, oldest first. Jobs created in the same
    /// instant keep their insertion order.
    pub async fn jobs_for_session(&self, session_id: &str) -> Vec<TryOnJob> {
        let slots: Vec<_> = self.jobs.read().await.values().cloned().collect();
        let mut jobs = Vec::new();
        for slot in slots {
            let job = slot.job.lock().await;
            if job.session_id == session_id {
                jobs.push((job.created_at, slot.seq, job.clone()));
            }
        }
        jobs.sort_by_key(|(created_at, seq, _)| (*created_at, *seq));
        jobs.into_iter().map(|(_, _, job)| job).collect()
    }

    /// Count jobs sitting in `status` whose last update is before `cutoff`.
    pub async fn count_stale_jobs(&self, status: JobStatus, cutoff: DateTime<Utc>) -> usize {
        let slots: Vec<_> = self.jobs.read().await.values().cloned().collect();
        let mut count = 0;
        for slot in slots {
            let job = slot.job.lock().await;
            if job.status == status && job.updated_at < cutoff {
                count += 1;
            }
        }
        count
    }
}

/// Normalise a filter value: missing, blank or "all" means no predicate.
fn active_predicate(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
        .map(str::to_lowercase)
}
