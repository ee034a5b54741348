//! Operational counters, injected into components by their constructors.
//!
//! Purely diagnostic: nothing in the pipelines gates on these values.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Counters {
    /// Path documents created in the search index.
    pub index_create: AtomicU64,
    /// Samples written to the wide-column store.
    pub store_success: AtomicU64,
    /// Failed store batches.
    pub store_error: AtomicU64,
    /// Per-tenant sample write counts.
    tenant_writes: DashMap<String, u64>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_index_create(&self, n: u64) {
        self.index_create.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_store_success(&self, n: u64) {
        self.store_success.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_store_error(&self, n: u64) {
        self.store_error.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_tenant_write(&self, tenant: &str, n: u64) {
        match self.tenant_writes.get_mut(tenant) {
            Some(mut count) => *count += n,
            None => {
                *self.tenant_writes.entry(tenant.to_string()).or_insert(0) += n;
            }
        }
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            index_create: self.index_create.load(Ordering::Relaxed),
            store_success: self.store_success.load(Ordering::Relaxed),
            store_error: self.store_error.load(Ordering::Relaxed),
            tenant_writes: self
                .tenant_writes
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
        }
    }
}

/// Point-in-time view of [`Counters`], shaped for a metrics endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CountersSnapshot {
    pub index_create: u64,
    pub store_success: u64,
    pub store_error: u64,
    pub tenant_writes: HashMap<String, u64>,
}
