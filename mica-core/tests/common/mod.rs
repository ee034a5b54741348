//! In-memory backends implementing the index and store seams, so the real
//! pipelines run end-to-end without live services.

#![allow(dead_code)]

use mica_core::path::client::{IndexClient, SearchPage, SearchQuery};
use mica_core::store::session::{Row, StoreSession};
use mica_core::{MicaError, PathDocument, Sample};
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Search-index fake: a document map with depth/tenant/regex filtering and
/// page-at-a-time scrolling.
pub struct MemoryIndex {
    docs: Mutex<BTreeMap<String, PathDocument>>,
    scrolls: Mutex<HashMap<String, Vec<PathDocument>>>,
    next_scroll: AtomicUsize,
    page_size: usize,
    pub fail_multi_get: AtomicBool,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            docs: Mutex::new(BTreeMap::new()),
            scrolls: Mutex::new(HashMap::new()),
            next_scroll: AtomicUsize::new(0),
            page_size,
            fail_multi_get: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.lock().len()
    }

    pub fn get(&self, id: &str) -> Option<PathDocument> {
        self.docs.lock().get(id).cloned()
    }

    pub fn all(&self) -> Vec<PathDocument> {
        self.docs.lock().values().cloned().collect()
    }
}

impl IndexClient for MemoryIndex {
    fn multi_get(&self, ids: &[String]) -> mica_core::Result<HashSet<String>> {
        if self.fail_multi_get.load(Ordering::Relaxed) {
            return Err(MicaError::BackendUnavailable("injected failure".into()));
        }
        let docs = self.docs.lock();
        Ok(ids
            .iter()
            .filter(|id| docs.contains_key(id.as_str()))
            .cloned()
            .collect())
    }

    fn bulk_upsert(&self, new_docs: &[PathDocument]) -> mica_core::Result<()> {
        let mut docs = self.docs.lock();
        for doc in new_docs {
            docs.insert(doc.id(), doc.clone());
        }
        Ok(())
    }

    fn put(&self, doc: &PathDocument) -> mica_core::Result<()> {
        self.docs.lock().insert(doc.id(), doc.clone());
        Ok(())
    }

    fn exists(&self, id: &str) -> mica_core::Result<bool> {
        Ok(self.docs.lock().contains_key(id))
    }

    fn search(&self, query: &SearchQuery) -> mica_core::Result<SearchPage> {
        let query_json = query.to_json()?;
        let re = Regex::new(&format!("^(?:{})$", query.path_regex)).map_err(|e| {
            MicaError::IndexQueryMalformed {
                reason: e.to_string(),
                query: query_json,
            }
        })?;

        let docs = self.docs.lock();
        let mut hits: Vec<PathDocument> = docs
            .values()
            .filter(|doc| {
                doc.tenant == query.tenant
                    && doc.depth == query.depth
                    && (!query.leafs_only || doc.leaf)
                    && re.is_match(&doc.path)
            })
            .cloned()
            .collect();
        let total = hits.len();

        let rest = if hits.len() > self.page_size {
            hits.split_off(self.page_size)
        } else {
            Vec::new()
        };
        let scroll_id = if rest.is_empty() {
            None
        } else {
            let id = self.next_scroll.fetch_add(1, Ordering::Relaxed).to_string();
            self.scrolls.lock().insert(id.clone(), rest);
            Some(id)
        };

        Ok(SearchPage {
            total,
            hits,
            scroll_id,
        })
    }

    fn scroll(&self, scroll_id: &str) -> mica_core::Result<SearchPage> {
        let mut scrolls = self.scrolls.lock();
        let Some(mut hits) = scrolls.remove(scroll_id) else {
            return Ok(SearchPage {
                total: 0,
                hits: Vec::new(),
                scroll_id: None,
            });
        };

        let rest = if hits.len() > self.page_size {
            hits.split_off(self.page_size)
        } else {
            Vec::new()
        };
        let total = hits.len() + rest.len();
        let scroll_id = if rest.is_empty() {
            None
        } else {
            scrolls.insert(scroll_id.to_string(), rest);
            Some(scroll_id.to_string())
        };

        Ok(SearchPage {
            total,
            hits,
            scroll_id,
        })
    }
}

type PointKey = (String, i32, i32, String);

/// Wide-column store fake with the real table's append semantics: writes
/// extend the value list under `(tenant, rollup, period, path, time)`.
pub struct MemoryStore {
    rows: Mutex<BTreeMap<PointKey, BTreeMap<i64, Vec<f64>>>>,
    pub fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn values(
        &self,
        tenant: &str,
        rollup: i32,
        period: i32,
        path: &str,
        time: i64,
    ) -> Option<Vec<f64>> {
        let key = (tenant.to_string(), rollup, period, path.to_string());
        self.rows.lock().get(&key)?.get(&time).cloned()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().values().map(|series| series.len()).sum()
    }
}

impl StoreSession for MemoryStore {
    fn write_batch(&self, samples: &[Sample]) -> mica_core::Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(MicaError::BatchWriteFailed("injected failure".into()));
        }
        let mut rows = self.rows.lock();
        for sample in samples {
            let key = (
                sample.tenant.clone(),
                sample.rollup,
                sample.period,
                sample.path.clone(),
            );
            rows.entry(key)
                .or_default()
                .entry(sample.time)
                .or_default()
                .push(sample.metric);
        }
        Ok(())
    }

    fn fetch_rows(
        &self,
        tenant: &str,
        path: &str,
        rollup: i32,
        period: i32,
        from: i64,
        to: i64,
    ) -> mica_core::Result<Vec<Row>> {
        let key = (tenant.to_string(), rollup, period, path.to_string());
        let rows = self.rows.lock();
        Ok(rows
            .get(&key)
            .map(|series| {
                series
                    .range(from..=to)
                    .map(|(time, values)| Row {
                        time: *time,
                        values: values.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
