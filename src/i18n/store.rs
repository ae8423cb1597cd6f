//! Language store: loaded translation tables and their memoized loads.
//!
//! Each language gets exactly one load future for the lifetime of the store.
//! The future is registered before the fetch runs, so concurrent callers all
//! await the same fetch. The fetch runs as its own task and completes even
//! if every awaiter is dropped. A failed load stays cached and is never
//! retried.

use crate::i18n::{LoadError, TranslationMetrics};
use crate::loader::Loader;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, error, info};

/// Flat key → template mapping for one language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationTable {
    entries: HashMap<String, String>,
}

impl TranslationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.entries.insert(key.into(), template.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<HashMap<String, String>> for TranslationTable {
    fn from(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TranslationTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Load progress of one language, derived from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

/// Memoized result of fetching one language.
pub type LoadFuture = Shared<BoxFuture<'static, Result<Arc<TranslationTable>, LoadError>>>;

type TableMap = Arc<RwLock<HashMap<String, Arc<TranslationTable>>>>;
type FailedSet = Arc<RwLock<HashSet<String>>>;

/// Owns every loaded table and every load future, keyed by language code.
pub struct LanguageStore {
    loader: Arc<dyn Loader>,
    tables: TableMap,
    failed: FailedSet,
    loads: Mutex<HashMap<String, LoadFuture>>,
    metrics: Arc<TranslationMetrics>,
}

impl LanguageStore {
    pub fn new(loader: Arc<dyn Loader>, metrics: Arc<TranslationMetrics>) -> Self {
        Self {
            loader,
            tables: Arc::new(RwLock::new(HashMap::new())),
            failed: Arc::new(RwLock::new(HashSet::new())),
            loads: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    /// Get the load future for `code`, starting the fetch on first demand.
    ///
    /// Later calls return the same future, whether it is still pending,
    /// resolved, or rejected. The fetch is spawned onto the current Tokio
    /// runtime, so this must be called from within one.
    pub fn ensure_loaded(&self, code: &str) -> LoadFuture {
        let mut loads = self.loads.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = loads.get(code) {
            debug!("Reusing load of language {}", code);
            return existing.clone();
        }

        self.metrics.record_load_started();
        let fetch = self.loader.load(code);
        let tables = Arc::clone(&self.tables);
        let failed = Arc::clone(&self.failed);
        let metrics = Arc::clone(&self.metrics);
        let lang = code.to_string();

        let task = tokio::spawn(async move {
            match fetch.await {
                Ok(table) => {
                    let table = Arc::new(table);
                    tables
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(lang.clone(), Arc::clone(&table));
                    info!("Language {} got loaded ({} keys)", lang, table.len());
                    Ok(table)
                }
                Err(reason) => {
                    mark_failed(&failed, &metrics, &lang, &reason);
                    Err(reason)
                }
            }
        });

        let failed = Arc::clone(&self.failed);
        let metrics = Arc::clone(&self.metrics);
        let lang = code.to_string();
        let future = async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => {
                    let reason = LoadError::Aborted(join_error.to_string());
                    mark_failed(&failed, &metrics, &lang, &reason);
                    Err(reason)
                }
            }
        }
        .boxed()
        .shared();

        loads.insert(code.to_string(), future.clone());
        future
    }

    /// Non-suspending read of the table for `code`, if it finished loading.
    pub fn get(&self, code: &str) -> Option<Arc<TranslationTable>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(code)
            .cloned()
    }

    pub fn state(&self, code: &str) -> LoadState {
        let requested = self
            .loads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(code);
        if !requested {
            return LoadState::Unloaded;
        }

        if self
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(code)
        {
            LoadState::Loaded
        } else if self
            .failed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(code)
        {
            LoadState::Failed
        } else {
            LoadState::Loading
        }
    }
}

fn mark_failed(failed: &FailedSet, metrics: &TranslationMetrics, lang: &str, reason: &LoadError) {
    failed
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(lang.to_string());
    metrics.record_load_failure();
    error!("Language {} could not be loaded ({})", lang, reason);
}
