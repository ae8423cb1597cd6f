//! Loaders: where a language's translation table comes from.
//!
//! The store treats a loader as an opaque capability. The JSON loaders share
//! one normalizer: strings are kept, arrays of strings are concatenated, and
//! every other value is dropped.

use crate::config::LoaderConfig;
use crate::i18n::{LoadError, TranslationTable};
use crate::retry::{with_retry_if, RetryConfig};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Fetches one language's key/value table.
pub trait Loader: Send + Sync {
    fn load(&self, code: &str) -> BoxFuture<'static, Result<TranslationTable, LoadError>>;
}

/// Turn a JSON document into a translation table.
///
/// # Returns
/// * `Ok(TranslationTable)` for a top-level object
/// * `Err(LoadError::Parse)` for malformed JSON
/// * `Err(LoadError::InvalidTable)` for any other top-level value
pub fn parse_translation_json(body: &str) -> Result<TranslationTable, LoadError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| LoadError::Parse(e.to_string()))?;
    table_from_value(value)
}

pub fn table_from_value(value: Value) -> Result<TranslationTable, LoadError> {
    let object = match value {
        Value::Object(object) => object,
        other => return Err(LoadError::InvalidTable(value_kind(&other).to_string())),
    };

    let mut table = TranslationTable::new();
    for (key, value) in object {
        match value {
            Value::String(text) => table.insert(key, text),
            Value::Array(items) => {
                let text: String = items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect();
                table.insert(key, text);
            }
            _ => debug!("Dropping non-string translation value for '{}'", key),
        }
    }

    Ok(table)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reads `{path}{code}{extension}` from the filesystem.
#[derive(Debug, Clone)]
pub struct JsonFileLoader {
    config: LoaderConfig,
}

impl JsonFileLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }
}

impl Loader for JsonFileLoader {
    fn load(&self, code: &str) -> BoxFuture<'static, Result<TranslationTable, LoadError>> {
        let path = self.config.location(code);
        async move {
            debug!("Reading translations from {}", path);
            let body = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| LoadError::Io {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            parse_translation_json(&body)
        }
        .boxed()
    }
}

/// Fetches `GET {path}{code}{extension}` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpJsonLoader {
    client: reqwest::Client,
    config: LoaderConfig,
}

impl HttpJsonLoader {
    pub fn new(client: reqwest::Client, config: LoaderConfig) -> Self {
        Self { client, config }
    }
}

impl Loader for HttpJsonLoader {
    fn load(&self, code: &str) -> BoxFuture<'static, Result<TranslationTable, LoadError>> {
        let client = self.client.clone();
        let url = self.config.location(code);
        async move {
            debug!("Fetching translations from {}", url);
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| LoadError::Request {
                    url: url.clone(),
                    message: e.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(LoadError::Http {
                    url,
                    status: status.as_u16(),
                });
            }

            let body = response.text().await.map_err(|e| LoadError::Request {
                url: url.clone(),
                message: e.to_string(),
            })?;
            parse_translation_json(&body)
        }
        .boxed()
    }
}

/// Serves tables held in memory (bundled assets, tests).
#[derive(Debug, Clone, Default)]
pub struct StaticLoader {
    tables: HashMap<String, TranslationTable>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, code: impl Into<String>, table: TranslationTable) -> Self {
        self.tables.insert(code.into(), table);
        self
    }
}

impl Loader for StaticLoader {
    fn load(&self, code: &str) -> BoxFuture<'static, Result<TranslationTable, LoadError>> {
        let result = self
            .tables
            .get(code)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(code.to_string()));
        futures::future::ready(result).boxed()
    }
}

/// Wraps a loader with exponential backoff.
///
/// Retries happen inside a single load, so the store still sees exactly one
/// outcome per language and caches a final failure as usual.
pub struct RetryingLoader<L> {
    inner: Arc<L>,
    config: RetryConfig,
}

impl<L: Loader + 'static> RetryingLoader<L> {
    pub fn new(inner: L, config: RetryConfig) -> Self {
        Self {
            inner: Arc::new(inner),
            config,
        }
    }
}

impl<L: Loader + 'static> Loader for RetryingLoader<L> {
    fn load(&self, code: &str) -> BoxFuture<'static, Result<TranslationTable, LoadError>> {
        let inner = Arc::clone(&self.inner);
        let config = self.config.clone();
        let code = code.to_string();
        async move {
            let operation_name = format!("Loading language {}", code);
            with_retry_if(
                &config,
                &operation_name,
                || inner.load(&code),
                is_retryable_error,
            )
            .await
        }
        .boxed()
    }
}

/// Transport failures and 5xx/429 responses are worth retrying; missing or
/// malformed tables are not.
pub fn is_retryable_error(error: &LoadError) -> bool {
    match error {
        LoadError::Http { status, .. } => *status >= 500 || *status == 429,
        LoadError::Request { .. } | LoadError::Io { .. } => true,
        LoadError::Parse(_)
        | LoadError::InvalidTable(_)
        | LoadError::NotFound(_)
        | LoadError::Aborted(_) => false,
    }
}
