//! Integration tests for the translation engine
//!
//! These tests drive a `Translator` end to end through its public API:
//! loading, negotiation, change notifications, references and
//! interpolation.

use futures::future::{BoxFuture, FutureExt};
use proptest::prelude::*;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use lingua_engine::config::{LoaderConfig, TranslatorConfig};
use lingua_engine::i18n::{
    to_params, DisabledEvaluator, LanguageProvider, LoadError, LoadState, Params, TranslateError,
    TranslationTable, Translator,
};
use lingua_engine::loader::{HttpJsonLoader, JsonFileLoader, Loader, StaticLoader};

// ==================== Test Helpers ====================

/// Loader that counts invocations, yields once before answering, and
/// rejects codes it has no table for.
#[derive(Clone)]
struct CountingLoader {
    calls: Arc<AtomicU32>,
    tables: Arc<StaticLoader>,
}

impl CountingLoader {
    fn new(tables: StaticLoader) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            tables: Arc::new(tables),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Loader for CountingLoader {
    fn load(&self, code: &str) -> BoxFuture<'static, Result<TranslationTable, LoadError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fetch = self.tables.load(code);
        async move {
            tokio::task::yield_now().await;
            fetch.await
        }
        .boxed()
    }
}

/// Loader that sleeps before answering with the english table.
struct SlowLoader {
    delay: Duration,
}

impl Loader for SlowLoader {
    fn load(&self, _code: &str) -> BoxFuture<'static, Result<TranslationTable, LoadError>> {
        let delay = self.delay;
        async move {
            tokio::time::sleep(delay).await;
            Ok(english())
        }
        .boxed()
    }
}

fn english() -> TranslationTable {
    TranslationTable::from_iter([
        ("A", "[[B]]"),
        ("B", "World"),
        ("GREETING", "Hello {{name}}"),
        ("OUTER", "[[SUB:x]]"),
        ("SUB", "{{x}}{{y}}"),
        ("TOTAL", "{{ price * qty }}"),
        ("BROKEN", "before{{ price * }}after"),
    ])
}

fn tables() -> StaticLoader {
    StaticLoader::new()
        .with_table("en", english())
        .with_table("de", TranslationTable::from_iter([("B", "Welt")]))
}

fn config() -> TranslatorConfig {
    TranslatorConfig::new("en", ["en", "de", "xx"])
}

async fn loaded_translator() -> Translator {
    let translator = Translator::builder(config(), tables()).build();
    translator
        .wait_for_translation(None)
        .await
        .expect("english loads");
    translator
}

// ==================== Lookup Tests ====================

#[tokio::test]
async fn test_unloaded_language_returns_keys() {
    let translator = Translator::builder(config(), tables()).build();
    let out = translator.instant(&["A", "GREETING", "missing"], &Params::new(), None);
    assert_eq!(out, vec!["A", "GREETING", "missing"]);
}

#[tokio::test]
async fn test_reference_resolves_to_other_key() {
    let translator = loaded_translator().await;
    assert_eq!(translator.instant_one("A", &Params::new(), None), "World");
}

#[tokio::test]
async fn test_greeting_interpolation() {
    let translator = loaded_translator().await;
    let params = to_params(json!({"name": "Bob"}));
    assert_eq!(translator.instant_one("GREETING", &params, None), "Hello Bob");
}

#[tokio::test]
async fn test_reference_receives_only_listed_vars() {
    let translator = loaded_translator().await;

    let first = translator.instant_one("OUTER", &to_params(json!({"x": 1, "y": 2})), None);
    let second = translator.instant_one("OUTER", &to_params(json!({"x": 1, "y": 3})), None);

    assert_eq!(first, "1");
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unsupported_expression_uses_dynamic_evaluation() {
    let translator = loaded_translator().await;
    let params = to_params(json!({"price": 2.5, "qty": 2}));
    assert_eq!(translator.instant_one("TOTAL", &params, None), "5");
}

#[tokio::test]
async fn test_evaluation_error_substitutes_empty_string() {
    let translator = loaded_translator().await;
    let params = to_params(json!({"price": 1}));
    assert_eq!(translator.instant_one("BROKEN", &params, None), "beforeafter");
    assert_eq!(translator.metrics().eval_failures, 1);
}

#[tokio::test]
async fn test_disabled_evaluator_blanks_dynamic_expressions() {
    let translator = Translator::builder(config(), tables())
        .evaluator(DisabledEvaluator)
        .build();
    translator.wait_for_translation(None).await.unwrap();

    let params = to_params(json!({"price": 2, "qty": 2, "name": "Bob"}));
    assert_eq!(translator.instant_one("TOTAL", &params, None), "");
    assert_eq!(translator.instant_one("GREETING", &params, None), "Hello Bob");
}

#[tokio::test]
async fn test_single_and_batch_lookup_agree() {
    let translator = loaded_translator().await;
    let params = to_params(json!({"name": "Ann"}));

    let batch = translator.instant(&["GREETING", "nope", "A"], &params, None);
    let single: Vec<String> = ["GREETING", "nope", "A"]
        .iter()
        .map(|key| translator.instant_one(key, &params, None))
        .collect();

    assert_eq!(batch, single);
}

// ==================== Loading Tests ====================

#[tokio::test]
async fn test_concurrent_waits_invoke_loader_once() {
    let loader = CountingLoader::new(tables());
    let translator = Translator::builder(config(), loader.clone()).build();

    let (a, b) = tokio::join!(
        translator.wait_for_translation(Some("en")),
        translator.wait_for_translation(Some("en"))
    );

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn test_load_finishes_after_timed_out_wait() {
    let loader = SlowLoader {
        delay: Duration::from_millis(50),
    };
    let translator = Translator::builder(config(), loader).build();

    let waited = tokio::time::timeout(
        Duration::from_millis(5),
        translator.wait_for_translation(None),
    )
    .await;
    assert!(waited.is_err());

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(translator.load_state("en"), LoadState::Loaded);
    assert_eq!(translator.instant_one("A", &Params::new(), None), "World");
}

#[tokio::test]
async fn test_failed_load_is_cached_without_retry() {
    let loader = CountingLoader::new(tables());
    let translator = Translator::builder(config(), loader.clone()).build();

    let first = translator.wait_for_translation(Some("xx")).await;
    let second = translator.wait_for_translation(Some("xx")).await;

    let expected = TranslateError::LoadFailure {
        lang: "xx".to_string(),
        reason: LoadError::NotFound("xx".to_string()),
    };
    assert_eq!(first, Err(expected.clone()));
    assert_eq!(second, Err(expected));
    assert_eq!(loader.calls(), 1);
    assert_eq!(translator.load_state("xx"), LoadState::Failed);
}

#[tokio::test]
async fn test_wait_for_unprovided_language_fails_without_loading() {
    let loader = CountingLoader::new(tables());
    let translator = Translator::builder(config(), loader.clone()).build();

    let result = translator.wait_for_translation(Some("fr")).await;

    assert_eq!(
        result,
        Err(TranslateError::LanguageNotProvided("fr".to_string()))
    );
    assert_eq!(loader.calls(), 0);
}

#[tokio::test]
async fn test_translate_swallows_load_failure() {
    let translator = Translator::builder(config(), tables()).build();
    let out = translator
        .translate(&["A", "B"], &Params::new(), Some("xx"))
        .await;
    assert_eq!(out, vec!["A", "B"]);
}

#[tokio::test]
async fn test_translate_unprovided_language_returns_keys() {
    let loader = CountingLoader::new(tables());
    let translator = Translator::builder(config(), loader.clone()).build();

    let out = translator.translate(&["B"], &Params::new(), Some("fr")).await;

    assert_eq!(out, vec!["B"]);
    assert_eq!(loader.calls(), 0);
}

#[tokio::test]
async fn test_translate_loads_on_demand() {
    let translator = Translator::builder(config(), tables()).build();
    assert_eq!(translator.load_state("de"), LoadState::Unloaded);

    let out = translator.translate(&["B"], &Params::new(), Some("de")).await;

    assert_eq!(out, vec!["Welt"]);
    assert_eq!(translator.load_state("de"), LoadState::Loaded);
}

#[tokio::test]
async fn test_instant_with_unprovided_language_misses() {
    let translator = loaded_translator().await;
    let out = translator.instant(&["B"], &Params::new(), Some("fr"));
    assert_eq!(out, vec!["B"]);
}

// ==================== Language State Tests ====================

#[tokio::test]
async fn test_language_change_notifies_subscribers() {
    let translator = loaded_translator().await;
    let mut changes = translator.subscribe();

    translator.set_lang("de").unwrap();
    translator.wait_for_translation(None).await.unwrap();

    assert_eq!(changes.recv().await.unwrap(), "de");
    assert_eq!(translator.instant_one("B", &Params::new(), None), "Welt");
}

#[test]
fn test_set_unprovided_language_fails() {
    let translator = Translator::builder(config(), tables()).build();
    let mut changes = translator.subscribe();

    assert_eq!(
        translator.set_lang("fr"),
        Err(TranslateError::LanguageNotProvided("fr".to_string()))
    );
    assert_eq!(translator.lang(), "en");
    assert!(changes.try_recv().is_err());
}

#[test]
fn test_detect_prefers_exact_match_anywhere() {
    struct Provider;

    impl LanguageProvider for Provider {
        fn provided(&self, code: &str, exact_only: bool) -> Option<String> {
            match (code, exact_only) {
                ("de", _) => Some("de".to_string()),
                ("en-GB", false) => Some("en".to_string()),
                _ => None,
            }
        }
    }

    let translator = Translator::builder(config(), tables())
        .provider(Provider)
        .build();

    assert_eq!(
        translator.detect_lang(&["fr", "en-GB", "de"]),
        Some("de".to_string())
    );
}

#[test]
fn test_independent_translators_do_not_share_state() {
    let first = Translator::builder(config(), tables()).build();
    let second = Translator::builder(config(), tables()).build();

    first.set_lang("de").unwrap();
    tokio_test::block_on(first.wait_for_translation(None)).unwrap();

    assert_eq!(second.lang(), "en");
    assert_eq!(second.load_state("de"), LoadState::Unloaded);
}

// ==================== Loader Integration Tests ====================

#[tokio::test]
async fn test_translator_over_json_files() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("en.json"),
        r#"{"WELCOME": ["Welcome, ", "{{user.name}}!"], "COUNT": 3}"#,
    )
    .unwrap();

    let loader = JsonFileLoader::new(LoaderConfig::new(dir.path().to_str().unwrap(), ".json"));
    let translator = Translator::builder(TranslatorConfig::new("en", ["en"]), loader).build();
    translator.wait_for_translation(None).await.unwrap();

    let params = to_params(json!({"user": {"name": "Eve"}}));
    let out = translator.instant(&["WELCOME", "COUNT"], &params, None);
    assert_eq!(out, vec!["Welcome, Eve!", "COUNT"]);
}

#[tokio::test]
async fn test_translator_over_http_surfaces_load_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/i18n/en.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"HELLO": "Hello"}"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/i18n/de.json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let loader = HttpJsonLoader::new(
        reqwest::Client::new(),
        LoaderConfig::new(format!("{}/i18n", server.uri()), ".json"),
    );
    let translator = Translator::builder(TranslatorConfig::new("en", ["en", "de"]), loader).build();

    let hello = translator.translate_one("HELLO", &Params::new(), None).await;
    assert_eq!(hello, "Hello");

    let failure = translator.wait_for_translation(Some("de")).await;
    assert!(matches!(
        failure,
        Err(TranslateError::LoadFailure {
            reason: LoadError::Http { status: 500, .. },
            ..
        })
    ));

    // Cached: no second request reaches the server
    let again = translator.translate_one("HELLO", &Params::new(), Some("de")).await;
    assert_eq!(again, "HELLO");
}

// ==================== Property Tests ====================

proptest! {
    #[test]
    fn prop_lookup_preserves_length_and_order(keys in prop::collection::vec("[A-Z]{1,3}", 0..20)) {
        let translator = tokio_test::block_on(loaded_translator());
        let out = translator.instant(&keys, &Params::new(), None);

        prop_assert_eq!(out.len(), keys.len());
        for (key, text) in keys.iter().zip(&out) {
            prop_assert_eq!(text, &translator.instant_one(key, &Params::new(), None));
        }
    }

    #[test]
    fn prop_unloaded_language_echoes_keys(keys in prop::collection::vec("[a-z._]{1,12}", 0..20)) {
        let translator = Translator::builder(config(), tables()).build();
        let out = translator.instant(&keys, &Params::new(), None);
        prop_assert_eq!(out, keys);
    }
}
