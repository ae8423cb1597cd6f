//! The `Translator` facade.
//!
//! Each translator owns its active language, its tables and its load cache.
//! Two translators never share state.

use crate::config::TranslatorConfig;
use crate::i18n::{
    BasicEvaluator, DynamicEvaluator, ExpressionCompiler, ExpressionParser, KeyResolver,
    LanguageNegotiator, LanguageProvider, LanguageStore, LoadState, MetricsReport, Params,
    ProvidedLanguages, TemplateParser, TranslateError, TranslationMetrics,
};
use crate::loader::Loader;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Assembles a [`Translator`] from its configuration and capabilities.
pub struct TranslatorBuilder {
    config: TranslatorConfig,
    loader: Arc<dyn Loader>,
    provider: Option<Arc<dyn LanguageProvider>>,
    parser: Arc<dyn ExpressionParser>,
    evaluator: Arc<dyn DynamicEvaluator>,
}

impl TranslatorBuilder {
    /// Replace the config-backed provider.
    pub fn provider(mut self, provider: impl LanguageProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    pub fn parser(mut self, parser: impl ExpressionParser + 'static) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    /// Replace the dynamic evaluator used for non property-chain expressions.
    pub fn evaluator(mut self, evaluator: impl DynamicEvaluator + 'static) -> Self {
        self.evaluator = Arc::new(evaluator);
        self
    }

    /// Build the translator, running language detection if configured.
    pub fn build(self) -> Translator {
        let provider: Arc<dyn LanguageProvider> = match self.provider {
            Some(provider) => provider,
            None => Arc::new(ProvidedLanguages::new(self.config.provided_langs.clone())),
        };
        let negotiator = LanguageNegotiator::new(provider, self.config.default_lang.clone());

        if self.config.detect_language_on_start {
            if let Some(lang) = negotiator.detect(&self.config.preferred_langs) {
                info!("Language {} got detected", lang);
                negotiator.set_initial(lang);
            }
        }

        let metrics = Arc::new(TranslationMetrics::new());
        let store = Arc::new(LanguageStore::new(self.loader, Arc::clone(&metrics)));
        let resolver = KeyResolver::new(
            Arc::clone(&store),
            self.parser,
            ExpressionCompiler::new(self.evaluator),
            Arc::clone(&metrics),
        );

        Translator {
            negotiator,
            store,
            resolver,
            metrics,
        }
    }
}

/// Resolves keys into translated strings for the active or a given language.
pub struct Translator {
    negotiator: LanguageNegotiator,
    store: Arc<LanguageStore>,
    resolver: KeyResolver,
    metrics: Arc<TranslationMetrics>,
}

impl Translator {
    pub fn builder(config: TranslatorConfig, loader: impl Loader + 'static) -> TranslatorBuilder {
        TranslatorBuilder {
            config,
            loader: Arc::new(loader),
            provider: None,
            parser: Arc::new(TemplateParser),
            evaluator: Arc::new(BasicEvaluator),
        }
    }

    /// The active language.
    pub fn lang(&self) -> String {
        self.negotiator.active()
    }

    /// Switch the active language; subscribers are notified on success.
    ///
    /// # Errors
    /// `LanguageNotProvided` if `code` has no exact provided match. The
    /// active language is left unchanged.
    pub fn set_lang(&self, code: &str) -> Result<(), TranslateError> {
        self.negotiator.set_active(code).map(|_| ())
    }

    /// Best provided language for a preference list (usually the user's
    /// accepted languages), or `None`.
    pub fn detect_lang<S: AsRef<str>>(&self, preferences: &[S]) -> Option<String> {
        self.negotiator.detect(preferences)
    }

    /// Receive every future active-language change.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.negotiator.notifier().subscribe()
    }

    /// Wait until `lang` (default: the active language) is loaded.
    ///
    /// # Errors
    /// * `LanguageNotProvided` if `lang` has no exact provided match
    /// * `LoadFailure` if the loader rejected it, now or on an earlier call
    pub async fn wait_for_translation(&self, lang: Option<&str>) -> Result<(), TranslateError> {
        let requested = lang.map(str::to_string).unwrap_or_else(|| self.lang());
        let resolved = self
            .negotiator
            .resolve(&requested, true)
            .ok_or(TranslateError::LanguageNotProvided(requested))?;

        self.store
            .ensure_loaded(&resolved)
            .await
            .map(|_| ())
            .map_err(|reason| TranslateError::LoadFailure {
                lang: resolved,
                reason,
            })
    }

    /// Translate `keys`, loading the language first if needed.
    ///
    /// Never fails: an unprovided language or a failed load yields the keys
    /// unchanged.
    pub async fn translate<K: AsRef<str>>(
        &self,
        keys: &[K],
        params: &Params,
        lang: Option<&str>,
    ) -> Vec<String> {
        let active = self.lang();
        let lang = match lang {
            Some(requested) if requested != active => {
                match self.negotiator.resolve(requested, true) {
                    Some(provided) => provided,
                    None => return untranslated(keys),
                }
            }
            _ => active,
        };

        match self.store.ensure_loaded(&lang).await {
            Ok(_) => self.resolver.lookup(keys, params, &lang),
            Err(_) => untranslated(keys),
        }
    }

    pub async fn translate_one(&self, key: &str, params: &Params, lang: Option<&str>) -> String {
        self.translate(&[key], params, lang)
            .await
            .into_iter()
            .next()
            .unwrap_or_else(|| key.to_string())
    }

    /// Translate `keys` with whatever is loaded right now.
    ///
    /// A language that is not loaded yet simply misses. An unprovided
    /// `lang` is used as given, so its lookups miss too.
    pub fn instant<K: AsRef<str>>(&self, keys: &[K], params: &Params, lang: Option<&str>) -> Vec<String> {
        let active = self.lang();
        let lang = match lang {
            Some(requested) if requested != active => self
                .negotiator
                .resolve(requested, true)
                .unwrap_or_else(|| requested.to_string()),
            _ => active,
        };

        self.resolver.lookup(keys, params, &lang)
    }

    pub fn instant_one(&self, key: &str, params: &Params, lang: Option<&str>) -> String {
        self.instant(&[key], params, lang)
            .into_iter()
            .next()
            .unwrap_or_else(|| key.to_string())
    }

    /// Load progress of a language.
    pub fn load_state(&self, code: &str) -> LoadState {
        self.store.state(code)
    }

    pub fn metrics(&self) -> MetricsReport {
        self.metrics.report()
    }
}

fn untranslated<K: AsRef<str>>(keys: &[K]) -> Vec<String> {
    keys.iter().map(|k| k.as_ref().to_string()).collect()
}
