//! Key resolution: table lookup, `[[key:vars]]` references and `{{ expr }}`
//! interpolation.

use crate::i18n::{ExpressionCompiler, ExpressionParser, LanguageStore, Params, TranslationMetrics};
use regex::{Captures, Regex};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info};

static REFERENCE_REGEX: OnceLock<Regex> = OnceLock::new();
static INTERPOLATION_REGEX: OnceLock<Regex> = OnceLock::new();

fn reference_regex() -> &'static Regex {
    REFERENCE_REGEX.get_or_init(|| {
        Regex::new(r"\[\[\s*([A-Za-z0-9_.\-]+)\s*:?\s*([A-Za-z0-9,_]+)?\s*\]\]")
            .expect("Invalid reference regex")
    })
}

fn interpolation_regex() -> &'static Regex {
    INTERPOLATION_REGEX
        .get_or_init(|| Regex::new(r"\{\{\s*(.*?)\s*\}\}").expect("Invalid interpolation regex"))
}

/// Keep only the params explicitly listed in `vars` that the caller set.
fn select_params(params: &Params, vars: &str) -> Params {
    vars.split(',')
        .filter_map(|name| params.get(name).map(|value| (name.to_string(), value.clone())))
        .collect()
}

/// Resolves keys against the loaded tables of a [`LanguageStore`].
///
/// Never suspends and never fails: a missing table or key yields the key
/// itself, a failing expression yields an empty string.
///
/// References are followed without cycle detection. A table whose keys
/// reference each other in a loop recurses until the stack overflows.
pub struct KeyResolver {
    store: Arc<LanguageStore>,
    parser: Arc<dyn ExpressionParser>,
    compiler: ExpressionCompiler,
    metrics: Arc<TranslationMetrics>,
}

impl KeyResolver {
    pub fn new(
        store: Arc<LanguageStore>,
        parser: Arc<dyn ExpressionParser>,
        compiler: ExpressionCompiler,
        metrics: Arc<TranslationMetrics>,
    ) -> Self {
        Self {
            store,
            parser,
            compiler,
            metrics,
        }
    }

    /// Translate every key in `keys`; output order and length match input.
    pub fn lookup<K: AsRef<str>>(&self, keys: &[K], params: &Params, lang: &str) -> Vec<String> {
        keys.iter()
            .map(|key| self.resolve(key.as_ref(), params, lang, true))
            .collect()
    }

    /// Translate a single key through the batch path.
    pub fn lookup_one(&self, key: &str, params: &Params, lang: &str) -> String {
        self.lookup(&[key], params, lang)
            .into_iter()
            .next()
            .unwrap_or_else(|| key.to_string())
    }

    /// Resolve one key. Only caller-requested keys (`counted`) feed the hit
    /// and miss counters; references are not counted.
    fn resolve(&self, key: &str, params: &Params, lang: &str, counted: bool) -> String {
        let template = self
            .store
            .get(lang)
            .and_then(|table| table.get(key).filter(|t| !t.is_empty()).map(str::to_string));

        let Some(template) = template else {
            info!("Translation for '{}' in language {} not found", key, lang);
            if counted {
                self.metrics.record_lookup_miss();
            }
            return key.to_string();
        };
        if counted {
            self.metrics.record_lookup_hit();
        }

        let text = reference_regex().replace_all(&template, |caps: &Captures| {
            let sub_params = caps
                .get(2)
                .map(|vars| select_params(params, vars.as_str()))
                .unwrap_or_default();
            self.resolve(&caps[1], &sub_params, lang, false)
        });

        interpolation_regex()
            .replace_all(&text, |caps: &Captures| {
                self.interpolate(&caps[0], &caps[1], params)
            })
            .into_owned()
    }

    /// Render one `{{ ... }}` occurrence against `params`.
    fn interpolate(&self, raw: &str, expression: &str, params: &Params) -> String {
        let compiled = self
            .parser
            .parse_interpolation(raw)
            .map(|ast| self.compiler.compile(&ast));

        let result = match compiled {
            Some(Ok(compiled)) => Ok(compiled.interpolate(params)),
            Some(Err(unsupported)) => {
                debug!("{}, using dynamic evaluation", unsupported);
                self.compiler.evaluate_generic(expression, params)
            }
            None => self.compiler.evaluate_generic(expression, params),
        };

        result.unwrap_or_else(|e| {
            error!("Parsing error for expression '{}': {}", expression, e);
            self.metrics.record_eval_failure();
            String::new()
        })
    }
}
