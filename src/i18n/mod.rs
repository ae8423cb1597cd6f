//! Translation engine: lazily loaded tables, language negotiation and
//! key resolution.
//!
//! # Architecture
//!
//! - `provider`: Which language codes are provided, exact and fuzzy matching
//! - `negotiator`: Language detection, the active language and change notifications
//! - `store`: One memoized load per language and the loaded tables
//! - `expression`: Parsing `{{ ... }}` and compiling property chains
//! - `evaluator`: Dynamic fallback evaluation for other expressions
//! - `resolver`: Key lookup with `[[key:vars]]` references and interpolation
//! - `engine`: The `Translator` facade tying everything together
//! - `metrics`: Per-translator counters
//!
//! # Example
//!
//! ```rust,ignore
//! use lingua_engine::i18n::{to_params, Translator};
//!
//! let translator = Translator::builder(config, loader).build();
//! translator.wait_for_translation(None).await?;
//!
//! let text = translator.instant_one("GREETING", &to_params(json!({"name": "Bob"})), None);
//! ```

mod engine;
mod error;
mod evaluator;
mod expression;
mod metrics;
mod negotiator;
mod provider;
mod resolver;
mod store;

pub use engine::{Translator, TranslatorBuilder};
pub use error::{EvalError, LoadError, TranslateError, Unsupported};
pub use evaluator::{BasicEvaluator, DisabledEvaluator, DynamicEvaluator};
pub use expression::{
    format_value, CompiledExpression, ExpressionCompiler, ExpressionParser, Getter,
    ParsedExpression, ParsedInterpolation, Part, TemplateParser,
};
pub use metrics::{MetricsReport, TranslationMetrics};
pub use negotiator::{ChangeNotifier, LanguageNegotiator};
pub use provider::{normalize_code, LanguageProvider, ProvidedLanguages};
pub use resolver::KeyResolver;
pub use store::{LanguageStore, LoadFuture, LoadState, TranslationTable};

/// Caller-supplied interpolation values.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Convert a JSON value into params; anything but an object yields no params.
pub fn to_params(value: serde_json::Value) -> Params {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Params::new(),
    }
}
