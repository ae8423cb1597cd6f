//! Provided languages: which codes the application ships translations for.
//!
//! The translator never parses locale syntax itself. It asks a
//! [`LanguageProvider`] whether a requested code maps onto a provided one,
//! either exactly or fuzzily.

use regex::Regex;
use std::sync::OnceLock;

/// Capability answering "which provided language does this code map to?".
pub trait LanguageProvider: Send + Sync {
    /// Match `code` against the provided languages.
    ///
    /// # Arguments
    /// * `code` - The requested language code (e.g., "de-AT", "en_us")
    /// * `exact_only` - When `true`, only an exact (normalized) match counts
    ///
    /// # Returns
    /// The provided code as configured, or `None`.
    fn provided(&self, code: &str, exact_only: bool) -> Option<String>;
}

/// Provider backed by a configured list of language codes.
#[derive(Debug, Clone)]
pub struct ProvidedLanguages {
    /// Codes as configured (returned verbatim on a match)
    langs: Vec<String>,

    /// Normalized form of each configured code, same order as `langs`
    normalized: Vec<String>,
}

static CODE_REGEX: OnceLock<Regex> = OnceLock::new();

fn code_regex() -> &'static Regex {
    CODE_REGEX.get_or_init(|| {
        Regex::new(r"^([A-Za-z]{2})(?:[.\-_/]?([A-Za-z]{2}))?$").expect("Invalid code regex")
    })
}

/// Normalize a language code to `ll` or `ll-CC`.
///
/// Returns an empty string for anything that does not look like a
/// two-letter language with an optional two-letter country.
pub fn normalize_code(code: &str) -> String {
    match code_regex().captures(code) {
        Some(caps) => {
            let language = caps[1].to_lowercase();
            match caps.get(2) {
                Some(country) => format!("{}-{}", language, country.as_str().to_uppercase()),
                None => language,
            }
        }
        None => String::new(),
    }
}

fn language_part(code: &str) -> &str {
    code.get(..2).unwrap_or(code)
}

impl ProvidedLanguages {
    pub fn new<I, S>(langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let langs: Vec<String> = langs.into_iter().map(Into::into).collect();
        let normalized = langs.iter().map(|l| normalize_code(l)).collect();
        Self { langs, normalized }
    }

    /// All provided codes in configuration order.
    pub fn list(&self) -> &[String] {
        &self.langs
    }
}

impl LanguageProvider for ProvidedLanguages {
    fn provided(&self, code: &str, exact_only: bool) -> Option<String> {
        let wanted = normalize_code(code);
        if wanted.is_empty() {
            return None;
        }

        if let Some(p) = self.normalized.iter().position(|n| *n == wanted) {
            return Some(self.langs[p].clone());
        }

        if exact_only {
            return None;
        }

        let wanted = language_part(&wanted);
        self.normalized
            .iter()
            .position(|n| n == wanted)
            .or_else(|| {
                self.normalized
                    .iter()
                    .position(|n| !n.is_empty() && language_part(n) == wanted)
            })
            .map(|p| self.langs[p].clone())
    }
}
