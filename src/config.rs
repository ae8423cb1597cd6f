use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct TranslatorConfig {
    /// Active language until something else is set or detected
    pub default_lang: String,

    /// Codes translations exist for, in preference order
    pub provided_langs: Vec<String>,

    /// Run detection over `preferred_langs` when the translator is built
    pub detect_language_on_start: bool,

    /// The user's preferred languages, most preferred first
    pub preferred_langs: Vec<String>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            default_lang: "en".to_string(),
            provided_langs: vec!["en".to_string()],
            detect_language_on_start: false,
            preferred_langs: Vec::new(),
        }
    }
}

impl TranslatorConfig {
    pub fn new<I, S>(default_lang: impl Into<String>, provided_langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            default_lang: default_lang.into(),
            provided_langs: provided_langs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_detection<I, S>(mut self, preferred_langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.detect_language_on_start = true;
        self.preferred_langs = preferred_langs.into_iter().map(Into::into).collect();
        self
    }

    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let default_lang =
            std::env::var("LINGUA_DEFAULT_LANG").unwrap_or(defaults.default_lang);

        let provided_langs = match std::env::var("LINGUA_PROVIDED_LANGS") {
            Ok(value) => split_list(&value),
            Err(_) => vec![default_lang.clone()],
        };

        let detect_language_on_start = match std::env::var("LINGUA_DETECT_ON_START") {
            Ok(value) => parse_flag(&value)
                .with_context(|| format!("LINGUA_DETECT_ON_START is not a flag: '{}'", value))?,
            Err(_) => defaults.detect_language_on_start,
        };

        // Fall back to the POSIX locale, e.g. LANG=de_AT.UTF-8 -> "de_AT"
        let preferred_langs = std::env::var("LINGUA_PREFERRED_LANGS")
            .map(|value| split_list(&value))
            .or_else(|_| {
                std::env::var("LANG").map(|lang| {
                    lang.split('.')
                        .next()
                        .filter(|l| !l.is_empty() && *l != "C" && *l != "POSIX")
                        .map(|l| vec![l.to_string()])
                        .unwrap_or_default()
                })
            })
            .unwrap_or_default();

        Ok(Self {
            default_lang,
            provided_langs,
            detect_language_on_start,
            preferred_langs,
        })
    }
}

/// Where a [`Loader`](crate::loader::Loader) finds a language's table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Directory or URL prefix, always ending in '/'
    pub path: String,

    /// Suffix appended after the language code
    pub extension: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::new("i18n", ".json")
    }
}

impl LoaderConfig {
    pub fn new(path: impl Into<String>, extension: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.ends_with('/') {
            path.push('/');
        }
        Self {
            path,
            extension: extension.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self::new(
            std::env::var("LINGUA_I18N_PATH").unwrap_or(defaults.path),
            std::env::var("LINGUA_I18N_EXTENSION").unwrap_or(defaults.extension),
        ))
    }

    /// Location of the table for `code`.
    pub fn location(&self, code: &str) -> String {
        format!("{}{}{}", self.path, code, self.extension)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
