//! Error types for language negotiation, loading and expression evaluation.

use thiserror::Error;

/// Errors surfaced to callers of the translator.
///
/// Only `set_lang` and `wait_for_translation` return these; every lookup
/// path degrades to returning the requested keys instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslateError {
    /// The requested code has no exact match among the provided languages.
    #[error("Language not provided: '{0}'")]
    LanguageNotProvided(String),

    /// The loader rejected this language. The failure is cached for the
    /// lifetime of the translator.
    #[error("Language '{lang}' could not be loaded: {reason}")]
    LoadFailure { lang: String, reason: LoadError },
}

/// Reasons a [`Loader`](crate::loader::Loader) can reject a language.
///
/// Cloneable so that one memoized failure can be handed to every awaiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("IO error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("HTTP {status} fetching {url}")]
    Http { url: String, status: u16 },

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Failed to parse translation table: {0}")]
    Parse(String),

    #[error("Translation table must be a JSON object, got {0}")]
    InvalidTable(String),

    #[error("No translations available for '{0}'")]
    NotFound(String),

    /// The load task panicked or was cancelled by a runtime shutdown.
    #[error("Load task did not complete: {0}")]
    Aborted(String),
}

/// Failures of the dynamic expression evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("Type error: {0}")]
    Type(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Dynamic evaluation is disabled")]
    Disabled,
}

/// Signals that an interpolation cannot be compiled into the fast
/// property-chain form. Never leaves the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Expression is not supported: {0}")]
pub struct Unsupported(pub String);
