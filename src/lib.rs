//! Lazy-loading translation engine.
//!
//! Translation tables are fetched once per language through a [`Loader`],
//! and keys resolve with `[[key:vars]]` references and `{{ expr }}`
//! interpolation. See [`i18n::Translator`] for the entry point.
//!
//! [`Loader`]: loader::Loader

pub mod config;
pub mod i18n;
pub mod loader;
pub mod retry;
