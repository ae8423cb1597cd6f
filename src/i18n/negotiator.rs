//! Language negotiation and the active-language state.

use crate::i18n::{LanguageProvider, TranslateError};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::info;

/// Buffered changes per subscriber before a slow receiver starts lagging.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Multicasts active-language transitions to subscribers.
///
/// Delivery happens at the moment of the transition. A receiver created
/// after an emission never sees it.
///
/// Each receiver buffers up to 16 undelivered changes. A receiver that
/// falls further behind drops the oldest ones: its next `recv` returns
/// `RecvError::Lagged(n)` with the number skipped, then continues with
/// the oldest change still buffered.
pub struct ChangeNotifier {
    sender: broadcast::Sender<String>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    /// Emit a change. Having no subscribers is not an error.
    pub fn emit(&self, lang: &str) {
        let _ = self.sender.send(lang.to_string());
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Matches requested codes against the provided languages and owns the
/// active language.
pub struct LanguageNegotiator {
    provider: Arc<dyn LanguageProvider>,
    active: RwLock<String>,
    notifier: ChangeNotifier,
}

impl LanguageNegotiator {
    pub fn new(provider: Arc<dyn LanguageProvider>, initial: impl Into<String>) -> Self {
        Self {
            provider,
            active: RwLock::new(initial.into()),
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn resolve(&self, code: &str, exact: bool) -> Option<String> {
        self.provider.provided(code, exact)
    }

    /// Pick the best provided language for an ordered preference list.
    ///
    /// An exact match anywhere in the list beats a fuzzy match earlier in
    /// the list: the whole list is scanned exactly before any fuzzy pass.
    pub fn detect<S: AsRef<str>>(&self, preferences: &[S]) -> Option<String> {
        preferences
            .iter()
            .find_map(|code| self.resolve(code.as_ref(), true))
            .or_else(|| {
                preferences
                    .iter()
                    .find_map(|code| self.resolve(code.as_ref(), false))
            })
    }

    pub fn active(&self) -> String {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Switch the active language to the exact provided match for `code`.
    ///
    /// # Returns
    /// The provided code now active, or `LanguageNotProvided` with the
    /// active language unchanged.
    pub fn set_active(&self, code: &str) -> Result<String, TranslateError> {
        let provided = self
            .resolve(code, true)
            .ok_or_else(|| TranslateError::LanguageNotProvided(code.to_string()))?;

        *self.active.write().unwrap_or_else(PoisonError::into_inner) = provided.clone();
        info!("Language changed to {}", provided);
        self.notifier.emit(&provided);

        Ok(provided)
    }

    /// Replace the active language without negotiation or notification.
    ///
    /// Used for startup detection, before anyone could have subscribed.
    pub(crate) fn set_initial(&self, code: String) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = code;
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}
