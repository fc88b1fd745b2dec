//! Language and theme preferences.
//!
//! Changes are persisted under `language` / `theme` and published on a
//! broadcast channel. `sync_from_storage` picks up values written by another
//! process sharing the same storage file.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::errors::AppError;
use crate::store::{keys, KeyValueStore};

pub const DEFAULT_LANGUAGE: &str = "en";
pub const SUPPORTED_LANGUAGES: [&str; 3] = ["en", "pt", "es"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(AppError::InvalidInput(format!("unknown theme '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceEvent {
    LanguageChanged(String),
    ThemeChanged(Theme),
}

#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
    default_language: String,
    events: broadcast::Sender<PreferenceEvent>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            store,
            default_language: DEFAULT_LANGUAGE.to_string(),
            events,
        }
    }

    /// Language reported while storage holds no valid choice.
    /// Unsupported values are ignored.
    pub fn with_default_language(mut self, language: &str) -> Self {
        let language = language.trim().to_lowercase();
        if SUPPORTED_LANGUAGES.contains(&language.as_str()) {
            self.default_language = language;
        } else {
            tracing::warn!(%language, "unsupported default language, using {}", DEFAULT_LANGUAGE);
        }
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PreferenceEvent> {
        self.events.subscribe()
    }

    pub fn language(&self) -> String {
        self.store
            .get(keys::LANGUAGE)
            .filter(|l| SUPPORTED_LANGUAGES.contains(&l.as_str()))
            .unwrap_or_else(|| self.default_language.clone())
    }

    pub fn theme(&self) -> Theme {
        self.store
            .get(keys::THEME)
            .and_then(|t| t.parse().ok())
            .unwrap_or(Theme::Light)
    }

    pub fn set_language(&self, language: &str) -> Result<(), AppError> {
        let language = language.trim().to_lowercase();
        if !SUPPORTED_LANGUAGES.contains(&language.as_str()) {
            return Err(AppError::InvalidInput(format!(
                "unsupported language '{}', expected one of {:?}",
                language, SUPPORTED_LANGUAGES
            )));
        }
        self.store.set(keys::LANGUAGE, &language)?;
        self.publish(PreferenceEvent::LanguageChanged(language));
        Ok(())
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), AppError> {
        self.store.set(keys::THEME, theme.as_str())?;
        self.publish(PreferenceEvent::ThemeChanged(theme));
        Ok(())
    }

    /// Reload storage and publish a language change if another writer set one.
    pub fn sync_from_storage(&self) -> Result<bool, AppError> {
        let changed = self.store.reload()?;
        if changed.iter().any(|k| k == keys::LANGUAGE) {
            let language = self.language();
            tracing::debug!(%language, "language changed by another session");
            self.publish(PreferenceEvent::LanguageChanged(language));
            return Ok(true);
        }
        Ok(false)
    }

    fn publish(&self, event: PreferenceEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
