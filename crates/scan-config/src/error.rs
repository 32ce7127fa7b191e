//! Validation errors raised while assembling a scan configuration.

use scangate_common::{Language, MessageKey};
use thiserror::Error;

/// A rejected scan configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{key}{}", .field.as_deref().map(|f| format!(" ({f})")).unwrap_or_default())]
pub struct ValidationError {
    pub key: MessageKey,
    pub field: Option<String>,
}

impl ValidationError {
    pub fn new(key: MessageKey) -> Self {
        Self { key, field: None }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Localized message, suffixed with the offending option if known.
    pub fn message(&self, language: Language) -> String {
        match &self.field {
            Some(field) => format!("{}: {}", self.key.text(language), field),
            None => self.key.text(language).to_string(),
        }
    }
}
