use crate::i18n::Language;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A text value with optional per-language overrides.
///
/// Used for the translatable fields of categories and authors. Reads fall
/// back to the default-language value when a language has no (or an empty)
/// override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Localized {
    #[serde(default)]
    pub default: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub translations: BTreeMap<Language, String>,
}

impl Localized {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            translations: BTreeMap::new(),
        }
    }

    pub fn with(mut self, lang: Language, value: impl Into<String>) -> Self {
        self.set(lang, value);
        self
    }

    /// Set the value for `lang`; the canonical language writes the default.
    pub fn set(&mut self, lang: Language, value: impl Into<String>) {
        if lang.is_canonical() {
            self.default = value.into();
        } else {
            self.translations.insert(lang, value.into());
        }
    }

    /// Value for `lang`, or `None` when it has no override of its own.
    pub fn get_exact(&self, lang: Language) -> Option<&str> {
        if lang.is_canonical() {
            return Some(self.default.as_str());
        }
        self.translations
            .get(&lang)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Value for `lang`, falling back to the default-language value.
    pub fn get(&self, lang: Language) -> &str {
        self.get_exact(lang).unwrap_or(&self.default)
    }
}

impl From<&str> for Localized {
    fn from(value: &str) -> Self {
        Localized::new(value)
    }
}
