//! Language registry: single source of truth for the site's languages.
//!
//! The registry is a lazily built singleton (`OnceLock`). Exactly one entry is
//! canonical; canonical posts are written in it and every other enabled
//! language is a translation target.

use std::sync::OnceLock;

/// Configuration for a site language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Language code used in URLs and on post rows (e.g. "en", "de", "pt-br")
    pub code: &'static str,

    /// English name of the language
    pub name: &'static str,

    /// Native name of the language
    pub native_name: &'static str,

    /// Whether this is the default language (only one should be true)
    pub is_canonical: bool,

    /// Whether content may be published in this language
    pub enabled: bool,
}

/// Global language registry singleton.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language configuration by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// Get all enabled languages, canonical first.
    pub fn list_enabled(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().filter(|lang| lang.enabled).collect()
    }

    /// Get all languages (including disabled ones).
    pub fn list_all(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().collect()
    }

    /// Get the canonical language configuration.
    ///
    /// # Panics
    /// Panics if the registry does not contain exactly one canonical language.
    /// The table is static, so this can only fire after a bad edit to
    /// `default_languages`.
    pub fn canonical(&self) -> &LanguageConfig {
        let canonical_langs: Vec<_> = self
            .languages
            .iter()
            .filter(|lang| lang.is_canonical)
            .collect();

        match canonical_langs.len() {
            0 => panic!("No canonical language found in registry"),
            1 => canonical_langs[0],
            _ => panic!("Multiple canonical languages found in registry"),
        }
    }

    /// Check if a language code is supported and enabled.
    pub fn is_enabled(&self, code: &str) -> bool {
        self.get_by_code(code)
            .map(|lang| lang.enabled)
            .unwrap_or(false)
    }
}

const fn lang(
    code: &'static str,
    name: &'static str,
    native_name: &'static str,
    enabled: bool,
) -> LanguageConfig {
    LanguageConfig {
        code,
        name,
        native_name,
        is_canonical: false,
        enabled,
    }
}

/// Languages the outreach site publishes in.
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "en",
            name: "English",
            native_name: "English",
            is_canonical: true,
            enabled: true,
        },
        lang("de", "German", "Deutsch", true),
        lang("es", "Spanish", "Español", true),
        lang("fr", "French", "Français", true),
        lang("it", "Italian", "Italiano", true),
        lang("pt", "Portuguese", "Português", true),
        lang("pt-br", "Brazilian Portuguese", "Português do Brasil", true),
        lang("nl", "Dutch", "Nederlands", true),
        lang("da", "Danish", "Dansk", true),
        lang("sv", "Swedish", "Svenska", true),
        lang("fi", "Finnish", "Suomi", true),
        lang("cs", "Czech", "Čeština", true),
        lang("pl", "Polish", "Polski", true),
        lang("is", "Icelandic", "Íslenska", false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LanguageRegistry::get();
        let registry2 = LanguageRegistry::get();

        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_get_by_code_english() {
        let config = LanguageRegistry::get()
            .get_by_code("en")
            .expect("English should be registered");

        assert_eq!(config.name, "English");
        assert!(config.is_canonical);
        assert!(config.enabled);
    }

    #[test]
    fn test_get_by_code_regional_variant() {
        let config = LanguageRegistry::get()
            .get_by_code("pt-br")
            .expect("Brazilian Portuguese should be registered");

        assert!(!config.is_canonical);
        assert_eq!(config.native_name, "Português do Brasil");
    }

    #[test]
    fn test_get_by_code_nonexistent() {
        assert!(LanguageRegistry::get().get_by_code("xx").is_none());
    }

    #[test]
    fn test_list_enabled_skips_disabled() {
        let enabled = LanguageRegistry::get().list_enabled();

        assert!(enabled.iter().any(|lang| lang.code == "de"));
        assert!(!enabled.iter().any(|lang| lang.code == "is"));
        assert_eq!(enabled.len() + 1, LanguageRegistry::get().list_all().len());
    }

    #[test]
    fn test_exactly_one_canonical() {
        let canonical: Vec<_> = LanguageRegistry::get()
            .list_all()
            .into_iter()
            .filter(|lang| lang.is_canonical)
            .collect();

        assert_eq!(canonical.len(), 1);
        assert_eq!(LanguageRegistry::get().canonical().code, "en");
    }

    #[test]
    fn test_is_enabled() {
        let registry = LanguageRegistry::get();
        assert!(registry.is_enabled("fr"));
        assert!(!registry.is_enabled("is"));
        assert!(!registry.is_enabled("xx"));
    }
}
