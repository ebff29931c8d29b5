use super::{check_max_len, check_slug, Localized};
use crate::error::{ValidationError, ValidationErrors};
use crate::i18n::Language;
use serde::{Deserialize, Serialize};

/// A post category. Name, slug and footer are translatable; the slug is
/// required in the default language because category pages are addressed
/// by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: Localized,
    pub slug: Localized,
    /// Optional footer added to the bottom of posts
    pub footer: Localized,
}

impl Category {
    /// Query page listing this category's posts.
    pub fn url(&self, lang: Language) -> String {
        crate::urls::category_path(self.slug.get(lang), lang)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryInput {
    #[serde(default)]
    pub name: Localized,
    #[serde(default)]
    pub slug: Localized,
    #[serde(default)]
    pub footer: Localized,
}

impl CategoryInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.name.default.trim().is_empty() {
            errors.push(ValidationError::field("name", super::REQUIRED));
        }
        check_max_len(&mut errors, "name", &self.name.default, 100);
        check_slug(&mut errors, "slug", &self.slug.default);
        for (lang, slug) in &self.slug.translations {
            // Translated slugs are optional but must be well formed when set
            if !slug.is_empty() && !super::is_valid_slug(slug) {
                errors.push(ValidationError::field(
                    "slug",
                    format!("Enter a valid slug for language '{}'.", lang),
                ));
            }
            check_max_len(&mut errors, "slug", slug, 50);
        }
        for name in self.name.translations.values() {
            check_max_len(&mut errors, "name", name, 100);
        }
        errors.into_result()
    }

    pub fn into_category(self, id: i64) -> Category {
        Category {
            id,
            name: self.name,
            slug: self.slug,
            footer: self.footer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CategoryInput {
        CategoryInput {
            name: Localized::new("Astronomy"),
            slug: Localized::new("astronomy"),
            footer: Localized::default(),
        }
    }

    #[test]
    fn test_valid_input() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_default_slug_required() {
        let mut input = input();
        input.slug = Localized::default().with(Language::GERMAN, "astronomie");
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.for_field("slug"), vec![super::super::REQUIRED]);
    }

    #[test]
    fn test_bad_translated_slug() {
        let mut input = input();
        input.slug = input.slug.with(Language::GERMAN, "Astro nomie");
        let errors = input.validate().unwrap_err();
        assert!(errors.for_field("slug")[0].contains("'de'"));
    }

    #[test]
    fn test_translated_values_length_checked() {
        let mut input = input();
        input.slug = input.slug.with(Language::GERMAN, "a".repeat(51));
        input.name = input.name.with(Language::GERMAN, "n".repeat(101));
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.for_field("slug").len(), 1);
        assert_eq!(errors.for_field("name").len(), 1);
    }

    #[test]
    fn test_url_uses_translated_slug() {
        let mut category = input().into_category(3);
        category.slug.set(Language::GERMAN, "astronomie");
        assert_eq!(category.url(Language::ENGLISH), "/public/blog/category/astronomy/");
        assert_eq!(
            category.url(Language::GERMAN),
            "/de/public/blog/category/astronomie/"
        );
    }
}
