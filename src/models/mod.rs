//! Blog records: posts (canonical and translations), authors, categories
//! and tags.

mod author;
mod category;
mod localized;
mod post;
mod tag;

pub use author::{Author, AuthorInput};
pub use category::{Category, CategoryInput};
pub use localized::Localized;
pub use post::{
    AuthorDescription, Post, PostContent, PostInput, PostVariant, TranslationInput,
    TRANSLATED_FIELDS,
};
pub use tag::{Tag, TagInput};

use crate::error::{ValidationError, ValidationErrors};
use regex::Regex;
use std::sync::OnceLock;

pub(crate) const REQUIRED: &str = "This field is required.";

static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();

fn slug_regex() -> &'static Regex {
    SLUG_REGEX.get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("Invalid slug regex"))
}

/// Letters, numbers, underscores or hyphens only.
pub fn is_valid_slug(value: &str) -> bool {
    slug_regex().is_match(value)
}

/// Collect the usual slug problems for `field`.
pub(crate) fn check_slug(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::field(field, REQUIRED));
    } else if !is_valid_slug(value) {
        errors.push(ValidationError::field(
            field,
            "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
        ));
    } else {
        check_max_len(errors, field, value, 50);
    }
}

pub(crate) fn check_required(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::field(field, REQUIRED));
    }
}

pub(crate) fn check_max_len(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &str,
    max: usize,
) {
    let len = value.chars().count();
    if len > max {
        errors.push(ValidationError::field(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, len
            ),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_format() {
        assert!(is_valid_slug("black-hole_2019"));
        assert!(!is_valid_slug("black hole"));
        assert!(!is_valid_slug("ünïcode"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn test_check_slug_messages() {
        let mut errors = ValidationErrors::new();
        check_slug(&mut errors, "slug", "");
        check_slug(&mut errors, "slug", "not valid");
        check_slug(&mut errors, "slug", &"a".repeat(51));

        let messages = errors.for_field("slug");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], REQUIRED);
        assert!(messages[1].starts_with("Enter a valid slug"));
        assert!(messages[2].contains("at most 50"));
    }

    #[test]
    fn test_max_len_counts_chars() {
        let mut errors = ValidationErrors::new();
        check_max_len(&mut errors, "name", "ééé", 3);
        assert!(errors.is_empty());
    }
}
