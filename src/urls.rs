//! Public URL layout of the blog.
//!
//! Default-language pages live under `/public/blog/`; other languages get a
//! language prefix. Translated posts are addressed by their source's slug so
//! every language version of a post shares one path.

use crate::i18n::Language;

const BLOG_ROOT: &str = "/public/blog/";

fn with_lang(lang: Language, path: String) -> String {
    if lang.is_canonical() {
        path
    } else {
        format!("/{}{}", lang.code(), path)
    }
}

/// Detail page of a post.
pub fn post_path(canonical_slug: &str, lang: Language) -> String {
    with_lang(lang, format!("{}{}/", BLOG_ROOT, canonical_slug))
}

/// Listing page of a category.
pub fn category_path(slug: &str, lang: Language) -> String {
    with_lang(lang, format!("{}category/{}/", BLOG_ROOT, slug))
}

/// Listing page of a tag. Tags are not translated.
pub fn tag_path(slug: &str) -> String {
    format!("{}tag/{}/", BLOG_ROOT, slug)
}

/// Blog index for a language.
pub fn blog_index(lang: Language) -> String {
    with_lang(lang, BLOG_ROOT.to_string())
}

/// `https://{domain}{path}`
pub fn absolute_url(domain: &str, path: &str) -> String {
    format!("https://{}{}", domain.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_path() {
        assert_eq!(post_path("first-light", Language::ENGLISH), "/public/blog/first-light/");
        assert_eq!(
            post_path("first-light", Language::GERMAN),
            "/de/public/blog/first-light/"
        );
    }

    #[test]
    fn test_blog_index() {
        assert_eq!(blog_index(Language::ENGLISH), "/public/blog/");
        assert_eq!(blog_index(Language::GERMAN), "/de/public/blog/");
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url("www.example.org/", "/public/blog/x/"),
            "https://www.example.org/public/blog/x/"
        );
    }
}
