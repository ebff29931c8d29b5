//! Text normalization applied to rich-text fields before they are stored.

use std::borrow::Cow;

/// U+00A0. Rich-text editors insert it between words and it breaks template
/// tag parsing in post bodies.
pub const NO_BREAK_SPACE: char = '\u{a0}';

/// Replace every no-break space with an ordinary space.
///
/// Returns the input unchanged (borrowed) when there is nothing to replace.
pub fn normalize_body(body: &str) -> Cow<'_, str> {
    if body.contains(NO_BREAK_SPACE) {
        Cow::Owned(body.replace(NO_BREAK_SPACE, " "))
    } else {
        Cow::Borrowed(body)
    }
}

/// Strip markup that is unsafe to serve (scripts, event handlers,
/// `javascript:` links) and keep ordinary formatting. Template tags are
/// plain text to the sanitizer and pass through.
pub fn clean_html(html: &str) -> String {
    ammonia::clean(html)
}
