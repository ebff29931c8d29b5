//! Site languages.
//!
//! - `registry`: every language the site publishes in, with exactly one
//!   canonical (default) language that canonical posts are written in
//! - `language`: validated `Language` handle used on every post row
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::i18n::{Language, LanguageRegistry};
//!
//! let default = Language::canonical();
//! let german = Language::from_code("de")?;
//! let languages = LanguageRegistry::get().list_enabled();
//! ```

mod language;
mod registry;

pub use language::Language;
pub use registry::{LanguageConfig, LanguageRegistry};
