//! Translated blog posts for a public-outreach CMS: storage, validation,
//! the read API, the RSS feed and the admin surface.

pub mod admin;
pub mod api;
pub mod blog;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod helpers;
pub mod hooks;
pub mod i18n;
pub mod media;
pub mod models;
pub mod routes;
pub mod security;
pub mod store;
pub mod templates;
pub mod text;
pub mod translation;
pub mod urls;
