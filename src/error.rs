//! Error types for the blog store and its HTTP surfaces.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Key used for errors that do not belong to a single field.
pub const GENERAL_KEY: &str = "__all__";

/// Where a validation error is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldKey {
    General,
    Named(&'static str),
}

impl FieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::General => GENERAL_KEY,
            FieldKey::Named(name) => name,
        }
    }
}

/// A single user-correctable problem with a submitted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: FieldKey,
    pub message: String,
}

impl ValidationError {
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            field: FieldKey::General,
            message: message.into(),
        }
    }

    pub fn field(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            field: FieldKey::Named(name),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field.as_str(), self.message)
    }
}

/// All validation errors collected for one save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("validation failed: {}", self.summary())]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// Messages attached to a named field.
    pub fn for_field(&self, name: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| matches!(e.field, FieldKey::Named(n) if n == name))
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Messages attached to the general slot.
    pub fn general(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == FieldKey::General)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Field name to messages, the shape returned to the editor.
    pub fn to_map(&self) -> BTreeMap<&'static str, Vec<String>> {
        let mut map: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
        for error in &self.errors {
            map.entry(error.field.as_str())
                .or_default()
                .push(error.message.clone());
        }
        map
    }

    fn summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

/// Unique or referential constraint reported by storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// `blog_post.slug` primary key
    PostSlug,
    /// `UNIQUE (source_id, lang)` on `blog_post`
    SourceLanguage,
    CategorySlug,
    TagSlug,
    /// A foreign key points at a missing row
    Reference,
}

/// Storage-layer failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("constraint violated: {0:?}")]
    Conflict(Constraint),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

/// Errors surfaced by blog operations.
#[derive(Debug, Error)]
pub enum BlogError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("unauthorized")]
    Unauthorized,

    #[error("feature disabled: {0}")]
    Disabled(&'static str),

    #[error("storage error")]
    Store(#[source] StoreError),

    #[error("template error")]
    Template(#[from] tera::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for BlogError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(what) => BlogError::NotFound(what),
            other => BlogError::Store(other),
        }
    }
}

impl From<ValidationError> for BlogError {
    fn from(error: ValidationError) -> Self {
        BlogError::Validation(error.into())
    }
}

/// Result type alias using BlogError.
pub type BlogResult<T> = Result<T, BlogError>;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

#[derive(Serialize)]
struct ValidationBody {
    errors: BTreeMap<&'static str, Vec<String>>,
}

impl IntoResponse for BlogError {
    fn into_response(self) -> Response {
        match &self {
            BlogError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(ValidationBody {
                    errors: errors.to_map(),
                }),
            )
                .into_response(),
            BlogError::NotFound(_) | BlogError::Disabled(_) => (
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    error: &self.to_string(),
                }),
            )
                .into_response(),
            BlogError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody {
                    error: "unauthorized",
                }),
            )
                .into_response(),
            BlogError::Store(e) => {
                tracing::error!(error = ?e, "storage error");
                internal_error()
            }
            BlogError::Template(e) => {
                tracing::error!(error = %e, "template error");
                internal_error()
            }
            BlogError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                internal_error()
            }
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "internal server error",
        }),
    )
        .into_response()
}
