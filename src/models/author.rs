use super::{check_max_len, check_required, Localized};
use crate::error::ValidationErrors;
use serde::{Deserialize, Serialize};

/// A post author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub biography: Localized,
    /// Image from the archive
    pub photo: Option<String>,
    /// Direct link to a JPG image, used when there is no archive photo
    pub static_photo: String,
}

/// Fields accepted when creating or editing an author.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub biography: Localized,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub static_photo: String,
}

impl AuthorInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_required(&mut errors, "name", &self.name);
        check_max_len(&mut errors, "name", &self.name, 100);
        check_max_len(&mut errors, "static_photo", &self.static_photo, 200);
        if let Some(photo) = &self.photo {
            check_max_len(&mut errors, "photo", photo, 50);
        }
        errors.into_result()
    }

    pub fn into_author(self, id: i64) -> Author {
        Author {
            id,
            name: self.name,
            biography: self.biography,
            photo: self.photo.filter(|p| !p.is_empty()),
            static_photo: self.static_photo,
        }
    }
}
