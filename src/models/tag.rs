use super::{check_max_len, check_required, check_slug};
use crate::error::ValidationErrors;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl Tag {
    pub fn url(&self) -> String {
        crate::urls::tag_path(&self.slug)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

impl TagInput {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_required(&mut errors, "name", &self.name);
        check_max_len(&mut errors, "name", &self.name, 50);
        check_slug(&mut errors, "slug", &self.slug);
        errors.into_result()
    }

    pub fn into_tag(self, id: i64) -> Tag {
        Tag {
            id,
            name: self.name,
            slug: self.slug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let ok = TagInput {
            name: "Exoplanets".to_string(),
            slug: "exoplanets".to_string(),
        };
        assert!(ok.validate().is_ok());

        let errors = TagInput::default().validate().unwrap_err();
        assert_eq!(errors.for_field("name").len(), 1);
        assert_eq!(errors.for_field("slug").len(), 1);
    }

    #[test]
    fn test_url() {
        let tag = TagInput {
            name: "Exoplanets".to_string(),
            slug: "exoplanets".to_string(),
        }
        .into_tag(1);
        assert_eq!(tag.url(), "/public/blog/tag/exoplanets/");
    }
}
