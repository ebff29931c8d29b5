//! Admin descriptors: what the editing surface shows and allows per entity.

use crate::i18n::Language;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Author,
    Category,
    Post,
    Translation,
    Tag,
}

/// Optional behaviours switched on per entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdminCapabilities {
    /// Changing the slug of an existing record renames it in place
    pub rename: bool,
    /// New translations can be prefilled from their source
    pub translation_duplication: bool,
    /// Saving a source copies its shared fields to its translations
    pub sync_to_translation: bool,
    /// The primary key can change, re-pointing every row that references it
    pub archive_rename: bool,
}

impl AdminCapabilities {
    /// Whether a slug edit on a record keyed by its slug is applied.
    pub fn can_rename(&self) -> bool {
        self.rename && self.archive_rename
    }
}

/// A titled group of form rows; a row with several fields is shown inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Fieldset {
    pub title: Option<&'static str>,
    pub rows: &'static [&'static [&'static str]],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelAdmin {
    pub kind: EntityKind,
    pub capabilities: AdminCapabilities,
    pub list_display: &'static [&'static str],
    pub list_filter: &'static [&'static str],
    pub search_fields: &'static [&'static str],
    pub richtext_fields: &'static [&'static str],
    pub raw_id_fields: &'static [&'static str],
    pub fieldsets: &'static [Fieldset],
    /// Read-only on every form
    readonly: &'static [&'static str],
    /// Additionally read-only once the record exists
    readonly_when_existing: &'static [&'static str],
}

const POST_FIELDSETS: &[Fieldset] = &[
    Fieldset {
        title: None,
        rows: &[
            &["slug"],
            &["release_date"],
            &["published"],
            &["created", "last_modified"],
        ],
    },
    Fieldset {
        title: Some("Content"),
        rows: &[
            &["banner"],
            &["title"],
            &["subtitle"],
            &["lede"],
            &["body"],
            &["discover_box", "numbers_box"],
            &["links"],
        ],
    },
    Fieldset {
        title: Some("Metadata"),
        rows: &[&["category"], &["tags"]],
    },
];

const TRANSLATION_FIELDSETS: &[Fieldset] = &[
    Fieldset {
        title: None,
        rows: &[
            &["source"],
            &["lang"],
            &["slug"],
            &["release_date"],
            &["published"],
            &["created", "last_modified"],
        ],
    },
    Fieldset {
        title: Some("Content"),
        rows: &[
            &["banner"],
            &["title"],
            &["subtitle"],
            &["lede"],
            &["body"],
            &["discover_box", "numbers_box"],
            &["links"],
        ],
    },
    Fieldset {
        title: Some("Metadata"),
        rows: &[&["category"], &["tags"]],
    },
];

const POST_SEARCH: &[&str] = &[
    "slug",
    "title",
    "subtitle",
    "lede",
    "body",
    "links",
    "discover_box",
    "numbers_box",
];

const RENAMEABLE: AdminCapabilities = AdminCapabilities {
    rename: true,
    translation_duplication: false,
    sync_to_translation: false,
    archive_rename: false,
};

impl ModelAdmin {
    pub const AUTHOR: ModelAdmin = ModelAdmin {
        kind: EntityKind::Author,
        capabilities: RENAMEABLE,
        list_display: &["name"],
        list_filter: &[],
        search_fields: &["name"],
        richtext_fields: &["biography"],
        raw_id_fields: &["photo"],
        fieldsets: &[Fieldset {
            title: None,
            rows: &[&["name"], &["biography"], &["photo"], &["static_photo"]],
        }],
        readonly: &[],
        readonly_when_existing: &[],
    };

    pub const CATEGORY: ModelAdmin = ModelAdmin {
        kind: EntityKind::Category,
        capabilities: RENAMEABLE,
        list_display: &["name", "slug", "view_online"],
        list_filter: &[],
        search_fields: &["name", "slug"],
        richtext_fields: &["footer"],
        raw_id_fields: &[],
        fieldsets: &[Fieldset {
            title: None,
            rows: &[&["name"], &["slug"], &["footer"]],
        }],
        readonly: &[],
        readonly_when_existing: &[],
    };

    pub const POST: ModelAdmin = ModelAdmin {
        kind: EntityKind::Post,
        capabilities: AdminCapabilities {
            rename: true,
            translation_duplication: false,
            sync_to_translation: true,
            archive_rename: true,
        },
        list_display: &[
            "slug",
            "title",
            "category",
            "release_date",
            "published",
            "view_online",
        ],
        list_filter: &["category", "authors", "tags"],
        search_fields: POST_SEARCH,
        richtext_fields: &["body", "discover_box", "numbers_box", "links"],
        raw_id_fields: &["banner"],
        fieldsets: POST_FIELDSETS,
        readonly: &["created", "last_modified"],
        readonly_when_existing: &[],
    };

    pub const TRANSLATION: ModelAdmin = ModelAdmin {
        kind: EntityKind::Translation,
        capabilities: AdminCapabilities {
            rename: false,
            translation_duplication: true,
            sync_to_translation: false,
            archive_rename: false,
        },
        list_display: &["slug", "title", "lang", "source", "published", "view_online"],
        list_filter: &["lang"],
        search_fields: POST_SEARCH,
        richtext_fields: &["body", "discover_box", "numbers_box", "links"],
        raw_id_fields: &["banner", "source"],
        fieldsets: TRANSLATION_FIELDSETS,
        readonly: &["release_date", "created", "last_modified"],
        readonly_when_existing: &["slug"],
    };

    pub const TAG: ModelAdmin = ModelAdmin {
        kind: EntityKind::Tag,
        capabilities: RENAMEABLE,
        list_display: &["name", "slug", "view_online"],
        list_filter: &[],
        search_fields: &["name", "slug"],
        richtext_fields: &[],
        raw_id_fields: &[],
        fieldsets: &[Fieldset {
            title: None,
            rows: &[&["name"], &["slug"]],
        }],
        readonly: &[],
        readonly_when_existing: &[],
    };

    /// Fields whose submitted values are ignored.
    pub fn readonly_fields(&self, is_new: bool) -> Vec<&'static str> {
        let mut fields = self.readonly.to_vec();
        if !is_new {
            fields.extend_from_slice(self.readonly_when_existing);
        }
        fields
    }

    pub fn is_editable(&self, field: &str, is_new: bool) -> bool {
        !self.readonly_fields(is_new).contains(&field)
    }

    /// Public page of a record, for the "view online" column.
    pub fn view_online(&self, slug: &str, lang: Language) -> Option<String> {
        match self.kind {
            EntityKind::Post | EntityKind::Translation => {
                Some(crate::urls::post_path(slug, lang))
            }
            EntityKind::Category => Some(crate::urls::category_path(slug, lang)),
            EntityKind::Tag => Some(crate::urls::tag_path(slug)),
            EntityKind::Author => None,
        }
    }
}

/// Registered admins. Translations are only editable with i18n enabled.
#[derive(Debug, Clone, Serialize)]
pub struct AdminSite {
    models: Vec<ModelAdmin>,
}

impl AdminSite {
    pub fn new(i18n_enabled: bool) -> Self {
        let mut models = vec![
            ModelAdmin::AUTHOR,
            ModelAdmin::CATEGORY,
            ModelAdmin::POST,
            ModelAdmin::TAG,
        ];
        if i18n_enabled {
            models.push(ModelAdmin::TRANSLATION);
        }
        Self { models }
    }

    pub fn get(&self, kind: EntityKind) -> Option<&ModelAdmin> {
        self.models.iter().find(|m| m.kind == kind)
    }

    pub fn is_registered(&self, kind: EntityKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn models(&self) -> &[ModelAdmin] {
        &self.models
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_slug_locked_once_created() {
        let admin = ModelAdmin::TRANSLATION;

        assert!(admin.is_editable("slug", true));
        assert!(!admin.is_editable("slug", false));
        for field in ["release_date", "created", "last_modified"] {
            assert!(!admin.is_editable(field, true));
            assert!(!admin.is_editable(field, false));
        }
    }

    #[test]
    fn test_post_readonly_fields() {
        assert_eq!(
            ModelAdmin::POST.readonly_fields(false),
            vec!["created", "last_modified"]
        );
        assert!(ModelAdmin::POST.is_editable("slug", false));
    }

    #[test]
    fn test_translation_registered_only_with_i18n() {
        assert!(AdminSite::new(true).is_registered(EntityKind::Translation));
        assert!(!AdminSite::new(false).is_registered(EntityKind::Translation));
        assert!(AdminSite::new(false).is_registered(EntityKind::Post));
    }

    #[test]
    fn test_view_online() {
        assert_eq!(
            ModelAdmin::CATEGORY.view_online("astronomy", Language::ENGLISH),
            Some("/public/blog/category/astronomy/".to_string())
        );
        assert_eq!(
            ModelAdmin::TAG.view_online("alma", Language::GERMAN),
            Some("/public/blog/tag/alma/".to_string())
        );
        assert_eq!(ModelAdmin::AUTHOR.view_online("x", Language::ENGLISH), None);
    }

    #[test]
    fn test_capabilities() {
        assert!(ModelAdmin::POST.capabilities.sync_to_translation);
        assert!(ModelAdmin::TRANSLATION.capabilities.translation_duplication);
        assert!(!ModelAdmin::TRANSLATION.capabilities.rename);
    }

    #[test]
    fn test_key_rename_needs_archive_rename() {
        assert!(ModelAdmin::POST.capabilities.can_rename());
        assert!(!ModelAdmin::TRANSLATION.capabilities.can_rename());

        let field_only = AdminCapabilities {
            rename: true,
            ..Default::default()
        };
        assert!(!field_only.can_rename());
        assert!(!ModelAdmin::CATEGORY.capabilities.can_rename());
    }
}
