use serde::{Deserialize, Serialize};

/// One binary asset referenced by a catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub filename: String,
    /// MIME type as reported by the catalog, e.g. `"image/png"`.
    #[serde(rename = "type", default)]
    pub declared_mime_type: Option<String>,
    /// Size in bytes as reported by the catalog. Informational only.
    #[serde(rename = "size", default)]
    pub declared_size: Option<u64>,
}

/// A record from the external source catalog with its ordered attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Catalog-side record id (e.g. `"recA1b2C3"`).
    #[serde(rename = "id")]
    pub external_id: String,
    pub name: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A product row in the target store.
///
/// The pipeline only ever rewrites `asset_urls`; everything else is read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub id: String,
    pub name: String,
    /// Legacy or alternate display names, scanned after `name` when matching.
    #[serde(default)]
    pub alternate_names: Vec<String>,
    /// Weak reference to a [`SourceRecord::external_id`], used for matching only.
    pub external_id: Option<String>,
    /// Current public asset URLs, in display order.
    #[serde(default)]
    pub asset_urls: Vec<String>,
}

impl TargetRecord {
    /// Name fields in matching priority order: primary name first, then
    /// alternates as stored.
    pub fn name_candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.alternate_names.iter().map(String::as_str))
    }

    /// URL-safe slug derived from the display name.
    ///
    /// Runs of non-alphanumeric characters collapse to a single `-`. Names
    /// with no usable characters fall back to `"asset"`.
    #[must_use]
    pub fn slug(&self) -> String {
        let slug = self
            .name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        if slug.is_empty() {
            "asset".to_string()
        } else {
            slug
        }
    }
}
