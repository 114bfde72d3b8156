#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// One installable project as described by the remote catalog.
///
/// Every field is defaulted so a sparse or half-filled entry still
/// parses; validation happens where a field is actually needed (the
/// install engine rejects entries without an id or download URL).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Archive to download, expected to be a zip.
    #[serde(default)]
    pub download_url: String,
    /// Executable filename relative to the project's install directory.
    #[serde(default)]
    pub executable: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Advertised download size, display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_gb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ProjectEntry {
    /// Remote version string, treating blank as absent.
    #[must_use]
    pub fn remote_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// Top-level catalog document as served and cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Opaque version tag, compared by equality only.
    #[serde(default)]
    pub catalog_version: String,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

impl Catalog {
    /// Find a project by id.
    #[must_use]
    pub fn get(&self, project_id: &str) -> Option<&ProjectEntry> {
        self.projects.iter().find(|p| p.id == project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_entry_parses_with_defaults() {
        let entry: ProjectEntry = serde_json::from_str(r#"{"id":"demo"}"#).unwrap();
        assert_eq!(entry.id, "demo");
        assert_eq!(entry.title, "");
        assert_eq!(entry.version, None);
        assert_eq!(entry.size_gb, None);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let catalog: Catalog = serde_json::from_str(
            r#"{"catalog_version":"9","projects":[{"id":"a","brand_new_field":true}]}"#,
        )
        .unwrap();
        assert_eq!(catalog.catalog_version, "9");
        assert_eq!(catalog.projects.len(), 1);
    }

    #[test]
    fn get_finds_by_id() {
        let catalog: Catalog = serde_json::from_str(
            r#"{"projects":[{"id":"a","title":"A"},{"id":"b","title":"B"}]}"#,
        )
        .unwrap();
        assert_eq!(catalog.get("b").unwrap().title, "B");
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn blank_remote_version_is_absent() {
        let entry = ProjectEntry {
            version: Some("   ".into()),
            ..ProjectEntry::default()
        };
        assert_eq!(entry.remote_version(), None);

        let entry = ProjectEntry {
            version: Some(" 1.2 ".into()),
            ..ProjectEntry::default()
        };
        assert_eq!(entry.remote_version(), Some("1.2"));
    }
}
