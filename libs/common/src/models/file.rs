//! File model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Album, nullable};

/// Metadata extracted from the image at ingestion time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<serde_json::Value>,
}

/// File entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: Uuid,
    pub name: String,
    pub extname: String,
    /// Detected image format
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    /// Size in bytes
    pub size: i64,
    pub album_id: Option<Uuid>,
    pub metadata: FileMetadata,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// New file creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    pub name: String,
    pub extname: String,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub size: i64,
    pub album_id: Option<Uuid>,
    pub metadata: FileMetadata,
}

impl NewFile {
    /// A file with no album and no metadata; the extension is taken from the name
    pub fn named(name: impl Into<String>, size: i64) -> Self {
        let name = name.into();
        let extname = extension_of(&name);
        Self {
            name,
            extname,
            media_type: None,
            size,
            album_id: None,
            metadata: FileMetadata::default(),
        }
    }

    /// Materialize the record the store will hold
    pub fn into_file(self, id: Uuid, now: DateTime<Utc>) -> File {
        File {
            id,
            name: self.name,
            extname: self.extname,
            media_type: self.media_type,
            size: self.size,
            album_id: self.album_id,
            metadata: self.metadata,
            created_at: now,
            modified_at: now,
        }
    }
}

/// `.ext` suffix of a file name, including the dot, or an empty string
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[idx..].to_string(),
        _ => String::new(),
    }
}

/// File update payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileChanges {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub album_id: Option<Option<Uuid>>,
    pub metadata: Option<FileMetadata>,
}

impl FileChanges {
    /// Changes that move a file into an album
    pub fn link_to(album_id: Uuid) -> Self {
        Self {
            album_id: Some(Some(album_id)),
            ..Self::default()
        }
    }

    /// Whether no field would change
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the changes into a record, stamping the modification time
    pub fn apply(&self, file: &mut File, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            file.extname = extension_of(name);
            file.name = name.clone();
        }
        if let Some(album_id) = self.album_id {
            file.album_id = album_id;
        }
        if let Some(metadata) = &self.metadata {
            file.metadata = metadata.clone();
        }
        file.modified_at = now;
    }
}

/// A file embedded in another document, without its album reference
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub id: Uuid,
    pub name: String,
    pub extname: String,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub size: i64,
    pub metadata: FileMetadata,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl From<File> for FileSummary {
    fn from(file: File) -> Self {
        Self {
            id: file.id,
            name: file.name,
            extname: file.extname,
            media_type: file.media_type,
            size: file.size,
            metadata: file.metadata,
            created_at: file.created_at,
            modified_at: file.modified_at,
        }
    }
}

/// Public shape of a file, optionally with its album embedded
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    #[serde(flatten)]
    pub file: File,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<Album>,
}

impl From<File> for FileView {
    fn from(file: File) -> Self {
        Self { file, album: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("IMG_0042.JPG"), ".JPG");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of(".hidden"), "");
    }

    #[test]
    fn test_rename_updates_extension() {
        let now = Utc::now();
        let mut file = NewFile::named("sunset.png", 10).into_file(Uuid::new_v4(), now);
        FileChanges {
            name: Some("sunset.webp".to_string()),
            ..FileChanges::default()
        }
        .apply(&mut file, now);
        assert_eq!(file.extname, ".webp");
    }

    #[test]
    fn test_summary_drops_album_reference() {
        let mut file = NewFile::named("a.jpg", 1).into_file(Uuid::new_v4(), Utc::now());
        file.album_id = Some(Uuid::new_v4());
        let json = serde_json::to_value(FileSummary::from(file)).unwrap();
        assert!(json.get("albumId").is_none());
        assert_eq!(json["type"], serde_json::Value::Null);
    }

    #[test]
    fn test_unlink_with_explicit_null() {
        let changes: FileChanges = serde_json::from_str(r#"{"albumId": null}"#).unwrap();
        assert_eq!(changes.album_id, Some(None));
    }
}
