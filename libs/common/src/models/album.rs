//! Album model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{FileSummary, nullable};

/// Album entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: Uuid,
    pub name: String,
    pub draft: bool,
    pub hidden: bool,
    pub nsfw: bool,
    pub favorite: bool,
    pub featured: bool,
    pub cover_id: Option<Uuid>,
    pub cover_fallback_id: Option<Uuid>,
    /// Number of files linked to the album, computed at read time
    #[serde(default)]
    pub file_count: u64,
    pub posted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// New album creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlbum {
    pub name: String,
    #[serde(default = "default_draft")]
    pub draft: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub cover_id: Option<Uuid>,
    #[serde(default)]
    pub cover_fallback_id: Option<Uuid>,
}

fn default_draft() -> bool {
    true
}

impl NewAlbum {
    /// A draft album with every flag cleared
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            draft: true,
            hidden: false,
            nsfw: false,
            favorite: false,
            featured: false,
            cover_id: None,
            cover_fallback_id: None,
        }
    }

    /// Materialize the record the store will hold
    pub fn into_album(self, id: Uuid, now: DateTime<Utc>) -> Album {
        Album {
            id,
            name: self.name,
            draft: self.draft,
            hidden: self.hidden,
            nsfw: self.nsfw,
            favorite: self.favorite,
            featured: self.featured,
            cover_id: self.cover_id,
            cover_fallback_id: self.cover_fallback_id,
            file_count: 0,
            posted_at: if self.draft { None } else { Some(now) },
            created_at: now,
            modified_at: now,
        }
    }
}

/// Album update payload
///
/// Identity and creation time are not representable here, so they can
/// never be overwritten. `modifiedAt` is stamped by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AlbumChanges {
    pub name: Option<String>,
    pub draft: Option<bool>,
    pub hidden: Option<bool>,
    pub nsfw: Option<bool>,
    pub favorite: Option<bool>,
    pub featured: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub cover_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub cover_fallback_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable")]
    pub posted_at: Option<Option<DateTime<Utc>>>,
}

impl AlbumChanges {
    /// Changes that publish an album
    pub fn publish(now: DateTime<Utc>) -> Self {
        Self {
            draft: Some(false),
            posted_at: Some(Some(now)),
            ..Self::default()
        }
    }

    /// Changes that turn an album back into a draft
    pub fn unpublish() -> Self {
        Self {
            draft: Some(true),
            posted_at: Some(None),
            ..Self::default()
        }
    }

    /// Whether no field would change
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the changes into a record, stamping the modification time
    pub fn apply(&self, album: &mut Album, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            album.name = name.clone();
        }
        if let Some(draft) = self.draft {
            album.draft = draft;
        }
        if let Some(hidden) = self.hidden {
            album.hidden = hidden;
        }
        if let Some(nsfw) = self.nsfw {
            album.nsfw = nsfw;
        }
        if let Some(favorite) = self.favorite {
            album.favorite = favorite;
        }
        if let Some(featured) = self.featured {
            album.featured = featured;
        }
        if let Some(cover_id) = self.cover_id {
            album.cover_id = cover_id;
        }
        if let Some(cover_fallback_id) = self.cover_fallback_id {
            album.cover_fallback_id = cover_fallback_id;
        }
        if let Some(posted_at) = self.posted_at {
            album.posted_at = posted_at;
        }
        album.modified_at = now;
    }
}

/// Public shape of an album with its cover files resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumView {
    #[serde(flatten)]
    pub album: Album,
    pub cover: Option<FileSummary>,
    pub cover_fallback: Option<FileSummary>,
}
