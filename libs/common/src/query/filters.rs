//! Per-entity filters and sort fields

use serde::Deserialize;
use std::cmp::Ordering;
use uuid::Uuid;

use super::{ListQuery, SortField, natural_cmp};
use crate::models::{Album, File, User};

/// Publication state filter for albums
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    /// Drafts and published albums
    #[default]
    All,
    /// Published albums only
    Posted,
    /// Drafts only
    Draft,
}

impl DraftStatus {
    /// Value the `draft` flag must have, if constrained
    pub fn draft_flag(&self) -> Option<bool> {
        match self {
            DraftStatus::All => None,
            DraftStatus::Posted => Some(false),
            DraftStatus::Draft => Some(true),
        }
    }
}

/// Album listing filter. Every active flag narrows the result (AND).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlbumFilter {
    pub status: DraftStatus,
    /// Only favorite albums when set
    pub favorites: bool,
    /// Only featured albums when set
    pub featured: bool,
}

impl AlbumFilter {
    pub fn matches(&self, album: &Album) -> bool {
        self.status.draft_flag().is_none_or(|draft| album.draft == draft)
            && (!self.favorites || album.favorite)
            && (!self.featured || album.featured)
    }
}

/// Album sort fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumSort {
    LowerName,
    CreatedAt,
    ModifiedAt,
    PostedAt,
}

impl SortField for AlbumSort {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "lowerName" | "name" => Some(AlbumSort::LowerName),
            "createdAt" => Some(AlbumSort::CreatedAt),
            "modifiedAt" => Some(AlbumSort::ModifiedAt),
            "postedAt" => Some(AlbumSort::PostedAt),
            _ => None,
        }
    }
}

impl AlbumSort {
    pub fn compare(&self, a: &Album, b: &Album) -> Ordering {
        match self {
            AlbumSort::LowerName => natural_cmp(&a.name, &b.name),
            AlbumSort::CreatedAt => a.created_at.cmp(&b.created_at),
            AlbumSort::ModifiedAt => a.modified_at.cmp(&b.modified_at),
            AlbumSort::PostedAt => a.posted_at.cmp(&b.posted_at),
        }
    }
}

/// File listing filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileFilter {
    /// Only files linked to this album
    pub album_id: Option<Uuid>,
}

impl FileFilter {
    pub fn in_album(album_id: Uuid) -> Self {
        Self {
            album_id: Some(album_id),
        }
    }

    pub fn matches(&self, file: &File) -> bool {
        self.album_id.is_none_or(|id| file.album_id == Some(id))
    }
}

/// File sort fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSort {
    LowerName,
    Size,
    CreatedAt,
    ModifiedAt,
}

impl SortField for FileSort {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "lowerName" | "name" => Some(FileSort::LowerName),
            "size" => Some(FileSort::Size),
            "createdAt" => Some(FileSort::CreatedAt),
            "modifiedAt" => Some(FileSort::ModifiedAt),
            _ => None,
        }
    }
}

impl FileSort {
    pub fn compare(&self, a: &File, b: &File) -> Ordering {
        match self {
            FileSort::LowerName => natural_cmp(&a.name, &b.name),
            FileSort::Size => a.size.cmp(&b.size),
            FileSort::CreatedAt => a.created_at.cmp(&b.created_at),
            FileSort::ModifiedAt => a.modified_at.cmp(&b.modified_at),
        }
    }
}

/// Users have no equality filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserFilter;

/// User sort fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSort {
    FirstName,
    LastName,
    CreatedAt,
}

impl SortField for UserSort {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "name" | "firstName" | "lowerName" => Some(UserSort::FirstName),
            "lastName" => Some(UserSort::LastName),
            "createdAt" => Some(UserSort::CreatedAt),
            _ => None,
        }
    }
}

impl UserSort {
    pub fn compare(&self, a: &User, b: &User) -> Ordering {
        match self {
            UserSort::FirstName => natural_cmp(&a.first_name, &b.first_name),
            UserSort::LastName => natural_cmp(&a.last_name, &b.last_name),
            UserSort::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }
}

pub type AlbumQuery = ListQuery<AlbumFilter, AlbumSort>;
pub type FileQuery = ListQuery<FileFilter, FileSort>;
pub type UserQuery = ListQuery<UserFilter, UserSort>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewAlbum;
    use chrono::Utc;

    fn album(name: &str, draft: bool, favorite: bool, featured: bool) -> Album {
        let mut album = NewAlbum::named(name).into_album(Uuid::new_v4(), Utc::now());
        album.draft = draft;
        album.favorite = favorite;
        album.featured = featured;
        album
    }

    #[test]
    fn test_status_filter() {
        let draft = album("a", true, false, false);
        let posted = album("b", false, false, false);
        let posted_only = AlbumFilter {
            status: DraftStatus::Posted,
            ..AlbumFilter::default()
        };
        assert!(posted_only.matches(&posted));
        assert!(!posted_only.matches(&draft));
        assert!(AlbumFilter::default().matches(&draft));
    }

    #[test]
    fn test_flag_filters_are_and_combined() {
        let both = album("a", false, true, true);
        let favorite_only = album("b", false, true, false);
        let filter = AlbumFilter {
            favorites: true,
            featured: true,
            ..AlbumFilter::default()
        };
        assert!(filter.matches(&both));
        assert!(!filter.matches(&favorite_only));
    }

    #[test]
    fn test_sort_field_names() {
        assert_eq!(FileSort::parse("size"), Some(FileSort::Size));
        assert_eq!(FileSort::parse("postedAt"), None);
        assert_eq!(UserSort::parse("name"), Some(UserSort::FirstName));
        assert_eq!(AlbumSort::parse("name"), Some(AlbumSort::LowerName));
    }
}
