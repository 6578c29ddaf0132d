//! Gallery data model

pub mod album;
pub mod file;
pub mod user;

// Re-export for convenience
pub use album::{Album, AlbumChanges, AlbumView, NewAlbum};
pub use file::{File, FileChanges, FileMetadata, FileSummary, FileView, NewFile};
pub use user::{Credentials, NewUser, Role, User};

use serde::{Deserialize, Deserializer};

/// Deserialize a field that distinguishes "absent" from "explicitly null".
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: absent is `None`, `null` is `Some(None)`.
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
