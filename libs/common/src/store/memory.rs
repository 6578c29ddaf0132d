//! In-process store
//!
//! Keeps every collection in insertion order behind a `tokio` lock. Used
//! by the test suites and selected at runtime with `DATABASE_URL=memory`.
//! Listing goes through [`crate::query::memory`], so ordering and
//! filtering agree with the SQL renderer.

use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AlbumStore, FileStore, UserStore};
use crate::error::{DatabaseError, DatabaseResult};
use crate::models::{
    Album, AlbumChanges, Credentials, File, FileChanges, NewAlbum, NewFile, NewUser, User,
};
use crate::query::{AlbumQuery, FileQuery, UserQuery, memory};

#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    credentials: Credentials,
}

/// Memory-backed implementation of every store trait
#[derive(Debug, Default)]
pub struct MemoryStore {
    albums: RwLock<Vec<Album>>,
    files: RwLock<Vec<File>>,
    users: RwLock<Vec<UserRecord>>,
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn with_file_count(mut album: Album, files: &[File]) -> Album {
    album.file_count = files
        .iter()
        .filter(|f| f.album_id == Some(album.id))
        .count() as u64;
    album
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlbumStore for MemoryStore {
    async fn list(&self, query: &AlbumQuery) -> DatabaseResult<Vec<Album>> {
        let albums = self.albums.read().await;
        let files = self.files.read().await;
        Ok(memory::evaluate(albums.iter(), query)
            .into_iter()
            .map(|album| with_file_count(album, &files))
            .collect())
    }

    async fn count(&self, query: &AlbumQuery) -> DatabaseResult<u64> {
        let albums = self.albums.read().await;
        Ok(memory::count(albums.iter(), query))
    }

    async fn get(&self, id: Uuid) -> DatabaseResult<Option<Album>> {
        let albums = self.albums.read().await;
        let files = self.files.read().await;
        Ok(albums
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .map(|album| with_file_count(album, &files)))
    }

    async fn find_by_name(&self, name: &str) -> DatabaseResult<Option<Album>> {
        let albums = self.albums.read().await;
        let files = self.files.read().await;
        Ok(albums
            .iter()
            .find(|a| same_name(&a.name, name))
            .cloned()
            .map(|album| with_file_count(album, &files)))
    }

    async fn insert(&self, album: NewAlbum) -> DatabaseResult<Album> {
        let mut albums = self.albums.write().await;
        if albums.iter().any(|a| same_name(&a.name, &album.name)) {
            return Err(DatabaseError::DuplicateKey(
                "albums_lower_name_key".to_string(),
            ));
        }

        let album = album.into_album(Uuid::new_v4(), Utc::now());
        albums.push(album.clone());
        Ok(album)
    }

    async fn update(&self, id: Uuid, changes: &AlbumChanges) -> DatabaseResult<Option<Album>> {
        let mut albums = self.albums.write().await;
        if let Some(name) = &changes.name {
            if albums.iter().any(|a| a.id != id && same_name(&a.name, name)) {
                return Err(DatabaseError::DuplicateKey(
                    "albums_lower_name_key".to_string(),
                ));
            }
        }

        let Some(album) = albums.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        changes.apply(album, Utc::now());
        let album = album.clone();
        drop(albums);

        let files = self.files.read().await;
        Ok(Some(with_file_count(album, &files)))
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<u64> {
        AlbumStore::delete_many(self, &[id]).await
    }

    async fn delete_many(&self, ids: &[Uuid]) -> DatabaseResult<u64> {
        let mut albums = self.albums.write().await;
        let before = albums.len();
        albums.retain(|a| !ids.contains(&a.id));
        Ok((before - albums.len()) as u64)
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn list(&self, query: &FileQuery) -> DatabaseResult<Vec<File>> {
        let files = self.files.read().await;
        Ok(memory::evaluate(files.iter(), query))
    }

    async fn count(&self, query: &FileQuery) -> DatabaseResult<u64> {
        let files = self.files.read().await;
        Ok(memory::count(files.iter(), query))
    }

    async fn get(&self, id: Uuid) -> DatabaseResult<Option<File>> {
        let files = self.files.read().await;
        Ok(files.iter().find(|f| f.id == id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> DatabaseResult<Vec<File>> {
        let files = self.files.read().await;
        Ok(files.iter().filter(|f| ids.contains(&f.id)).cloned().collect())
    }

    async fn find_by_name(&self, name: &str) -> DatabaseResult<Option<File>> {
        let files = self.files.read().await;
        Ok(files.iter().find(|f| same_name(&f.name, name)).cloned())
    }

    async fn insert(&self, file: NewFile) -> DatabaseResult<File> {
        let mut files = self.files.write().await;
        if files.iter().any(|f| same_name(&f.name, &file.name)) {
            return Err(DatabaseError::DuplicateKey(
                "files_lower_name_key".to_string(),
            ));
        }

        let file = file.into_file(Uuid::new_v4(), Utc::now());
        files.push(file.clone());
        Ok(file)
    }

    async fn update(&self, id: Uuid, changes: &FileChanges) -> DatabaseResult<Option<File>> {
        let mut files = self.files.write().await;
        if let Some(name) = &changes.name {
            if files.iter().any(|f| f.id != id && same_name(&f.name, name)) {
                return Err(DatabaseError::DuplicateKey(
                    "files_lower_name_key".to_string(),
                ));
            }
        }

        Ok(files.iter_mut().find(|f| f.id == id).map(|file| {
            changes.apply(file, Utc::now());
            file.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<u64> {
        FileStore::delete_many(self, &[id]).await
    }

    async fn delete_many(&self, ids: &[Uuid]) -> DatabaseResult<u64> {
        let mut files = self.files.write().await;
        let before = files.len();
        files.retain(|f| !ids.contains(&f.id));
        Ok((before - files.len()) as u64)
    }

    async fn delete_by_album(&self, album_id: Uuid) -> DatabaseResult<u64> {
        let mut files = self.files.write().await;
        let before = files.len();
        files.retain(|f| f.album_id != Some(album_id));
        Ok((before - files.len()) as u64)
    }

    async fn detach_album(&self, album_id: Uuid) -> DatabaseResult<u64> {
        let mut files = self.files.write().await;
        let now = Utc::now();
        let mut detached = 0;
        for file in files.iter_mut().filter(|f| f.album_id == Some(album_id)) {
            file.album_id = None;
            file.modified_at = now;
            detached += 1;
        }
        Ok(detached)
    }

    async fn count_by_album(&self, album_id: Uuid) -> DatabaseResult<u64> {
        let files = self.files.read().await;
        Ok(files.iter().filter(|f| f.album_id == Some(album_id)).count() as u64)
    }

    async fn sample(&self, size: usize) -> DatabaseResult<Vec<File>> {
        let files = self.files.read().await;
        let linked: Vec<&File> = files.iter().filter(|f| f.album_id.is_some()).collect();
        let mut rng = rand::thread_rng();
        Ok(linked
            .choose_multiple(&mut rng, size)
            .map(|f| (*f).clone())
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|r| r.user.id == id).map(|r| r.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|r| same_name(&r.credentials.email, email))
            .map(|r| r.user.clone()))
    }

    async fn credentials(&self, email: &str) -> DatabaseResult<Option<Credentials>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|r| same_name(&r.credentials.email, email))
            .map(|r| r.credentials.clone()))
    }

    async fn list(&self, query: &UserQuery) -> DatabaseResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(memory::evaluate(users.iter().map(|r| &r.user), query))
    }

    async fn count(&self, query: &UserQuery) -> DatabaseResult<u64> {
        let users = self.users.read().await;
        Ok(memory::count(users.iter().map(|r| &r.user), query))
    }

    async fn insert(&self, user: NewUser) -> DatabaseResult<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|r| same_name(&r.credentials.email, &user.email)) {
            return Err(DatabaseError::DuplicateKey(
                "user_credentials_lower_email_key".to_string(),
            ));
        }

        let (user, credentials) = user.into_records(Uuid::new_v4(), Utc::now());
        users.push(UserRecord {
            user: user.clone(),
            credentials,
        });
        Ok(user)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> DatabaseResult<bool> {
        let mut users = self.users.write().await;
        let Some(record) = users.iter_mut().find(|r| r.user.id == id) else {
            return Ok(false);
        };

        let now = Utc::now();
        record.credentials.password = password_hash.to_string();
        record.credentials.password_edited_at = Some(now);
        record.credentials.modified_at = now;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::pagination::PageRequest;
    use crate::query::{AlbumFilter, AlbumSort, DraftStatus, FileFilter};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            role: Role::Admin,
            email: email.to_string(),
            password_hash: "digest".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_then_get_album() {
        let store = MemoryStore::new();
        let mut new_album = NewAlbum::named("Summer");
        new_album.favorite = true;
        let inserted = AlbumStore::insert(&store, new_album).await.unwrap();

        let fetched = AlbumStore::get(&store, inserted.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Summer");
        assert!(fetched.favorite);
        assert!(fetched.draft);
        assert_eq!(fetched, inserted);
    }

    #[tokio::test]
    async fn test_album_names_are_unique_ignoring_case() {
        let store = MemoryStore::new();
        AlbumStore::insert(&store, NewAlbum::named("Summer")).await.unwrap();
        let err = AlbumStore::insert(&store, NewAlbum::named("SUMMER"))
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());
    }

    #[tokio::test]
    async fn test_update_keeps_created_at_and_stamps_modified_at() {
        let store = MemoryStore::new();
        let album = AlbumStore::insert(&store, NewAlbum::named("Trips")).await.unwrap();
        let changes = AlbumChanges {
            featured: Some(true),
            ..AlbumChanges::default()
        };
        let updated = AlbumStore::update(&store, album.id, &changes)
            .await
            .unwrap()
            .unwrap();
        assert!(updated.featured);
        assert_eq!(updated.created_at, album.created_at);
        assert!(updated.modified_at >= album.modified_at);

        let missing = AlbumStore::update(&store, Uuid::new_v4(), &changes).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_file_count_and_detach() {
        let store = MemoryStore::new();
        let album = AlbumStore::insert(&store, NewAlbum::named("Trips")).await.unwrap();
        for name in ["a.jpg", "b.jpg"] {
            let mut file = NewFile::named(name, 10);
            file.album_id = Some(album.id);
            FileStore::insert(&store, file).await.unwrap();
        }
        FileStore::insert(&store, NewFile::named("c.jpg", 10)).await.unwrap();

        let fetched = AlbumStore::get(&store, album.id).await.unwrap().unwrap();
        assert_eq!(fetched.file_count, 2);

        assert_eq!(store.detach_album(album.id).await.unwrap(), 2);
        assert_eq!(store.count_by_album(album.id).await.unwrap(), 0);
        let all = FileStore::count(&store, &FileQuery::new(FileFilter::default()))
            .await
            .unwrap();
        assert_eq!(all, 3);
    }

    #[tokio::test]
    async fn test_delete_reports_removed_count() {
        let store = MemoryStore::new();
        let album = AlbumStore::insert(&store, NewAlbum::named("Trips")).await.unwrap();
        assert_eq!(AlbumStore::delete(&store, album.id).await.unwrap(), 1);
        assert_eq!(AlbumStore::delete(&store, album.id).await.unwrap(), 0);
        assert!(AlbumStore::get(&store, album.id).await.unwrap().is_none());

        let file = FileStore::insert(&store, NewFile::named("a.jpg", 1)).await.unwrap();
        let other = FileStore::insert(&store, NewFile::named("b.jpg", 1)).await.unwrap();
        assert_eq!(FileStore::delete(&store, file.id).await.unwrap(), 1);
        assert_eq!(FileStore::delete(&store, file.id).await.unwrap(), 0);
        assert_eq!(
            FileStore::delete_many(&store, &[file.id, other.id]).await.unwrap(),
            1
        );
        assert!(FileStore::get(&store, other.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_listing_applies_filter_sort_and_window() {
        let store = MemoryStore::new();
        for name in ["img10", "img2", "img1", "draft"] {
            let mut album = NewAlbum::named(name);
            album.draft = name == "draft";
            AlbumStore::insert(&store, album).await.unwrap();
        }

        let request = PageRequest::from_raw(Some(1), Some(2)).unwrap();
        let query = AlbumQuery::new(AlbumFilter {
            status: DraftStatus::Posted,
            ..AlbumFilter::default()
        })
        .sort(Some(AlbumSort::LowerName))
        .window(request.window());

        let page = AlbumStore::list(&store, &query).await.unwrap();
        let names: Vec<_> = page.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["img1", "img2"]);
        assert_eq!(AlbumStore::count(&store, &query).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_sample_only_returns_linked_files() {
        let store = MemoryStore::new();
        let album = AlbumStore::insert(&store, NewAlbum::named("Trips")).await.unwrap();
        let mut linked = NewFile::named("linked.jpg", 1);
        linked.album_id = Some(album.id);
        FileStore::insert(&store, linked).await.unwrap();
        FileStore::insert(&store, NewFile::named("loose.jpg", 1)).await.unwrap();

        let sample = store.sample(35).await.unwrap();
        assert_eq!(sample.len(), 1);
        assert_eq!(sample[0].name, "linked.jpg");
    }

    #[tokio::test]
    async fn test_user_lookup_and_password_update() {
        let store = MemoryStore::new();
        let user = UserStore::insert(&store, new_user("ada@example.com")).await.unwrap();

        let err = UserStore::insert(&store, new_user("ADA@example.com"))
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());

        let found = store.find_by_email("Ada@Example.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);

        assert!(store.update_password(user.id, "new-digest").await.unwrap());
        let credentials = store.credentials("ada@example.com").await.unwrap().unwrap();
        assert_eq!(credentials.password, "new-digest");
        assert!(credentials.password_edited_at.is_some());
        assert!(!store.update_password(Uuid::new_v4(), "x").await.unwrap());
    }
}
