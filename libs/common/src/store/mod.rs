//! Data access layer
//!
//! One trait per collection, each implemented by the PostgreSQL store and
//! by the in-process memory store. Handlers only ever see the trait
//! objects bundled in [`Stores`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::DatabaseResult;
use crate::models::{
    Album, AlbumChanges, Credentials, File, FileChanges, NewAlbum, NewFile, NewUser, User,
};
use crate::query::{AlbumQuery, FileQuery, UserQuery};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Album collection
#[async_trait]
pub trait AlbumStore: Send + Sync + 'static {
    /// Albums matching the query, in query order
    async fn list(&self, query: &AlbumQuery) -> DatabaseResult<Vec<Album>>;

    /// Number of albums matching the query's filter and search
    async fn count(&self, query: &AlbumQuery) -> DatabaseResult<u64>;

    async fn get(&self, id: Uuid) -> DatabaseResult<Option<Album>>;

    /// Case-insensitive lookup by name
    async fn find_by_name(&self, name: &str) -> DatabaseResult<Option<Album>>;

    /// Insert a new album.
    ///
    /// # Errors
    ///
    /// [`DatabaseError::DuplicateKey`](crate::error::DatabaseError::DuplicateKey)
    /// when another album has the same name, ignoring case.
    async fn insert(&self, album: NewAlbum) -> DatabaseResult<Album>;

    /// Merge `changes` into the album. `None` when the id is unknown.
    async fn update(&self, id: Uuid, changes: &AlbumChanges) -> DatabaseResult<Option<Album>>;

    /// Number of removed albums (0 or 1)
    async fn delete(&self, id: Uuid) -> DatabaseResult<u64>;

    async fn delete_many(&self, ids: &[Uuid]) -> DatabaseResult<u64>;
}

/// File collection
#[async_trait]
pub trait FileStore: Send + Sync + 'static {
    async fn list(&self, query: &FileQuery) -> DatabaseResult<Vec<File>>;

    async fn count(&self, query: &FileQuery) -> DatabaseResult<u64>;

    async fn get(&self, id: Uuid) -> DatabaseResult<Option<File>>;

    /// Files with any of the given ids; unknown ids are skipped
    async fn get_many(&self, ids: &[Uuid]) -> DatabaseResult<Vec<File>>;

    /// Case-insensitive lookup by name
    async fn find_by_name(&self, name: &str) -> DatabaseResult<Option<File>>;

    /// Insert a new file, failing with `DuplicateKey` on a name clash
    async fn insert(&self, file: NewFile) -> DatabaseResult<File>;

    async fn update(&self, id: Uuid, changes: &FileChanges) -> DatabaseResult<Option<File>>;

    async fn delete(&self, id: Uuid) -> DatabaseResult<u64>;

    async fn delete_many(&self, ids: &[Uuid]) -> DatabaseResult<u64>;

    /// Remove every file linked to the album
    async fn delete_by_album(&self, album_id: Uuid) -> DatabaseResult<u64>;

    /// Unlink every file from the album, keeping the files
    async fn detach_album(&self, album_id: Uuid) -> DatabaseResult<u64>;

    async fn count_by_album(&self, album_id: Uuid) -> DatabaseResult<u64>;

    /// Up to `size` files picked at random among files linked to an album
    async fn sample(&self, size: usize) -> DatabaseResult<Vec<File>>;
}

/// User collection: metadata and credentials
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    async fn get(&self, id: Uuid) -> DatabaseResult<Option<User>>;

    /// Case-insensitive lookup by email
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;

    /// Credentials for an email. The only read path exposing the digest.
    async fn credentials(&self, email: &str) -> DatabaseResult<Option<Credentials>>;

    async fn list(&self, query: &UserQuery) -> DatabaseResult<Vec<User>>;

    async fn count(&self, query: &UserQuery) -> DatabaseResult<u64>;

    /// Insert credentials, then metadata. Fails with `DuplicateKey` when
    /// the email is taken.
    async fn insert(&self, user: NewUser) -> DatabaseResult<User>;

    /// Replace the password digest and stamp `passwordEditedAt`.
    /// `false` when the id is unknown.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> DatabaseResult<bool>;
}

/// The three collections behind one backend
#[derive(Clone)]
pub struct Stores {
    pub albums: Arc<dyn AlbumStore>,
    pub files: Arc<dyn FileStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    /// Share a single backend between the three collections
    pub fn new<B>(backend: B) -> Self
    where
        B: AlbumStore + FileStore + UserStore,
    {
        let backend = Arc::new(backend);
        Self {
            albums: backend.clone(),
            files: backend.clone(),
            users: backend,
        }
    }

    /// Fresh, empty memory backend
    pub fn memory() -> Self {
        Self::new(MemoryStore::new())
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
