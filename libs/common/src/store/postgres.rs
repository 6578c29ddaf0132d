//! PostgreSQL store

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::{AlbumStore, FileStore, UserStore};
use crate::error::{DatabaseError, DatabaseResult};
use crate::models::{
    Album, AlbumChanges, Credentials, File, FileChanges, FileMetadata, NewAlbum, NewFile,
    NewUser, Role, User,
};
use crate::query::sql::{self, AlbumSource, FileSource, UserSource};
use crate::query::{AlbumQuery, FileQuery, UserQuery};

const ALBUM_SELECT: &str = "SELECT a.id, a.name, a.draft, a.hidden, a.nsfw, a.favorite, \
     a.featured, a.cover_id, a.cover_fallback_id, a.posted_at, a.created_at, a.modified_at, \
     (SELECT COUNT(*) FROM files f WHERE f.album_id = a.id) AS file_count FROM albums a";
const ALBUM_FROM: &str = "FROM albums a";

const FILE_SELECT: &str = "SELECT f.id, f.name, f.extname, f.type, f.size, f.album_id, \
     f.metadata, f.created_at, f.modified_at FROM files f";
const FILE_FROM: &str = "FROM files f";

const USER_SELECT: &str = "SELECT m.id, m.first_name, m.last_name, m.role, m.avatar, c.email, \
     m.created_at, m.modified_at FROM user_metadata m JOIN user_credentials c ON c.id = m.id";
const USER_FROM: &str = "FROM user_metadata m";

/// Store backed by a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn album_from_row(row: &PgRow) -> DatabaseResult<Album> {
    let file_count: i64 = row.try_get("file_count")?;
    Ok(Album {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        draft: row.try_get("draft")?,
        hidden: row.try_get("hidden")?,
        nsfw: row.try_get("nsfw")?,
        favorite: row.try_get("favorite")?,
        featured: row.try_get("featured")?,
        cover_id: row.try_get("cover_id")?,
        cover_fallback_id: row.try_get("cover_fallback_id")?,
        file_count: file_count.max(0) as u64,
        posted_at: row.try_get("posted_at")?,
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
    })
}

fn file_from_row(row: &PgRow) -> DatabaseResult<File> {
    let metadata = file_metadata(row.try_get("metadata")?)?;
    Ok(File {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        extname: row.try_get("extname")?,
        media_type: row.try_get("type")?,
        size: row.try_get("size")?,
        album_id: row.try_get("album_id")?,
        metadata,
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
    })
}

/// Decode the JSON `metadata` column of a file row
fn file_metadata(value: serde_json::Value) -> DatabaseResult<FileMetadata> {
    Ok(serde_json::from_value(value)?)
}

fn user_from_row(row: &PgRow) -> DatabaseResult<User> {
    let role: String = row.try_get("role")?;
    let role = role.parse::<Role>().unwrap_or_else(|err| {
        tracing::warn!("Stored user role is invalid, falling back to user: {}", err);
        Role::User
    });

    Ok(User {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        role,
        avatar: row.try_get("avatar")?,
        email: row.try_get("email")?,
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
    })
}

fn credentials_from_row(row: &PgRow) -> DatabaseResult<Credentials> {
    Ok(Credentials {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password: row.try_get("password")?,
        password_edited_at: row.try_get("password_edited_at")?,
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
    })
}

fn decode_all<T>(
    rows: Vec<PgRow>,
    decode: fn(&PgRow) -> DatabaseResult<T>,
) -> DatabaseResult<Vec<T>> {
    rows.iter().map(decode).collect()
}

fn decode_one<T>(
    row: Option<PgRow>,
    decode: fn(&PgRow) -> DatabaseResult<T>,
) -> DatabaseResult<Option<T>> {
    row.as_ref().map(decode).transpose()
}

fn to_count(value: i64) -> u64 {
    value.max(0) as u64
}

impl PgStore {
    async fn fetch_count(&self, mut qb: QueryBuilder<'_, Postgres>) -> DatabaseResult<u64> {
        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        Ok(to_count(count))
    }

    async fn fetch_rows(&self, mut qb: QueryBuilder<'_, Postgres>) -> DatabaseResult<Vec<PgRow>> {
        qb.build()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_query)
    }

    /// Run a partial `UPDATE ... RETURNING id`, `None` when no row matched
    async fn apply_update(
        &self,
        mut qb: QueryBuilder<'_, Postgres>,
        id: Uuid,
    ) -> DatabaseResult<Option<Uuid>> {
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING id");
        qb.build_query_scalar()
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)
    }
}

#[async_trait]
impl AlbumStore for PgStore {
    async fn list(&self, query: &AlbumQuery) -> DatabaseResult<Vec<Album>> {
        let rows = self
            .fetch_rows(sql::build_list::<AlbumSource>(ALBUM_SELECT, query))
            .await?;
        decode_all(rows, album_from_row)
    }

    async fn count(&self, query: &AlbumQuery) -> DatabaseResult<u64> {
        self.fetch_count(sql::build_count::<AlbumSource>(ALBUM_FROM, query))
            .await
    }

    async fn get(&self, id: Uuid) -> DatabaseResult<Option<Album>> {
        let row = sqlx::query(&format!("{ALBUM_SELECT} WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        decode_one(row, album_from_row)
    }

    async fn find_by_name(&self, name: &str) -> DatabaseResult<Option<Album>> {
        let row = sqlx::query(&format!("{ALBUM_SELECT} WHERE lower(a.name) = lower($1)"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        decode_one(row, album_from_row)
    }

    async fn insert(&self, album: NewAlbum) -> DatabaseResult<Album> {
        let album = album.into_album(Uuid::new_v4(), Utc::now());
        sqlx::query(
            r#"
            INSERT INTO albums (id, name, draft, hidden, nsfw, favorite, featured,
                                cover_id, cover_fallback_id, posted_at, created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(album.id)
        .bind(&album.name)
        .bind(album.draft)
        .bind(album.hidden)
        .bind(album.nsfw)
        .bind(album.favorite)
        .bind(album.featured)
        .bind(album.cover_id)
        .bind(album.cover_fallback_id)
        .bind(album.posted_at)
        .bind(album.created_at)
        .bind(album.modified_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(album)
    }

    async fn update(&self, id: Uuid, changes: &AlbumChanges) -> DatabaseResult<Option<Album>> {
        let mut qb = QueryBuilder::new("UPDATE albums SET modified_at = ");
        qb.push_bind(Utc::now());
        if let Some(name) = &changes.name {
            qb.push(", name = ").push_bind(name.clone());
        }
        for (column, value) in [
            ("draft", changes.draft),
            ("hidden", changes.hidden),
            ("nsfw", changes.nsfw),
            ("favorite", changes.favorite),
            ("featured", changes.featured),
        ] {
            if let Some(value) = value {
                qb.push(format_args!(", {column} = ")).push_bind(value);
            }
        }
        if let Some(cover_id) = changes.cover_id {
            qb.push(", cover_id = ").push_bind(cover_id);
        }
        if let Some(cover_fallback_id) = changes.cover_fallback_id {
            qb.push(", cover_fallback_id = ").push_bind(cover_fallback_id);
        }
        if let Some(posted_at) = changes.posted_at {
            qb.push(", posted_at = ").push_bind(posted_at);
        }

        match self.apply_update(qb, id).await? {
            Some(id) => AlbumStore::get(self, id).await,
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<u64> {
        AlbumStore::delete_many(self, &[id]).await
    }

    async fn delete_many(&self, ids: &[Uuid]) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM albums WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl FileStore for PgStore {
    async fn list(&self, query: &FileQuery) -> DatabaseResult<Vec<File>> {
        let rows = self
            .fetch_rows(sql::build_list::<FileSource>(FILE_SELECT, query))
            .await?;
        decode_all(rows, file_from_row)
    }

    async fn count(&self, query: &FileQuery) -> DatabaseResult<u64> {
        self.fetch_count(sql::build_count::<FileSource>(FILE_FROM, query))
            .await
    }

    async fn get(&self, id: Uuid) -> DatabaseResult<Option<File>> {
        let row = sqlx::query(&format!("{FILE_SELECT} WHERE f.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        decode_one(row, file_from_row)
    }

    async fn get_many(&self, ids: &[Uuid]) -> DatabaseResult<Vec<File>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(&format!("{FILE_SELECT} WHERE f.id = ANY($1)"))
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        decode_all(rows, file_from_row)
    }

    async fn find_by_name(&self, name: &str) -> DatabaseResult<Option<File>> {
        let row = sqlx::query(&format!("{FILE_SELECT} WHERE lower(f.name) = lower($1)"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        decode_one(row, file_from_row)
    }

    async fn insert(&self, file: NewFile) -> DatabaseResult<File> {
        let file = file.into_file(Uuid::new_v4(), Utc::now());
        sqlx::query(
            r#"
            INSERT INTO files (id, name, extname, type, size, album_id, metadata,
                               created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(file.id)
        .bind(&file.name)
        .bind(&file.extname)
        .bind(&file.media_type)
        .bind(file.size)
        .bind(file.album_id)
        .bind(Json(&file.metadata))
        .bind(file.created_at)
        .bind(file.modified_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(file)
    }

    async fn update(&self, id: Uuid, changes: &FileChanges) -> DatabaseResult<Option<File>> {
        let mut qb = QueryBuilder::new("UPDATE files SET modified_at = ");
        qb.push_bind(Utc::now());
        if let Some(name) = &changes.name {
            qb.push(", name = ").push_bind(name.clone());
            qb.push(", extname = ")
                .push_bind(crate::models::file::extension_of(name));
        }
        if let Some(album_id) = changes.album_id {
            qb.push(", album_id = ").push_bind(album_id);
        }
        if let Some(metadata) = &changes.metadata {
            qb.push(", metadata = ").push_bind(Json(metadata.clone()));
        }

        match self.apply_update(qb, id).await? {
            Some(id) => FileStore::get(self, id).await,
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<u64> {
        FileStore::delete_many(self, &[id]).await
    }

    async fn delete_many(&self, ids: &[Uuid]) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM files WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        Ok(result.rows_affected())
    }

    async fn delete_by_album(&self, album_id: Uuid) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM files WHERE album_id = $1")
            .bind(album_id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        Ok(result.rows_affected())
    }

    async fn detach_album(&self, album_id: Uuid) -> DatabaseResult<u64> {
        let result =
            sqlx::query("UPDATE files SET album_id = NULL, modified_at = $2 WHERE album_id = $1")
                .bind(album_id)
                .bind(Utc::now())
                .execute(&self.pool)
                .await
                .map_err(DatabaseError::from_query)?;
        Ok(result.rows_affected())
    }

    async fn count_by_album(&self, album_id: Uuid) -> DatabaseResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE album_id = $1")
            .bind(album_id)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        Ok(to_count(count))
    }

    async fn sample(&self, size: usize) -> DatabaseResult<Vec<File>> {
        let rows = sqlx::query(&format!(
            "{FILE_SELECT} WHERE f.album_id IS NOT NULL ORDER BY random() LIMIT $1"
        ))
        .bind(i64::try_from(size).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;
        decode_all(rows, file_from_row)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn get(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(&format!("{USER_SELECT} WHERE m.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        decode_one(row, user_from_row)
    }

    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(&format!("{USER_SELECT} WHERE lower(c.email) = lower($1)"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        decode_one(row, user_from_row)
    }

    async fn credentials(&self, email: &str) -> DatabaseResult<Option<Credentials>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password, password_edited_at, created_at, modified_at
            FROM user_credentials
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;
        decode_one(row, credentials_from_row)
    }

    async fn list(&self, query: &UserQuery) -> DatabaseResult<Vec<User>> {
        let rows = self
            .fetch_rows(sql::build_list::<UserSource>(USER_SELECT, query))
            .await?;
        decode_all(rows, user_from_row)
    }

    async fn count(&self, query: &UserQuery) -> DatabaseResult<u64> {
        self.fetch_count(sql::build_count::<UserSource>(USER_FROM, query))
            .await
    }

    async fn insert(&self, user: NewUser) -> DatabaseResult<User> {
        let (user, credentials) = user.into_records(Uuid::new_v4(), Utc::now());

        sqlx::query(
            r#"
            INSERT INTO user_credentials (id, email, password, password_edited_at,
                                          created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(credentials.id)
        .bind(&credentials.email)
        .bind(&credentials.password)
        .bind(credentials.password_edited_at)
        .bind(credentials.created_at)
        .bind(credentials.modified_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        sqlx::query(
            r#"
            INSERT INTO user_metadata (id, first_name, last_name, role, avatar,
                                       created_at, modified_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(&user.avatar)
        .bind(user.created_at)
        .bind(user.modified_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(user)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> DatabaseResult<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE user_credentials
            SET password = $2, password_edited_at = $3, modified_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_metadata_column_decodes() {
        let metadata = file_metadata(json!({"width": 640, "height": 480})).unwrap();
        assert_eq!(metadata.width, Some(640));
        assert_eq!(metadata.height, Some(480));
        assert!(metadata.tags.is_none());
    }

    #[test]
    fn test_malformed_metadata_is_a_serialization_error() {
        let err = file_metadata(json!({"width": "wide"})).unwrap_err();
        assert!(matches!(err, DatabaseError::Serialization(_)));
        assert!(!err.is_duplicate_key());
    }
}
