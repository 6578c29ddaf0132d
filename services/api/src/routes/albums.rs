//! Album routes
//!
//! Reads are public; publishing, edits and deletion need a signed-in user.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use common::models::{Album, AlbumChanges, AlbumView, File, FileSummary};
use common::pagination::Page;
use common::query::{
    AlbumFilter, AlbumQuery, DraftStatus, FileFilter, FileQuery, FileSort, SortOrder,
};

use super::{RouteModule, search_term};
use crate::{
    config::DeletePolicy,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiQuery, page_request, parse_id},
    state::AppState,
};

const NOT_FOUND: &str = "Album not found.";

pub fn module() -> RouteModule {
    let public = Router::new()
        .route("/", get(list_albums))
        .route("/:id", get(get_album))
        .route("/:id/files", get(album_files));

    let protected = Router::new()
        .route("/:id", patch(update_album).delete(delete_album))
        .route("/:id/publish", post(publish_album))
        .route("/:id/unpublish", post(unpublish_album));

    RouteModule::new(3, "/albums").public(public).protected(protected)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumListParams {
    pub status: Option<DraftStatus>,
    pub favorites: Option<bool>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<SortOrder>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DeletedAlbum {
    pub deleted: u64,
    /// Files removed or unlinked, depending on the delete policy
    pub files: u64,
}

/// Resolve the cover references of each album with one file lookup
async fn album_views(state: &AppState, albums: Vec<Album>) -> ApiResult<Vec<AlbumView>> {
    let cover_ids: Vec<Uuid> = albums
        .iter()
        .flat_map(|album| [album.cover_id, album.cover_fallback_id])
        .flatten()
        .collect();

    let mut covers: HashMap<Uuid, File> = HashMap::new();
    if !cover_ids.is_empty() {
        for file in state.stores.files.get_many(&cover_ids).await? {
            covers.insert(file.id, file);
        }
    }

    let summary = |id: Option<Uuid>| {
        id.and_then(|id| covers.get(&id))
            .cloned()
            .map(FileSummary::from)
    };

    Ok(albums
        .into_iter()
        .map(|album| AlbumView {
            cover: summary(album.cover_id),
            cover_fallback: summary(album.cover_fallback_id),
            album,
        })
        .collect())
}

async fn find_album(state: &AppState, raw_id: &str) -> ApiResult<Album> {
    let id = parse_id(raw_id, NOT_FOUND)?;
    state
        .stores
        .albums
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))
}

/// Paginated album listing; published albums sorted by name unless asked otherwise
pub async fn list_albums(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<AlbumListParams>,
) -> ApiResult<Json<Page<AlbumView>>> {
    let request = page_request(params.page, params.limit)?;

    let filter = AlbumFilter {
        status: params.status.unwrap_or(DraftStatus::Posted),
        favorites: params.favorites.unwrap_or(false),
        featured: params.featured.unwrap_or(false),
    };

    let query = AlbumQuery::new(filter)
        .search(search_term(params.search)?)
        .sort_by_name(Some(params.sort.as_deref().unwrap_or("lowerName")))
        .order(params.order.unwrap_or_default())
        .window(request.window());

    let count = state.stores.albums.count(&query).await?;
    let albums = if query.window.is_empty() {
        Vec::new()
    } else {
        state.stores.albums.list(&query).await?
    };

    let views = album_views(&state, albums).await?;
    Ok(Json(request.into_page(views, count)))
}

pub async fn get_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AlbumView>> {
    let album = find_album(&state, &id).await?;
    let mut views = album_views(&state, vec![album]).await?;
    views
        .pop()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))
}

/// Files of one album, by name
pub async fn album_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<Page<File>>> {
    let request = page_request(params.page, params.limit)?;
    let album = find_album(&state, &id).await?;

    let query = FileQuery::new(FileFilter::in_album(album.id))
        .sort(Some(FileSort::LowerName))
        .window(request.window());

    let count = state.stores.files.count(&query).await?;
    let files = if query.window.is_empty() {
        Vec::new()
    } else {
        state.stores.files.list(&query).await?
    };

    Ok(Json(request.into_page(files, count)))
}

async fn apply_changes(state: &AppState, id: Uuid, changes: &AlbumChanges) -> ApiResult<Album> {
    state
        .stores
        .albums
        .update(id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))
}

pub async fn publish_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Album>> {
    let id = parse_id(&id, NOT_FOUND)?;
    let album = apply_changes(&state, id, &AlbumChanges::publish(Utc::now())).await?;
    info!("Published album {}", album.id);
    Ok(Json(album))
}

pub async fn unpublish_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Album>> {
    let id = parse_id(&id, NOT_FOUND)?;
    let album = apply_changes(&state, id, &AlbumChanges::unpublish()).await?;
    info!("Unpublished album {}", album.id);
    Ok(Json(album))
}

/// Check that a cover reference, when set, names an existing file
async fn ensure_cover(state: &AppState, field: &str, cover: Option<Option<Uuid>>) -> ApiResult<()> {
    if let Some(Some(file_id)) = cover {
        if state.stores.files.get(file_id).await?.is_none() {
            return Err(ApiError::Validation(format!(
                "The file referenced by \"{}\" does not exist.",
                field
            )));
        }
    }
    Ok(())
}

/// Partial update; a name clash with another album is a 409
pub async fn update_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(mut changes): ApiJson<AlbumChanges>,
) -> ApiResult<Json<Album>> {
    let id = parse_id(&id, NOT_FOUND)?;

    if changes.is_empty() {
        return Err(ApiError::Validation("No changes provided.".to_string()));
    }
    if let Some(name) = changes.name.as_mut() {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ApiError::Validation(
                "The album name must not be empty.".to_string(),
            ));
        }
        *name = trimmed.to_string();
    }
    ensure_cover(&state, "coverId", changes.cover_id).await?;
    ensure_cover(&state, "coverFallbackId", changes.cover_fallback_id).await?;

    let album = apply_changes(&state, id, &changes).await?;
    Ok(Json(album))
}

/// Delete an album, detaching or deleting its files per the configured policy
pub async fn delete_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedAlbum>> {
    let album = find_album(&state, &id).await?;

    let files = match state.delete_policy {
        DeletePolicy::Detach => state.stores.files.detach_album(album.id).await?,
        DeletePolicy::Cascade => state.stores.files.delete_by_album(album.id).await?,
    };
    let deleted = state.stores.albums.delete(album.id).await?;

    info!(
        "Deleted album {} ({:?}, {} files affected)",
        album.id, state.delete_policy, files
    );
    Ok(Json(DeletedAlbum { deleted, files }))
}
