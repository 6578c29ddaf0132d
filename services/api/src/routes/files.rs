//! File routes

use axum::{
    Json, Router,
    extract::{Path, State},
    middleware,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use common::models::{Album, File, FileChanges, FileView};
use common::pagination::Page;
use common::query::{FileFilter, FileQuery, SortOrder};

use super::{RouteModule, search_term};
use crate::{
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiQuery, page_request, parse_id},
    middleware::{RateLimit, rate_limit_middleware},
    state::AppState,
};

const NOT_FOUND: &str = "File not found.";
/// Files returned by `/files/random`
const RANDOM_SAMPLE_SIZE: usize = 35;

pub fn module(state: &AppState) -> RouteModule {
    let random_limit = RateLimit::new(state.limits.random_files.clone(), state.jwt.clone());
    let public = Router::new().route(
        "/random",
        get(random_files).route_layer(middleware::from_fn_with_state(
            random_limit,
            rate_limit_middleware,
        )),
    );

    let protected = Router::new()
        .route("/", get(list_files))
        .route(
            "/:id",
            get(get_file).patch(update_file).delete(delete_file),
        );

    RouteModule::new(4, "/files").public(public).protected(protected)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListParams {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<SortOrder>,
    pub include_album: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludeParams {
    pub include_album: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DeletedFile {
    pub deleted: u64,
}

/// Embed the owning album of every file, looking each album up once
async fn with_albums(state: &AppState, files: Vec<File>) -> ApiResult<Vec<FileView>> {
    let mut albums: HashMap<Uuid, Option<Album>> = HashMap::new();
    for album_id in files.iter().filter_map(|file| file.album_id) {
        if !albums.contains_key(&album_id) {
            let album = state.stores.albums.get(album_id).await?;
            albums.insert(album_id, album);
        }
    }

    Ok(files
        .into_iter()
        .map(|file| {
            let album = file
                .album_id
                .and_then(|id| albums.get(&id).cloned().flatten());
            FileView { file, album }
        })
        .collect())
}

async fn views(state: &AppState, files: Vec<File>, include_album: bool) -> ApiResult<Vec<FileView>> {
    if include_album {
        with_albums(state, files).await
    } else {
        Ok(files.into_iter().map(FileView::from).collect())
    }
}

/// Paginated file listing, sorted by name unless asked otherwise
pub async fn list_files(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<FileListParams>,
) -> ApiResult<Json<Page<FileView>>> {
    let request = page_request(params.page, params.limit)?;

    let query = FileQuery::new(FileFilter::default())
        .search(search_term(params.search)?)
        .sort_by_name(Some(params.sort.as_deref().unwrap_or("lowerName")))
        .order(params.order.unwrap_or_default())
        .window(request.window());

    let count = state.stores.files.count(&query).await?;
    let files = if query.window.is_empty() {
        Vec::new()
    } else {
        state.stores.files.list(&query).await?
    };

    let data = views(&state, files, params.include_album.unwrap_or(false)).await?;
    Ok(Json(request.into_page(data, count)))
}

/// Random files that belong to an album, each with its album
pub async fn random_files(State(state): State<AppState>) -> ApiResult<Json<Vec<FileView>>> {
    let files = state.stores.files.sample(RANDOM_SAMPLE_SIZE).await?;
    Ok(Json(with_albums(&state, files).await?))
}

/// Also mounted as `/images/:id`
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<IncludeParams>,
) -> ApiResult<Json<FileView>> {
    let id = parse_id(&id, NOT_FOUND)?;
    let file = state
        .stores
        .files
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))?;

    let mut found = views(&state, vec![file], params.include_album.unwrap_or(false)).await?;
    found
        .pop()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))
}

/// Rename a file or move it between albums
pub async fn update_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(mut changes): ApiJson<FileChanges>,
) -> ApiResult<Json<File>> {
    let id = parse_id(&id, NOT_FOUND)?;

    if changes.is_empty() {
        return Err(ApiError::Validation("No changes provided.".to_string()));
    }
    if let Some(name) = changes.name.as_mut() {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ApiError::Validation(
                "The file name must not be empty.".to_string(),
            ));
        }
        *name = trimmed.to_string();
    }
    if let Some(Some(album_id)) = changes.album_id {
        if state.stores.albums.get(album_id).await?.is_none() {
            return Err(ApiError::Validation(
                "The album referenced by \"albumId\" does not exist.".to_string(),
            ));
        }
    }

    let file = state
        .stores
        .files
        .update(id, &changes)
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))?;
    Ok(Json(file))
}

pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedFile>> {
    let id = parse_id(&id, NOT_FOUND)?;
    let deleted = state.stores.files.delete(id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound(NOT_FOUND.to_string()));
    }
    Ok(Json(DeletedFile { deleted }))
}
