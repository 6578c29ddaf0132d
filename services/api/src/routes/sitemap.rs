//! Sitemap route

use axum::{Json, Router, extract::State, routing::get};

use common::query::{AlbumFilter, AlbumQuery, AlbumSort};

use super::RouteModule;
use crate::{error::ApiResult, state::AppState};

pub fn module() -> RouteModule {
    RouteModule::new(8, "/sitemap").public(Router::new().route("/", get(sitemap)))
}

/// Client paths of every album, ordered by album name
pub async fn sitemap(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let query = AlbumQuery::new(AlbumFilter::default()).sort(Some(AlbumSort::LowerName));
    let albums = state.stores.albums.list(&query).await?;

    Ok(Json(
        albums
            .into_iter()
            .map(|album| format!("/albums/{}", album.id))
            .collect(),
    ))
}
