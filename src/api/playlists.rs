//! Playlist listing endpoint.

use actix_web::{get, web, HttpResponse};
use std::collections::BTreeMap;

use crate::auth::AuthenticatedUser;
use crate::error::AppResult;
use crate::models::AppState;
use crate::playlists::PlaylistRepository;

/// List the caller's playlists.
///
/// GET /playlists
///
/// Returns a mapping from playlist name to its ordered song filenames.
/// A playlist whose stored song list is unreadable shows up as empty.
#[get("/playlists")]
pub async fn list_playlists(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let playlists = state.playlists.list_for_user(user.id)?;

    let result: BTreeMap<String, Vec<String>> = playlists
        .into_iter()
        .map(|p| (p.name.clone(), p.song_list()))
        .collect();

    Ok(HttpResponse::Ok().json(result))
}

/// Configure playlist routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_playlists);
}
