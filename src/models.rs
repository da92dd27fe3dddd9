use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::SharedUserRepository;
use crate::jobs::JobRegistry;
use crate::playlists::{ConvertService, SharedPlaylistRepository};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub audio_folder: PathBuf,
    pub users: SharedUserRepository,
    pub playlists: SharedPlaylistRepository,
    pub jobs: Arc<JobRegistry>,
    pub convert: Arc<ConvertService>,
}
