//! Playlist data model and repository.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppResult;

/// Playlist model.
///
/// `songs` is a JSON-encoded text blob holding the ordered list of
/// filenames, decoded leniently on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    /// Unique playlist ID.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Playlist name, unique per user.
    pub name: String,
    /// JSON-encoded song filename list.
    pub songs: String,
}

impl Playlist {
    /// Create a new, empty playlist for a user.
    pub fn new(user_id: Uuid, name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            songs: "[]".to_string(),
        }
    }

    /// Decode the stored song list.
    ///
    /// A malformed or empty blob decodes to the empty list; corruption is
    /// logged rather than surfaced so one bad row cannot take listing down.
    pub fn song_list(&self) -> Vec<String> {
        if self.songs.is_empty() {
            return Vec::new();
        }

        match serde_json::from_str(&self.songs) {
            Ok(songs) => songs,
            Err(e) => {
                tracing::warn!(
                    playlist_id = %self.id,
                    name = %self.name,
                    error = %e,
                    "Malformed song list in store, treating as empty"
                );
                Vec::new()
            }
        }
    }

    fn push_song(&mut self, filename: &str) -> AppResult<()> {
        let mut songs = self.song_list();
        songs.push(filename.to_string());
        self.songs = serde_json::to_string(&songs)?;
        Ok(())
    }
}

/// Playlist storage format for JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PlaylistStore {
    playlists: Vec<Playlist>,
}

/// Trait for playlist repository operations.
pub trait PlaylistRepository: Send + Sync {
    /// Find a playlist by owner and name.
    fn find_by_user_and_name(&self, user_id: Uuid, name: &str) -> AppResult<Option<Playlist>>;

    /// Get all playlists owned by a user.
    fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Playlist>>;

    /// Append a song to a user's playlist, creating the playlist if it
    /// does not exist yet.
    fn append_song(&self, user_id: Uuid, name: &str, filename: &str) -> AppResult<Playlist>;
}

/// JSON file-based playlist repository.
#[derive(Debug)]
pub struct JsonPlaylistRepository {
    file_path: PathBuf,
    /// In-memory cache for fast reads.
    cache: RwLock<HashMap<Uuid, Playlist>>,
}

impl JsonPlaylistRepository {
    /// Create a new JSON playlist repository.
    pub fn new(file_path: impl AsRef<Path>) -> AppResult<Self> {
        let file_path = file_path.as_ref().to_path_buf();
        let repo = Self {
            file_path,
            cache: RwLock::new(HashMap::new()),
        };

        repo.load()?;

        Ok(repo)
    }

    /// Load playlists from file into cache.
    fn load(&self) -> AppResult<()> {
        if !self.file_path.exists() {
            tracing::info!(path = %self.file_path.display(), "Playlists file not found, starting fresh");
            return Ok(());
        }

        let content = std::fs::read_to_string(&self.file_path)?;
        let store: PlaylistStore = serde_json::from_str(&content)?;

        let mut cache = self.cache.write();
        cache.clear();
        for playlist in store.playlists {
            cache.insert(playlist.id, playlist);
        }

        tracing::info!(count = cache.len(), "Loaded playlists from file");
        Ok(())
    }

    /// Save playlists from cache to file.
    fn save(&self) -> AppResult<()> {
        let cache = self.cache.read();
        let store = PlaylistStore {
            playlists: cache.values().cloned().collect(),
        };

        let content = serde_json::to_string_pretty(&store)?;

        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write atomically using temp file
        let temp_path = self.file_path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &self.file_path)?;

        tracing::debug!(path = %self.file_path.display(), count = cache.len(), "Saved playlists to file");
        Ok(())
    }
}

impl PlaylistRepository for JsonPlaylistRepository {
    fn find_by_user_and_name(&self, user_id: Uuid, name: &str) -> AppResult<Option<Playlist>> {
        let cache = self.cache.read();
        Ok(cache
            .values()
            .find(|p| p.user_id == user_id && p.name == name)
            .cloned())
    }

    fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Playlist>> {
        let cache = self.cache.read();
        Ok(cache
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    fn append_song(&self, user_id: Uuid, name: &str, filename: &str) -> AppResult<Playlist> {
        let playlist = {
            // Lookup, lazy create and append happen under one write lock,
            // so an append can never land on a stale song list.
            let mut cache = self.cache.write();

            let id = cache
                .values()
                .find(|p| p.user_id == user_id && p.name == name)
                .map(|p| p.id);

            let playlist = match id {
                Some(id) => cache.get_mut(&id).expect("playlist id came from the cache"),
                None => {
                    let created = Playlist::new(user_id, name.to_string());
                    tracing::info!(
                        playlist_id = %created.id,
                        user_id = %user_id,
                        name = %name,
                        "Created new playlist"
                    );
                    cache.entry(created.id).or_insert(created)
                }
            };

            playlist.push_song(filename)?;
            playlist.clone()
        };

        self.save()?;
        tracing::info!(
            playlist_id = %playlist.id,
            name = %playlist.name,
            filename = %filename,
            "Appended song to playlist"
        );
        Ok(playlist)
    }
}

/// Thread-safe wrapper for playlist repository.
pub type SharedPlaylistRepository = Arc<dyn PlaylistRepository>;
