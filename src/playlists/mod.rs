//! Playlist storage and the conversion pipeline.

pub mod repository;
pub mod service;

pub use repository::{
    JsonPlaylistRepository, Playlist, PlaylistRepository, SharedPlaylistRepository,
};
pub use service::ConvertService;
