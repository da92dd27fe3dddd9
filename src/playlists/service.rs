//! Conversion pipeline: acquire a track and file it into a playlist.
//!
//! Admission happens in-request (field checks and the target-name
//! reservation), the download and the playlist append run in a spawned
//! task tracked by the job registry.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::fetch::{AudioFetcher, SharedFetcher};
use crate::jobs::{ConversionJob, JobRegistry};
use crate::playlists::repository::{PlaylistRepository, SharedPlaylistRepository};

/// Orchestrates acquisition and playlist bookkeeping.
pub struct ConvertService {
    audio_folder: PathBuf,
    playlists: SharedPlaylistRepository,
    fetcher: SharedFetcher,
    jobs: Arc<JobRegistry>,
}

impl ConvertService {
    pub fn new(
        audio_folder: PathBuf,
        playlists: SharedPlaylistRepository,
        fetcher: SharedFetcher,
        jobs: Arc<JobRegistry>,
    ) -> Self {
        Self {
            audio_folder,
            playlists,
            fetcher,
            jobs,
        }
    }

    /// Admit a conversion: reserve the target filename and enqueue a job.
    ///
    /// The reservation creates the final file with `create_new`, so the
    /// existence check and the claim are one atomic step — two requests
    /// for the same name cannot both pass.
    pub fn admit(
        &self,
        user_id: Uuid,
        playlist: &str,
        filename: &str,
    ) -> AppResult<ConversionJob> {
        self.reserve(filename)?;
        Ok(self.jobs.enqueue(user_id, playlist, filename))
    }

    /// Drive an admitted job to a terminal state.
    pub async fn run(&self, job: &ConversionJob, url: &str) {
        self.jobs.mark_running(job.id);

        match self.execute(job, url).await {
            Ok(()) => {
                self.jobs.complete(job.id);
                tracing::info!(job_id = %job.id, filename = %job.filename, "Conversion completed");
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "Conversion failed");
                self.jobs.fail(job.id, e.to_string());
            }
        }
    }

    async fn execute(&self, job: &ConversionJob, url: &str) -> AppResult<()> {
        let dest = self.target_path(&job.filename);

        if let Err(e) = self.fetcher.fetch(url, &dest).await {
            self.remove_target(&dest);
            return Err(e.into());
        }

        if let Err(e) = self
            .playlists
            .append_song(job.user_id, &job.playlist, &job.filename)
        {
            // The download succeeded but the bookkeeping did not; remove
            // the file so the two sides stay consistent.
            self.remove_target(&dest);
            return Err(e);
        }

        Ok(())
    }

    fn target_path(&self, filename: &str) -> PathBuf {
        self.audio_folder.join(filename)
    }

    fn reserve(&self, filename: &str) -> AppResult<PathBuf> {
        let path = self.target_path(filename);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(path),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(AppError::file_exists(filename))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn remove_target(&self, path: &Path) {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove target file");
            }
        }
    }
}
