//! Audio acquisition via yt-dlp.
//!
//! The fetcher is the one seam to the outside world: given a source URL
//! and a destination path, it must leave a finished audio file at exactly
//! that path, or fail. No progress reporting, no retries.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use uuid::Uuid;

use crate::error::AppError;

/// Extension of every file the fetcher produces.
pub const AUDIO_EXT: &str = "mp3";

/// Format selector handed to yt-dlp.
const FORMAT_SELECTOR: &str = "bestaudio/best";

/// Target bitrate for the extracted audio.
const AUDIO_QUALITY: &str = "320K";

/// How much of stderr to keep in an error message.
const STDERR_TAIL_BYTES: usize = 2048;

/// Fetcher errors.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to launch downloader: {0}")]
    Spawn(std::io::Error),

    #[error("Downloader failed: {0}")]
    Failed(String),

    #[error("Downloader reported success but produced no output file")]
    MissingOutput,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        AppError::Download(err.to_string())
    }
}

/// Trait for audio acquisition.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Download the audio track of `url` and write it to `dest`.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError>;
}

/// yt-dlp subprocess fetcher.
///
/// Downloads best-available audio and extracts it to mp3 at a fixed
/// bitrate. yt-dlp decides the intermediate container itself, so the
/// download goes through a hidden staging name with an `%(ext)s`
/// template and the finished mp3 is renamed onto `dest`.
pub struct YtDlpFetcher {
    binary: PathBuf,
}

impl YtDlpFetcher {
    /// Create a fetcher running the given yt-dlp binary.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn staging_stem(dest: &Path) -> PathBuf {
        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        dir.join(format!(".fetch-{}", Uuid::new_v4()))
    }

    /// Best-effort removal of staging leftovers after a failed run.
    fn cleanup_staging(stem: &Path) {
        let Some(dir) = stem.parent() else { return };
        let Some(prefix) = stem.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        let Ok(entries) = std::fs::read_dir(dir) else { return };

        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(prefix) {
                if let Err(e) = std::fs::remove_file(entry.path()) {
                    tracing::warn!(path = %entry.path().display(), error = %e, "Failed to remove staging file");
                }
            }
        }
    }
}

#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        let stem = Self::staging_stem(dest);
        let output_template = format!("{}.%(ext)s", stem.display());

        tracing::info!(url = %url, dest = %dest.display(), "Starting download");

        let output = Command::new(&self.binary)
            .arg("--format")
            .arg(FORMAT_SELECTOR)
            .arg("--extract-audio")
            .arg("--audio-format")
            .arg(AUDIO_EXT)
            .arg("--audio-quality")
            .arg(AUDIO_QUALITY)
            .arg("--no-playlist")
            .arg("--output")
            .arg(&output_template)
            .arg("--")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(FetchError::Spawn)?;

        if !output.status.success() {
            Self::cleanup_staging(&stem);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let mut tail_start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
            while !stderr.is_char_boundary(tail_start) {
                tail_start += 1;
            }
            let message = stderr[tail_start..].trim().to_string();
            tracing::warn!(url = %url, status = %output.status, "Download failed");
            return Err(FetchError::Failed(message));
        }

        // The extract-audio postprocessor leaves <stem>.mp3 behind.
        let produced = stem.with_extension(AUDIO_EXT);
        if !produced.exists() {
            Self::cleanup_staging(&stem);
            return Err(FetchError::MissingOutput);
        }

        std::fs::rename(&produced, dest)?;

        tracing::info!(dest = %dest.display(), "Download finished");
        Ok(())
    }
}

/// Shared fetcher handle.
pub type SharedFetcher = std::sync::Arc<dyn AudioFetcher>;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_stem_stays_in_dest_dir() {
        let stem = YtDlpFetcher::staging_stem(Path::new("/srv/audio/track1.mp3"));
        assert_eq!(stem.parent(), Some(Path::new("/srv/audio")));
        assert!(stem
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(".fetch-"));
    }

    #[test]
    fn test_fetch_error_maps_to_download_error() {
        let err: AppError = FetchError::Failed("no such video".to_string()).into();
        assert!(matches!(err, AppError::Download(_)));
        assert!(err.to_string().contains("no such video"));
    }
}
