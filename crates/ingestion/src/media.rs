//! Media storage for uploaded papers and narrations
//!
//! References stored on paper records are relative to the media root and
//! always use `/` separators.

use crate::errors::IngestionError;
use papercast_common::config::MediaConfig;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// A media file location: the reference stored on records and its path on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPath {
    pub relative: String,
    pub absolute: PathBuf,
}

/// Filesystem layout under the media root
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    audio_dir: String,
    upload_dir: String,
}

impl MediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: config.root.clone(),
            audio_dir: config.audio_dir.trim_matches('/').to_string(),
            upload_dir: config.upload_dir.trim_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored reference against the media root
    pub fn absolute(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }

    fn locate(&self, relative: String) -> MediaPath {
        let absolute = self.absolute(&relative);
        MediaPath { relative, absolute }
    }

    /// Narration of paper `id`
    pub fn paper_audio(&self, id: i32) -> MediaPath {
        self.locate(format!("{}/{}.mp3", self.audio_dir, id))
    }

    /// Scratch narration, written before the paper id is known
    pub fn staged_audio(&self) -> MediaPath {
        self.locate(format!("{}/tmp-{}.mp3", self.audio_dir, Uuid::new_v4()))
    }

    /// Narration of a topic synthesis
    pub fn synthesis_audio(&self, topic: &str) -> MediaPath {
        self.locate(format!("{}/synthesis/{}.mp3", self.audio_dir, slugify(topic)))
    }

    /// Persist an uploaded document under a collision-free name
    pub async fn store_upload(&self, filename: &str, bytes: &[u8]) -> Result<MediaPath, IngestionError> {
        let target = self.locate(format!(
            "{}/{}-{}",
            self.upload_dir,
            Uuid::new_v4(),
            sanitize_filename(filename)
        ));

        if let Some(parent) = target.absolute.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target.absolute, bytes).await?;

        Ok(target)
    }

    /// Move a staged file to its final location
    pub async fn promote(&self, staged: &MediaPath, target: &MediaPath) -> Result<(), IngestionError> {
        if let Some(parent) = target.absolute.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(&staged.absolute, &target.absolute).await?;
        Ok(())
    }

    /// Remove a stored file; a missing file is not an error
    pub async fn remove(&self, path: &MediaPath) {
        if let Err(e) = tokio::fs::remove_file(&path.absolute).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.relative, error = %e, "Failed to remove media file");
            }
        }
    }
}

/// Final path component with anything outside `[A-Za-z0-9._-]` replaced
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim_start_matches('.');

    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "upload.pdf".to_string()
    } else {
        sanitized
    }
}

/// Lowercase, dash-separated form of a topic for file names
pub fn slugify(topic: &str) -> String {
    let slug = topic
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "topic".to_string()
    } else {
        slug
    }
}
