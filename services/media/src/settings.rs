use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct IngestSettings {
    pub gallery_dir: PathBuf,
    /// Cron expression; `None` means a single pass
    pub schedule: Option<String>,
}

impl IngestSettings {
    pub fn from_env() -> Result<Self> {
        let gallery_dir = env::var("MEDIA_GALLERY_DIR")
            .context("MEDIA_GALLERY_DIR must point at the gallery root")?;

        let schedule = env::var("MEDIA_INGEST_SCHEDULE")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            gallery_dir: PathBuf::from(gallery_dir),
            schedule,
        })
    }
}
