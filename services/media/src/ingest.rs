//! Gallery ingestion
//!
//! Registers every image below the gallery root. The directory holding an
//! image names its album; albums created here start as drafts.

use anyhow::Result;
use common::Stores;
use common::models::{AlbumChanges, File, FileChanges, NewAlbum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::metadata;

/// Counters for a single pass over the gallery
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub scanned: usize,
    pub inserted: usize,
    pub linked: usize,
    pub albums_created: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct Ingestor {
    stores: Stores,
    root: PathBuf,
    running: Arc<Mutex<()>>,
}

impl Ingestor {
    pub fn new(stores: Stores, root: impl Into<PathBuf>) -> Self {
        Self {
            stores,
            root: root.into(),
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Image paths below the root, in a stable order
    fn image_paths(root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| metadata::is_image(path))
            .collect()
    }

    /// Walk the gallery once, waiting for a pass already in progress
    pub async fn run(&self) -> Result<IngestReport> {
        let _guard = self.running.lock().await;
        self.pass().await
    }

    /// Walk the gallery once unless a pass is already in progress.
    /// Returns `None` when skipped.
    pub async fn tick(&self) -> Option<Result<IngestReport>> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!("Previous ingestion still running, skipping this tick");
            return None;
        };
        Some(self.pass().await)
    }

    /// One walk; callers hold the `running` lock
    async fn pass(&self) -> Result<IngestReport> {
        if !self.root.is_dir() {
            anyhow::bail!("gallery directory {} does not exist", self.root.display());
        }

        let root = self.root.clone();
        let paths = tokio::task::spawn_blocking(move || Self::image_paths(&root)).await?;
        info!("Found {} images under {}", paths.len(), self.root.display());

        let mut report = IngestReport::default();
        for path in paths {
            report.scanned += 1;
            if let Err(e) = self.ingest_file(&path, &mut report).await {
                report.failed += 1;
                error!("Failed to ingest {}: {:#}", path.display(), e);
            }
        }

        info!(
            "Ingestion finished: {} scanned, {} inserted, {} linked, {} albums created, {} failed",
            report.scanned, report.inserted, report.linked, report.albums_created, report.failed
        );
        Ok(report)
    }

    async fn ingest_file(&self, path: &Path, report: &mut IngestReport) -> Result<()> {
        let name = metadata::file_name(path)?;

        let file = match self.stores.files.find_by_name(&name).await? {
            Some(file) => file,
            None => {
                let owned = path.to_path_buf();
                let info = tokio::task::spawn_blocking(move || metadata::read_image_info(&owned))
                    .await??;
                let file = self.stores.files.insert(info.into_new_file(&name)).await?;
                report.inserted += 1;
                info!("{}: inserted", name);
                file
            }
        };

        if file.album_id.is_none() {
            self.link_to_album(path, &file, report).await?;
        }
        Ok(())
    }

    async fn link_to_album(&self, path: &Path, file: &File, report: &mut IngestReport) -> Result<()> {
        let album_name = metadata::album_name(path)?;

        let album = match self.stores.albums.find_by_name(&album_name).await? {
            Some(album) => album,
            None => {
                let album = self.stores.albums.insert(NewAlbum::named(&album_name)).await?;
                report.albums_created += 1;
                info!("Album {} created as a draft", album.name);
                album
            }
        };

        if self
            .stores
            .files
            .update(file.id, &FileChanges::link_to(album.id))
            .await?
            .is_none()
        {
            anyhow::bail!("file {} disappeared before it could be linked", file.id);
        }
        // an empty change set still stamps modifiedAt
        self.stores
            .albums
            .update(album.id, &AlbumChanges::default())
            .await?;

        report.linked += 1;
        debug!("{}: linked to {}", file.name, album.name);
        Ok(())
    }

    /// Run on a cron schedule until the returned scheduler is shut down.
    /// A pass that is still running when the next one fires is skipped.
    pub async fn schedule(&self, schedule: &str) -> Result<JobScheduler> {
        let ingestor = self.clone();
        let scheduler = JobScheduler::new().await?;

        let job = Job::new_async(schedule, move |_, _| {
            let ingestor = ingestor.clone();
            Box::pin(async move {
                if let Some(Err(e)) = ingestor.tick().await {
                    error!("Scheduled ingestion failed: {:#}", e);
                }
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        info!("Scheduled gallery ingestion: {}", schedule);
        Ok(scheduler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::query::{AlbumFilter, AlbumQuery, DraftStatus};

    struct Gallery(PathBuf);

    impl Gallery {
        fn new() -> Self {
            let root = std::env::temp_dir().join(format!("gallery-{}", uuid::Uuid::new_v4()));
            std::fs::create_dir_all(&root).unwrap();
            Self(root)
        }

        fn image(&self, album: &str, name: &str, width: u32, height: u32) {
            let dir = self.0.join(album);
            std::fs::create_dir_all(&dir).unwrap();
            image::RgbImage::new(width, height).save(dir.join(name)).unwrap();
        }

        fn text(&self, album: &str, name: &str) {
            let dir = self.0.join(album);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join(name), "not an image").unwrap();
        }
    }

    impl Drop for Gallery {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    fn all_albums() -> AlbumQuery {
        AlbumQuery::new(AlbumFilter {
            status: DraftStatus::All,
            ..AlbumFilter::default()
        })
    }

    #[tokio::test]
    async fn test_images_are_inserted_and_linked() {
        let gallery = Gallery::new();
        gallery.image("Summer", "beach.png", 4, 3);
        gallery.image("Summer", "dunes.png", 2, 2);
        gallery.image("Winter", "snow.png", 1, 1);
        gallery.text("Winter", "notes.txt");

        let stores = Stores::memory();
        let report = Ingestor::new(stores.clone(), &gallery.0).run().await.unwrap();

        assert_eq!(report.scanned, 3);
        assert_eq!(report.inserted, 3);
        assert_eq!(report.linked, 3);
        assert_eq!(report.albums_created, 2);
        assert_eq!(report.failed, 0);

        let summer = stores.albums.find_by_name("summer").await.unwrap().unwrap();
        assert!(summer.draft);
        assert_eq!(summer.file_count, 2);

        let beach = stores.files.find_by_name("beach.png").await.unwrap().unwrap();
        assert_eq!(beach.album_id, Some(summer.id));
        assert_eq!(beach.media_type.as_deref(), Some("image/png"));
        assert_eq!(beach.metadata.width, Some(4));
        assert_eq!(beach.metadata.height, Some(3));
        assert!(beach.size > 0);

        assert!(stores.files.find_by_name("notes.txt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_pass_changes_nothing() {
        let gallery = Gallery::new();
        gallery.image("Trip", "a.png", 1, 1);

        let stores = Stores::memory();
        let ingestor = Ingestor::new(stores.clone(), &gallery.0);
        ingestor.run().await.unwrap();
        let report = ingestor.run().await.unwrap();

        assert_eq!(report.scanned, 1);
        assert_eq!(report.inserted, 0);
        assert_eq!(report.linked, 0);
        assert_eq!(stores.albums.count(&all_albums()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_detached_file_joins_existing_album_ignoring_case() {
        let gallery = Gallery::new();
        gallery.image("Portraits", "face.png", 1, 1);

        let stores = Stores::memory();
        let existing = stores
            .albums
            .insert(NewAlbum::named("portraits"))
            .await
            .unwrap();
        let before = existing.modified_at;

        stores
            .files
            .insert(common::models::NewFile::named("FACE.png", 10))
            .await
            .unwrap();

        let report = Ingestor::new(stores.clone(), &gallery.0).run().await.unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(report.linked, 1);
        assert_eq!(report.albums_created, 0);

        let face = stores.files.find_by_name("face.png").await.unwrap().unwrap();
        assert_eq!(face.album_id, Some(existing.id));

        let album = stores.albums.get(existing.id).await.unwrap().unwrap();
        assert!(album.modified_at >= before);
        assert_eq!(album.name, "portraits");
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let gallery = Gallery::new();
        gallery.image("Trip", "a.png", 1, 1);
        gallery.image("Trip", "b.png", 1, 1);

        let stores = Stores::memory();
        let ingestor = Ingestor::new(stores.clone(), &gallery.0);

        let (first, second) = tokio::join!(ingestor.tick(), ingestor.tick());
        let report = first.unwrap().unwrap();
        assert_eq!(report.inserted, 2);
        assert!(second.is_none());

        let held = ingestor.running.lock().await;
        assert!(ingestor.tick().await.is_none());
        drop(held);

        let report = ingestor.tick().await.unwrap().unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.inserted, 0);
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let missing = std::env::temp_dir().join(format!("gallery-{}", uuid::Uuid::new_v4()));
        let result = Ingestor::new(Stores::memory(), missing).run().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_image_is_counted_as_failed() {
        let gallery = Gallery::new();
        gallery.text("Broken", "fake.png");
        gallery.image("Broken", "real.png", 1, 1);

        let stores = Stores::memory();
        let report = Ingestor::new(stores.clone(), &gallery.0).run().await.unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.inserted, 1);
        assert!(stores.files.find_by_name("fake.png").await.unwrap().is_none());
    }
}
