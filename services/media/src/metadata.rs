use common::models::{FileMetadata, NewFile};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{0} has no usable file name")]
    Unnamed(PathBuf),
}

/// Format and size of an image file as read from disk
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub mime_type: String,
    pub size: i64,
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    /// The record to insert for a file named `name`
    pub fn into_new_file(self, name: &str) -> NewFile {
        let mut file = NewFile::named(name, self.size);
        file.media_type = Some(self.mime_type);
        file.metadata = FileMetadata {
            width: Some(self.width),
            height: Some(self.height),
            tags: None,
        };
        file
    }
}

/// Whether the extension names an image format we can read
pub fn is_image(path: &Path) -> bool {
    ImageFormat::from_path(path)
        .map(|format| format.reading_enabled())
        .unwrap_or(false)
}

/// Final path component, used as the stored file name
pub fn file_name(path: &Path) -> Result<String, MetadataError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| MetadataError::Unnamed(path.to_path_buf()))
}

/// Name of the directory holding `path`, which becomes its album name
pub fn album_name(path: &Path) -> Result<String, MetadataError> {
    path.parent()
        .and_then(|dir| dir.file_name())
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| MetadataError::Unnamed(path.to_path_buf()))
}

/// Read size, format and dimensions. Only the image header is decoded.
pub fn read_image_info(path: &Path) -> Result<ImageInfo, MetadataError> {
    let io = |source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    };
    let decode = |source| MetadataError::Image {
        path: path.to_path_buf(),
        source,
    };

    let size = std::fs::metadata(path).map_err(io)?.len();
    let format = ImageFormat::from_path(path).map_err(decode)?;
    let (width, height) = image::image_dimensions(path).map_err(decode)?;
    debug!("{}: {:?} {}x{}", path.display(), format, width, height);

    Ok(ImageInfo {
        mime_type: format.to_mime_type().to_string(),
        size: i64::try_from(size).unwrap_or(i64::MAX),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extensions() {
        assert!(is_image(Path::new("gallery/trip/IMG_001.JPG")));
        assert!(is_image(Path::new("a/b.png")));
        assert!(is_image(Path::new("a/b.webp")));
        assert!(!is_image(Path::new("a/notes.txt")));
        assert!(!is_image(Path::new("a/README")));
    }

    #[test]
    fn test_names_come_from_the_path() {
        let path = Path::new("/srv/gallery/Summer 2023/beach.jpg");
        assert_eq!(file_name(path).unwrap(), "beach.jpg");
        assert_eq!(album_name(path).unwrap(), "Summer 2023");
        assert!(album_name(Path::new("beach.jpg")).is_err());
    }

    #[test]
    fn test_new_file_carries_image_info() {
        let info = ImageInfo {
            mime_type: "image/png".to_string(),
            size: 2048,
            width: 640,
            height: 480,
        };

        let file = info.into_new_file("cat.PNG");
        assert_eq!(file.name, "cat.PNG");
        assert_eq!(file.extname, ".PNG");
        assert_eq!(file.size, 2048);
        assert_eq!(file.media_type.as_deref(), Some("image/png"));
        assert_eq!(file.metadata.width, Some(640));
        assert_eq!(file.metadata.height, Some(480));
        assert!(file.album_id.is_none());
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let err = read_image_info(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, MetadataError::Io { .. }));
    }
}
