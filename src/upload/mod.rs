mod directory;
mod dropbox;
mod temp_image;

pub use directory::DirectoryStore;
pub use dropbox::DropboxStore;
pub use temp_image::TempImage;

use crate::{Result, TIMESTAMP_FORMAT};
use chrono::{DateTime, Local};
use image::RgbImage;
use std::path::PathBuf;

/// Trait for destinations of confirmed motion frames
pub trait ObjectStore {
    /// Write `bytes` at `path`
    fn put_file(&mut self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Remote path for a frame captured at `timestamp`
pub fn remote_path(base_path: &str, timestamp: DateTime<Local>) -> String {
    format!(
        "{}/{}.jpg",
        base_path.trim_end_matches('/'),
        timestamp.format(TIMESTAMP_FORMAT)
    )
}

/// Persists confirmed motion frames to an object store
pub struct Uploader {
    store: Box<dyn ObjectStore>,
    base_path: String,
    temp_dir: Option<PathBuf>,
}

impl Uploader {
    pub fn new(
        store: Box<dyn ObjectStore>,
        base_path: impl Into<String>,
        temp_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            store,
            base_path: base_path.into(),
            temp_dir,
        }
    }

    /// Store the annotated frame and return the path it was written to
    ///
    /// The frame goes through a temp JPEG, which is deleted afterwards
    /// whether or not the store accepted it.
    pub fn on_motion_confirmed(
        &mut self,
        frame: &RgbImage,
        timestamp: DateTime<Local>,
    ) -> Result<String> {
        let _span = tracing::debug_span!("upload").entered();

        let temp = TempImage::write(frame, self.temp_dir.as_deref())?;
        let bytes = temp.read()?;
        let path = remote_path(&self.base_path, timestamp);

        tracing::info!("Uploading {} ({} bytes) to {}", path, bytes.len(), self.store.name());
        self.store.put_file(&path, &bytes)?;

        if let Err(e) = temp.cleanup() {
            tracing::warn!("Failed to remove temp image: {}", e);
        }

        Ok(path)
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use chrono::TimeZone;
    use image::Rgb;
    use tempfile::TempDir;

    struct FailingStore;

    impl ObjectStore for FailingStore {
        fn put_file(&mut self, _path: &str, _bytes: &[u8]) -> Result<()> {
            Err(Error::Upload("offline".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn timestamp() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 16, 9, 5, 3).single().unwrap()
    }

    #[test]
    fn test_remote_path_format() {
        assert_eq!(
            remote_path("/motion", timestamp()),
            "/motion/Friday 16 October 2026 09:05:03.jpg"
        );
        assert_eq!(
            remote_path("/motion/", timestamp()),
            "/motion/Friday 16 October 2026 09:05:03.jpg"
        );
        assert_eq!(remote_path("", timestamp()), "/Friday 16 October 2026 09:05:03.jpg");
    }

    #[test]
    fn test_upload_writes_jpeg_to_store() {
        let store_dir = TempDir::new().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let mut uploader = Uploader::new(
            Box::new(DirectoryStore::new(store_dir.path())),
            "/motion",
            Some(temp_dir.path().to_path_buf()),
        );

        let frame = RgbImage::from_pixel(32, 24, Rgb([90, 90, 90]));
        let path = uploader.on_motion_confirmed(&frame, timestamp()).unwrap();

        let stored = store_dir.path().join(path.trim_start_matches('/'));
        let decoded = image::open(stored).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));

        // Temp image is gone once the upload finished
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_upload_removes_temp_image() {
        let temp_dir = TempDir::new().unwrap();
        let mut uploader = Uploader::new(
            Box::new(FailingStore),
            "/motion",
            Some(temp_dir.path().to_path_buf()),
        );

        let frame = RgbImage::new(8, 8);
        assert!(uploader.on_motion_confirmed(&frame, timestamp()).is_err());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }
}
