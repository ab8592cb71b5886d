use crate::Result;
use image::{ImageFormat, RgbImage};
use std::path::Path;
use tempfile::NamedTempFile;

/// Uniquely named JPEG on local disk, removed when dropped
pub struct TempImage {
    file: NamedTempFile,
}

impl TempImage {
    /// Encode `frame` as JPEG into a fresh temp file under `dir`
    /// (the OS temp dir when `None`)
    pub fn write(frame: &RgbImage, dir: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("motion-").suffix(".jpg");

        let file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        frame.save_with_format(file.path(), ImageFormat::Jpeg)?;
        tracing::debug!("Wrote temp image {}", file.path().display());

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.path())?)
    }

    /// Delete the file now, reporting any failure
    pub fn cleanup(self) -> Result<()> {
        self.file.close()?;
        Ok(())
    }
}
