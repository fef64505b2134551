//! Raster persistence. A store that cannot find or read a raster reports a
//! miss; callers regenerate instead of failing.

use crate::error::{SynthError, SynthResult};
use crate::raster::grid::Grid;
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub trait RasterStore: Send {
    /// Where `key` would be stored.
    fn path_for(&self, key: &str) -> PathBuf;

    /// Persist `grid` under `key`; `None` when the write failed.
    fn save(&self, grid: &Grid<u16>, key: &str) -> Option<PathBuf>;

    /// Read a raster back; `None` for missing or unreadable files.
    fn load(&self, path: &Path) -> Option<Grid<u16>>;
}

/// Single-channel 16-bit PNG files in one directory.
#[derive(Debug, Clone)]
pub struct PngRasterStore {
    pub dir: PathBuf,
}

impl PngRasterStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn try_save(&self, grid: &Grid<u16>, key: &str) -> SynthResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(grid.width() as u32, grid.height() as u32, grid.cells().to_vec()).ok_or_else(
                || SynthError::InvalidGrid {
                    width: grid.width(),
                    height: grid.height(),
                    len: grid.len(),
                },
            )?;
        img.save_with_format(&path, ImageFormat::Png)?;
        debug!(path = %path.display(), "saved raster");
        Ok(path)
    }

    pub fn try_load(&self, path: &Path) -> SynthResult<Grid<u16>> {
        let img = image::open(path)?;
        match img {
            DynamicImage::ImageLuma16(buf) => {
                let (width, height) = buf.dimensions();
                Grid::from_vec(width as usize, height as usize, buf.into_raw())
            }
            other => Err(SynthError::MalformedRaster {
                path: path.to_path_buf(),
                reason: format!("expected 16-bit luminance, found {:?}", other.color()),
            }),
        }
    }
}

/// File-name-safe form of a cache key.
fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

impl RasterStore for PngRasterStore {
    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.png", sanitize(key)))
    }

    fn save(&self, grid: &Grid<u16>, key: &str) -> Option<PathBuf> {
        match self.try_save(grid, key) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(key, error = %e, "failed to save raster");
                None
            }
        }
    }

    fn load(&self, path: &Path) -> Option<Grid<u16>> {
        if !path.exists() {
            debug!(path = %path.display(), "raster cache miss");
            return None;
        }
        match self.try_load(path) {
            Ok(grid) => Some(grid),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable raster treated as a cache miss");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Grid<u16> {
        let cells = (0..24u16).map(|i| i * 2000).collect();
        Grid::from_vec(6, 4, cells).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = PngRasterStore::new(dir.path());
        let path = store.save(&ramp(), "earth/elevation 0.25").unwrap();
        assert_eq!(path, store.path_for("earth/elevation 0.25"));
        assert_eq!(store.load(&path).unwrap(), ramp());
    }

    #[test]
    fn test_missing_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = PngRasterStore::new(dir.path());
        assert!(store.load(&store.path_for("nothing")).is_none());
    }

    #[test]
    fn test_garbage_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = PngRasterStore::new(dir.path());
        let path = store.path_for("broken");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(store.load(&path).is_none());
    }

    #[test]
    fn test_eight_bit_png_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = PngRasterStore::new(dir.path());
        let path = store.path_for("eight_bit");
        let img: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_raw(2, 2, vec![0, 64, 128, 255]).unwrap();
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        assert!(matches!(store.try_load(&path), Err(SynthError::MalformedRaster { .. })));
        assert!(store.load(&path).is_none());
    }
}
