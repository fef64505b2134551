//! Off-thread raster persistence.
//!
//! The writer owns its store on a dedicated thread. `submit` never blocks on
//! disk; the returned receiver is awaited only where the caller needs the
//! file to exist.

use crate::error::{SynthError, SynthResult};
use crate::raster::grid::Grid;
use crate::raster::store::RasterStore;
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::path::PathBuf;
use std::thread::JoinHandle;
use tracing::debug;

struct WriteJob {
    grid: Grid<u16>,
    key: String,
    reply: Sender<Option<PathBuf>>,
}

pub struct BackgroundRasterWriter {
    job_sender: Option<Sender<WriteJob>>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundRasterWriter {
    pub fn new(store: Box<dyn RasterStore>) -> Self {
        let (job_tx, job_rx) = unbounded::<WriteJob>();
        let worker = std::thread::spawn(move || {
            while let Ok(job) = job_rx.recv() {
                let path = store.save(&job.grid, &job.key);
                debug!(key = %job.key, saved = path.is_some(), "background raster write");
                let _ = job.reply.send(path);
            }
        });
        Self {
            job_sender: Some(job_tx),
            worker: Some(worker),
        }
    }

    /// Queue a write. The receiver yields the saved path, or `None` if the
    /// store could not write it.
    pub fn submit(&self, grid: Grid<u16>, key: impl Into<String>) -> SynthResult<Receiver<Option<PathBuf>>> {
        let sender = self.job_sender.as_ref().ok_or(SynthError::WriterClosed)?;
        let (reply_tx, reply_rx) = bounded(1);
        sender
            .send(WriteJob {
                grid,
                key: key.into(),
                reply: reply_tx,
            })
            .map_err(|_| SynthError::WriterClosed)?;
        Ok(reply_rx)
    }

    /// Finish queued writes and stop the worker.
    pub fn shutdown(&mut self) {
        self.job_sender.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for BackgroundRasterWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::store::PngRasterStore;

    #[test]
    fn test_writes_land_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = PngRasterStore::new(dir.path());
        let writer = BackgroundRasterWriter::new(Box::new(store.clone()));

        let grid = Grid::new(4, 2, 1234u16);
        let pending: Vec<_> = (0..3)
            .map(|i| writer.submit(grid.clone(), format!("step-{i}")).unwrap())
            .collect();

        for rx in pending {
            let path = rx.recv().unwrap().unwrap();
            assert_eq!(store.load(&path).unwrap(), grid);
        }
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BackgroundRasterWriter::new(Box::new(PngRasterStore::new(dir.path())));
        writer.shutdown();
        assert!(matches!(writer.submit(Grid::new(1, 1, 0u16), "late"), Err(SynthError::WriterClosed)));
    }
}
