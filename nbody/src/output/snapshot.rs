//! Raw state snapshots
//!
//! One file per outer step, named by the zero-padded step index
//! (`000000.raw`, `000001.raw`, ...). A file is the state buffer dumped as is:
//! `6n` reals in layout order, native byte order and width, no header.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{NbodyError, Result};
use crate::simulation::states::StateBuffer;

pub const SNAPSHOT_EXTENSION: &str = "raw";

/// File name of snapshot `index`
pub fn snapshot_file_name(index: usize) -> String {
    format!("{index:06}.{SNAPSHOT_EXTENSION}")
}

/// Destination of the per-step checkpoints
///
/// Sinks only borrow the state for the duration of one call
pub trait SnapshotSink {
    fn write_snapshot(&mut self, index: usize, state: &StateBuffer) -> Result<()>;
}

/// Writes each snapshot to `<dir>/<index:06>.raw`
#[derive(Debug, Clone)]
pub struct RawFileWriter {
    dir: PathBuf,
}

impl RawFileWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(snapshot_file_name(index))
    }
}

impl SnapshotSink for RawFileWriter {
    fn write_snapshot(&mut self, index: usize, state: &StateBuffer) -> Result<()> {
        let path = self.path_for(index);
        fs::write(&path, state.as_bytes()).map_err(|source| NbodyError::Io {
            path: path.clone(),
            source,
        })?;
        log::trace!("wrote {} ({} bytes)", path.display(), state.as_bytes().len());
        Ok(())
    }
}

/// Keeps every snapshot in memory, in write order
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub snapshots: Vec<(usize, Vec<u8>)>, // (index, raw bytes)
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotSink for MemorySink {
    fn write_snapshot(&mut self, index: usize, state: &StateBuffer) -> Result<()> {
        self.snapshots.push((index, state.as_bytes().to_vec()));
        Ok(())
    }
}
