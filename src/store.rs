use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use crate::error::{BitcaskError, Result};

/// Encapsulates read, write, remove, and sync operations on a single segment file.
///
/// Two file handles are kept open: a writer opened append-only and a reader opened
/// read-only. Writes always land at end-of-file (letting the kernel do its usual
/// append-mode optimizations); reads are positional, so the reader handle never needs
/// to track or share a cursor with the writer.
///
/// The reader handle is never closed until the `Store` itself is dropped or
/// [`Store::remove`] is called — deliberately: reopening a file handle on every
/// inactive-segment read would add latency, at the cost of a larger open-FD
/// footprint.
pub struct Store {
    writer: Option<File>,
    reader: File,
    current_write_offset: u64,
    path: PathBuf,
}

impl Store {
    /// Opens a `Store` for a segment that will be written to, creating the file if
    /// necessary. Both a writer and a reader handle are opened.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        let reader = OpenOptions::new().read(true).open(&path)?;
        Ok(Store {
            writer: Some(writer),
            reader,
            current_write_offset: 0,
            path,
        })
    }

    /// Opens a `Store` for a segment discovered at start-up that will never receive
    /// further writes: only the reader handle is created.
    pub fn reload(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let reader = OpenOptions::new().read(true).open(&path)?;
        let current_write_offset = reader.metadata()?.len();
        Ok(Store {
            writer: None,
            reader,
            current_write_offset,
            path,
        })
    }

    /// Appends `bytes` to the file, returning the offset the write started at.
    ///
    /// Fails with an I/O error if writes have been stopped (via [`Store::stop_writes`])
    /// or the store was opened with [`Store::reload`], neither of which have a writer
    /// handle.
    pub fn append(&mut self, bytes: &[u8]) -> Result<u64> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            BitcaskError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "store has no open writer",
            ))
        })?;
        let written = writer.write_and_count(bytes)?;
        if written < bytes.len() {
            return Err(BitcaskError::ShortWrite {
                written,
                expected: bytes.len(),
            });
        }
        let offset = self.current_write_offset;
        self.current_write_offset += written as u64;
        Ok(offset)
    }

    /// Reads exactly `size` bytes starting at `offset`.
    pub fn read(&self, offset: u64, size: u32) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; size as usize];
        let read = self.reader.read_at(&mut buf, offset)?;
        if read != size as usize {
            return Err(BitcaskError::ShortRead {
                read,
                expected: size as usize,
                offset,
            });
        }
        Ok(buf)
    }

    /// Returns the entire file contents.
    pub fn read_full(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }

    /// Returns the file size in bytes, as tracked by the write cursor.
    pub fn size_in_bytes(&self) -> u64 {
        self.current_write_offset
    }

    /// Flushes the writer to stable storage.
    pub fn sync(&self) -> Result<()> {
        if let Some(writer) = &self.writer {
            writer.sync_all()?;
        }
        Ok(())
    }

    /// Closes the write handle. Called when the active segment has reached its size
    /// threshold and is being sealed.
    pub fn stop_writes(&mut self) {
        self.writer = None;
    }

    /// Removes the underlying file.
    pub fn remove(&self) -> Result<()> {
        fs::remove_file(&self.path)?;
        Ok(())
    }
}

trait WriteAndCount {
    fn write_and_count(&mut self, bytes: &[u8]) -> Result<usize>;
}

impl WriteAndCount for File {
    fn write_and_count(&mut self, bytes: &[u8]) -> Result<usize> {
        use std::io::Write;
        let written = self.write(bytes)?;
        Ok(written)
    }
}

/// Returns `{file_id}_bitcask.data` inside `directory`, the segment file naming
/// scheme shared by [`crate::segment::Segment`] and the bootstrap scan in
/// [`crate::segments::Segments`].
pub fn segment_file_name(file_id: u64, directory: &Path) -> PathBuf {
    directory.join(format!("{file_id}_bitcask.data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn read_and_write_a_single_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store_test_file");
        let mut store = Store::open(&path).unwrap();

        let message = b"Welcome to new world!";
        let offset = store.append(message).unwrap();
        assert_eq!(offset, 0);

        let actual = store.read(offset, message.len() as u32).unwrap();
        assert_eq!(actual, message);
    }

    #[test]
    fn multiple_reads_and_writes_land_at_the_right_offsets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store_test_file");
        let mut store = Store::open(&path).unwrap();

        let welcome = b"Welcome to new world!";
        let hello = b"Hello world";
        let bye = b"Bye bye world";

        let welcome_offset = store.append(welcome).unwrap();
        let hello_offset = store.append(hello).unwrap();
        let bye_offset = store.append(bye).unwrap();

        assert_eq!(store.read(welcome_offset, welcome.len() as u32).unwrap(), welcome);
        assert_eq!(store.read(hello_offset, hello.len() as u32).unwrap(), hello);
        assert_eq!(store.read(bye_offset, bye.len() as u32).unwrap(), bye);
    }

    #[test]
    fn stop_writes_makes_further_appends_fail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store_test_file");
        let mut store = Store::open(&path).unwrap();
        store.append(b"Key1").unwrap();
        store.stop_writes();

        assert!(store.append(b"Key2").is_err());
    }

    #[test]
    fn reload_opens_only_a_reader_and_tracks_existing_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store_test_file");
        {
            let mut store = Store::open(&path).unwrap();
            store.append(b"Key1").unwrap();
            store.sync().unwrap();
        }

        let reloaded = Store::reload(&path).unwrap();
        assert_eq!(reloaded.size_in_bytes(), 4);
        assert_eq!(reloaded.read(0, 4).unwrap(), b"Key1");
    }
}
