use crate::archive::encoder::EntryEncoder;
use crate::archive::entry::{CompressionLevel, CompressionMethod, Entry};
use crate::archive::records::{
    CentralDirectoryHeader, DataDescriptor, DosDateTime, EndOfCentralDirectory, LocalFileHeader,
};
use crate::error::{Result, ZipStreamError};
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, trace};

/// Emission stages, in archive order.
///
/// Entry-indexed stages repeat for every registered entry; `LocalHeader(n)`
/// and `CentralHeader(n)` with `n == entries.len()` are transient and
/// immediately redirect to the next phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    LocalHeader(usize),
    FileName(usize),
    FileData(usize),
    Descriptor(usize),
    CentralHeader(usize),
    CentralName(usize),
    EndRecord,
    Finished,
    Failed,
}

/// Pull-based ZIP archive producer.
///
/// Register entries with [`add_entry`](Self::add_entry), then call
/// [`read`](Self::read) repeatedly to drain the archive byte stream through
/// a caller-supplied buffer of any size. No seeking is ever performed on the
/// output and no file is buffered whole: sizes and CRCs are discovered as
/// each source is streamed and emitted in trailing data descriptors
/// (general-purpose flag bit 3).
///
/// The first `read` call finalizes the entry list; `add_entry` fails from
/// then on. Dropping the producer mid-stream releases the currently open
/// source file and codec state.
pub struct ZipStream {
    entries: Vec<Entry>,
    stage: Stage,
    /// Record bytes staged for the current stage, rebuilt on each stage entry
    staged: Vec<u8>,
    staged_pos: usize,
    /// Active compression backend while in `FileData`
    encoder: Option<EntryEncoder>,
    /// Running total of emitted local-section bytes; doubles as the next
    /// entry's local header offset and, at the end, the central directory
    /// offset
    local_bytes: u32,
    finalized: bool,
    /// First streaming error; replayed by every subsequent `read`
    fault: Option<ZipStreamError>,
}

impl ZipStream {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            stage: Stage::LocalHeader(0),
            staged: Vec::new(),
            staged_pos: 0,
            encoder: None,
            local_bytes: 0,
            finalized: false,
            fault: None,
        }
    }

    /// Number of registered entries
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Register a member file.
    ///
    /// `name` is the path recorded inside the archive; `source` is the file
    /// the data will be streamed from when this entry's turn comes. The
    /// source is only stat'ed here; it must still be openable once
    /// streaming reaches it.
    pub fn add_entry<P: AsRef<Path>>(
        &mut self,
        name: &str,
        source: P,
        method: CompressionMethod,
        level: CompressionLevel,
    ) -> Result<()> {
        if self.finalized {
            return Err(ZipStreamError::InvalidEntry(
                "archive is already finalized".to_string(),
            ));
        }

        let source = source.as_ref();
        let meta = fs::metadata(source).map_err(|e| {
            ZipStreamError::InvalidEntry(format!("{}: {}", source.display(), e))
        })?;
        if !meta.is_file() {
            return Err(ZipStreamError::InvalidEntry(format!(
                "{}: not a regular file",
                source.display()
            )));
        }
        let modified = meta.modified().unwrap_or_else(|_| SystemTime::now());

        let entry = Entry::new(
            name.to_string(),
            source.to_path_buf(),
            modified,
            method,
            level,
        )?;
        debug!(name, method = %method, "entry registered");
        self.entries.push(entry);

        Ok(())
    }

    /// Register a member file with deflate at the default level
    pub fn add_file<P: AsRef<Path>>(&mut self, name: &str, source: P) -> Result<()> {
        self.add_entry(
            name,
            source,
            CompressionMethod::Deflate,
            CompressionLevel::Default,
        )
    }

    /// Seal the entry list and arm the state machine. Called implicitly by
    /// the first `read`; calling it again has no effect.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;
        debug!(entries = self.entries.len(), "archive finalized");
        self.enter(Stage::LocalHeader(0))
    }

    /// Pull up to `buf.len()` archive bytes.
    ///
    /// Returns the number of bytes written into `buf`; `Ok(0)` means the
    /// archive is complete (clean end of stream). A non-terminal stream
    /// never returns 0: zero-length sub-stages (empty names, empty files)
    /// are skipped within the call. Once a streaming error occurs every
    /// further call returns that same error.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        if buf.is_empty() {
            return Err(ZipStreamError::InvalidState(
                "read with zero-capacity buffer".to_string(),
            ));
        }
        self.finalize()?;

        let mut written = 0;
        while written < buf.len() {
            match self.stage {
                Stage::Finished => break,
                Stage::Failed => break,
                Stage::FileData(i) => {
                    let n = match self.encoder.as_mut() {
                        Some(encoder) => encoder.read(&mut buf[written..]),
                        None => Err(ZipStreamError::InvalidState(
                            "data stage without an active encoder".to_string(),
                        )),
                    };
                    let n = match n {
                        Ok(n) => n,
                        Err(e) => return self.fail(e, written),
                    };

                    if n == 0 {
                        // Source exhausted and codec flushed: freeze this
                        // entry and account its full local section.
                        if let Some(encoder) = self.encoder.take() {
                            let entry = &mut self.entries[i];
                            entry.crc32 = encoder.crc32();
                            entry.uncompressed_size = encoder.bytes_read() as u32;
                        }
                        self.local_bytes =
                            self.entries[i].local_offset + self.entries[i].local_section_len();
                        debug!(
                            name = %self.entries[i].name,
                            compressed = self.entries[i].compressed_size,
                            uncompressed = self.entries[i].uncompressed_size,
                            "entry data complete"
                        );
                        if let Err(e) = self.enter(Stage::Descriptor(i)) {
                            return self.fail(e, written);
                        }
                        continue;
                    }

                    self.entries[i].compressed_size += n as u32;
                    written += n;
                }
                _ => {
                    // A staged record or name is being drained
                    if self.staged_pos == self.staged.len() {
                        let next = self.next_stage();
                        if let Err(e) = self.enter(next) {
                            return self.fail(e, written);
                        }
                        continue;
                    }
                    let n = (buf.len() - written).min(self.staged.len() - self.staged_pos);
                    buf[written..written + n]
                        .copy_from_slice(&self.staged[self.staged_pos..self.staged_pos + n]);
                    self.staged_pos += n;
                    written += n;
                }
            }
        }

        Ok(written)
    }

    /// Successor of the current stage once its bytes are fully emitted
    fn next_stage(&self) -> Stage {
        match self.stage {
            Stage::LocalHeader(i) => Stage::FileName(i),
            Stage::FileName(i) => Stage::FileData(i),
            Stage::Descriptor(i) => Stage::LocalHeader(i + 1),
            Stage::CentralHeader(i) => Stage::CentralName(i),
            Stage::CentralName(i) => Stage::CentralHeader(i + 1),
            Stage::EndRecord => Stage::Finished,
            other => other,
        }
    }

    /// Transition into `stage`, staging its record bytes fresh. Exhausted
    /// entry cursors redirect: local phase into the central directory,
    /// central phase into the end record.
    fn enter(&mut self, stage: Stage) -> Result<()> {
        self.staged.clear();
        self.staged_pos = 0;

        match stage {
            Stage::LocalHeader(i) => {
                if i == self.entries.len() {
                    return self.enter(Stage::CentralHeader(0));
                }
                let entry = &mut self.entries[i];
                entry.local_offset = self.local_bytes;
                let header = LocalFileHeader {
                    method: entry.method,
                    modified: DosDateTime::from_system_time(entry.modified),
                    name_len: entry.name_len(),
                }
                .to_bytes();
                self.staged.extend_from_slice(&header);
            }
            Stage::FileName(i) | Stage::CentralName(i) => {
                self.staged.extend_from_slice(self.entries[i].name.as_bytes());
            }
            Stage::FileData(i) => {
                self.encoder = Some(EntryEncoder::open(&self.entries[i])?);
            }
            Stage::Descriptor(i) => {
                let entry = &self.entries[i];
                let descriptor = DataDescriptor {
                    crc32: entry.crc32,
                    compressed_size: entry.compressed_size,
                    uncompressed_size: entry.uncompressed_size,
                }
                .to_bytes();
                self.staged.extend_from_slice(&descriptor);
            }
            Stage::CentralHeader(i) => {
                if i == self.entries.len() {
                    return self.enter(Stage::EndRecord);
                }
                let entry = &self.entries[i];
                let header = CentralDirectoryHeader {
                    method: entry.method,
                    modified: DosDateTime::from_system_time(entry.modified),
                    crc32: entry.crc32,
                    compressed_size: entry.compressed_size,
                    uncompressed_size: entry.uncompressed_size,
                    name_len: entry.name_len(),
                    local_offset: entry.local_offset,
                }
                .to_bytes();
                self.staged.extend_from_slice(&header);
            }
            Stage::EndRecord => {
                let directory_size = self
                    .entries
                    .iter()
                    .map(|e| e.central_section_len())
                    .sum::<u32>();
                let record = EndOfCentralDirectory {
                    entry_count: self.entries.len() as u16,
                    directory_size,
                    directory_offset: self.local_bytes,
                }
                .to_bytes();
                self.staged.extend_from_slice(&record);
            }
            Stage::Finished | Stage::Failed => {}
        }

        trace!(?stage, "stage transition");
        self.stage = stage;

        Ok(())
    }

    /// Poison the stream. Bytes already copied into the caller's buffer are
    /// still delivered; the error surfaces on this call or the next one.
    fn fail(&mut self, err: ZipStreamError, written: usize) -> Result<usize> {
        self.stage = Stage::Failed;
        self.encoder = None;
        self.fault = Some(err.clone());
        if written > 0 {
            Ok(written)
        } else {
            Err(err)
        }
    }
}

impl Default for ZipStream {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapts the producer to `std::io::Read` so the stream can be piped with
/// `io::copy` to a file, socket, or stdout.
impl io::Read for ZipStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        ZipStream::read(self, buf).map_err(io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::records::END_RECORD_LEN;

    #[test]
    fn test_empty_archive_is_bare_end_record() {
        let mut stream = ZipStream::new();
        let mut buf = [0u8; 64];
        let n = stream.read(&mut buf).unwrap();
        assert_eq!(n, END_RECORD_LEN);
        assert_eq!(&buf[0..4], b"PK\x05\x06");
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_zero_capacity_buffer_rejected() {
        let mut stream = ZipStream::new();
        let err = stream.read(&mut []).unwrap_err();
        assert!(matches!(err, ZipStreamError::InvalidState(_)));
    }

    #[test]
    fn test_add_entry_after_read_rejected() {
        let mut stream = ZipStream::new();
        let mut buf = [0u8; 64];
        stream.read(&mut buf).unwrap();

        let err = stream
            .add_entry(
                "late.txt",
                "/nonexistent",
                CompressionMethod::Store,
                CompressionLevel::Default,
            )
            .unwrap_err();
        assert!(matches!(err, ZipStreamError::InvalidEntry(_)));
    }

    #[test]
    fn test_missing_source_rejected_at_registration() {
        let mut stream = ZipStream::new();
        let err = stream
            .add_entry(
                "a.txt",
                "/definitely/not/a/real/path",
                CompressionMethod::Store,
                CompressionLevel::Default,
            )
            .unwrap_err();
        assert!(matches!(err, ZipStreamError::InvalidEntry(_)));
        assert_eq!(stream.entry_count(), 0);
    }
}
