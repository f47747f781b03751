use crate::archive::entry::{CompressionLevel, CompressionMethod, Entry};
use crate::error::{Result, ZipStreamError};
use flate2::read::DeflateEncoder;
use std::fs::File;
use std::io::{self, Read};

#[cfg(feature = "bzip2")]
use bzip2::read::BzEncoder;

/// Wraps the source reader so every byte is folded into the entry's CRC-32
/// and counted before it reaches the compressor.
pub struct CrcReader<R> {
    inner: R,
    hasher: crc32fast::Hasher,
    bytes_read: u64,
}

impl<R: Read> CrcReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: crc32fast::Hasher::new(),
            bytes_read: 0,
        }
    }

    /// Finalized CRC-32 of everything read so far
    pub fn crc32(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Raw bytes consumed from the source
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl<R: Read> Read for CrcReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes_read += n as u64;
        Ok(n)
    }
}

/// A closed set of pull-style transforms over the entry's source
enum Codec {
    Store(CrcReader<File>),
    Deflate(DeflateEncoder<CrcReader<File>>),
    #[cfg(feature = "bzip2")]
    Bzip2(BzEncoder<CrcReader<File>>),
}

/// The compression backend for one entry's data stage.
///
/// `read` yields compressed (or raw, for Store) bytes and returns `Ok(0)`
/// exactly once the source is exhausted and the codec has flushed its tail.
/// The codec is selected once, from the entry's method, when the data stage
/// begins.
pub struct EntryEncoder {
    source_path: String,
    codec: Codec,
}

impl EntryEncoder {
    /// Open the entry's source and wire up the codec for its method.
    pub fn open(entry: &Entry) -> Result<Self> {
        let source_path = entry.source.display().to_string();
        let file = File::open(&entry.source).map_err(|e| ZipStreamError::SourceUnavailable {
            path: source_path.clone(),
            reason: e.to_string(),
        })?;
        let source = CrcReader::new(file);

        let codec = match entry.method {
            CompressionMethod::Store => Codec::Store(source),
            CompressionMethod::Deflate => {
                Codec::Deflate(DeflateEncoder::new(source, deflate_level(entry.level)))
            }
            #[cfg(feature = "bzip2")]
            CompressionMethod::Bzip2 => {
                Codec::Bzip2(BzEncoder::new(source, bzip2_level(entry.level)))
            }
            #[cfg(not(feature = "bzip2"))]
            CompressionMethod::Bzip2 => {
                return Err(ZipStreamError::UnsupportedCompression(
                    entry.method.to_string(),
                ))
            }
        };

        Ok(Self { source_path, codec })
    }

    /// Pull up to `buf.len()` output bytes. `Ok(0)` signals the data stage
    /// is complete, never a transient stall.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match &mut self.codec {
            Codec::Store(r) => r.read(buf).map_err(|e| ZipStreamError::SourceUnavailable {
                path: self.source_path.clone(),
                reason: e.to_string(),
            }),
            Codec::Deflate(e) => e
                .read(buf)
                .map_err(|e| ZipStreamError::CompressionFailed(e.to_string())),
            #[cfg(feature = "bzip2")]
            Codec::Bzip2(e) => e
                .read(buf)
                .map_err(|e| ZipStreamError::CompressionFailed(e.to_string())),
        }
    }

    fn source(&self) -> &CrcReader<File> {
        match &self.codec {
            Codec::Store(r) => r,
            Codec::Deflate(e) => e.get_ref(),
            #[cfg(feature = "bzip2")]
            Codec::Bzip2(e) => e.get_ref(),
        }
    }

    /// Finalized CRC-32 of the raw source bytes
    pub fn crc32(&self) -> u32 {
        self.source().crc32()
    }

    /// Raw bytes consumed from the source (the uncompressed size)
    pub fn bytes_read(&self) -> u64 {
        self.source().bytes_read()
    }
}

fn deflate_level(level: CompressionLevel) -> flate2::Compression {
    match level {
        CompressionLevel::Default => flate2::Compression::default(),
        CompressionLevel::Speed => flate2::Compression::fast(),
        CompressionLevel::Size => flate2::Compression::best(),
    }
}

#[cfg(feature = "bzip2")]
fn bzip2_level(level: CompressionLevel) -> bzip2::Compression {
    match level {
        CompressionLevel::Default => bzip2::Compression::default(),
        CompressionLevel::Speed => bzip2::Compression::fast(),
        CompressionLevel::Size => bzip2::Compression::best(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::DeflateDecoder;

    #[test]
    fn test_crc_canonical_vector() {
        let mut reader = CrcReader::new(&b"123456789"[..]);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(reader.crc32(), 0xCBF43926);
        assert_eq!(reader.bytes_read(), 9);
    }

    #[test]
    fn test_crc_empty_input() {
        let reader = CrcReader::new(&b""[..]);
        assert_eq!(reader.crc32(), 0);
        assert_eq!(reader.bytes_read(), 0);
    }

    #[test]
    fn test_crc_incremental_matches_oneshot() {
        let data = b"incremental accumulation must match a single pass";
        let mut reader = CrcReader::new(&data[..]);
        // Drain through a tiny buffer to exercise multiple updates
        let mut chunk = [0u8; 3];
        loop {
            if reader.read(&mut chunk).unwrap() == 0 {
                break;
            }
        }
        assert_eq!(reader.crc32(), crc32fast::hash(data));
    }

    #[test]
    fn test_deflate_roundtrip() {
        let data = b"compress me ".repeat(64);
        let mut encoder =
            DeflateEncoder::new(CrcReader::new(&data[..]), flate2::Compression::best());
        let mut compressed = Vec::new();
        encoder.read_to_end(&mut compressed).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(encoder.get_ref().bytes_read(), data.len() as u64);

        let mut restored = Vec::new();
        DeflateDecoder::new(&compressed[..])
            .read_to_end(&mut restored)
            .unwrap();
        assert_eq!(restored, data);
    }
}
