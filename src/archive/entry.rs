use crate::archive::records::{CENTRAL_HEADER_LEN, DESCRIPTOR_LEN, LOCAL_HEADER_LEN};
use crate::error::{Result, ZipStreamError};
use std::path::PathBuf;
use std::time::SystemTime;

/// Compression methods supported, with their ZIP method codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum CompressionMethod {
    Store = 0,
    Deflate = 8,
    Bzip2 = 12,
}

impl CompressionMethod {
    /// ZIP method code for header fields
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Minimum version-needed-to-extract for this method (APPNOTE §4.4.3)
    pub fn version_needed(self) -> u16 {
        match self {
            Self::Store => 10,
            Self::Deflate => 20,
            Self::Bzip2 => 46,
        }
    }

    /// Whether the codec for this method was compiled in
    pub fn is_available(self) -> bool {
        match self {
            Self::Store | Self::Deflate => true,
            Self::Bzip2 => cfg!(feature = "bzip2"),
        }
    }
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store => write!(f, "store"),
            Self::Deflate => write!(f, "deflate"),
            Self::Bzip2 => write!(f, "bzip2"),
        }
    }
}

/// Compression effort, mapped onto each codec's level range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    #[default]
    Default,
    /// Favor throughput
    Speed,
    /// Favor output size
    Size,
}

/// One member file of the archive.
///
/// Sizes, CRC, and the local header offset start at zero and are frozen by
/// the stream once the entry's data stage completes; record builders only
/// read them after that point.
#[derive(Debug)]
pub struct Entry {
    /// Path recorded inside the archive
    pub name: String,
    /// Source file the data is streamed from, opened lazily
    pub source: PathBuf,
    /// Source mtime, captured at registration
    pub modified: SystemTime,
    pub method: CompressionMethod,
    pub level: CompressionLevel,
    pub crc32: u32,
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    /// Byte offset of this entry's local header in the output stream
    pub local_offset: u32,
}

impl Entry {
    pub fn new(
        name: String,
        source: PathBuf,
        modified: SystemTime,
        method: CompressionMethod,
        level: CompressionLevel,
    ) -> Result<Self> {
        if name.len() > u16::MAX as usize {
            return Err(ZipStreamError::InvalidEntry(format!(
                "Entry name too long: {} bytes (max {})",
                name.len(),
                u16::MAX
            )));
        }
        if !method.is_available() {
            return Err(ZipStreamError::UnsupportedCompression(method.to_string()));
        }

        Ok(Self {
            name,
            source,
            modified,
            method,
            level,
            crc32: 0,
            uncompressed_size: 0,
            compressed_size: 0,
            local_offset: 0,
        })
    }

    pub fn name_len(&self) -> u16 {
        self.name.len() as u16
    }

    /// Total bytes this entry occupies in the local section
    /// (header + name + data + descriptor). Valid once sizes are frozen.
    pub fn local_section_len(&self) -> u32 {
        LOCAL_HEADER_LEN as u32
            + self.name.len() as u32
            + self.compressed_size
            + DESCRIPTOR_LEN as u32
    }

    /// Total bytes this entry occupies in the central directory
    pub fn central_section_len(&self) -> u32 {
        CENTRAL_HEADER_LEN as u32 + self.name.len() as u32
    }
}
