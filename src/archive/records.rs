use crate::archive::entry::CompressionMethod;
use std::time::SystemTime;
use time::OffsetDateTime;

/// Local file header signature "PK\x03\x04"
pub const LOCAL_HEADER_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Data descriptor signature "PK\x07\x08"
pub const DESCRIPTOR_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x07, 0x08];

/// Central directory header signature "PK\x01\x02"
pub const CENTRAL_HEADER_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x01, 0x02];

/// End of central directory signature "PK\x05\x06"
pub const END_RECORD_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];

/// Local file header size in bytes (fixed portion, excluding the name)
pub const LOCAL_HEADER_LEN: usize = 30;

/// Data descriptor size in bytes
pub const DESCRIPTOR_LEN: usize = 16;

/// Central directory header size in bytes (fixed portion, excluding the name)
pub const CENTRAL_HEADER_LEN: usize = 46;

/// End of central directory record size in bytes
pub const END_RECORD_LEN: usize = 22;

/// General-purpose flag bit 3: sizes and CRC are unknown when the local
/// header is written and follow the data in a data descriptor. Set on every
/// entry; it is what makes seek-free emission possible.
pub const FLAG_STREAMED: u16 = 0x0008;

/// Version-made-by recorded in central directory headers (2.0, MS-DOS)
pub const VERSION_MADE_BY: u16 = 0x0014;

/// An MS-DOS date/time pair as stored in ZIP headers.
///
/// Packing:
/// - time: `(hour << 11) | (minute << 5) | (second / 2)`
/// - date: `((year - 1980) << 9) | (month << 5) | day`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub date: u16,
    pub time: u16,
}

impl DosDateTime {
    /// The DOS epoch, 1980-01-01 00:00:00
    pub const EPOCH: DosDateTime = DosDateTime {
        date: (1 << 5) | 1,
        time: 0,
    };

    /// Truncate a wall-clock timestamp to DOS resolution (UTC, 2-second
    /// granularity). Timestamps outside the representable range clamp to
    /// the nearest bound.
    pub fn from_system_time(t: SystemTime) -> Self {
        let dt = OffsetDateTime::from(t);
        let year = dt.year();
        if year < 1980 {
            return Self::EPOCH;
        }
        let year = year.min(2107) as u16;

        let date =
            ((year - 1980) << 9) | ((u8::from(dt.month()) as u16) << 5) | (dt.day() as u16);
        let time = ((dt.hour() as u16) << 11)
            | ((dt.minute() as u16) << 5)
            | ((dt.second() as u16) >> 1);

        DosDateTime { date, time }
    }
}

/// Local file header (30 bytes).
///
/// Written before each entry's name and data. Because flag bit 3 is set, the
/// CRC and both size fields are zero here; the authoritative values follow
/// the data in the descriptor.
#[derive(Debug, Clone)]
pub struct LocalFileHeader {
    pub method: CompressionMethod,
    pub modified: DosDateTime,
    pub name_len: u16,
}

impl LocalFileHeader {
    pub fn to_bytes(&self) -> [u8; LOCAL_HEADER_LEN] {
        let mut buf = [0u8; LOCAL_HEADER_LEN];
        buf[0..4].copy_from_slice(&LOCAL_HEADER_SIGNATURE);
        buf[4..6].copy_from_slice(&self.method.version_needed().to_le_bytes());
        buf[6..8].copy_from_slice(&FLAG_STREAMED.to_le_bytes());
        buf[8..10].copy_from_slice(&self.method.code().to_le_bytes());
        buf[10..12].copy_from_slice(&self.modified.time.to_le_bytes());
        buf[12..14].copy_from_slice(&self.modified.date.to_le_bytes());
        // CRC32 and both sizes stay zero (deferred to the descriptor)
        buf[26..28].copy_from_slice(&self.name_len.to_le_bytes());
        // Extra field length stays zero
        buf
    }
}

/// Data descriptor (16 bytes).
///
/// Emitted after an entry's data, once the CRC and sizes are final.
#[derive(Debug, Clone)]
pub struct DataDescriptor {
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
}

impl DataDescriptor {
    pub fn to_bytes(&self) -> [u8; DESCRIPTOR_LEN] {
        let mut buf = [0u8; DESCRIPTOR_LEN];
        buf[0..4].copy_from_slice(&DESCRIPTOR_SIGNATURE);
        buf[4..8].copy_from_slice(&self.crc32.to_le_bytes());
        buf[8..12].copy_from_slice(&self.compressed_size.to_le_bytes());
        buf[12..16].copy_from_slice(&self.uncompressed_size.to_le_bytes());
        buf
    }
}

/// Central directory header (46 bytes).
///
/// One per entry, written after all entry data. All fields are known by the
/// time these are emitted, including the relative offset of the entry's
/// local header.
#[derive(Debug, Clone)]
pub struct CentralDirectoryHeader {
    pub method: CompressionMethod,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
    pub local_offset: u32,
}

impl CentralDirectoryHeader {
    pub fn to_bytes(&self) -> [u8; CENTRAL_HEADER_LEN] {
        let mut buf = [0u8; CENTRAL_HEADER_LEN];
        buf[0..4].copy_from_slice(&CENTRAL_HEADER_SIGNATURE);
        buf[4..6].copy_from_slice(&VERSION_MADE_BY.to_le_bytes());
        buf[6..8].copy_from_slice(&self.method.version_needed().to_le_bytes());
        buf[8..10].copy_from_slice(&FLAG_STREAMED.to_le_bytes());
        buf[10..12].copy_from_slice(&self.method.code().to_le_bytes());
        buf[12..14].copy_from_slice(&self.modified.time.to_le_bytes());
        buf[14..16].copy_from_slice(&self.modified.date.to_le_bytes());
        buf[16..20].copy_from_slice(&self.crc32.to_le_bytes());
        buf[20..24].copy_from_slice(&self.compressed_size.to_le_bytes());
        buf[24..28].copy_from_slice(&self.uncompressed_size.to_le_bytes());
        buf[28..30].copy_from_slice(&self.name_len.to_le_bytes());
        // Extra field length, comment length, disk number start, internal
        // and external attributes all stay zero
        buf[42..46].copy_from_slice(&self.local_offset.to_le_bytes());
        buf
    }
}

/// End of central directory record (22 bytes), single-disk form.
#[derive(Debug, Clone)]
pub struct EndOfCentralDirectory {
    pub entry_count: u16,
    pub directory_size: u32,
    pub directory_offset: u32,
}

impl EndOfCentralDirectory {
    pub fn to_bytes(&self) -> [u8; END_RECORD_LEN] {
        let mut buf = [0u8; END_RECORD_LEN];
        buf[0..4].copy_from_slice(&END_RECORD_SIGNATURE);
        // Disk number and central-directory disk stay zero
        buf[8..10].copy_from_slice(&self.entry_count.to_le_bytes());
        buf[10..12].copy_from_slice(&self.entry_count.to_le_bytes());
        buf[12..16].copy_from_slice(&self.directory_size.to_le_bytes());
        buf[16..20].copy_from_slice(&self.directory_offset.to_le_bytes());
        // Comment length stays zero
        buf
    }
}
