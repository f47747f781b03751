//! zipstream: streaming ZIP archive generation
//!
//! Produces a standards-compliant ZIP byte stream incrementally, with no
//! seeking on the output and no whole-file buffering. Per-file sizes and
//! CRCs are discovered as each source is streamed and carried in trailing
//! data descriptors (general-purpose flag bit 3), so the archive can be
//! written straight to a socket or pipe while sources are read once,
//! sequentially.
//!
//! Supported per-entry compression: store, deflate, and (with the default
//! `bzip2` feature) bzip2.
//!
//! # Example
//!
//! ```no_run
//! use zipstream::{CompressionLevel, CompressionMethod, ZipStream};
//!
//! let mut stream = ZipStream::new();
//! stream.add_entry("report.txt", "data/report.txt", CompressionMethod::Deflate, CompressionLevel::Default)?;
//! stream.add_entry("raw.bin", "data/raw.bin", CompressionMethod::Store, CompressionLevel::Default)?;
//!
//! // First read finalizes the entry list; drain in bounded chunks.
//! let mut buf = [0u8; 4096];
//! loop {
//!     let n = stream.read(&mut buf)?;
//!     if n == 0 {
//!         break;
//!     }
//!     // forward &buf[..n] to a file, socket, stdout, ...
//! }
//! # Ok::<(), zipstream::ZipStreamError>(())
//! ```

// Core modules
pub mod archive;
pub mod error;

// Re-export commonly used types
pub use archive::{
    CompressionLevel, CompressionMethod, ZipStream, CENTRAL_HEADER_LEN, DESCRIPTOR_LEN,
    END_RECORD_LEN, FLAG_STREAMED, LOCAL_HEADER_LEN,
};
pub use error::{Result, ZipStreamError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Ensure core types are accessible
        let _method = CompressionMethod::Deflate;
        let _stream = ZipStream::new();
    }
}
