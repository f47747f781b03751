//! Archive production: entry registry, record serializers, compression
//! backends, and the pull-based stream state machine.

pub mod encoder;
pub mod entry;
pub mod records;
pub mod stream;

pub use entry::{CompressionLevel, CompressionMethod};
pub use records::{
    CENTRAL_HEADER_LEN, DESCRIPTOR_LEN, END_RECORD_LEN, FLAG_STREAMED, LOCAL_HEADER_LEN,
};
pub use stream::ZipStream;
