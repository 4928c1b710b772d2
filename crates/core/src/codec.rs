//! Sub-log codec
//!
//! A sub-log is stored as one opaque blob: the event list serialized as
//! named-field MessagePack, then zstd-compressed. Named fields keep the
//! payload self-describing so older blobs stay readable as `Event` grows
//! optional fields.
//!
//! Absence and corruption are treated differently. A missing blob is the
//! normal state of a visitor with no history and decodes to an empty list;
//! bytes that fail to decompress or deserialize are a [`Error::Corruption`].

use crate::error::{Error, Result};
use crate::event::Event;

/// Default zstd compression level
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Encoder/decoder for stored sub-logs
///
/// # Example
///
/// ```ignore
/// use tagstore_core::codec::EventCodec;
///
/// let codec = EventCodec::default();
/// let blob = codec.encode(&events)?;
/// assert_eq!(codec.decode(Some(&blob))?, events);
/// assert!(codec.decode(None)?.is_empty());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EventCodec {
    level: i32,
}

impl Default for EventCodec {
    fn default() -> Self {
        Self {
            level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl EventCodec {
    /// Codec with an explicit zstd level
    pub fn with_level(level: i32) -> Self {
        Self { level }
    }

    /// Identifier recorded alongside encoded data
    pub fn codec_id(&self) -> &'static str {
        "msgpack+zstd"
    }

    /// Serialize and compress an ordered event list
    pub fn encode(&self, events: &[Event]) -> Result<Vec<u8>> {
        let packed = rmp_serde::to_vec_named(events)?;
        zstd::encode_all(packed.as_slice(), self.level).map_err(|e| {
            Error::SerializationError(format!("zstd compression failed: {}", e))
        })
    }

    /// Decompress and deserialize a stored blob.
    ///
    /// `None` yields an empty list.
    pub fn decode(&self, bytes: Option<&[u8]>) -> Result<Vec<Event>> {
        let Some(bytes) = bytes else {
            return Ok(Vec::new());
        };
        let packed = zstd::decode_all(bytes)
            .map_err(|e| Error::Corruption(format!("zstd decompression failed: {}", e)))?;
        Ok(rmp_serde::from_slice(&packed)?)
    }
}
