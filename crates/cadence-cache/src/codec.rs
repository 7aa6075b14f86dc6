//! Payload encoding: JSON bytes, zstd-compressed above a size threshold.

use crate::error::Result;

/// Encoded payload ready to store.
pub struct Encoded {
    pub data: Vec<u8>,
    pub compressed: bool,
    /// Serialized size before compression.
    pub raw_size: usize,
}

pub fn encode(value: &serde_json::Value, threshold: usize, level: i32) -> Result<Encoded> {
    let raw = serde_json::to_vec(value)?;
    let raw_size = raw.len();
    if raw_size > threshold {
        let data = zstd::encode_all(raw.as_slice(), level)?;
        Ok(Encoded {
            data,
            compressed: true,
            raw_size,
        })
    } else {
        Ok(Encoded {
            data: raw,
            compressed: false,
            raw_size,
        })
    }
}

pub fn decode(data: &[u8], compressed: bool) -> Result<serde_json::Value> {
    if compressed {
        let raw = zstd::decode_all(data)?;
        Ok(serde_json::from_slice(&raw)?)
    } else {
        Ok(serde_json::from_slice(data)?)
    }
}
