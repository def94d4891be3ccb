use serde::{Serialize, Deserialize};
use crate::core::error::{Error, ErrorKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    LZ4,      // Fast compression (~500 MB/s), ratio 2-3x
}

impl CompressionType {
    fn tag(self) -> u8 {
        match self {
            CompressionType::None => 0,
            CompressionType::LZ4 => 1,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(CompressionType::None),
            1 => Some(CompressionType::LZ4),
            _ => None,
        }
    }
}

/// Payload blob as stored: one tag byte naming the compression, then the body
pub struct CompressedBlock;

impl CompressedBlock {
    pub fn compress(data: &[u8], compression: CompressionType) -> Vec<u8> {
        let mut out = vec![compression.tag()];
        match compression {
            CompressionType::None => out.extend_from_slice(data),
            CompressionType::LZ4 => out.extend(lz4_flex::compress_prepend_size(data)),
        }
        out
    }

    pub fn decompress(blob: &[u8]) -> Result<Vec<u8>> {
        let (&tag, body) = blob
            .split_first()
            .ok_or_else(|| Error::new(ErrorKind::Storage, "Empty payload blob"))?;

        match CompressionType::from_tag(tag) {
            Some(CompressionType::None) => Ok(body.to_vec()),
            Some(CompressionType::LZ4) => lz4_flex::decompress_size_prepended(body)
                .map_err(|e| Error::new(ErrorKind::Storage, format!("Corrupt LZ4 payload: {}", e))),
            None => Err(Error::new(
                ErrorKind::Storage,
                format!("Unknown payload compression tag: {}", tag),
            )),
        }
    }
}
