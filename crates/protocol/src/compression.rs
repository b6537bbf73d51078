//! Compression stage for snapshot payloads
//!
//! The method travels in the frame header, so a receiver always knows how
//! to reverse it. Decompressed output is capped to keep hostile payloads
//! bounded.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{Read, Write};
use std::str::FromStr;
use tofmt_core::{Result, TimerError};

/// Largest decompressed payload accepted
pub const MAX_DECOMPRESSED_LEN: usize = 16 * 1024 * 1024;

/// Compression method used for payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionType {
    None = 0,
    Zlib = 1,
    Bzip2 = 2,
    #[default]
    Zstd = 3,
}

impl CompressionType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Zlib),
            2 => Some(Self::Bzip2),
            3 => Some(Self::Zstd),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Zlib => "zlib",
            Self::Bzip2 => "bzip2",
            Self::Zstd => "zstd",
        }
    }

    /// Level used when the caller does not pick one
    pub fn default_level(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Zlib => 6,
            Self::Bzip2 => 9,
            Self::Zstd => 3,
        }
    }
}

impl FromStr for CompressionType {
    type Err = TimerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "zlib" => Ok(Self::Zlib),
            "bzip2" => Ok(Self::Bzip2),
            "zstd" => Ok(Self::Zstd),
            other => Err(TimerError::Config(format!("unknown compression method {other:?}"))),
        }
    }
}

/// Compress data using the method's default level
pub fn compress(data: &[u8], method: CompressionType) -> Result<Vec<u8>> {
    compress_with_level(data, method, method.default_level())
}

/// Compress data at `level`, clamped to the method's valid range
pub fn compress_with_level(data: &[u8], method: CompressionType, level: u32) -> Result<Vec<u8>> {
    match method {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::new(level.min(9)));
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
        CompressionType::Bzip2 => {
            let mut compressed = Vec::new();
            {
                let mut encoder = bzip2::write::BzEncoder::new(
                    &mut compressed,
                    bzip2::Compression::new(level.clamp(1, 9)),
                );
                encoder.write_all(data)?;
                encoder.finish()?;
            }
            Ok(compressed)
        }
        CompressionType::Zstd => {
            let level = i32::try_from(level.clamp(1, 22)).unwrap_or(3);
            Ok(zstd::bulk::compress(data, level)?)
        }
    }
}

/// Decompress data using the specified method
///
/// Any failure, including output over [`MAX_DECOMPRESSED_LEN`], is a
/// [`TimerError::Decompression`].
pub fn decompress(data: &[u8], method: CompressionType) -> Result<Vec<u8>> {
    match method {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::Zlib => read_capped(ZlibDecoder::new(data), method),
        CompressionType::Bzip2 => read_capped(bzip2::read::BzDecoder::new(data), method),
        CompressionType::Zstd => zstd::bulk::decompress(data, MAX_DECOMPRESSED_LEN)
            .map_err(|e| TimerError::Decompression(format!("zstd: {e}"))),
    }
}

fn read_capped<R: Read>(decoder: R, method: CompressionType) -> Result<Vec<u8>> {
    let mut decompressed = Vec::new();
    decoder
        .take(MAX_DECOMPRESSED_LEN as u64 + 1)
        .read_to_end(&mut decompressed)
        .map_err(|e| TimerError::Decompression(format!("{}: {e}", method.as_str())))?;

    if decompressed.len() > MAX_DECOMPRESSED_LEN {
        return Err(TimerError::Decompression(format!(
            "{}: output exceeds {} bytes",
            method.as_str(),
            MAX_DECOMPRESSED_LEN
        )));
    }
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &[u8] = b"Sobek Sobek Sobek Hela Hela Eva - a timetable compresses well";

    #[test]
    fn test_roundtrip_all_methods() {
        for method in [
            CompressionType::None,
            CompressionType::Zlib,
            CompressionType::Bzip2,
            CompressionType::Zstd,
        ] {
            let compressed = compress(ORIGINAL, method).unwrap();
            let decompressed = decompress(&compressed, method).unwrap();
            assert_eq!(ORIGINAL, &decompressed[..], "{}", method.as_str());
        }
    }

    #[test]
    fn test_levels_are_clamped() {
        let compressed = compress_with_level(ORIGINAL, CompressionType::Zlib, 99).unwrap();
        assert_eq!(decompress(&compressed, CompressionType::Zlib).unwrap(), ORIGINAL);

        let compressed = compress_with_level(ORIGINAL, CompressionType::Zstd, 0).unwrap();
        assert_eq!(decompress(&compressed, CompressionType::Zstd).unwrap(), ORIGINAL);
    }

    #[test]
    fn test_corrupt_stream() {
        let garbage = [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01];
        for method in [CompressionType::Zlib, CompressionType::Bzip2, CompressionType::Zstd] {
            assert!(
                matches!(decompress(&garbage, method), Err(TimerError::Decompression(_))),
                "{}",
                method.as_str()
            );
        }
    }

    #[test]
    fn test_truncated_stream() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
        let compressed = compress(&data, CompressionType::Zstd).unwrap();
        let truncated = &compressed[..compressed.len() / 2];
        assert!(matches!(
            decompress(truncated, CompressionType::Zstd),
            Err(TimerError::Decompression(_))
        ));
    }

    #[test]
    fn test_tag_mapping() {
        assert_eq!(CompressionType::from_u8(3), Some(CompressionType::Zstd));
        assert_eq!(CompressionType::from_u8(4), None);
        assert_eq!("ZLIB".parse::<CompressionType>().unwrap(), CompressionType::Zlib);
        assert!("lz4".parse::<CompressionType>().is_err());
    }
}
