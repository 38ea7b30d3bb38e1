use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};
use strum_macros::Display;
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;
use zstd::stream::read::Decoder;

use crate::error::{Error, Result};

/// Payload compressors, named as in the `PayloadCompressor` header entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Compressor {
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compressor {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "gzip" => Ok(Compressor::Gzip),
            "bzip2" => Ok(Compressor::Bzip2),
            "xz" | "lzma" => Ok(Compressor::Xz),
            "zstd" => Ok(Compressor::Zstd),
            format => Err(Error::format(format!(
                "decompressor \"{}\" is not implemented",
                format
            ))),
        }
    }

    pub fn decoder<'a, R: Read + 'a>(self, reader: R) -> Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compressor::Gzip => Box::new(GzDecoder::new(reader)),
            Compressor::Bzip2 => Box::new(BzDecoder::new(reader)),
            Compressor::Xz => Box::new(XzDecoder::new(reader)),
            Compressor::Zstd => Box::new(Decoder::new(reader)?),
        })
    }

    /// Compresses `data` in one go. Output depends only on the input and
    /// the level.
    pub fn compress(self, data: &[u8], level: u32) -> Result<Vec<u8>> {
        let compressed = match self {
            Compressor::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level.min(9)));
                encoder.write_all(data)?;
                encoder.finish()?
            }
            Compressor::Bzip2 => {
                let level = level.clamp(1, 9);
                let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::new(level));
                encoder.write_all(data)?;
                encoder.finish()?
            }
            Compressor::Xz => {
                let mut encoder = XzEncoder::new(Vec::new(), level.min(9));
                encoder.write_all(data)?;
                encoder.finish()?
            }
            Compressor::Zstd => zstd::stream::encode_all(data, level as i32)?,
        };
        Ok(compressed)
    }
}
