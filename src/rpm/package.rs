use log::debug;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use super::Compressor;
use crate::error::Result;
use crate::header::{Header, SignatureTag, Tag};
use crate::lead::Lead;
use crate::payload::CpioReader;
use crate::utils::{AlignRead, AlignWrite, Tracked};

const DEFAULT_COMPRESSION_LEVEL: u32 = 9;

/// A complete package: lead, signature header, package header and the
/// uncompressed cpio payload. The payload is compressed on `write_to`.
#[derive(Debug)]
pub struct RpmPackage {
    pub lead: Lead,
    pub signature: Header<SignatureTag>,
    pub header: Header<Tag>,
    archive: Vec<u8>,
}

impl RpmPackage {
    pub fn new(
        lead: Lead,
        signature: Header<SignatureTag>,
        header: Header<Tag>,
        archive: Vec<u8>,
    ) -> Self {
        Self {
            lead,
            signature,
            header,
            archive,
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let mut reader = Tracked::new(reader);
        let lead = Lead::read(&mut reader)?;
        let signature = Header::read(&mut reader, SignatureTag::HeaderSignatures)?;
        reader.align_read_to(8)?;
        let header = Header::read(&mut reader, Tag::Immutable)?;
        let header_end = reader.position();

        let compressor = Compressor::from_name(
            header
                .get_string(Tag::PayloadCompressor)
                .unwrap_or("gzip"),
        )?;
        let mut archive = Vec::new();
        compressor.decoder(reader)?.read_to_end(&mut archive)?;
        debug!(
            "rpm: read {} ({} header bytes, {} payload bytes, {})",
            lead.name(),
            header_end,
            archive.len(),
            compressor
        );

        Ok(RpmPackage {
            lead,
            signature,
            header,
            archive,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut writer = Tracked::new(writer);
        self.lead.write(&mut writer)?;
        self.signature
            .write_to(&mut writer, SignatureTag::HeaderSignatures)?;
        writer.align_write_to(8)?;
        self.header.write_to(&mut writer, Tag::Immutable)?;
        let payload = self.compressed_payload()?;
        writer.write_all(&payload)?;
        writer.flush()?;
        debug!(
            "rpm: wrote {} bytes ({} payload bytes)",
            writer.position(),
            payload.len()
        );
        Ok(())
    }

    /// The payload compressed as the package header describes.
    pub fn compressed_payload(&self) -> Result<Vec<u8>> {
        let compressor = Compressor::from_name(
            self.header
                .get_string(Tag::PayloadCompressor)
                .unwrap_or("gzip"),
        )?;
        let level = self
            .header
            .get_string(Tag::PayloadCompressorLevel)
            .and_then(|level| level.parse().ok())
            .unwrap_or(DEFAULT_COMPRESSION_LEVEL);
        compressor.compress(&self.archive, level)
    }

    pub fn archive(&self) -> CpioReader<&[u8]> {
        CpioReader::new(self.archive.as_slice())
    }

    pub fn archive_bytes(&self) -> &[u8] {
        &self.archive
    }

    pub fn into_archive(self) -> Vec<u8> {
        self.archive
    }
}
