use omnom::prelude::*;
use std::io::{Read, Write};

use crate::error::{Error, Result};

pub const MAGIC_HEADER: [u8; 3] = [0x8e, 0xad, 0xe8];
pub const HEADER_VERSION: u8 = 1;

/// The 16-byte preamble of a header structure.
#[derive(Debug, PartialEq)]
pub struct HeaderLead {
    pub magic: [u8; 3],
    pub version: u8,
    pub reserved: [u8; 4],
    pub nindex: u32,
    pub hsize: u32,
}

impl HeaderLead {
    pub fn read<R: Read>(fh: &mut R) -> Result<Self> {
        let mut magic = [0_u8; 3];
        fh.read_exact(&mut magic)?;
        if magic != MAGIC_HEADER {
            return Err(Error::format(format!(
                "invalid rpm header magic {:x?}",
                magic
            )));
        }

        let mut version = [0_u8; 1];
        fh.read_exact(&mut version)?;
        let [version] = version;
        if version != HEADER_VERSION {
            return Err(Error::format(format!(
                "unsupported rpm header version {}",
                version
            )));
        }

        let mut reserved = [0_u8; 4];
        fh.read_exact(&mut reserved)?;
        if reserved != [0_u8; 4] {
            return Err(Error::format("invalid rpm header reserved bytes"));
        }

        let nindex: u32 = fh.read_be()?;
        let hsize: u32 = fh.read_be()?;

        Ok(HeaderLead {
            magic,
            version,
            reserved,
            nindex,
            hsize,
        })
    }

    pub fn from(nindex: u32, hsize: u32) -> Self {
        Self {
            nindex,
            hsize,
            ..Default::default()
        }
    }

    pub fn write<W: Write>(&self, fh: &mut W) -> Result<()> {
        fh.write_all(&MAGIC_HEADER)?;
        fh.write_all(&[HEADER_VERSION])?;
        fh.write_all(&self.reserved)?;
        fh.write_be(self.nindex)?;
        fh.write_be(self.hsize)?;
        Ok(())
    }
}

impl Default for HeaderLead {
    fn default() -> Self {
        HeaderLead {
            magic: MAGIC_HEADER,
            version: HEADER_VERSION,
            reserved: [0; 4],
            nindex: 0,
            hsize: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_headerlead_read_write_smoke() {
        let lead = HeaderLead::from(7, 9);

        let mut data: Vec<u8> = Vec::new();
        lead.write(&mut data).unwrap();
        assert_eq!(
            data,
            [0x8e, 0xad, 0xe8, 1, 0, 0, 0, 0, 0, 0, 0, 7, 0, 0, 0, 9]
        );

        let mut cursor = Cursor::new(data);
        let lead2 = HeaderLead::read(&mut cursor).unwrap();

        assert_eq!(lead, lead2);
    }

    #[test]
    fn test_headerlead_rejects_bad_version() {
        let data = [0x8e, 0xad, 0xe8, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            HeaderLead::read(&mut &data[..]),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_headerlead_rejects_bad_magic() {
        let data = [0xed, 0xab, 0xee, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            HeaderLead::read(&mut &data[..]),
            Err(Error::Format(_))
        ));
    }
}
