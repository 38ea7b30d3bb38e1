//! Debian packages: the outer ar container and the small text files that
//! live in `control.tar.gz`.

mod changelog;
mod control;
mod md5sums;

pub use changelog::*;
pub use control::*;
pub use md5sums::*;

use log::debug;
use std::io::{Read, Write};

use crate::ar::{ArEntry, ArReader, ArWriter};
use crate::error::{Error, Result};

pub const DEBIAN_BINARY: &str = "debian-binary";
pub const CONTROL_ARCHIVE: &str = "control.tar.gz";
pub const DATA_ARCHIVE: &str = "data.tar.gz";
pub const FORMAT_VERSION: &[u8] = b"2.0\n";
const MEMBER_MODE: u32 = 0o100644;

/// Writes `debian-binary`, `control.tar.gz` and `data.tar.gz`, in that
/// order, and returns the writer.
pub fn create_deb_package<W: Write>(
    writer: W,
    control: &[u8],
    data: &[u8],
    timestamp: u64,
) -> Result<W> {
    let mut archive = ArWriter::new(writer)?;
    for (name, content) in [
        (DEBIAN_BINARY, FORMAT_VERSION),
        (CONTROL_ARCHIVE, control),
        (DATA_ARCHIVE, data),
    ] {
        archive.add_entry(&ArEntry {
            timestamp,
            ..ArEntry::new(name, MEMBER_MODE, content.to_vec())
        })?;
    }
    debug!(
        "deb: wrote package ({} control bytes, {} data bytes)",
        control.len(),
        data.len()
    );
    archive.into_inner()
}

/// The members of a `.deb` read back from its ar container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebPackage {
    pub control: ArEntry,
    pub data: ArEntry,
}

impl DebPackage {
    /// Reads a package. Member names may carry the GNU `/` suffix and any
    /// `control.tar.*`/`data.tar.*` compression.
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let mut entries = ArReader::new(reader)?;

        let version = entries
            .next_entry()?
            .ok_or_else(|| Error::format("deb package is empty"))?;
        if member_name(&version) != DEBIAN_BINARY {
            return Err(Error::format(format!(
                "first deb member is {:?}, expected {}",
                version.name, DEBIAN_BINARY
            )));
        }
        if !version.data.starts_with(b"2.") {
            return Err(Error::format(format!(
                "unsupported deb format {:?}",
                String::from_utf8_lossy(&version.data).trim_end()
            )));
        }

        let mut control = None;
        let mut data = None;
        for entry in entries {
            let entry = entry?;
            let name = member_name(&entry).to_owned();
            if name.starts_with("control.tar") && control.is_none() {
                control = Some(entry);
            } else if name.starts_with("data.tar") && data.is_none() {
                data = Some(entry);
            }
        }

        Ok(DebPackage {
            control: control.ok_or_else(|| Error::format("deb package has no control archive"))?,
            data: data.ok_or_else(|| Error::format("deb package has no data archive"))?,
        })
    }
}

fn member_name(entry: &ArEntry) -> &str {
    entry.name.trim_end_matches('/')
}
