use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};
use omnom::prelude::*;
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;
use strum_macros::Display;

use crate::error::{Error, Result};
use crate::utils::parse_string;

pub const MAGIC: [u8; 4] = [237, 171, 238, 219];
pub const LEAD_LEN: usize = 96;
pub const NAME_LEN: usize = 66;
/// "Signature in a header structure".
pub const SIGNATURE_TYPE: i16 = 5;

#[derive(Debug, PartialEq, Eq, FromPrimitive, ToPrimitive, Display, Clone, Copy)]
pub enum Type {
    Binary = 0,
    Source = 1,
}

/// Target architectures, with their `rpmrc` lead codes and header names.
#[derive(Debug, PartialEq, Eq, Display, Clone, Copy)]
#[strum(serialize_all = "lowercase")]
pub enum Architecture {
    X86,
    X64,
    Arm,
    Arm64,
    Armv6,
    S390x,
    Ppc64le,
    Riscv64,
    Loongarch64,
}

impl Architecture {
    pub fn lead_code(self) -> i16 {
        match self {
            Architecture::X86 | Architecture::X64 => 1,
            Architecture::Arm | Architecture::Armv6 => 12,
            Architecture::Arm64 => 19,
            Architecture::S390x => 15,
            Architecture::Ppc64le => 16,
            Architecture::Riscv64 => 22,
            Architecture::Loongarch64 => 23,
        }
    }

    pub fn header_name(self) -> &'static str {
        match self {
            Architecture::X86 => "i686",
            Architecture::X64 => "x86_64",
            Architecture::Arm => "armv7hl",
            Architecture::Arm64 => "aarch64",
            Architecture::Armv6 => "armv6hl",
            Architecture::S390x => "s390x",
            Architecture::Ppc64le => "ppc64le",
            Architecture::Riscv64 => "riscv64",
            Architecture::Loongarch64 => "loongarch64",
        }
    }

    /// Maps an rpm header architecture to the short architecture name
    /// (`x86_64` to `x64`, `noarch` to `any`). Unknown names pass through.
    pub fn short_name(header_name: &str) -> &str {
        match header_name {
            "noarch" => "any",
            "i386" | "i486" | "i586" | "i686" => "x86",
            "x86_64" => "x64",
            "armv6hl" | "armv7hl" => "arm",
            "aarch64" => "arm64",
            other => other,
        }
    }
}

impl FromStr for Architecture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let arch = match s.to_ascii_lowercase().as_str() {
            "x86" | "i386" | "i486" | "i586" | "i686" => Architecture::X86,
            "x64" | "x86_64" | "amd64" => Architecture::X64,
            "arm" | "armv7hl" => Architecture::Arm,
            "arm64" | "aarch64" => Architecture::Arm64,
            "armv6" | "armv6hl" => Architecture::Armv6,
            "s390x" => Architecture::S390x,
            "ppc64le" => Architecture::Ppc64le,
            "riscv64" => Architecture::Riscv64,
            "loongarch64" => Architecture::Loongarch64,
            _ => return Err(Error::argument(format!("unsupported architecture {:?}", s))),
        };
        Ok(arch)
    }
}

#[derive(Debug, PartialEq, Eq, Display, Clone, Copy)]
#[strum(serialize_all = "lowercase")]
pub enum OperatingSystem {
    Linux,
    FreeBsd,
}

impl OperatingSystem {
    pub fn lead_code(self) -> i16 {
        match self {
            OperatingSystem::Linux => 1,
            OperatingSystem::FreeBsd => 8,
        }
    }
}

impl FromStr for OperatingSystem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(OperatingSystem::Linux),
            "freebsd" => Ok(OperatingSystem::FreeBsd),
            _ => Err(Error::argument(format!("unsupported operating system {:?}", s))),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Lead {
    pub magic: [u8; 4],
    pub major: u8,
    pub minor: u8,
    pub rpm_type: Type,
    pub archnum: i16,
    pub name: [u8; NAME_LEN],
    pub osnum: i16,
    pub signature_type: i16,
    pub reserved: [u8; 16],
}

impl Lead {
    /// A binary package lead in format 3.0.
    pub fn new(arch: Architecture, os: OperatingSystem) -> Self {
        Lead {
            major: 3,
            minor: 0,
            archnum: arch.lead_code(),
            osnum: os.lead_code(),
            ..Default::default()
        }
    }

    /// Returns a copy with the name replaced, truncated so that a NUL
    /// terminator always fits.
    pub fn with_name(&self, name: &str) -> Self {
        let mut raw = [0_u8; NAME_LEN];
        let len = name.len().min(NAME_LEN - 1);
        raw[..len].copy_from_slice(&name.as_bytes()[..len]);
        Lead {
            name: raw,
            ..self.clone()
        }
    }

    pub fn name(&self) -> String {
        parse_string(&self.name)
    }

    pub fn read<R: Read>(fh: &mut R) -> Result<Self> {
        let mut magic = [0_u8; 4];
        fh.read_exact(&mut magic)?;

        if magic != MAGIC {
            return Err(Error::format("file is not rpm"));
        }

        let mut head = [0_u8; 2];
        fh.read_exact(&mut head)?;
        let [major, minor] = head;

        match (major, minor) {
            (3, 0) | (3, 1) | (4, 0) => {}
            _ => {
                return Err(Error::format(format!(
                    "rpm format version is not supported {}.{}",
                    major, minor
                )));
            }
        }

        let rpm_type_id: i16 = fh.read_be()?;
        let rpm_type = Type::from_i16(rpm_type_id)
            .ok_or_else(|| Error::format(format!("can not read the rpm type {}", rpm_type_id)))?;
        let archnum: i16 = fh.read_be()?;

        let mut name = [0_u8; NAME_LEN];
        fh.read_exact(&mut name)?;
        let osnum: i16 = fh.read_be()?;
        let signature_type: i16 = fh.read_be()?;

        let mut reserved = [0_u8; 16];
        fh.read_exact(&mut reserved)?;

        Ok(Lead {
            magic,
            major,
            minor,
            rpm_type,
            archnum,
            name,
            osnum,
            signature_type,
            reserved,
        })
    }

    pub fn write<W: Write>(&self, fh: &mut W) -> Result<()> {
        fh.write_all(&MAGIC)?;
        fh.write_all(&[self.major, self.minor])?;

        let rpm_type = self
            .rpm_type
            .to_i16()
            .ok_or_else(|| Error::argument("rpm type is not correct"))?;
        fh.write_be(rpm_type)?;
        fh.write_be(self.archnum)?;

        fh.write_all(&self.name)?;

        fh.write_be(self.osnum)?;
        fh.write_be(self.signature_type)?;

        // reserve
        fh.write_all(&[0_u8; 16])?;
        Ok(())
    }
}

impl fmt::Display for Lead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "magic: {:?}", self.magic)?;
        writeln!(f, "major: {}", self.major)?;
        writeln!(f, "minor: {}", self.minor)?;
        writeln!(f, "rpm_type: {}", self.rpm_type)?;
        writeln!(f, "archnum: {}", self.archnum)?;
        writeln!(f, "name: {}", parse_string(&self.name))?;
        writeln!(f, "osnum: {}", self.osnum)?;
        writeln!(f, "signature_type: {}", self.signature_type)?;
        writeln!(f, "reserved: {:?}", self.reserved)
    }
}

impl fmt::Debug for Lead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lead")
            .field("major", &self.major)
            .field("minor", &self.minor)
            .field("rpm_type", &self.rpm_type)
            .field("archnum", &self.archnum)
            .field("name", &parse_string(&self.name))
            .field("osnum", &self.osnum)
            .field("signature_type", &self.signature_type)
            .finish()
    }
}

impl Default for Lead {
    fn default() -> Self {
        Lead {
            magic: MAGIC,
            major: 3,
            minor: 0,
            rpm_type: Type::Binary,
            archnum: 0,
            name: [0; NAME_LEN],
            osnum: 0,
            signature_type: SIGNATURE_TYPE,
            reserved: [0; 16],
        }
    }
}
