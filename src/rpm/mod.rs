mod builder;
mod compress;
mod info;
mod package;

pub use builder::*;
pub use compress::*;
pub use info::*;
pub use package::*;

use bitflags::bitflags;
use std::str::FromStr;
use strum_macros::Display;

use crate::error::{Error, Result};
use crate::header::Tag;

/// `PGPHASHALGO_SHA256`, used for file and payload digests.
pub const SHA256_DIGEST_ALGORITHM: i32 = 8;

bitflags! {
    /// Sense flags of a dependency (`RPMSENSE_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DependencyFlags: i32 {
        const LESS = 0x2;
        const GREATER = 0x4;
        const EQUAL = 0x8;
        const RPMLIB = 0x0100_0000;
    }
}

/// Install scriptlets a package may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ScriptKind {
    Prein,
    Postin,
    Preun,
    Postun,
}

impl ScriptKind {
    pub fn tag(self) -> Tag {
        match self {
            ScriptKind::Prein => Tag::Prein,
            ScriptKind::Postin => Tag::Postin,
            ScriptKind::Preun => Tag::Preun,
            ScriptKind::Postun => Tag::Postun,
        }
    }

    /// Tag of the matching interpreter entry.
    pub fn prog_tag(self) -> Tag {
        match self {
            ScriptKind::Prein => Tag::PreinProg,
            ScriptKind::Postin => Tag::PostinProg,
            ScriptKind::Preun => Tag::PreunProg,
            ScriptKind::Postun => Tag::PostunProg,
        }
    }
}

impl FromStr for ScriptKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "prein" => Ok(ScriptKind::Prein),
            "postin" => Ok(ScriptKind::Postin),
            "preun" => Ok(ScriptKind::Preun),
            "postun" => Ok(ScriptKind::Postun),
            _ => Err(Error::argument(format!("unknown script kind {:?}", s))),
        }
    }
}
