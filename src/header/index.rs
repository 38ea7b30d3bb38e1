use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use omnom::prelude::*;
use std::io::{self, Read, Write};
use strum_macros::Display;

use crate::error::{Error, Result};

pub const INDEX_ENTRY_LEN: usize = 16;

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive, Display)]
pub enum EntryType {
    Null = 0,
    Char = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    String = 6,
    Binary = 7,
    StringArray = 8,
    I18NString = 9,
}

impl EntryType {
    pub fn from_code(code: i32) -> Result<Self> {
        EntryType::from_i32(code)
            .ok_or_else(|| Error::format(format!("unknown header entry type {}", code)))
    }

    /// Store alignment required before the first element.
    pub fn alignment(self) -> u64 {
        match self {
            EntryType::Int16 => 2,
            EntryType::Int32 => 4,
            EntryType::Int64 => 8,
            _ => 1,
        }
    }
}

/// One 16-byte record of the header index.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub tag: i32,
    pub entry_type: i32,
    pub offset: i32,
    pub count: i32,
}

impl IndexEntry {
    pub fn new(tag: i32, entry_type: EntryType, offset: i32, count: i32) -> Self {
        Self {
            tag,
            entry_type: entry_type as i32,
            offset,
            count,
        }
    }

    pub fn read<R: Read>(fh: &mut R) -> io::Result<Self> {
        let tag: i32 = fh.read_be()?;
        let entry_type: i32 = fh.read_be()?;
        let offset: i32 = fh.read_be()?;
        let count: i32 = fh.read_be()?;

        Ok(IndexEntry {
            tag,
            entry_type,
            offset,
            count,
        })
    }

    pub fn write<W: Write>(&self, fh: &mut W) -> io::Result<()> {
        fh.write_be(self.tag)?;
        fh.write_be(self.entry_type)?;
        fh.write_be(self.offset)?;
        fh.write_be(self.count)?;
        Ok(())
    }
}
