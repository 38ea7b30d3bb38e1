//! The "index + store" structure shared by the signature and the package
//! header of an RPM file.
//!
//! A header is a list of tagged entries. On the wire it is a 16-byte
//! [`HeaderLead`], one 16-byte [`IndexEntry`] per entry, and a store blob the
//! index records point into. Writing always prepends an immutable-region
//! marker; reading validates and drops it.

mod index;
mod lead;
mod sigtags;
mod tags;

pub use index::*;
pub use lead::*;
pub use sigtags::*;
pub use tags::*;

use log::trace;
use num_traits::FromPrimitive;
use std::fmt;
use std::io::{Read, Write};
use std::marker::PhantomData;

use crate::error::{Error, Result, to_i32, to_u32};
use crate::utils::{AlignWrite, Tracked, align_up};

/// A tag vocabulary of a header.
pub trait RpmTag: Copy + FromPrimitive {
    fn code(self) -> i32;
}

/// A header value. The variant decides the wire type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RType {
    Null,
    Char(Vec<u8>),
    Int8(Vec<u8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    String(String),
    Binary(Vec<u8>),
    StringArray(Vec<String>),
    I18NString(String),
}

impl RType {
    pub fn entry_type(&self) -> EntryType {
        match self {
            RType::Null => EntryType::Null,
            RType::Char(_) => EntryType::Char,
            RType::Int8(_) => EntryType::Int8,
            RType::Int16(_) => EntryType::Int16,
            RType::Int32(_) => EntryType::Int32,
            RType::Int64(_) => EntryType::Int64,
            RType::String(_) => EntryType::String,
            RType::Binary(_) => EntryType::Binary,
            RType::StringArray(_) => EntryType::StringArray,
            RType::I18NString(_) => EntryType::I18NString,
        }
    }

    /// Value of the index `count` field.
    pub fn count(&self) -> usize {
        match self {
            RType::Null => 0,
            RType::String(_) | RType::I18NString(_) => 1,
            RType::Char(v) | RType::Int8(v) | RType::Binary(v) => v.len(),
            RType::Int16(v) => v.len(),
            RType::Int32(v) => v.len(),
            RType::Int64(v) => v.len(),
            RType::StringArray(v) => v.len(),
        }
    }

    /// Strings are NUL-terminated in the store, so they can not hold a NUL.
    fn check_strings(&self) -> Result<()> {
        let strings: &[String] = match self {
            RType::String(s) | RType::I18NString(s) => std::slice::from_ref(s),
            RType::StringArray(v) => v,
            _ => return Ok(()),
        };
        match strings.iter().find(|s| s.contains('\0')) {
            Some(s) => Err(Error::argument(format!("string {:?} contains a NUL byte", s))),
            None => Ok(()),
        }
    }

    fn write_store<W: Write>(&self, store: &mut W) -> Result<()> {
        match self {
            RType::Null => return Err(Error::format("null entry can not be written")),
            RType::Char(v) | RType::Int8(v) | RType::Binary(v) => store.write_all(v)?,
            RType::Int16(v) => v.iter().try_for_each(|x| store.write_all(&x.to_be_bytes()))?,
            RType::Int32(v) => v.iter().try_for_each(|x| store.write_all(&x.to_be_bytes()))?,
            RType::Int64(v) => v.iter().try_for_each(|x| store.write_all(&x.to_be_bytes()))?,
            RType::String(s) | RType::I18NString(s) => {
                store.write_all(s.as_bytes())?;
                store.write_all(&[0])?;
            }
            RType::StringArray(v) => {
                for s in v {
                    store.write_all(s.as_bytes())?;
                    store.write_all(&[0])?;
                }
            }
        }
        Ok(())
    }
}

/// One tagged value. The raw tag is kept so that tags outside the
/// vocabulary `T` survive a read/write cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<T> {
    tag: i32,
    pub value: RType,
    kind: PhantomData<T>,
}

impl<T: RpmTag> Entry<T> {
    pub fn new(tag: T, value: RType) -> Self {
        Self::from_raw(tag.code(), value)
    }

    pub fn from_raw(tag: i32, value: RType) -> Self {
        Self {
            tag,
            value,
            kind: PhantomData,
        }
    }

    pub fn tag(&self) -> Option<T> {
        T::from_i32(self.tag)
    }

    pub fn raw_tag(&self) -> i32 {
        self.tag
    }

    pub fn entry_type(&self) -> EntryType {
        self.value.entry_type()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Header<T> {
    entries: Vec<Entry<T>>,
}

impl<T: RpmTag> Default for Header<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: RpmTag> Header<T> {
    pub fn new(entries: Vec<Entry<T>>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Entry<T>] {
        &self.entries
    }

    pub fn push(&mut self, tag: T, value: RType) {
        self.entries.push(Entry::new(tag, value));
    }

    /// First entry carrying `tag`.
    pub fn get(&self, tag: T) -> Option<&RType> {
        let code = tag.code();
        self.entries
            .iter()
            .find(|e| e.tag == code)
            .map(|e| &e.value)
    }

    pub fn get_string(&self, tag: T) -> Option<&str> {
        match self.get(tag)? {
            RType::String(s) | RType::I18NString(s) => Some(s),
            RType::StringArray(v) => v.first().map(String::as_str),
            _ => None,
        }
    }

    pub fn get_string_array(&self, tag: T) -> Option<&[String]> {
        match self.get(tag)? {
            RType::StringArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_i16_array(&self, tag: T) -> Option<&[i16]> {
        match self.get(tag)? {
            RType::Int16(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_i32_array(&self, tag: T) -> Option<&[i32]> {
        match self.get(tag)? {
            RType::Int32(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_i32(&self, tag: T) -> Option<i32> {
        self.get_i32_array(tag)?.first().copied()
    }

    pub fn get_binary(&self, tag: T) -> Option<&[u8]> {
        match self.get(tag)? {
            RType::Binary(v) => Some(v),
            _ => None,
        }
    }

    pub fn read<R: Read>(fh: &mut R, immutable_tag: T) -> Result<Self> {
        let lead = HeaderLead::read(fh)?;

        let mut index = Vec::with_capacity(lead.nindex.min(4096) as usize);
        for _ in 0..lead.nindex {
            index.push(IndexEntry::read(fh)?);
        }

        let mut store = Vec::new();
        let read = Read::by_ref(fh)
            .take(lead.hsize.into())
            .read_to_end(&mut store)?;
        if read != lead.hsize as usize {
            return Err(Error::format(format!(
                "rpm header store is truncated ({} of {} bytes)",
                read, lead.hsize
            )));
        }

        let immutable = immutable_tag.code();
        let mut entries = Vec::with_capacity(index.len());
        for record in &index {
            if record.tag == immutable {
                check_region_marker(&store, record)?;
                continue;
            }
            let value = decode_value(&store, record)?;
            entries.push(Entry::from_raw(record.tag, value));
        }
        trace!(
            "header: read {} entries, {} store bytes",
            entries.len(),
            store.len()
        );
        Ok(Header { entries })
    }

    pub fn write_to<W: Write>(&self, fh: &mut W, immutable_tag: T) -> Result<()> {
        let immutable = immutable_tag.code();
        let region_len = to_i32((self.entries.len() + 1) * INDEX_ENTRY_LEN, "rpm header index")?;

        let mut store = Tracked::new(Vec::new());
        IndexEntry::new(immutable, EntryType::Binary, -region_len, INDEX_ENTRY_LEN as i32)
            .write(&mut store)?;

        let mut index = Vec::with_capacity(self.entries.len() + 1);
        index.push(IndexEntry::new(immutable, EntryType::Binary, 0, INDEX_ENTRY_LEN as i32));
        for entry in &self.entries {
            let entry_type = entry.entry_type();
            if entry_type == EntryType::Null {
                return Err(Error::format(format!(
                    "null entry (tag {}) can not be written",
                    entry.tag
                )));
            }
            entry.value.check_strings()?;
            store.align_write_to(entry_type.alignment())?;
            let offset = to_i32(store.get_ref().len(), "rpm header store")?;
            let count = to_i32(entry.value.count(), "rpm header entry")?;
            entry.value.write_store(&mut store)?;
            index.push(IndexEntry::new(entry.tag, entry_type, offset, count));
        }

        let store = store.into_inner();
        let nindex = to_u32(index.len(), "rpm header index")?;
        let hsize = to_u32(store.len(), "rpm header store")?;
        HeaderLead::from(nindex, hsize).write(fh)?;
        for record in &index {
            record.write(fh)?;
        }
        fh.write_all(&store)?;
        trace!("header: wrote {} entries, {} store bytes", nindex, hsize);
        Ok(())
    }

    pub fn to_bytes(&self, immutable_tag: T) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.write_to(&mut data, immutable_tag)?;
        Ok(data)
    }
}

fn check_region_marker(store: &[u8], record: &IndexEntry) -> Result<()> {
    let mut bytes = store_slice(store, record.offset, INDEX_ENTRY_LEN)?;
    let marker = IndexEntry::read(&mut bytes)?;
    if marker.tag != record.tag
        || marker.entry_type != EntryType::Binary as i32
        || marker.count != INDEX_ENTRY_LEN as i32
    {
        return Err(Error::format(format!(
            "invalid immutable region marker {:?}",
            marker
        )));
    }
    Ok(())
}

fn store_slice(store: &[u8], offset: i32, len: usize) -> Result<&[u8]> {
    usize::try_from(offset)
        .ok()
        .and_then(|start| store.get(start..start.checked_add(len)?))
        .ok_or_else(|| {
            Error::format(format!(
                "header entry at offset {} ({} bytes) is outside the store",
                offset, len
            ))
        })
}

fn nul_terminated(store: &[u8], offset: usize) -> Result<(String, usize)> {
    let rest = store.get(offset..).unwrap_or_default();
    let end = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::format("header string has no NUL terminator"))?;
    Ok((String::from_utf8_lossy(&rest[..end]).to_string(), end + 1))
}

fn numbers<const N: usize, V>(
    store: &[u8],
    record: &IndexEntry,
    count: usize,
    from_be: fn([u8; N]) -> V,
) -> Result<Vec<V>> {
    let start = align_up(record.offset as u64, N as u64);
    let start = i32::try_from(start)
        .map_err(|_| Error::format("header entry offset is outside the store"))?;
    let len = count
        .checked_mul(N)
        .ok_or_else(|| Error::format("header entry count is too large"))?;
    let bytes = store_slice(store, start, len)?;
    Ok(bytes
        .chunks_exact(N)
        .map(|chunk| {
            let mut raw = [0_u8; N];
            raw.copy_from_slice(chunk);
            from_be(raw)
        })
        .collect())
}

fn decode_value(store: &[u8], record: &IndexEntry) -> Result<RType> {
    let count = usize::try_from(record.count).map_err(|_| {
        Error::format(format!(
            "negative count {} for header tag {}",
            record.count, record.tag
        ))
    })?;
    if record.offset < 0 {
        return Err(Error::format(format!(
            "negative offset {} for header tag {}",
            record.offset, record.tag
        )));
    }

    let value = match EntryType::from_code(record.entry_type)? {
        EntryType::Null => {
            return Err(Error::format(format!(
                "null entry (tag {}) in rpm header",
                record.tag
            )));
        }
        EntryType::Char => RType::Char(store_slice(store, record.offset, count)?.to_vec()),
        EntryType::Int8 => RType::Int8(store_slice(store, record.offset, count)?.to_vec()),
        EntryType::Binary => RType::Binary(store_slice(store, record.offset, count)?.to_vec()),
        EntryType::Int16 => RType::Int16(numbers(store, record, count, i16::from_be_bytes)?),
        EntryType::Int32 => RType::Int32(numbers(store, record, count, i32::from_be_bytes)?),
        EntryType::Int64 => RType::Int64(numbers(store, record, count, i64::from_be_bytes)?),
        EntryType::String => RType::String(nul_terminated(store, record.offset as usize)?.0),
        EntryType::I18NString => {
            RType::I18NString(nul_terminated(store, record.offset as usize)?.0)
        }
        EntryType::StringArray => {
            let mut offset = record.offset as usize;
            let mut strings = Vec::with_capacity(count.min(store.len()));
            for _ in 0..count {
                let (s, len) = nul_terminated(store, offset)?;
                strings.push(s);
                offset += len;
            }
            RType::StringArray(strings)
        }
    };
    Ok(value)
}

impl<T: RpmTag + fmt::Debug> fmt::Display for Header<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            match entry.tag() {
                Some(tag) => write!(f, "\tTag: {:?}", tag)?,
                None => write!(f, "\tTag: {}", entry.tag)?,
            }
            writeln!(f, ", Type: {}", entry.entry_type())?;
            match &entry.value {
                RType::Null => writeln!(f, "\t\tnull")?,
                RType::String(s) | RType::I18NString(s) => writeln!(f, "\t\t'{}'", s)?,
                RType::Binary(v) => {
                    writeln!(f, "\t\t{} bytes", v.len())?;
                    writeln!(f, "\t\t{}", hex::encode(v))?;
                }
                RType::Char(v) | RType::Int8(v) => writeln!(f, "\t\t{:?}", v)?,
                RType::Int16(v) => v.iter().try_for_each(|x| writeln!(f, "\t\t- '{}'", x))?,
                RType::Int32(v) => v.iter().try_for_each(|x| writeln!(f, "\t\t- '{}'", x))?,
                RType::Int64(v) => v.iter().try_for_each(|x| writeln!(f, "\t\t- '{}'", x))?,
                RType::StringArray(v) => v.iter().try_for_each(|x| writeln!(f, "\t\t- '{}'", x))?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip<T: RpmTag + fmt::Debug + PartialEq>(header: &Header<T>, tag: T) -> Header<T> {
        let data = header.to_bytes(tag).unwrap();
        Header::read(&mut Cursor::new(data), tag).unwrap()
    }

    #[test]
    fn test_string_array_roundtrip() {
        let header = Header::new(vec![Entry::new(
            Tag::BaseNames,
            RType::StringArray(vec!["a".into(), "bb".into(), "ccc".into()]),
        )]);
        let read = roundtrip(&header, Tag::Immutable);
        assert_eq!(
            read.get_string_array(Tag::BaseNames).unwrap(),
            ["a", "bb", "ccc"]
        );
    }

    #[test]
    fn test_string_with_nul_is_rejected() {
        for value in [
            RType::StringArray(vec!["a\0b".into(), "c".into()]),
            RType::String("a\0".into()),
            RType::I18NString("\0".into()),
        ] {
            let header = Header::new(vec![Entry::new(Tag::BaseNames, value)]);
            let mut data = Vec::new();
            assert!(matches!(
                header.write_to(&mut data, Tag::Immutable),
                Err(Error::InvalidArgument(_))
            ));
            assert!(data.is_empty());
        }
    }

    #[test]
    fn test_int32_roundtrip() {
        let values = vec![1, -1, i32::MAX, i32::MIN];
        let header = Header::new(vec![Entry::new(Tag::FileSizes, RType::Int32(values.clone()))]);
        let read = roundtrip(&header, Tag::Immutable);
        assert_eq!(read.get_i32_array(Tag::FileSizes).unwrap(), values.as_slice());
    }

    #[test]
    fn test_all_types_roundtrip() {
        let header = Header::new(vec![
            Entry::new(Tag::Name, RType::String("foo".into())),
            Entry::new(Tag::FileModes, RType::Int16(vec![0o100755u16 as i16, -1])),
            Entry::new(Tag::Summary, RType::I18NString("summary".into())),
            Entry::new(Tag::FileSizes, RType::Int64(vec![i64::MAX, 7])),
            Entry::new(Tag::FileColors, RType::Int8(vec![1, 2, 3])),
            Entry::new(Tag::FileClass, RType::Char(b"xyz".to_vec())),
            Entry::new(Tag::Prefixes, RType::StringArray(vec![])),
            Entry::new(Tag::FileDigests, RType::Binary(vec![0xde, 0xad])),
            Entry::from_raw(4242, RType::Int32(vec![5])),
        ]);
        let read = roundtrip(&header, Tag::Immutable);
        assert_eq!(read, header);
        assert_eq!(read.entries()[8].tag(), None);
        assert_eq!(read.entries()[8].raw_tag(), 4242);
    }

    #[test]
    fn test_immutable_region_is_hidden() {
        let header = Header::new(vec![
            Entry::new(Tag::Name, RType::String("foo".into())),
            Entry::new(Tag::Version, RType::String("1.0".into())),
        ]);
        let data = header.to_bytes(Tag::Immutable).unwrap();
        assert_eq!(&data[8..12], &3_u32.to_be_bytes());

        // first index record is the marker pointing at store offset 0
        assert_eq!(&data[16..32], &[0, 0, 0, 63, 0, 0, 0, 7, 0, 0, 0, 0, 0, 0, 0, 16]);
        // the store opens with the marker pointing back over the index
        let store = 16 + 3 * INDEX_ENTRY_LEN;
        assert_eq!(
            &data[store..store + 16],
            &[0, 0, 0, 63, 0, 0, 0, 7, 0xff, 0xff, 0xff, 0xd0, 0, 0, 0, 16]
        );

        let read = Header::read(&mut Cursor::new(data), Tag::Immutable).unwrap();
        assert_eq!(read.entries().len(), 2);
        assert_eq!(read.get_string(Tag::Version), Some("1.0"));
    }

    #[test]
    fn test_signature_header_uses_its_own_tag() {
        let header = Header::new(vec![Entry::new(
            SignatureTag::UncompressedPayloadSize,
            RType::Int32(vec![512]),
        )]);
        let read = roundtrip(&header, SignatureTag::HeaderSignatures);
        assert_eq!(read.get_i32(SignatureTag::UncompressedPayloadSize), Some(512));
    }

    #[test]
    fn test_integer_alignment() {
        let header = Header::new(vec![
            Entry::new(Tag::Name, RType::String("ab".into())),
            Entry::new(Tag::FileModes, RType::Int16(vec![1])),
            Entry::new(Tag::Release, RType::String("x".into())),
            Entry::new(Tag::FileSizes, RType::Int64(vec![2])),
            Entry::new(Tag::FileDigests, RType::Binary(vec![9])),
            Entry::new(Tag::FileFlags, RType::Int32(vec![3])),
        ]);
        let data = header.to_bytes(Tag::Immutable).unwrap();
        let mut cursor = Cursor::new(&data[16..]);
        let offsets: Vec<i32> = (0..7)
            .map(|_| IndexEntry::read(&mut cursor).unwrap().offset)
            .collect();
        // marker 0..16, "ab\0" 16..19, pad, i16 20..22, "x\0" 22..24,
        // i64 24..32, binary 32..33 unaligned, pad, i32 36..40
        assert_eq!(offsets, [0, 16, 20, 22, 24, 32, 36]);
        assert_eq!(&data[12..16], &40_u32.to_be_bytes());
    }

    #[test]
    fn test_null_entry_is_rejected() {
        let header: Header<Tag> = Header::new(vec![Entry::new(Tag::Name, RType::Null)]);
        assert!(matches!(header.to_bytes(Tag::Immutable), Err(Error::Format(_))));
    }

    #[test]
    fn test_null_entry_on_read() {
        let header = Header::new(vec![Entry::new(Tag::Name, RType::String("a".into()))]);
        let mut data = header.to_bytes(Tag::Immutable).unwrap();
        // second index record, type field
        data[16 + 16 + 4..16 + 16 + 8].copy_from_slice(&0_i32.to_be_bytes());
        assert!(matches!(
            Header::read(&mut Cursor::new(data), Tag::Immutable),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_missing_nul_terminator() {
        let header = Header::new(vec![Entry::new(Tag::Name, RType::String("abc".into()))]);
        let mut data = header.to_bytes(Tag::Immutable).unwrap();
        let last = data.len() - 1;
        data[last] = b'd';
        assert!(matches!(
            Header::read(&mut Cursor::new(data), Tag::Immutable),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_bad_immutable_marker() {
        let header = Header::new(vec![Entry::new(Tag::Name, RType::String("abc".into()))]);
        let mut data = header.to_bytes(Tag::Immutable).unwrap();
        let store = 16 + 2 * INDEX_ENTRY_LEN;
        // marker count 16 -> 17
        data[store + 15] = 17;
        assert!(matches!(
            Header::read(&mut Cursor::new(data), Tag::Immutable),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_offset_outside_store() {
        let header = Header::new(vec![Entry::new(Tag::FileSizes, RType::Int32(vec![1]))]);
        let mut data = header.to_bytes(Tag::Immutable).unwrap();
        data[16 + 16 + 8..16 + 16 + 12].copy_from_slice(&1000_i32.to_be_bytes());
        assert!(matches!(
            Header::read(&mut Cursor::new(data), Tag::Immutable),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_display_lists_entries() {
        let header = Header::new(vec![
            Entry::new(Tag::Name, RType::String("foo".into())),
            Entry::new(Tag::FileDigests, RType::Binary(vec![0xab, 0x01])),
        ]);
        let text = header.to_string();
        assert!(text.contains("Tag: Name, Type: String"));
        assert!(text.contains("'foo'"));
        assert!(text.contains("2 bytes"));
        assert!(text.contains("ab01"));
    }
}
