use log::trace;
use std::io::{self, Read, Write};

use crate::error::{Error, Result};
use crate::utils::read_exact_or_eof;

pub const MAGIC: &[u8; 8] = b"!<arch>\n";
const TERMINATOR: &[u8; 2] = b"`\n";
const PAD: u8 = b'\n';

const NAME_LEN: usize = 16;
const TIMESTAMP_LEN: usize = 12;
const OWNER_LEN: usize = 6;
const GROUP_LEN: usize = 6;
const MODE_LEN: usize = 8;
const SIZE_LEN: usize = 10;
const HEADER_LEN: usize =
    NAME_LEN + TIMESTAMP_LEN + OWNER_LEN + GROUP_LEN + MODE_LEN + SIZE_LEN + TERMINATOR.len();

/// One named blob inside an ar archive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArEntry {
    pub name: String,
    pub timestamp: u64,
    pub owner_id: u32,
    pub group_id: u32,
    pub mode: u32,
    pub data: Vec<u8>,
}

impl ArEntry {
    pub const FILE_PERMISSION_MASK: u32 = 0o777;

    pub fn new<S: Into<String>>(name: S, mode: u32, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mode,
            data,
            ..Default::default()
        }
    }
}

/// Reads entries from an ar archive. Pass `&mut stream` to keep using the
/// stream afterwards, or get it back with `into_inner`.
pub struct ArReader<R> {
    reader: R,
}

impl<R: Read> ArReader<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let mut magic = [0_u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(Error::format(format!(
                "incorrect magic of ar archive {:x?}",
                magic
            )));
        }
        Ok(Self { reader })
    }

    /// Returns `None` once the stream is exhausted at a record boundary.
    pub fn next_entry(&mut self) -> Result<Option<ArEntry>> {
        let mut header = [0_u8; HEADER_LEN];
        if !read_exact_or_eof(&mut self.reader, &mut header)? {
            return Ok(None);
        }

        let mut fields = Fields::new(&header);
        let name = fields.text(NAME_LEN);
        let timestamp = fields.number::<u64>(TIMESTAMP_LEN, 10, "timestamp")?;
        let owner_id = fields.number::<u32>(OWNER_LEN, 10, "owner id")?;
        let group_id = fields.number::<u32>(GROUP_LEN, 10, "group id")?;
        let mode = fields.number::<u32>(MODE_LEN, 8, "mode")?;
        let size = fields.number::<u64>(SIZE_LEN, 10, "size")?;
        if fields.rest() != TERMINATOR {
            return Err(Error::format(format!(
                "incorrect terminator of ar entry {:?}",
                name
            )));
        }

        let mut data = Vec::new();
        let read = Read::by_ref(&mut self.reader).take(size).read_to_end(&mut data)?;
        if read as u64 != size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("Error: ar entry {:?} is truncated", name),
            )
            .into());
        }
        if size % 2 == 1 {
            let mut pad = [0_u8; 1];
            self.reader.read_exact(&mut pad)?;
        }

        trace!("ar: read entry {:?} ({} bytes)", name, size);
        Ok(Some(ArEntry {
            name,
            timestamp,
            owner_id,
            group_id,
            mode,
            data,
        }))
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for ArReader<R> {
    type Item = Result<ArEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

struct Fields<'a> {
    bytes: &'a [u8],
}

impl<'a> Fields<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn take(&mut self, len: usize) -> &'a [u8] {
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        head
    }

    fn text(&mut self, len: usize) -> String {
        let raw = self.take(len);
        String::from_utf8_lossy(raw).trim_end_matches(' ').to_string()
    }

    fn number<T: num_traits::Num>(&mut self, len: usize, radix: u32, what: &str) -> Result<T> {
        let text = self.text(len);
        if text.is_empty() {
            return Ok(T::zero());
        }
        T::from_str_radix(&text, radix)
            .map_err(|_| Error::format(format!("can not parse ar {} {:?}", what, text)))
    }

    fn rest(&self) -> &'a [u8] {
        self.bytes
    }
}

/// Append-only ar archive writer.
pub struct ArWriter<W> {
    writer: W,
}

impl<W: Write> ArWriter<W> {
    pub fn new(mut writer: W) -> Result<Self> {
        writer.write_all(MAGIC)?;
        Ok(Self { writer })
    }

    pub fn add_entry(&mut self, entry: &ArEntry) -> Result<()> {
        let mut header = Vec::with_capacity(HEADER_LEN);
        push_field(&mut header, truncate_name(&entry.name, NAME_LEN).as_bytes(), NAME_LEN);
        push_number(&mut header, entry.timestamp.to_string(), TIMESTAMP_LEN, "timestamp")?;
        push_number(&mut header, entry.owner_id.to_string(), OWNER_LEN, "owner id")?;
        push_number(&mut header, entry.group_id.to_string(), GROUP_LEN, "group id")?;
        push_number(&mut header, format!("{:o}", entry.mode), MODE_LEN, "mode")?;
        push_number(&mut header, entry.data.len().to_string(), SIZE_LEN, "size")?;
        header.extend_from_slice(TERMINATOR);

        self.writer.write_all(&header)?;
        self.writer.write_all(&entry.data)?;
        if entry.data.len() % 2 == 1 {
            self.writer.write_all(&[PAD])?;
        }
        trace!("ar: wrote entry {:?} ({} bytes)", entry.name, entry.data.len());
        Ok(())
    }

    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Cuts `name` to at most `width` bytes without splitting a character.
fn truncate_name(name: &str, width: usize) -> &str {
    let mut len = name.len().min(width);
    while !name.is_char_boundary(len) {
        len -= 1;
    }
    &name[..len]
}

fn push_field(header: &mut Vec<u8>, value: &[u8], width: usize) {
    let len = value.len().min(width);
    header.extend_from_slice(&value[..len]);
    header.resize(header.len() + width - len, b' ');
}

fn push_number(header: &mut Vec<u8>, value: String, width: usize, what: &str) -> Result<()> {
    if value.len() > width {
        return Err(Error::argument(format!(
            "ar {} {} does not fit in {} characters",
            what, value, width
        )));
    }
    push_field(header, value.as_bytes(), width);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn entry(name: &str, data: &[u8]) -> ArEntry {
        ArEntry {
            name: name.to_owned(),
            timestamp: 1_700_000_000,
            owner_id: 1000,
            group_id: 100,
            mode: 0o100644,
            data: data.to_vec(),
        }
    }

    fn write_all(entries: &[ArEntry]) -> Vec<u8> {
        let mut writer = ArWriter::new(Vec::new()).unwrap();
        for entry in entries {
            writer.add_entry(entry).unwrap();
        }
        writer.into_inner().unwrap()
    }

    #[test]
    fn test_ar_header_layout() {
        let bytes = write_all(&[entry("debian-binary", b"2.0\n")]);
        assert_eq!(&bytes[..8], MAGIC);
        assert_eq!(
            &bytes[8..8 + HEADER_LEN],
            &b"debian-binary   1700000000  1000  100   100644  4         `\n"[..]
        );
        assert_eq!(&bytes[8 + HEADER_LEN..], b"2.0\n");
    }

    #[test]
    fn test_ar_roundtrip_odd_and_even_sizes() {
        let entries: Vec<ArEntry> = (0..6)
            .map(|len| entry(&format!("file{}", len), &vec![b'x'; len]))
            .collect();
        let bytes = write_all(&entries);

        let reader = ArReader::new(Cursor::new(bytes)).unwrap();
        let read: Vec<ArEntry> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(read, entries);
    }

    #[test]
    fn test_ar_odd_entry_is_padded() {
        let bytes = write_all(&[entry("a", b"abc")]);
        assert_eq!(bytes.len(), 8 + HEADER_LEN + 4);
        assert_eq!(*bytes.last().unwrap(), b'\n');
    }

    #[test]
    fn test_ar_long_name_is_truncated() {
        let bytes = write_all(&[entry("a-very-long-entry-name.tar.gz", b"")]);
        let mut reader = ArReader::new(Cursor::new(bytes)).unwrap();
        let read = reader.next_entry().unwrap().unwrap();
        assert_eq!(read.name, "a-very-long-entr");
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn test_ar_long_name_keeps_whole_characters() {
        let mut writer = ArWriter::new(Vec::new()).unwrap();
        writer
            .add_entry(&ArEntry::new("aéééééééé", 0o100644, Vec::new()))
            .unwrap();
        let bytes = writer.into_inner().unwrap();
        let entry = ArReader::new(Cursor::new(bytes))
            .unwrap()
            .next_entry()
            .unwrap()
            .unwrap();
        assert_eq!(entry.name, "aééééééé");
    }

    #[test]
    fn test_ar_bad_magic() {
        assert!(matches!(
            ArReader::new(Cursor::new(b"!<arch>X".to_vec())),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_ar_bad_terminator() {
        let mut bytes = write_all(&[entry("a", b"ab")]);
        bytes[8 + HEADER_LEN - 2] = b'x';
        let mut reader = ArReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(reader.next_entry(), Err(Error::Format(_))));
    }

    #[test]
    fn test_ar_truncated_entry() {
        let mut bytes = write_all(&[entry("a", b"abcdef")]);
        bytes.truncate(bytes.len() - 2);
        let mut reader = ArReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(reader.next_entry(), Err(Error::Io(_))));
    }

    #[test]
    fn test_ar_oversized_field() {
        let mut writer = ArWriter::new(Vec::new()).unwrap();
        let mut e = entry("a", b"");
        e.owner_id = 1_234_567;
        assert!(matches!(writer.add_entry(&e), Err(Error::InvalidArgument(_))));
    }
}
