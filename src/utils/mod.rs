use hex::FromHex;
use omnom::prelude::*;
use std::io::{self, Read, Write};

use crate::error::{Error, Result};

/// Rounds `position` up to the next multiple of `alignment` (a power of two).
pub fn align_up(position: u64, alignment: u64) -> u64 {
    (position + alignment - 1) & !(alignment - 1)
}

pub fn parse_string(bytes: &[u8]) -> String {
    let position = bytes.iter().position(|&x| x == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[0..position]).to_string()
}

/// Fills `buf` completely, or returns `false` if the stream ends before the
/// first byte. Running dry half way through is an `UnexpectedEof` error.
pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "Error: stream ends inside a record",
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// A reader or writer that counts the bytes passing through it, so padding
/// can be computed on streams that cannot seek (compressors, pipes).
#[derive(Debug)]
pub struct Tracked<T> {
    inner: T,
    position: u64,
}

impl<T> Tracked<T> {
    pub fn new(inner: T) -> Self {
        Self { inner, position: 0 }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<R: Read> Read for Tracked<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<W: Write> Write for Tracked<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub trait AlignRead {
    /// Discards bytes until the read position is a multiple of `alignment`.
    fn align_read_to(&mut self, alignment: u64) -> io::Result<()>;
}

pub trait AlignWrite {
    /// Writes zero bytes until the write position is a multiple of `alignment`.
    fn align_write_to(&mut self, alignment: u64) -> io::Result<()>;
}

impl<R: Read> AlignRead for Tracked<R> {
    fn align_read_to(&mut self, alignment: u64) -> io::Result<()> {
        let pad = align_up(self.position, alignment) - self.position;
        if pad == 0 {
            return Ok(());
        }
        let skipped = io::copy(&mut Read::by_ref(self).take(pad), &mut io::sink())?;
        if skipped != pad {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Error: stream ends inside alignment padding",
            ));
        }
        Ok(())
    }
}

impl<W: Write> AlignWrite for Tracked<W> {
    fn align_write_to(&mut self, alignment: u64) -> io::Result<()> {
        let pad = align_up(self.position, alignment) - self.position;
        io::copy(&mut io::repeat(0).take(pad), self)?;
        Ok(())
    }
}

pub trait HexWriter {
    fn write_u32_as_hex(&mut self, from: u32) -> io::Result<()>;
}

impl<W> HexWriter for W
where
    W: Write,
{
    fn write_u32_as_hex(&mut self, from: u32) -> io::Result<()> {
        self.write_all(format!("{:08x}", from).as_bytes())?;
        Ok(())
    }
}

pub trait HexReader {
    fn read_hex_as_u32(&mut self) -> Result<u32>;
}

impl<R> HexReader for R
where
    R: Read,
{
    fn read_hex_as_u32(&mut self) -> Result<u32> {
        let mut raw_bytes = [0_u8; 8];
        self.read_exact(&mut raw_bytes)?;

        let value: u32 = Vec::from_hex(raw_bytes)
            .map_err(|e| Error::format(format!("can not parse hex field: {}", e)))?
            .as_slice()
            .read_be()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_align_up_bounds() {
        for alignment in [2_u64, 4, 8] {
            for n in 0..64_u64 {
                let aligned = align_up(n, alignment);
                assert_eq!(aligned % alignment, 0);
                assert!(aligned >= n);
                assert!(aligned < n + alignment);
            }
        }
    }

    #[test]
    fn test_align_write_pads_with_zeros() {
        let mut writer = Tracked::new(Vec::new());
        writer.write_all(b"abc").unwrap();
        writer.align_write_to(8).unwrap();
        assert_eq!(writer.position(), 8);
        assert_eq!(writer.into_inner(), b"abc\0\0\0\0\0");

        let mut writer = Tracked::new(Vec::new());
        writer.write_all(b"abcd").unwrap();
        writer.align_write_to(4).unwrap();
        assert_eq!(writer.into_inner(), b"abcd");
    }

    #[test]
    fn test_align_read_skips_padding() {
        let mut reader = Tracked::new(Cursor::new(b"a\0\0\0bcde".to_vec()));
        let mut byte = [0_u8; 1];
        reader.read_exact(&mut byte).unwrap();
        reader.align_read_to(4).unwrap();
        assert_eq!(reader.position(), 4);
        reader.read_exact(&mut byte).unwrap();
        assert_eq!(&byte, b"b");
    }

    #[test]
    fn test_align_read_truncated() {
        let mut reader = Tracked::new(Cursor::new(b"a\0".to_vec()));
        let mut byte = [0_u8; 1];
        reader.read_exact(&mut byte).unwrap();
        assert!(reader.align_read_to(8).is_err());
    }

    #[test]
    fn test_read_exact_or_eof() {
        let mut buf = [0_u8; 4];
        assert!(!read_exact_or_eof(&mut Cursor::new(Vec::new()), &mut buf).unwrap());
        assert!(read_exact_or_eof(&mut Cursor::new(b"abcd".to_vec()), &mut buf).unwrap());
        assert!(read_exact_or_eof(&mut Cursor::new(b"ab".to_vec()), &mut buf).is_err());
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(parse_string(b"foo\0\0\0"), "foo");
        assert_eq!(parse_string(b"bar"), "bar");
    }

    #[test]
    #[allow(clippy::string_lit_as_bytes)]
    fn test_hex_reader() {
        assert_eq!("00000001".as_bytes().read_hex_as_u32().unwrap(), 1);
        assert_eq!("00000101".as_bytes().read_hex_as_u32().unwrap(), 257);
        assert_eq!("000001f1".as_bytes().read_hex_as_u32().unwrap(), 497);
        assert_eq!("ffffffff".as_bytes().read_hex_as_u32().unwrap(), u32::MAX);
        assert!("0000zz01".as_bytes().read_hex_as_u32().is_err());
    }

    #[test]
    fn test_hex_writer() {
        let mut buf = Vec::new();
        buf.write_u32_as_hex(1).unwrap();
        assert_eq!(buf.as_slice(), b"00000001");

        let mut buf = Vec::new();
        buf.write_u32_as_hex(497).unwrap();
        assert_eq!(buf.as_slice(), b"000001f1");

        let mut buf = Vec::new();
        buf.write_u32_as_hex(u32::MAX).unwrap();
        assert_eq!(buf.as_slice(), b"ffffffff");
    }
}
