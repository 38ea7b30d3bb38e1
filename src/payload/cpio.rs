use filetime::{FileTime, set_file_mtime, set_symlink_file_times};
use log::trace;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use strum_macros::Display;

use crate::error::{Error, Result, to_u32};
use crate::utils::{AlignRead, AlignWrite, HexReader, HexWriter, Tracked};

const MAGIC: &[u8] = b"070701";
pub const TRAILER: &str = "TRAILER!!!";

pub const FILE_KIND_MASK: u32 = 0o170000;
pub const REGULAR_FILE: u32 = 0o100000;
pub const DIRECTORY: u32 = 0o040000;
pub const SYMBOLIC_LINK: u32 = 0o120000;
pub const FILE_PERMISSION_MASK: u32 = 0o7777;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FileKind {
    #[strum(serialize = "regular file")]
    RegularFile,
    #[strum(serialize = "directory")]
    Directory,
    #[strum(serialize = "symbolic link")]
    SymbolicLink,
}

impl FileKind {
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode & FILE_KIND_MASK {
            REGULAR_FILE => Some(FileKind::RegularFile),
            DIRECTORY => Some(FileKind::Directory),
            SYMBOLIC_LINK => Some(FileKind::SymbolicLink),
            _ => None,
        }
    }

    pub fn mode_bits(self) -> u32 {
        match self {
            FileKind::RegularFile => REGULAR_FILE,
            FileKind::Directory => DIRECTORY,
            FileKind::SymbolicLink => SYMBOLIC_LINK,
        }
    }
}

/// One filesystem entry of a "newc" cpio archive. For symbolic links `data`
/// holds the link target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpioEntry {
    pub inode: u32,
    pub name: String,
    pub timestamp: u32,
    pub owner_id: u32,
    pub group_id: u32,
    pub mode: u32,
    pub number_of_links: u32,
    pub dev_major: u32,
    pub dev_minor: u32,
    pub rdev_major: u32,
    pub rdev_minor: u32,
    pub data: Vec<u8>,
}

impl CpioEntry {
    pub fn new<S: Into<String>>(name: S, mode: u32, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mode,
            number_of_links: 1,
            data,
            ..Default::default()
        }
    }

    pub fn kind(&self) -> Option<FileKind> {
        FileKind::from_mode(self.mode)
    }

    pub fn link_target(&self) -> Option<String> {
        match self.kind() {
            Some(FileKind::SymbolicLink) => Some(String::from_utf8_lossy(&self.data).to_string()),
            _ => None,
        }
    }

    /// Builds an entry named `name` from a file, directory or symlink on disk.
    pub fn from_path<P: AsRef<Path>>(path: P, name: &str) -> Result<Self> {
        let path = path.as_ref();
        let meta = fs::symlink_metadata(path)?;
        let file_type = meta.file_type();
        let data = if file_type.is_symlink() {
            fs::read_link(path)?.to_string_lossy().into_owned().into_bytes()
        } else if file_type.is_dir() {
            Vec::new()
        } else if file_type.is_file() {
            fs::read(path)?
        } else {
            return Err(Error::argument(format!(
                "{} is neither a file, a directory nor a symlink",
                path.display()
            )));
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            Ok(CpioEntry {
                inode: meta.ino() as u32,
                name: name.to_owned(),
                timestamp: u32::try_from(meta.mtime()).unwrap_or(0),
                owner_id: meta.uid(),
                group_id: meta.gid(),
                mode: meta.mode(),
                number_of_links: meta.nlink() as u32,
                dev_major: major(meta.dev()),
                dev_minor: minor(meta.dev()),
                rdev_major: major(meta.rdev()),
                rdev_minor: minor(meta.rdev()),
                data,
            })
        }
        #[cfg(not(unix))]
        {
            let kind = if file_type.is_symlink() {
                FileKind::SymbolicLink
            } else if file_type.is_dir() {
                FileKind::Directory
            } else {
                FileKind::RegularFile
            };
            let permissions = if meta.permissions().readonly() {
                0o555
            } else {
                0o755
            };
            let timestamp = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .and_then(|d| u32::try_from(d.as_secs()).ok())
                .unwrap_or(0);
            Ok(CpioEntry {
                timestamp,
                ..CpioEntry::new(name, kind.mode_bits() | permissions, data)
            })
        }
    }
}

#[cfg(unix)]
fn major(dev: u64) -> u32 {
    (((dev >> 32) & 0xffff_f000) | ((dev >> 8) & 0x0000_0fff)) as u32
}

#[cfg(unix)]
fn minor(dev: u64) -> u32 {
    (((dev >> 12) & 0xffff_ff00) | (dev & 0x0000_00ff)) as u32
}

/// Reads entries from a "newc" archive until the trailer.
pub struct CpioReader<R> {
    reader: Tracked<R>,
    done: bool,
}

impl<R: Read> CpioReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Tracked::new(reader),
            done: false,
        }
    }

    /// Returns `None` once the trailer entry has been consumed.
    pub fn next_entry(&mut self) -> Result<Option<CpioEntry>> {
        if self.done {
            return Ok(None);
        }

        let reader = &mut self.reader;
        let mut magic = [0_u8; 6];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::format(format!(
                "incorrect magic of cpio entry {:x?}",
                magic
            )));
        }

        let inode = reader.read_hex_as_u32()?;
        let mode = reader.read_hex_as_u32()?;
        let owner_id = reader.read_hex_as_u32()?;
        let group_id = reader.read_hex_as_u32()?;
        let number_of_links = reader.read_hex_as_u32()?;
        let timestamp = reader.read_hex_as_u32()?;
        let file_size = reader.read_hex_as_u32()?;
        let dev_major = reader.read_hex_as_u32()?;
        let dev_minor = reader.read_hex_as_u32()?;
        let rdev_major = reader.read_hex_as_u32()?;
        let rdev_minor = reader.read_hex_as_u32()?;
        let name_size = reader.read_hex_as_u32()?;
        let mut checksum = [0_u8; 8];
        reader.read_exact(&mut checksum)?;

        let mut name_bytes = vec![0_u8; name_size as usize];
        reader.read_exact(&mut name_bytes)?;
        if name_bytes.pop() != Some(0) {
            return Err(Error::format("cpio entry name is not NUL terminated"));
        }
        let name = String::from_utf8(name_bytes)
            .map_err(|e| Error::format(format!("incorrect utf8 symbol in cpio name: {}", e)))?;
        reader.align_read_to(4)?;

        let mut data = Vec::new();
        let read = Read::by_ref(reader)
            .take(file_size.into())
            .read_to_end(&mut data)?;
        if read != file_size as usize {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("Error: cpio entry {:?} is truncated", name),
            )
            .into());
        }
        reader.align_read_to(4)?;

        if name == TRAILER {
            self.done = true;
            return Ok(None);
        }
        if FileKind::from_mode(mode).is_none() {
            return Err(Error::format(format!(
                "unsupported file kind {:o} for cpio entry {:?}",
                mode & FILE_KIND_MASK,
                name
            )));
        }

        trace!("cpio: read entry {:?} ({} bytes)", name, file_size);
        Ok(Some(CpioEntry {
            inode,
            name,
            timestamp,
            owner_id,
            group_id,
            mode,
            number_of_links,
            dev_major,
            dev_minor,
            rdev_major,
            rdev_minor,
            data,
        }))
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

impl<R: Read> Iterator for CpioReader<R> {
    type Item = Result<CpioEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

/// Writes "newc" entries. `finish` appends the trailer and hands the stream
/// back; dropping an unfinished writer still appends the trailer.
pub struct CpioWriter<W: Write> {
    writer: Option<Tracked<W>>,
}

impl<W: Write> CpioWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(Tracked::new(writer)),
        }
    }

    pub fn write_entry(&mut self, entry: &CpioEntry) -> Result<()> {
        if entry.kind().is_none() {
            return Err(Error::argument(format!(
                "unsupported file kind {:o} for cpio entry {:?}",
                entry.mode & FILE_KIND_MASK,
                entry.name
            )));
        }
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::argument("cpio archive is already finished"))?;
        write_entry(writer, entry)?;
        trace!("cpio: wrote entry {:?} ({} bytes)", entry.name, entry.data.len());
        Ok(())
    }

    /// Number of archive bytes written so far.
    pub fn position(&self) -> u64 {
        self.writer.as_ref().map_or(0, Tracked::position)
    }

    pub fn finish(mut self) -> Result<W> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| Error::argument("cpio archive is already finished"))?;
        write_trailer(&mut writer)?;
        writer.flush()?;
        Ok(writer.into_inner())
    }
}

impl<W: Write> Drop for CpioWriter<W> {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = write_trailer(&mut writer);
        }
    }
}

fn write_trailer<W: Write>(writer: &mut Tracked<W>) -> Result<()> {
    write_entry(writer, &CpioEntry::new(TRAILER, 0, Vec::new()))
}

fn write_entry<W: Write>(writer: &mut Tracked<W>, entry: &CpioEntry) -> Result<()> {
    let file_size = to_u32(entry.data.len(), "cpio entry data")?;
    let name_size = to_u32(entry.name.len() + 1, "cpio entry name")?;

    writer.write_all(MAGIC)?;
    writer.write_u32_as_hex(entry.inode)?;
    writer.write_u32_as_hex(entry.mode)?;
    writer.write_u32_as_hex(entry.owner_id)?;
    writer.write_u32_as_hex(entry.group_id)?;
    writer.write_u32_as_hex(entry.number_of_links)?;
    writer.write_u32_as_hex(entry.timestamp)?;
    writer.write_u32_as_hex(file_size)?;
    writer.write_u32_as_hex(entry.dev_major)?;
    writer.write_u32_as_hex(entry.dev_minor)?;
    writer.write_u32_as_hex(entry.rdev_major)?;
    writer.write_u32_as_hex(entry.rdev_minor)?;
    writer.write_u32_as_hex(name_size)?;
    writer.write_u32_as_hex(0)?;

    writer.write_all(entry.name.as_bytes())?;
    writer.write_all(&[0_u8])?;
    writer.align_write_to(4)?;

    writer.write_all(&entry.data)?;
    writer.align_write_to(4)?;
    Ok(())
}

/// Materialises `entry` below `dir` and returns the created path.
pub fn extract_entry(entry: &CpioEntry, dir: &Path, change_owner: bool) -> Result<PathBuf> {
    let relative = relative_path(&entry.name)?;
    check_ancestors(dir, &relative, &entry.name)?;
    let path = dir.join(&relative);
    let kind = entry.kind().ok_or_else(|| {
        Error::format(format!("unsupported file kind for cpio entry {:?}", entry.name))
    })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::symlink_metadata(&path).is_ok_and(|meta| meta.file_type().is_symlink()) {
        fs::remove_file(&path)?;
    }
    match kind {
        FileKind::Directory => fs::create_dir_all(&path)?,
        FileKind::RegularFile => fs::write(&path, &entry.data)?,
        FileKind::SymbolicLink => {
            if fs::symlink_metadata(&path).is_ok() {
                fs::remove_file(&path)?;
            }
            create_symlink(&entry.data, &path)?;
        }
    }

    #[cfg(unix)]
    {
        if kind != FileKind::SymbolicLink {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(entry.mode & FILE_PERMISSION_MASK);
            fs::set_permissions(&path, permissions)?;
        }
        if change_owner && kind != FileKind::SymbolicLink {
            use nix::unistd::{Gid, Uid, chown};
            chown(
                path.as_path(),
                Some(Uid::from_raw(entry.owner_id)),
                Some(Gid::from_raw(entry.group_id)),
            )
            .map_err(|e| {
                io::Error::other(format!("Error: can not change owner of {}: {}", path.display(), e))
            })?;
        }
    }
    #[cfg(not(unix))]
    let _ = change_owner;

    let mtime = FileTime::from_unix_time(entry.timestamp.into(), 0);
    if kind == FileKind::SymbolicLink {
        set_symlink_file_times(&path, mtime, mtime)?;
    } else {
        set_file_mtime(&path, mtime)?;
    }
    Ok(path)
}

#[cfg(unix)]
fn create_symlink(target: &[u8], path: &Path) -> io::Result<()> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    std::os::unix::fs::symlink(OsStr::from_bytes(target), path)
}

#[cfg(not(unix))]
fn create_symlink(target: &[u8], path: &Path) -> io::Result<()> {
    fs::write(path, target)
}

/// Strips the `./` or `/` prefix and refuses names escaping the target directory.
/// Every ancestor of `relative` that already exists below `dir` must be a
/// real directory, not a symlink.
fn check_ancestors(dir: &Path, relative: &Path, name: &str) -> Result<()> {
    let mut current = dir.to_path_buf();
    let Some(parent) = relative.parent() else {
        return Ok(());
    };
    for part in parent.components() {
        current.push(part);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_dir() => {}
            Ok(_) => {
                return Err(Error::format(format!(
                    "cpio entry {:?} goes through {} which is not a directory",
                    name,
                    current.display()
                )));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn relative_path(name: &str) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(Error::format(format!(
                    "cpio entry {:?} points outside the target directory",
                    name
                )));
            }
        }
    }
    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn archive(entries: &[CpioEntry]) -> Vec<u8> {
        let mut writer = CpioWriter::new(Vec::new());
        for entry in entries {
            writer.write_entry(entry).unwrap();
        }
        writer.finish().unwrap()
    }

    fn read_all(bytes: Vec<u8>) -> Vec<CpioEntry> {
        CpioReader::new(Cursor::new(bytes))
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_cpio_header_layout() {
        let entry = CpioEntry {
            inode: 1,
            timestamp: 0x10,
            ..CpioEntry::new("./a", REGULAR_FILE | 0o644, b"hi".to_vec())
        };
        let bytes = archive(&[entry]);
        let header = std::str::from_utf8(&bytes[..110]).unwrap();
        assert_eq!(
            header,
            "070701\
             00000001000081a4000000000000000000000001000000100000000200000000\
             00000000000000000000000000000004\
             00000000"
        );
        // 110 header bytes + "./a\0" = 114, padded to 116
        assert_eq!(&bytes[110..116], b"./a\0\0\0");
        assert_eq!(&bytes[116..120], b"hi\0\0");
        assert_eq!(&bytes[120..126], b"070701");
    }

    #[test]
    fn test_cpio_roundtrip_with_padding() {
        let entries: Vec<CpioEntry> = (0..6)
            .map(|len| CpioEntry {
                inode: len as u32 + 1,
                owner_id: 1000,
                group_id: 1000,
                timestamp: 1_700_000_000,
                ..CpioEntry::new(
                    format!("./usr/share/f{}", "x".repeat(len)),
                    REGULAR_FILE | 0o644,
                    vec![b'a'; len],
                )
            })
            .collect();
        let bytes = archive(&entries);
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(read_all(bytes), entries);
    }

    #[test]
    fn test_cpio_directory_and_symlink() {
        let entries = vec![
            CpioEntry::new("./usr", DIRECTORY | 0o755, Vec::new()),
            CpioEntry::new("./usr/bin/tool", SYMBOLIC_LINK | 0o777, b"../lib/tool".to_vec()),
        ];
        let read = read_all(archive(&entries));
        assert_eq!(read, entries);
        assert_eq!(read[0].kind(), Some(FileKind::Directory));
        assert_eq!(read[1].link_target().as_deref(), Some("../lib/tool"));
    }

    #[test]
    fn test_cpio_trailer_ends_archive() {
        let mut bytes = archive(&[CpioEntry::new("./a", REGULAR_FILE | 0o644, b"x".to_vec())]);
        // garbage after the trailer is never looked at
        bytes.extend_from_slice(b"garbage");
        let mut reader = CpioReader::new(Cursor::new(bytes));
        assert!(reader.next_entry().unwrap().is_some());
        assert!(reader.next_entry().unwrap().is_none());
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn test_cpio_empty_archive() {
        let bytes = archive(&[]);
        assert!(read_all(bytes).is_empty());
    }

    #[test]
    fn test_cpio_drop_writes_trailer() {
        let mut bytes = Vec::new();
        {
            let mut writer = CpioWriter::new(&mut bytes);
            writer
                .write_entry(&CpioEntry::new("./a", REGULAR_FILE | 0o644, b"abc".to_vec()))
                .unwrap();
        }
        assert_eq!(read_all(bytes).len(), 1);
    }

    #[test]
    fn test_cpio_rejects_unsupported_kind() {
        let mut writer = CpioWriter::new(Vec::new());
        let fifo = CpioEntry::new("./fifo", 0o010644, Vec::new());
        assert!(matches!(writer.write_entry(&fifo), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_cpio_bad_magic() {
        let mut bytes = archive(&[]);
        bytes[5] = b'7';
        let mut reader = CpioReader::new(Cursor::new(bytes));
        assert!(matches!(reader.next_entry(), Err(Error::Format(_))));
    }

    #[test]
    fn test_cpio_missing_nul_terminator() {
        let mut bytes = archive(&[CpioEntry::new("./ab", REGULAR_FILE, Vec::new())]);
        // name "./ab\0" starts at 110, replace its terminator
        bytes[114] = b'c';
        let mut reader = CpioReader::new(Cursor::new(bytes));
        assert!(matches!(reader.next_entry(), Err(Error::Format(_))));
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path("./usr/bin/a").unwrap(), PathBuf::from("usr/bin/a"));
        assert_eq!(relative_path("/etc/x").unwrap(), PathBuf::from("etc/x"));
        assert!(relative_path("../../etc/passwd").is_err());
    }

    #[test]
    fn test_extract_entry() {
        let dir = tempfile::tempdir().unwrap();
        let entry = CpioEntry {
            timestamp: 1_600_000_000,
            ..CpioEntry::new("./usr/bin/foo", REGULAR_FILE | 0o755, b"hi".to_vec())
        };
        let path = extract_entry(&entry, dir.path(), false).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hi");
        let mtime = FileTime::from_last_modification_time(&fs::metadata(&path).unwrap());
        assert_eq!(mtime.unix_seconds(), 1_600_000_000);
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_does_not_follow_symlinks() {
        let root = tempfile::tempdir().unwrap();
        let target = root.path().join("target");
        let outside = root.path().join("outside");
        fs::create_dir_all(&target).unwrap();
        fs::create_dir_all(&outside).unwrap();

        let link = CpioEntry::new(
            "./x",
            SYMBOLIC_LINK | 0o777,
            outside.to_string_lossy().into_owned().into_bytes(),
        );
        extract_entry(&link, &target, false).unwrap();

        let through = CpioEntry::new("./x/pwned", REGULAR_FILE | 0o644, b"boom".to_vec());
        assert!(matches!(
            extract_entry(&through, &target, false),
            Err(Error::Format(_))
        ));
        assert!(!outside.join("pwned").exists());

        let over = CpioEntry::new("./x", REGULAR_FILE | 0o644, b"plain".to_vec());
        let path = extract_entry(&over, &target, false).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"plain");
        assert!(fs::read_dir(&outside).unwrap().next().is_none());
    }

    #[test]
    fn test_from_path_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.txt");
        fs::write(&file, b"payload").unwrap();
        let entry = CpioEntry::from_path(&file, "./opt/data.txt").unwrap();
        assert_eq!(entry.kind(), Some(FileKind::RegularFile));
        assert_eq!(entry.data, b"payload");
        assert_eq!(read_all(archive(&[entry.clone()])), vec![entry]);
    }
}
