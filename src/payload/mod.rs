mod cpio;

pub use cpio::*;

/// One file as described by the parallel arrays of a package header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub user: String,
    pub group: String,
    pub flags: i32,
    pub mtime: i32,
    pub digest: String,
    pub mode: u16,
    pub linkname: String,
    pub device: i32,
    pub inode: i32,
    pub class: String,
}

#[derive(Debug, Default)]
pub struct PayloadInfo {
    pub size: u64,
    pub format: String,
    pub compressor: String,
    pub level: String,
    pub files: Vec<FileInfo>,
}
