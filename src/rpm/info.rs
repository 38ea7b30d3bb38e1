use chrono::{DateTime, Local};
use itertools::multizip;
use std::fmt;

use super::RpmPackage;
use crate::header::{SignatureTag, Tag};
use crate::payload::{FileInfo, PayloadInfo};

/// `rpm -qi` style summary of a package.
#[derive(Debug, Default)]
pub struct RpmInfo {
    pub name: String,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub os: String,
    pub group: String,
    pub size: u64,
    pub license: String,
    pub vendor: String,
    pub packager: String,
    pub url: String,
    pub source_rpm: String,
    pub build_time: i64,
    pub build_host: String,
    pub summary: String,
    pub description: String,
    pub payload: PayloadInfo,
}

impl fmt::Display for RpmInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let build_time = DateTime::from_timestamp(self.build_time, 0)
            .map(|t| t.with_timezone(&Local).format("%c").to_string())
            .unwrap_or_default();

        writeln!(f, "Name        : {}", self.name)?;
        writeln!(f, "Version     : {}", self.version)?;
        writeln!(f, "Release     : {}", self.release)?;
        writeln!(f, "Architecture: {}", self.arch)?;
        writeln!(f, "Group       : {}", self.group)?;
        writeln!(f, "Size        : {}", self.size)?;
        writeln!(f, "License     : {}", self.license)?;
        writeln!(f, "Signature   : (none)")?;
        writeln!(f, "Source RPM  : {}", self.source_rpm)?;
        writeln!(f, "Build Date  : {}", build_time)?;
        writeln!(f, "Build Host  : {}", self.build_host)?;
        writeln!(f, "Vendor      : {}", self.vendor)?;
        writeln!(f, "Packager    : {}", self.packager)?;
        writeln!(f, "URL         : {}", self.url)?;
        writeln!(f, "Summary     : {}", self.summary)?;
        writeln!(f, "Description : \n{}", self.description)
    }
}

impl From<&RpmPackage> for RpmInfo {
    fn from(rpm: &RpmPackage) -> Self {
        let header = &rpm.header;
        let string = move |tag| header.get_string(tag).unwrap_or_default().to_owned();
        let strings = move |tag| header.get_string_array(tag).unwrap_or_default();
        let ints = move |tag| header.get_i32_array(tag).unwrap_or_default();

        let dirs = strings(Tag::DirectoryNames);
        let modes = header.get_i16_array(Tag::FileModes).unwrap_or_default();
        let flags = ints(Tag::FileFlags);
        let mtimes = ints(Tag::FileModificationTimestamp);
        let devices = ints(Tag::FileDevices);
        let inodes = ints(Tag::FileInode);
        let classes = ints(Tag::FileClass);
        let class_dictionary = strings(Tag::FileClassDictionary);

        let files: Vec<FileInfo> = multizip((
            strings(Tag::BaseNames),
            ints(Tag::DirectoryNameIndices),
            ints(Tag::FileSizes),
            strings(Tag::FileUserName),
            strings(Tag::FileGroupName),
            strings(Tag::FileLinkTos),
            strings(Tag::FileDigests),
        ))
        .enumerate()
        .map(
            |(i, (name, &index, &size, user, group, linkname, digest))| FileInfo {
                name: lookup(dirs, index) + name,
                size: size as u32 as u64,
                user: user.clone(),
                group: group.clone(),
                flags: flags.get(i).copied().unwrap_or_default(),
                mtime: mtimes.get(i).copied().unwrap_or_default(),
                digest: digest.clone(),
                mode: modes.get(i).map(|&m| m as u16).unwrap_or_default(),
                linkname: linkname.clone(),
                device: devices.get(i).copied().unwrap_or_default(),
                inode: inodes.get(i).copied().unwrap_or_default(),
                class: classes
                    .get(i)
                    .map(|&c| lookup(class_dictionary, c))
                    .unwrap_or_default(),
            },
        )
        .collect();

        let payload = PayloadInfo {
            size: rpm
                .signature
                .get_i32(SignatureTag::UncompressedPayloadSize)
                .map(|s| s as u32 as u64)
                .unwrap_or(rpm.archive_bytes().len() as u64),
            format: string(Tag::PayloadFormat),
            compressor: string(Tag::PayloadCompressor),
            level: string(Tag::PayloadCompressorLevel),
            files,
        };

        RpmInfo {
            name: string(Tag::Name),
            version: string(Tag::Version),
            release: string(Tag::Release),
            arch: string(Tag::Architecture),
            os: string(Tag::OperatingSystem),
            group: string(Tag::Group),
            size: header
                .get_i32(Tag::InstalledSize)
                .map(|s| s as u32 as u64)
                .unwrap_or_default(),
            license: string(Tag::License),
            vendor: string(Tag::Vendor),
            packager: string(Tag::Packager),
            url: string(Tag::Url),
            source_rpm: string(Tag::SourceRpm),
            build_time: header.get_i32(Tag::BuildTime).unwrap_or_default().into(),
            build_host: string(Tag::BuildHost),
            summary: string(Tag::Summary),
            description: string(Tag::Description),
            payload,
        }
    }
}

fn lookup(table: &[String], index: i32) -> String {
    usize::try_from(index)
        .ok()
        .and_then(|i| table.get(i))
        .cloned()
        .unwrap_or_default()
}
