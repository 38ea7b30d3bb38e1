use chrono::Utc;
use itertools::Itertools;
use log::{debug, trace};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::{Compressor, DependencyFlags, RpmPackage, SHA256_DIGEST_ALGORITHM, ScriptKind};
use crate::error::{Error, Result, to_i32};
use crate::header::{Header, RType, SignatureTag, Tag};
use crate::lead::{Architecture, Lead, OperatingSystem};
use crate::payload::{CpioEntry, CpioWriter, FileKind};

const RPM_VERSION: &str = "4.18.2";
const PLATFORM: &str = "x86_64-azl-linux";
const COMPRESSION_LEVEL: u32 = 9;
const RESERVED_SPACE: usize = 4128;

#[derive(Debug, Clone)]
struct Dependency {
    name: String,
    flags: DependencyFlags,
    version: String,
}

impl Dependency {
    fn rpmlib(name: &str, version: &str) -> Self {
        Dependency {
            name: name.to_owned(),
            flags: DependencyFlags::RPMLIB | DependencyFlags::EQUAL | DependencyFlags::LESS,
            version: version.to_owned(),
        }
    }
}

/// Collects metadata and files of one package, then `build` turns them
/// into an [`RpmPackage`].
#[derive(Debug)]
pub struct RpmBuilder {
    name: String,
    version: String,
    release: String,
    arch: Architecture,
    os: OperatingSystem,
    provides: Vec<(String, String)>,
    conflicts: Vec<String>,
    requires: Vec<Dependency>,
    changelog: Vec<(String, String)>,
    files: Vec<(CpioEntry, String)>,
    scripts: Vec<(ScriptKind, String)>,
    url: String,
    vendor: String,
    license: String,
    packager: String,
    summary: String,
    description: String,
    build_time: i64,
    build_host: String,
}

impl RpmBuilder {
    pub fn new(
        name: &str,
        version: &str,
        release: &str,
        arch: Architecture,
        os: OperatingSystem,
    ) -> Self {
        let build_host = hostname::get()
            .map(|host| host.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_owned());
        Self {
            name: name.to_owned(),
            version: version.to_owned(),
            release: release.to_owned(),
            arch,
            os,
            provides: Vec::new(),
            conflicts: Vec::new(),
            requires: vec![
                Dependency::rpmlib("rpmlib(CompressedFileNames)", "3.0.4-1"),
                Dependency::rpmlib("rpmlib(PayloadFilesHavePrefix)", "4.0-1"),
                Dependency::rpmlib("rpmlib(FileDigests)", "4.6.0-1"),
            ],
            changelog: Vec::new(),
            files: Vec::new(),
            scripts: Vec::new(),
            url: String::new(),
            vendor: String::new(),
            license: String::new(),
            packager: String::new(),
            summary: String::new(),
            description: String::new(),
            build_time: Utc::now().timestamp(),
            build_host,
        }
    }

    pub fn url(mut self, url: &str) -> Self {
        self.url = url.to_owned();
        self
    }

    pub fn vendor(mut self, vendor: &str) -> Self {
        self.vendor = vendor.to_owned();
        self
    }

    pub fn license(mut self, license: &str) -> Self {
        self.license = license.to_owned();
        self
    }

    pub fn packager(mut self, packager: &str) -> Self {
        self.packager = packager.to_owned();
        self
    }

    pub fn summary(mut self, summary: &str) -> Self {
        self.summary = summary.to_owned();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    /// Seconds since the epoch, used for `BuildTime` and changelog lines.
    pub fn build_time(mut self, build_time: i64) -> Self {
        self.build_time = build_time;
        self
    }

    pub fn build_host(mut self, build_host: &str) -> Self {
        self.build_host = build_host.to_owned();
        self
    }

    pub fn add_provided_capability(mut self, capability: &str, version: &str) -> Self {
        self.provides.push((capability.to_owned(), version.to_owned()));
        self
    }

    pub fn add_conflict(mut self, name: &str) -> Self {
        self.conflicts.push(name.to_owned());
        self
    }

    /// An empty `version` makes the requirement unversioned, otherwise it
    /// means "greater or equal".
    pub fn add_required_capability(mut self, capability: &str, version: &str) -> Self {
        let flags = if version.is_empty() {
            DependencyFlags::empty()
        } else {
            DependencyFlags::GREATER | DependencyFlags::EQUAL
        };
        self.requires.push(Dependency {
            name: capability.to_owned(),
            flags,
            version: version.to_owned(),
        });
        self
    }

    pub fn add_changelog_line(mut self, name: &str, text: &str) -> Self {
        self.changelog.push((name.to_owned(), text.to_owned()));
        self
    }

    /// `kind` is a `file(1)` style description; it lands in the file class
    /// dictionary and decides the file color.
    pub fn add_file(mut self, entry: CpioEntry, kind: &str) -> Self {
        self.files.push((entry, kind.to_owned()));
        self
    }

    /// Each kind may be added once; `build` fails on a repeated kind.
    pub fn add_script(mut self, kind: ScriptKind, script: &str) -> Self {
        self.scripts.push((kind, script.to_owned()));
        self
    }

    pub fn build(self) -> Result<RpmPackage> {
        let build_time = i32::try_from(self.build_time)
            .map_err(|_| Error::argument(format!("build time {} is out of range", self.build_time)))?;
        if let Some(kind) = self.scripts.iter().map(|(kind, _)| kind).duplicates().next() {
            return Err(Error::argument(format!("{} script is added more than once", kind)));
        }

        let mut header = Header::<Tag>::default();
        header.push(Tag::I18nTable, RType::StringArray(vec!["C".to_owned()]));
        header.push(Tag::Name, RType::String(self.name.clone()));
        header.push(Tag::Version, RType::String(self.version.clone()));
        header.push(Tag::Release, RType::String(self.release.clone()));
        header.push(Tag::PayloadCompressor, RType::String(Compressor::Gzip.to_string()));
        header.push(
            Tag::PayloadCompressorLevel,
            RType::String(COMPRESSION_LEVEL.to_string()),
        );
        header.push(Tag::PayloadFormat, RType::String("cpio".to_owned()));
        header.push(Tag::OperatingSystem, RType::String(self.os.to_string()));
        header.push(Tag::Architecture, RType::String(self.arch.header_name().to_owned()));
        header.push(Tag::Encoding, RType::String("utf-8".to_owned()));
        header.push(Tag::RpmVersion, RType::String(RPM_VERSION.to_owned()));
        header.push(Tag::Platform, RType::String(PLATFORM.to_owned()));
        header.push(Tag::BuildHost, RType::String(self.build_host.clone()));
        header.push(Tag::Group, RType::String("default".to_owned()));

        if !self.provides.is_empty() {
            let (names, versions): (Vec<_>, Vec<_>) = self.provides.iter().cloned().unzip();
            header.push(Tag::ProvideName, RType::StringArray(names));
            header.push(Tag::ProvideVersion, RType::StringArray(versions));
            header.push(Tag::ProvideFlags, RType::Int32(vec![0; self.provides.len()]));
        }
        if !self.conflicts.is_empty() {
            header.push(Tag::ConflictName, RType::StringArray(self.conflicts.clone()));
            header.push(Tag::ConflictFlags, RType::Int32(vec![0; self.conflicts.len()]));
            header.push(
                Tag::ConflictVersion,
                RType::StringArray(vec![String::new(); self.conflicts.len()]),
            );
        }
        if !self.requires.is_empty() {
            header.push(
                Tag::RequireName,
                RType::StringArray(self.requires.iter().map(|r| r.name.clone()).collect()),
            );
            header.push(
                Tag::RequireVersion,
                RType::StringArray(self.requires.iter().map(|r| r.version.clone()).collect()),
            );
            header.push(
                Tag::RequireFlags,
                RType::Int32(self.requires.iter().map(|r| r.flags.bits()).collect()),
            );
        }
        if !self.changelog.is_empty() {
            let (names, texts): (Vec<_>, Vec<_>) = self.changelog.iter().cloned().unzip();
            header.push(Tag::ChangelogName, RType::StringArray(names));
            header.push(Tag::ChangelogText, RType::StringArray(texts));
            header.push(
                Tag::ChangelogTimestamp,
                RType::Int32(vec![build_time; self.changelog.len()]),
            );
        }
        header.push(Tag::BuildTime, RType::Int32(vec![build_time]));
        header.push(Tag::Prefixes, RType::StringArray(vec!["/".to_owned()]));
        header.push(Tag::Vendor, RType::String(self.vendor.clone()));
        header.push(Tag::License, RType::String(self.license.clone()));
        header.push(Tag::Packager, RType::String(self.packager.clone()));
        header.push(Tag::Url, RType::String(self.url.clone()));
        header.push(Tag::Summary, RType::I18NString(self.summary.clone()));
        header.push(Tag::Description, RType::I18NString(self.description.clone()));

        for (kind, script) in &self.scripts {
            header.push(kind.tag(), RType::String(script.clone()));
            header.push(kind.prog_tag(), RType::String("/bin/sh".to_owned()));
        }

        header.push(
            Tag::FileDigestAlgorithm,
            RType::Int32(vec![SHA256_DIGEST_ALGORITHM]),
        );
        let mut writer = CpioWriter::new(Vec::new());
        let mut files = FileArrays::default();
        for (entry, kind) in &self.files {
            writer.write_entry(&CpioEntry {
                name: payload_name(&entry.name),
                ..entry.clone()
            })?;
            files.push(entry, kind)?;
        }
        let archive = writer.finish()?;
        files.append_to(&mut header);

        let payload = Compressor::Gzip.compress(&archive, COMPRESSION_LEVEL)?;
        header.push(
            Tag::PayloadDigestAlgorithm,
            RType::Int32(vec![SHA256_DIGEST_ALGORITHM]),
        );
        header.push(
            Tag::CompressedPayloadDigest,
            RType::StringArray(vec![hex::encode(Sha256::digest(&payload))]),
        );
        header.push(
            Tag::UncompressedPayloadDigest,
            RType::StringArray(vec![hex::encode(Sha256::digest(&archive))]),
        );

        let header_bytes = header.to_bytes(Tag::Immutable)?;
        let mut signature = Header::<SignatureTag>::default();
        signature.push(
            SignatureTag::UncompressedPayloadSize,
            RType::Int32(vec![to_i32(archive.len(), "payload")?]),
        );
        signature.push(
            SignatureTag::HeaderAndPayloadSize,
            RType::Int32(vec![to_i32(
                header_bytes.len() + payload.len(),
                "header and payload",
            )?]),
        );
        signature.push(
            SignatureTag::Sha1Header,
            RType::String(hex::encode(Sha1::digest(&header_bytes))),
        );
        signature.push(
            SignatureTag::Sha256Header,
            RType::String(hex::encode(Sha256::digest(&header_bytes))),
        );
        signature.push(
            SignatureTag::ReservedSpace,
            RType::Binary(vec![0; RESERVED_SPACE]),
        );

        debug!(
            "rpm: built {}-{}-{}.{} ({} files, {} payload bytes, {} compressed, {} header bytes)",
            self.name,
            self.version,
            self.release,
            self.arch.header_name(),
            self.files.len(),
            archive.len(),
            payload.len(),
            header_bytes.len()
        );

        let lead = Lead::new(self.arch, self.os).with_name(&self.name);
        Ok(RpmPackage::new(lead, signature, header, archive))
    }
}

/// Names inside the payload carry a `./` prefix.
fn payload_name(name: &str) -> String {
    format!("./{}", name.trim_start_matches("./").trim_start_matches('/'))
}

/// Splits a file name into its header directory (absolute, with a trailing
/// slash) and base name.
fn split_name(name: &str) -> (String, &str) {
    let (dir, base) = match name.rsplit_once('/') {
        Some((dir, base)) => (dir, base),
        None => ("", name),
    };
    let dir = match dir.strip_prefix('.') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => dir,
    };
    (format!("{}/", dir), base)
}

fn file_color(kind: &str) -> i32 {
    if kind.contains("ELF 64-bit LSB") {
        2
    } else if kind.contains("ELF 32-bit LSB") {
        1
    } else {
        0
    }
}

/// `RPMFILE_DOC` for debian style copyright files.
fn file_flags(name: &str, base_name: &str) -> i32 {
    let relative = name.trim_start_matches("./").trim_start_matches('/');
    if relative.starts_with("usr/share/doc") && base_name == "copyright" {
        2
    } else {
        0
    }
}

fn index_of(table: &mut Vec<String>, value: &str) -> Result<i32> {
    let index = match table.iter().position(|v| v == value) {
        Some(index) => index,
        None => {
            table.push(value.to_owned());
            table.len() - 1
        }
    };
    to_i32(index, "file table")
}

#[derive(Default)]
struct FileArrays {
    digests: Vec<String>,
    base_names: Vec<String>,
    dir_indexes: Vec<i32>,
    dir_names: Vec<String>,
    class_indexes: Vec<i32>,
    class_dictionary: Vec<String>,
    inodes: Vec<i32>,
    sizes: Vec<i32>,
    modes: Vec<i16>,
    mtimes: Vec<i32>,
    colors: Vec<i32>,
    flags: Vec<i32>,
    link_tos: Vec<String>,
    installed_size: i32,
}

impl FileArrays {
    fn push(&mut self, entry: &CpioEntry, kind: &str) -> Result<()> {
        let file_kind = entry.kind();
        self.digests.push(if file_kind == Some(FileKind::RegularFile) {
            hex::encode(Sha256::digest(&entry.data))
        } else {
            String::new()
        });
        self.link_tos.push(if file_kind == Some(FileKind::SymbolicLink) {
            String::from_utf8_lossy(&entry.data).trim_end().to_owned()
        } else {
            String::new()
        });

        let (dir, base_name) = split_name(&entry.name);
        self.base_names.push(base_name.to_owned());
        let dir_index = index_of(&mut self.dir_names, &dir)?;
        self.dir_indexes.push(dir_index);
        let class_index = index_of(&mut self.class_dictionary, kind)?;
        self.class_indexes.push(class_index);

        let size = to_i32(entry.data.len(), "file size")?;
        self.installed_size = self
            .installed_size
            .checked_add(size)
            .ok_or_else(|| Error::argument("installed size does not fit 32 bits"))?;
        self.sizes.push(size);
        self.inodes.push(entry.inode as i32);
        self.modes.push(entry.mode as u16 as i16);
        self.mtimes.push(entry.timestamp as i32);
        self.colors.push(file_color(kind));
        self.flags.push(file_flags(&entry.name, base_name));
        trace!("rpm: file {} in {} ({} bytes)", base_name, dir, size);
        Ok(())
    }

    fn append_to(self, header: &mut Header<Tag>) {
        let count = self.base_names.len();
        let root = vec!["root".to_owned(); count];
        header.push(Tag::FileDigests, RType::StringArray(self.digests));
        header.push(Tag::BaseNames, RType::StringArray(self.base_names));
        header.push(Tag::DirectoryNameIndices, RType::Int32(self.dir_indexes));
        header.push(Tag::DirectoryNames, RType::StringArray(self.dir_names));
        header.push(Tag::FileClass, RType::Int32(self.class_indexes));
        header.push(Tag::FileClassDictionary, RType::StringArray(self.class_dictionary));
        header.push(Tag::FileInode, RType::Int32(self.inodes));
        header.push(Tag::FileSizes, RType::Int32(self.sizes));
        header.push(Tag::FileUserName, RType::StringArray(root.clone()));
        header.push(Tag::FileGroupName, RType::StringArray(root));
        header.push(Tag::FileModes, RType::Int16(self.modes));
        header.push(Tag::DeviceFileIds, RType::Int16(vec![0; count]));
        header.push(Tag::FileModificationTimestamp, RType::Int32(self.mtimes));
        header.push(Tag::FileVerifyFlags, RType::Int32(vec![-1; count]));
        header.push(Tag::FileDevices, RType::Int32(vec![1; count]));
        header.push(Tag::FileLang, RType::StringArray(vec![String::new(); count]));
        header.push(Tag::FileColors, RType::Int32(self.colors));
        header.push(Tag::InstalledSize, RType::Int32(vec![self.installed_size]));
        header.push(Tag::FileFlags, RType::Int32(self.flags));
        header.push(Tag::FileLinkTos, RType::StringArray(self.link_tos));
    }
}
