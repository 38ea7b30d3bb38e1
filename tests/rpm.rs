use flate2::read::GzDecoder;
use pkgcodec::header::{SignatureTag, Tag};
use pkgcodec::lead::{Architecture, OperatingSystem};
use pkgcodec::payload::{CpioEntry, CpioReader, REGULAR_FILE};
use pkgcodec::rpm::ScriptKind;
use pkgcodec::{Result, RpmBuilder, RpmInfo, RpmPackage};
use std::io::{Cursor, Read};

fn foo_package() -> RpmPackage {
    RpmBuilder::new("foo", "1.0", "1", Architecture::X64, OperatingSystem::Linux)
        .build_time(1_700_000_000)
        .build_host("builder.example.com")
        .summary("foo")
        .add_file(
            CpioEntry::new("bin/foo", REGULAR_FILE | 0o755, b"hi".to_vec()),
            "regular file",
        )
        .build()
        .unwrap()
}

#[test]
fn test_build_single_file_package() {
    let rpm = foo_package();
    assert_eq!(rpm.lead.archnum, 1);
    assert_eq!(rpm.lead.osnum, 1);
    assert_eq!(rpm.lead.name(), "foo");

    let header = &rpm.header;
    assert_eq!(header.get_i32_array(Tag::FileSizes).unwrap(), &[2]);
    assert_eq!(header.get_string_array(Tag::BaseNames).unwrap(), &["foo"]);
    assert_eq!(header.get_string_array(Tag::DirectoryNames).unwrap(), &["bin/"]);
    assert_eq!(header.get_i32(Tag::InstalledSize), Some(2));
    assert_eq!(header.get_string(Tag::Architecture), Some("x86_64"));
}

#[test]
fn test_written_payload_is_gzip_cpio() {
    let rpm = foo_package();
    let mut bytes = Vec::new();
    rpm.write_to(&mut bytes).unwrap();

    let payload = rpm.compressed_payload().unwrap();
    assert!(bytes.ends_with(&payload));

    let mut archive = Vec::new();
    GzDecoder::new(payload.as_slice())
        .read_to_end(&mut archive)
        .unwrap();
    let entries: Vec<CpioEntry> = CpioReader::new(archive.as_slice())
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "./bin/foo");
    assert_eq!(entries[0].data, b"hi");
    assert_eq!(entries[0].mode, 0o100755);
}

#[test]
fn test_package_read_back() {
    let rpm = RpmBuilder::new("bar", "2.1", "3", Architecture::Arm64, OperatingSystem::Linux)
        .build_time(1_700_000_000)
        .license("MIT")
        .add_required_capability("libc.so.6", "")
        .add_changelog_line("Jane", "- first")
        .add_script(ScriptKind::Postin, "ldconfig")
        .add_file(
            CpioEntry::new("./usr/bin/bar", REGULAR_FILE | 0o755, b"#!/bin/sh\n".to_vec()),
            "regular file",
        )
        .build()
        .unwrap();
    let mut bytes = Vec::new();
    rpm.write_to(&mut bytes).unwrap();

    let read = RpmPackage::read(Cursor::new(&bytes)).unwrap();
    assert_eq!(read.lead, rpm.lead);
    assert_eq!(read.header.entries(), rpm.header.entries());
    assert_eq!(read.signature.entries(), rpm.signature.entries());
    assert_eq!(read.archive_bytes(), rpm.archive_bytes());
    assert_eq!(
        read.signature.get_i32(SignatureTag::UncompressedPayloadSize),
        Some(rpm.archive_bytes().len() as i32)
    );

    let info = RpmInfo::from(&read);
    assert_eq!(info.name, "bar");
    assert_eq!(info.arch, "aarch64");
    assert_eq!(info.payload.files[0].name, "/usr/bin/bar");

    let mut rewritten = Vec::new();
    read.write_to(&mut rewritten).unwrap();
    assert_eq!(rewritten, bytes);
}

#[test]
fn test_unsupported_architecture() {
    assert!(matches!(
        "sparc".parse::<Architecture>(),
        Err(pkgcodec::Error::InvalidArgument(_))
    ));
    assert!(matches!(
        "windows".parse::<OperatingSystem>(),
        Err(pkgcodec::Error::InvalidArgument(_))
    ));
}
