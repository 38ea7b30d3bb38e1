use clap::Parser;
use pkgcodec::lead::{Architecture, OperatingSystem};
use pkgcodec::payload::CpioEntry;
use pkgcodec::rpm::ScriptKind;
use pkgcodec::{Error, Result, RpmBuilder};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::exit;

const ELF_MAGIC: &[u8] = b"\x7fELF";

#[derive(Debug, Parser)]
#[command(name = "rpm-build")]
struct Args {
    #[arg(long = "name")]
    name: String,

    #[arg(long = "version")]
    version: String,

    #[arg(long = "release", default_value = "1")]
    release: String,

    /// x86, x64, arm, arm64, armv6, s390x, ppc64le, riscv64 or loongarch64
    #[arg(long = "arch", default_value = "x64")]
    arch: String,

    #[arg(long = "os", default_value = "linux")]
    os: String,

    /// File to package as SRC=DEST
    #[arg(long = "file")]
    files: Vec<String>,

    /// Required capability as NAME or NAME=VERSION
    #[arg(long = "requires")]
    requires: Vec<String>,

    /// Provided capability as NAME=VERSION
    #[arg(long = "provides")]
    provides: Vec<String>,

    #[arg(long = "conflicts")]
    conflicts: Vec<String>,

    /// Script as KIND=PATH, KIND is prein, postin, preun or postun
    #[arg(long = "script")]
    scripts: Vec<String>,

    #[arg(long = "summary", default_value = "")]
    summary: String,

    #[arg(long = "description", default_value = "")]
    description: String,

    #[arg(long = "license", default_value = "")]
    license: String,

    #[arg(long = "vendor", default_value = "")]
    vendor: String,

    #[arg(long = "packager", default_value = "")]
    packager: String,

    #[arg(long = "url", default_value = "")]
    url: String,

    /// Build time as unix timestamp, defaults to now
    #[arg(long = "build-time")]
    build_time: Option<i64>,

    /// Path to save rpm file
    #[arg(long = "output")]
    output: PathBuf,
}

fn split_pair<'a>(value: &'a str, what: &str) -> Result<(&'a str, &'a str)> {
    value
        .split_once('=')
        .ok_or_else(|| Error::InvalidArgument(format!("{} {:?} is not KEY=VALUE", what, value)))
}

/// `file(1)` style description used for the file class and color.
fn describe(entry: &CpioEntry) -> String {
    let data = &entry.data;
    if entry.link_target().is_none() && data.len() > 5 && data.starts_with(ELF_MAGIC) {
        match (data[4], data[5]) {
            (2, 1) => return "ELF 64-bit LSB executable".to_owned(),
            (1, 1) => return "ELF 32-bit LSB executable".to_owned(),
            _ => {}
        }
    }
    entry
        .kind()
        .map(|kind| kind.to_string())
        .unwrap_or_default()
}

fn run(args: Args) -> Result<()> {
    let arch: Architecture = args.arch.parse()?;
    let os: OperatingSystem = args.os.parse()?;

    let mut builder = RpmBuilder::new(&args.name, &args.version, &args.release, arch, os)
        .summary(&args.summary)
        .description(&args.description)
        .license(&args.license)
        .vendor(&args.vendor)
        .packager(&args.packager)
        .url(&args.url);
    if let Some(build_time) = args.build_time {
        builder = builder.build_time(build_time);
    }

    for file in &args.files {
        let (src, dest) = split_pair(file, "file")?;
        let entry = CpioEntry::from_path(src, dest)?;
        let kind = describe(&entry);
        builder = builder.add_file(entry, &kind);
    }
    for require in &args.requires {
        let (name, version) = require.split_once('=').unwrap_or((require.as_str(), ""));
        builder = builder.add_required_capability(name, version);
    }
    for provide in &args.provides {
        let (name, version) = split_pair(provide, "provides")?;
        builder = builder.add_provided_capability(name, version);
    }
    for conflict in &args.conflicts {
        builder = builder.add_conflict(conflict);
    }
    for script in &args.scripts {
        let (kind, path) = split_pair(script, "script")?;
        let kind: ScriptKind = kind.parse()?;
        builder = builder.add_script(kind, &fs::read_to_string(path)?);
    }

    let rpm = builder.build()?;
    let mut output = BufWriter::new(File::create(&args.output)?);
    rpm.write_to(&mut output)?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("{}", err);
        exit(1);
    }
}
