use clap::Parser;
use pkgcodec::Result;
use pkgcodec::payload::{CpioEntry, CpioWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::exit;

#[derive(Debug, Parser)]
#[command(name = "cpio-create")]
struct Args {
    /// Path to cpio file
    #[arg(long = "file", short = 'f')]
    file: PathBuf,

    /// Files, directories and symlinks to archive
    #[arg(name = "path")]
    files: Vec<PathBuf>,
}

fn run(args: Args) -> Result<()> {
    let mut writer = CpioWriter::new(BufWriter::new(File::create(&args.file)?));
    for path in &args.files {
        let name = path.to_string_lossy();
        let entry = CpioEntry::from_path(path, &name)?;
        writer.write_entry(&entry)?;
    }
    writer.finish()?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("{}", err);
        exit(1);
    }
}
