use chrono::Utc;
use clap::Parser;
use pkgcodec::Result;
use pkgcodec::deb::create_deb_package;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::exit;

#[derive(Debug, Parser)]
#[command(name = "deb-build")]
struct Args {
    /// Path to control.tar.gz
    #[arg(long = "control")]
    control: PathBuf,

    /// Path to data.tar.gz
    #[arg(long = "data")]
    data: PathBuf,

    /// Member timestamp as unix time, defaults to now
    #[arg(long = "timestamp")]
    timestamp: Option<u64>,

    /// Path to save deb file
    #[arg(long = "output")]
    output: PathBuf,
}

fn run(args: Args) -> Result<()> {
    let control = fs::read(&args.control)?;
    let data = fs::read(&args.data)?;
    let timestamp = args
        .timestamp
        .unwrap_or_else(|| Utc::now().timestamp().max(0) as u64);
    let output = BufWriter::new(File::create(&args.output)?);
    create_deb_package(output, &control, &data, timestamp)?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("{}", err);
        exit(1);
    }
}
