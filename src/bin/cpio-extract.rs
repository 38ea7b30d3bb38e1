use clap::Parser;
use pkgcodec::Result;
use pkgcodec::payload::{CpioReader, extract_entry};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::exit;

#[derive(Debug, Parser)]
#[command(name = "cpio-extract")]
struct Args {
    /// Path to cpio file
    #[arg(name = "path")]
    path: PathBuf,

    /// Print entries instead of extracting them
    #[arg(long = "debug", short = 'd')]
    debug: bool,

    /// Target directory to extract
    #[arg(short = 'e')]
    target_dir: PathBuf,

    /// Restore owner and group ids of extracted files
    #[arg(long = "preserve-owner")]
    preserve_owner: bool,
}

fn run(args: Args) -> Result<()> {
    let reader = CpioReader::new(BufReader::new(File::open(&args.path)?));
    for entry in reader {
        let entry = entry?;
        if args.debug {
            println!("{:#?}", entry);
        } else {
            println!("Extracting {}", entry.name);
            extract_entry(&entry, &args.target_dir, args.preserve_owner)?;
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("{}", err);
        exit(1);
    }
}
