use clap::Parser;
use pkgcodec::{Result, RpmInfo, RpmPackage};
use std::path::PathBuf;
use std::process::exit;

#[derive(Debug, Parser)]
#[command(name = "rpm-info")]
struct Args {
    /// Path to rpm file
    #[arg(name = "path")]
    path: PathBuf,

    /// Dump lead, signature and header entries
    #[arg(long = "debug", short = 'd')]
    debug: bool,
}

fn run(args: Args) -> Result<()> {
    let rpm = RpmPackage::open(args.path)?;
    if args.debug {
        println!("{:?}", rpm.lead);
        println!("Signature:");
        print!("{}", rpm.signature);
        println!("Header:");
        print!("{}", rpm.header);
    } else {
        let info = RpmInfo::from(&rpm);
        println!("{}", info);
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
