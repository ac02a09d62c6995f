mod asm;
mod error;
mod repl;

use std::fs::File;
use std::process::exit;

use clap::Parser;
use env_logger::{Builder, Target};
use log::LevelFilter;
use monitor::session::Session;

use crate::repl::Repl;

#[derive(Parser)]
#[command(name = "zdb", about = "Remote debugger for a Z80 target over a serial link")]
struct Args {
    /// Assembly source file to build and upload.
    source: String,

    /// Serial device the debug stub is attached to.
    #[arg(short = 'p', long)]
    serial_port: String,

    /// Start execution immediately instead of waiting at the entry point.
    #[arg(short, long)]
    run: bool,

    /// Scrub the whole program memory region before uploading.
    #[arg(short, long)]
    clear_rom: bool,

    /// Log serial traffic to debugger.log.
    #[arg(short, long)]
    log: bool,
}

fn main() {
    let args = Args::parse();
    initialize_logging(args.log);

    let assembly = match asm::assemble(&args.source) {
        Ok(assembly) => assembly,
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    };

    println!("Contacting debug stub...");
    let session = match Session::connect(&args.serial_port) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    };

    if let Err(e) = Repl::new(session, assembly).run(args.clear_rom, args.run) {
        eprintln!("{}", e);
        exit(1);
    }
}

fn initialize_logging(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    // The prompt owns stdout; serial traffic goes to a file instead.
    let target = match File::create("debugger.log") {
        Ok(file) => Target::Pipe(Box::new(file)),
        Err(_) => Target::Stderr,
    };

    Builder::new()
        .filter(Some("monitor"), level)
        .filter(Some("zdb"), level)
        .format_timestamp(None)
        .target(target)
        .init();
}
