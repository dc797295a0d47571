//! # traceweave - Main Entry Point
//!
//! Thin binary around the library: parse arguments, build the batch
//! configuration, run the project translator, report the result.

use anyhow::Result;
use clap::Parser;

use traceweave::cli::Args;
use traceweave::domain::Config;
use traceweave::project::ProjectTranslator;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            // `:#` keeps the whole context chain: the failing file from the
            // driver, the line from the engine.
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

fn run() -> Result<()> {
    let args = Args::parse();

    if !args.input.exists() {
        anyhow::bail!("no such file or directory: {}", args.input.display());
    }

    if !args.quiet {
        println!("traceweave v{}", env!("CARGO_PKG_VERSION"));
        println!("input: {}", args.input.display());
    }

    let config = Config {
        entry_point: args.entry,
        defines: args.defines,
        elide: args.elide,
    };

    let translator = ProjectTranslator::new(config, args.runtime);
    let count = translator.run(&args.input)?;

    if !args.quiet {
        println!("rewritten: {count} file(s)");
    }
    Ok(())
}
