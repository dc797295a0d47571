//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "traceweave",
    version,
    about = "Rewrite C/C++ sources with function entry/exit trace calls",
    after_help = "\
EXAMPLES:
    traceweave src/                          Instrument every source under src/
    traceweave src/ --runtime ../rt          Also install traceweave.h/.cpp
    traceweave main.cpp --entry mainU -D WIN32
                                             Single file, custom entry point"
)]
pub struct Args {
    /// Source file or project directory to instrument
    #[arg(value_name = "PATH")]
    pub input: PathBuf,

    /// Directory holding the runtime support sources (traceweave.h / traceweave.cpp)
    #[arg(short, long, value_name = "DIR")]
    pub runtime: Option<PathBuf>,

    /// Function given the program begin/end treatment
    #[arg(long, value_name = "NAME", default_value = "main")]
    pub entry: String,

    /// Additional preprocessor symbols treated as defined
    #[arg(short = 'D', long = "define", value_name = "NAME")]
    pub defines: Vec<String>,

    /// Additional identifiers stripped from the output together with a
    /// directly following argument list
    #[arg(long = "elide", value_name = "NAME")]
    pub elide: Vec<String>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}
