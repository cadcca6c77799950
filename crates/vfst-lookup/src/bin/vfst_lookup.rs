// vfst-lookup: print every output of a VFST transducer for each input word.
//
// Reads words from the command line, or from stdin (one per line) when no
// words are given, and prints `word<TAB>output` lines followed by a blank
// line per word.
//
// Usage:
//   vfst-lookup -t mor.vfst koira kissa
//   VFST_PATH=mor.vfst vfst-lookup < words.txt

use std::io;
use std::path::PathBuf;

use clap::Parser;
use vfst::LookupOptions;
use vfst::config::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_RESULTS};
use vfst_lookup::TRANSDUCER_ENV;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Transducer file (.vfst).
    #[arg(short, long, value_name = "FILE", env = TRANSDUCER_ENV)]
    transducer: PathBuf,
    /// Maximum search depth.
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    stack_capacity: usize,
    /// Output capacity in bytes, terminator included.
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    output_capacity: usize,
    /// Outputs printed per word.
    #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: usize,
    /// Log more; repeat for trace output.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Words to look up. Reads stdin when empty.
    words: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let options = LookupOptions::default()
        .with_stack_capacity(cli.stack_capacity)
        .with_output_capacity(cli.output_capacity)
        .with_max_results(cli.max_results);

    let transducer = vfst_lookup::load_transducer(&cli.transducer)?;
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    vfst_lookup::run(&mut out, &transducer, &cli.words, &options)
}
