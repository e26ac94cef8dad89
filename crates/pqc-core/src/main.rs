//! `pqc` binary entry point.

use clap::Parser;
use pqc_core::cli::{run, Cli};
use pqc_core::logging::init_logging;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);
    let code = run(cli);
    std::process::exit(code.as_i32());
}
