use clap::Parser;
use filecat::cli::{Cli, run_cli};
use filecat::logging;
use filecat::output::OutputFormatter;
use std::process;

fn main() {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose());

    if let Err(e) = run_cli(cli) {
        OutputFormatter::error(&format!("Error: {}", e));
        process::exit(1);
    }
}
