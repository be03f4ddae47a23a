use std::process::ExitCode;

use clap::Parser;
use cli::Cli;

mod cli;
mod commands;

fn main() -> ExitCode {
    Cli::parse().start()
}
