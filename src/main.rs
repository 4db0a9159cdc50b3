use clap::Parser;
use colored::*;

use crate::{cli::Cli, shell::start_shell};

mod cli;
mod shell;

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = start_shell(cli) {
        eprintln!("{} {}", "❌ Fatal:".red().bold(), e);
        std::process::exit(1);
    }
}
