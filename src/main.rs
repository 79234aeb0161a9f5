mod categorizer;
mod cli;
mod emitter;
mod error;
mod fmt;
mod identity;
mod importer;
mod models;
mod normalize;
mod settings;
mod workbook;

use clap::Parser;

use cli::Cli;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(e) = cli::generate::run(&cli.excel, cli.out) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
