mod cli;
mod config;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing(cli.verbose);

    match cli.command {
        Some(Command::Compile(args)) => run::compile(&cli.config, &cli.run, args),
        Some(Command::Config) => run::print_config(&cli.config, &cli.run),
        Some(Command::Run) | None => run::run(&cli.config, &cli.run),
    }
}
