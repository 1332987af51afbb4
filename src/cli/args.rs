use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "callflow")]
#[command(about = "Voice AI demo call orchestration service", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Print version information
    Version,
    /// Print the config file location
    ConfigPath,
}
