use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "pistomp-nav", about = "Pedalboard navigation for a MOD audio host")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the control loop
    Run(RunArgs),
    /// Print what the host reports
    Enumerate {
        target: EnumerateTarget,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the plugins and parameters of one pedalboard bundle
    Describe {
        /// Bundle path as reported by `enumerate pedalboards`
        bundle: String,

        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum EnumerateTarget {
    /// Pedalboards in the host's library
    Pedalboards,
    /// Presets of the loaded pedalboard
    Presets,
}

/// Where configuration and host state come from.
#[derive(clap::Args)]
pub struct SourceArgs {
    /// Configuration file (default: ./pistomp.toml if present)
    #[arg(long)]
    pub config: Option<String>,

    /// Use a fixture file instead of a live host
    #[arg(long, value_name = "FIXTURE")]
    pub offline: Option<String>,
}

#[derive(clap::Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Log display commands instead of drawing to the terminal
    #[arg(long)]
    pub headless: bool,

    /// Write log lines to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<String>,
}
