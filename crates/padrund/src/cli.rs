use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Debug, Subcommand, PartialEq)]
pub(crate) enum Command {
    /// Launch a game with gamepad-to-keyboard mapping.
    Run {
        /// Path to the game executable
        exe: PathBuf,

        /// Mappings file (defaults to mappings.yaml when present)
        #[clap(short, long)]
        mappings: Option<PathBuf>,

        /// Index of the gamepad to use, as printed by `devices`
        #[clap(short, long)]
        device: Option<usize>,
    },
    /// List attached gamepads.
    Devices,
}

/// Runs classic-engine games with a gamepad mapped onto their keyboard controls.
#[derive(Parser)]
#[command(version, about, long_about = None)]
pub(crate) struct Cli {
    /// Turn debugging information on
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// The command to run
    #[clap(subcommand)]
    pub command: Command,
}
