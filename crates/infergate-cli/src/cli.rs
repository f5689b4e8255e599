use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "infergate",
    version,
    about = "Inspect and run models through the predictor backend"
)]
pub struct Cli {
    /// Log level (RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the model's input and output descriptors
    Inspect {
        /// Path to the model file
        #[arg(long)]
        model: PathBuf,
    },
    /// Build a backend and run one inference on all-ones inputs
    Run {
        /// Path to the model file
        #[arg(long)]
        model: PathBuf,

        /// Path to the params file (defaults to the model file)
        #[arg(long)]
        params: Option<PathBuf>,

        /// Device for inference (cpu or cuda:N)
        #[arg(long, default_value = "cpu")]
        device: String,

        /// JSON file with backend options
        #[arg(long)]
        option: Option<PathBuf>,
    },
}
