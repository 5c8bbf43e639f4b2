use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flvkit")]
#[command(author, version, about = "FLV tag inspection and rewriting tool")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print every tag of an FLV file and a per-type summary
    Dump {
        /// FLV file to inspect
        #[arg(required = true)]
        file: PathBuf,

        /// Verify each tag's back-pointer
        #[arg(long)]
        strict: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy the audio and video tags of an FLV file into a new file
    Rewrite {
        /// Source FLV file
        #[arg(required = true)]
        input: PathBuf,

        /// Destination FLV file (overwritten)
        #[arg(required = true)]
        output: PathBuf,

        /// Update the stored duration every N tags
        #[arg(long)]
        sync_every: Option<u32>,
    },

    /// Display version information
    Version,
}
