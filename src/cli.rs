use clap::{Parser, Subcommand};

const DEFAULT_READERS: usize = 8;
const DEFAULT_SIZE: usize = 4096;
const DEFAULT_ROUNDS: usize = 64;

#[derive(Parser)]
#[command(name = "cached-bytes", version = "0.1.0")]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Hold input bytes, then scrub them and report how
    Scrub {
        /// Input (@file, - for stdin, or literal)
        #[arg(short, long, env = "CACHED_BYTES_INPUT")]
        input: String,
    },

    /// Race concurrent readers against disposal and check for torn reads
    Stress {
        /// Reader threads per round
        #[arg(short, long, env = "CACHED_BYTES_READERS", default_value_t = DEFAULT_READERS)]
        readers: usize,
        /// Payload size in bytes
        #[arg(short, long, env = "CACHED_BYTES_SIZE", default_value_t = DEFAULT_SIZE)]
        size: usize,
        /// Number of rounds
        #[arg(long, env = "CACHED_BYTES_ROUNDS", default_value_t = DEFAULT_ROUNDS)]
        rounds: usize,
    },
}
