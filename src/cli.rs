use clap::Parser;
use std::path::PathBuf;

use bfs::fs::config::{DEFAULT_BLOCK_COUNT, DEFAULT_BLOCK_SIZE};

#[derive(Parser, Debug)]
#[command(name = "bfs", version, about = "Interactive shell over a BFS disk image")]
pub struct Cli {
    /// Disk image to mount
    #[arg(long, short, env = "BFS_DISK", default_value = "bfs.img")]
    pub disk: PathBuf,

    /// Block size in bytes, used when formatting
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,

    /// Number of blocks, used when formatting
    #[arg(long, default_value_t = DEFAULT_BLOCK_COUNT)]
    pub blocks: u64,

    /// Format the image even if it already exists
    #[arg(long, short)]
    pub format: bool,
}
