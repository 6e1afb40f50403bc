use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "jsonl-compact",
    version,
    about = "Compact the local JSONL states/objects databases of an ioBroker data directory"
)]
pub struct Cli {
    /// Data directory holding iobroker.json (defaults to the current directory)
    pub directory: Option<PathBuf>,

    /// Exit non-zero when a compaction fails or the config file is unreadable
    #[arg(long, env = "JSONL_COMPACT_STRICT", default_value_t = false)]
    pub strict: bool,
}

impl Cli {
    /// Resolves the target directory, falling back to the working directory.
    pub fn target_directory(&self) -> std::io::Result<PathBuf> {
        match &self.directory {
            Some(dir) => Ok(dir.clone()),
            None => {
                let cwd = std::env::current_dir()?;
                log::info!("No path given, using {}", cwd.display());
                Ok(cwd)
            }
        }
    }
}
