//! Command-line surface: `builder [--verbose] [--version] [--disable-cache] DIRECTORY MANIFEST`.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "builder", version, about = "Manifest-driven incremental application-bundle builder")]
pub struct Cli {
    /// Enable debug-level logging.
    #[arg(long)]
    pub verbose: bool,

    /// Skip cache lookups entirely, forcing every module to rebuild.
    #[arg(long = "disable-cache")]
    pub disable_cache: bool,

    /// Staging directory. Recreated on every run.
    pub directory: PathBuf,

    /// Path to the manifest JSON file.
    pub manifest: PathBuf,
}
