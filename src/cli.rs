//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Open image-host item pages and galleries from the terminal.
///
/// Resolves an item link through the host's redirect and form handshake,
/// caches the result on disk and reports the full-size image, navigation
/// links and related thumbnails.
#[derive(Parser, Debug)]
#[command(name = "imgview")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/imgview/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Cache root directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Directory saved images are written to (default: today's date)
    #[arg(short = 'o', long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Store cache entries as-is instead of byte-reversed
    #[arg(long, global = true)]
    pub plain_cache: bool,

    /// Route every request through this proxy (host:port); remembered for --saved-proxy
    #[arg(long, global = true, conflicts_with = "saved_proxy")]
    pub proxy: Option<String>,

    /// Use the proxy remembered from an earlier --proxy run
    #[arg(long, global = true)]
    pub saved_proxy: bool,

    /// File the last proxy is remembered in
    #[arg(long, global = true, default_value = "proxy.txt")]
    pub proxy_file: PathBuf,

    /// Attempts per page resolution (1-20)
    #[arg(short = 'r', long, global = true, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_attempts: Option<u32>,

    /// Send provider requests to this origin instead of the real host
    #[arg(long, global = true, hide = true)]
    pub origin: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve an item page and report its image
    View(ViewArgs),

    /// List one page of a gallery
    Gallery(GalleryArgs),
}

/// Arguments for `view`.
#[derive(clap::Args, Debug)]
pub struct ViewArgs {
    /// Item page URL
    pub url: String,

    /// Ignore cached page markup and redo the handshake
    #[arg(short, long)]
    pub force: bool,

    /// Save the original image into the output directory
    #[arg(short, long)]
    pub save: bool,

    /// Wait for the related-thumbnail panels and report them
    #[arg(long)]
    pub panels: bool,

    /// Print a JSON summary instead of text
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `gallery`.
#[derive(clap::Args, Debug)]
pub struct GalleryArgs {
    /// Gallery URL (`.../g/<hash>`) or an item URL that links a gallery
    pub url: String,

    /// Page number; clamped to the gallery's range
    #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
    pub page: i64,

    /// Also fetch and resize every entry's thumbnail
    #[arg(long)]
    pub thumbnails: bool,

    /// Print a JSON summary instead of text
    #[arg(long)]
    pub json: bool,
}
