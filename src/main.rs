use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ext2resizer::engine::{ProgressFn, ResizeEngine};
use ext2resizer::{check_root, get_fs_info, resize_filesystem, FilesystemHandle, ResizeOptions};

const GIT_HASH: &str = env!("GIT_HASH");

fn version_long() -> String {
    format!("{} (git:{})", env!("CARGO_PKG_VERSION"), GIT_HASH)
}

#[derive(Parser)]
#[command(name = "ext2resizer")]
#[command(author, version, about = "Resize ext2 filesystems in-place", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display information about an ext2 filesystem
    Info {
        /// Path to the device or image file
        device: String,
    },

    /// Show detailed version and build information
    Version,

    /// Resize an ext2 filesystem to a new block count
    Resize {
        /// Path to the device or image file
        device: String,

        /// New size in filesystem blocks (defaults to the full device)
        new_size: Option<u64>,

        /// Skip the size-bound and staleness safety checks
        #[arg(short, long)]
        force: bool,

        /// Flush device caches before resizing
        #[arg(short = 'F', long)]
        flush: bool,

        /// Show per-pass progress
        #[arg(short = 'p', long)]
        progress: bool,

        /// Trace every device read and write
        #[arg(short = 'd', long)]
        debug_io: bool,
    },
}

/// Placeholder engine until a structural engine is linked in
///
/// The orchestrator is engine-agnostic; deployments supply a real
/// `ResizeEngine`. This stub refuses to run so the binary cannot silently
/// claim a resize it never performed.
struct UnlinkedEngine;

impl ResizeEngine for UnlinkedEngine {
    fn run(
        &mut self,
        _fs: &mut FilesystemHandle,
        _new_blocks: u64,
        _progress: Option<ProgressFn<'_>>,
    ) -> ext2resizer::Result<()> {
        Err(ext2resizer::Error::Engine(anyhow::anyhow!(
            "no resize engine linked into this build"
        )))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { device } => {
            let info = get_fs_info(&device)
                .with_context(|| format!("Failed to read filesystem info from {}", device))?;
            println!("{}", info);
        }

        Commands::Version => {
            println!("ext2resizer {}", version_long());
        }

        Commands::Resize {
            device,
            new_size,
            force,
            flush,
            progress,
            debug_io,
        } => {
            // Check for root privileges
            if !check_root() {
                eprintln!("Warning: This tool requires root privileges to modify block devices.");
                if !force {
                    anyhow::bail!("Run as root or use --force to continue anyway");
                }
            }

            let options = ResizeOptions::new(&device)
                .new_blocks(new_size)
                .force(force)
                .flush(flush)
                .debug_io(debug_io)
                .show_progress(progress);

            let mut engine = UnlinkedEngine;
            let outcome = resize_filesystem(&options, &mut engine)
                .with_context(|| format!("Failed to resize filesystem on {}", device))?;

            if outcome.changed {
                println!(
                    "The filesystem on {} is now {} blocks long.",
                    outcome.device_path, outcome.new_blocks
                );
            } else {
                println!(
                    "The filesystem is already {} blocks long. Nothing to do!",
                    outcome.old_blocks
                );
            }
        }
    }

    Ok(())
}
