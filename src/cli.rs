//! Command-line interface definitions for dirsweep.

use clap::Parser;
use dirsweep_core::sweep::{DEFAULT_MAX_DEPTH, DEFAULT_WRITE_STABILITY_THRESHOLD};
use dirsweep_core::{EventMask, SweepConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Poll a directory tree and print files as they appear and disappear.
#[derive(Parser, Debug)]
#[command(name = "dirsweep", version, about)]
pub struct Cli {
    /// Directory to watch
    pub dir: PathBuf,

    /// Seconds to wait between sweeps
    #[arg(short, long, default_value_t = 5.0)]
    pub interval: f64,

    /// Maximum recursion depth
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: u32,

    /// Minimum age in seconds before a new file is reported
    #[arg(long, default_value_t = DEFAULT_WRITE_STABILITY_THRESHOLD.as_secs_f64())]
    pub stability: f64,

    /// Watch only this path beneath DIR (event paths keep the prefix)
    #[arg(long)]
    pub sub_root: Option<String>,

    /// Skip a directory (relative to DIR); may be repeated
    #[arg(long = "exclude-dir", value_name = "PATH")]
    pub exclude_dirs: Vec<String>,

    /// Report dot-files and descend into dot-directories
    #[arg(long)]
    pub include_hidden: bool,

    /// Only report added files
    #[arg(long, conflicts_with = "removed_only")]
    pub added_only: bool,

    /// Only report removed files
    #[arg(long)]
    pub removed_only: bool,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Run a single sweep and exit
    #[arg(long)]
    pub once: bool,

    /// Worker threads for directory fan-out (0 = one per CPU)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn interval(&self) -> Duration {
        secs(self.interval)
    }

    pub fn sweep_config(&self) -> SweepConfig {
        let event_mask = if self.added_only {
            EventMask::ADDED
        } else if self.removed_only {
            EventMask::REMOVED
        } else {
            EventMask::ALL
        };
        SweepConfig {
            event_mask,
            max_depth: self.max_depth,
            write_stability_threshold: secs(self.stability),
            sub_root: self.sub_root.clone(),
            parallelism: self.threads,
        }
    }
}

/// Negative or non-finite input collapses to zero.
fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}
