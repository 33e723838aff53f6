//! dirsweep — polling directory watcher.
//!
//! Thin binary entry point. All sweep logic lives in the `dirsweep-core`
//! crate; this file only wires the OS backend, filters, the polling loop and
//! an event printer together.

mod cli;
mod signal;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use dirsweep_core::{
    start_watch, AllOf, CancelToken, Event, ExcludePaths, HiddenFilter, OsFileSystem, Watcher,
    EVENT_CHANNEL_CAPACITY,
};
use std::io::Write;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialise structured logging. RUST_LOG overrides the verbosity flag.
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let root = cli
        .dir
        .canonicalize()
        .with_context(|| format!("cannot watch {}", cli.dir.display()))?;
    tracing::info!("dirsweep watching {}", root.display());

    let mut dir_filter = AllOf::new();
    let mut file_filter = AllOf::new();
    if !cli.include_hidden {
        dir_filter = dir_filter.with(HiddenFilter);
        file_filter = file_filter.with(HiddenFilter);
    }
    dir_filter = dir_filter.with(ExcludePaths::new(&cli.exclude_dirs));

    let mut watcher = Watcher::builder()
        .file_system(OsFileSystem::new(root))
        .config(cli.sweep_config())
        .dir_filter(dir_filter)
        .file_filter(file_filter)
        .build()?;

    if cli.once {
        let cancel = CancelToken::new();
        signal::cancel_on_shutdown(cancel.clone())?;
        let (tx, rx) = crossbeam_channel::unbounded::<Event>();
        match watcher.sweep(&cancel, &tx) {
            Ok(_) => {}
            Err(err) if err.is_cancelled() => tracing::info!("sweep interrupted"),
            Err(err) => return Err(err.into()),
        }
        drop(tx);
        for event in rx {
            print_event(&event, cli.json)?;
        }
        return Ok(());
    }

    let handle = start_watch(watcher, cli.interval(), EVENT_CHANNEL_CAPACITY)?;
    // The loop below ends once cancellation stops the watch thread and its
    // sender is dropped.
    signal::cancel_on_shutdown(handle.cancel_token())?;
    for event in handle.events_rx.iter() {
        print_event(&event, cli.json)?;
    }
    handle.join()?;
    Ok(())
}

fn print_event(event: &Event, json: bool) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer(&mut out, event)?;
        writeln!(out)?;
    } else {
        writeln!(out, "{event}")?;
    }
    Ok(())
}
