// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod output;
pub mod reload;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{resolve_config, ConfigFile, RawConfigFile};
use crate::reload::{Debouncer, PathUpdates, ReloadFilter};
use crate::types::{ChangeEvent, OutputFormat};
use crate::watch::{ChannelSink, WatchOptions, Watcher};

pub use crate::errors::WatchError;
pub use crate::types::{ChangeKind, WatcherState};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading, with CLI overrides
/// - the watcher, feeding a channel
/// - filtering + debouncing (or raw printing)
/// - Ctrl-C handling
///
/// Returns once the watcher has stopped, with the dispatch loop's error if it
/// ended on one.
pub async fn run(args: CliArgs) -> Result<()> {
    let file_cfg = resolve_config(args.config.as_deref())?;
    let cfg = apply_cli_overrides(&args, file_cfg)?;

    let root = cfg
        .watch
        .root
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    let (sink, rx) = ChannelSink::channel();
    let options = WatchOptions {
        poll_timeout: cfg.poll_timeout(),
    };
    let mut watcher = Watcher::with_options(root, sink, options)?;
    watcher
        .start()
        .with_context(|| format!("starting watcher on {:?}", watcher.root()))?;

    let root = watcher.root().to_path_buf();
    info!(root = ?root, raw = args.raw, "watching for changes");

    let filter = ReloadFilter::new(&root, &cfg.reload.include, cfg.reload.skip_deleted)?;

    // Ctrl-C → stop the watcher; the channel closes once the dispatch loop exits.
    {
        let stop = watcher.stop_handle();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            stop.stop();
        });
    }

    if args.raw {
        print_raw(rx, &filter, args.format).await;
    } else {
        let format = args.format;
        let print_root = root.clone();
        let debouncer = Debouncer::spawn(cfg.debounce(), move |updates| {
            print_updates(&updates, &print_root, format)
        });
        forward_filtered(rx, &filter, &debouncer).await;
        debouncer.finish().await;
    }

    let result = tokio::task::spawn_blocking(move || watcher.join())
        .await
        .context("joining watcher thread")?;
    info!("watch service stopped");
    result.map_err(Into::into)
}

/// Merge CLI flags over the file configuration and re-validate the result.
pub fn apply_cli_overrides(args: &CliArgs, cfg: ConfigFile) -> crate::errors::Result<ConfigFile> {
    let ConfigFile {
        mut watch,
        mut reload,
    } = cfg;

    if let Some(root) = &args.root {
        watch.root = Some(root.clone());
    }
    if let Some(ms) = args.poll_timeout_ms {
        watch.poll_timeout_ms = ms;
    }
    if let Some(ms) = args.debounce_ms {
        reload.debounce_ms = ms;
    }
    if !args.include.is_empty() {
        reload.include = args.include.clone();
    }
    reload.skip_deleted |= args.skip_deleted;

    ConfigFile::try_from(RawConfigFile { watch, reload })
}

async fn print_raw(mut rx: mpsc::UnboundedReceiver<ChangeEvent>, filter: &ReloadFilter, format: OutputFormat) {
    while let Some(event) = rx.recv().await {
        if !filter.accepts(&event) {
            debug!(%event, "filtered out");
            continue;
        }
        match output::format_event(&event, format) {
            Ok(line) => println!("{line}"),
            Err(err) => warn!(error = %err, "failed to render change event"),
        }
    }
}

async fn forward_filtered(
    mut rx: mpsc::UnboundedReceiver<ChangeEvent>,
    filter: &ReloadFilter,
    debouncer: &Debouncer,
) {
    while let Some(event) = rx.recv().await {
        if filter.accepts(&event) {
            debouncer.submit_event(event);
        } else {
            debug!(%event, "filtered out");
        }
    }
}

fn print_updates(updates: &PathUpdates, root: &Path, format: OutputFormat) {
    match output::format_updates(updates, root, format) {
        Ok(line) => println!("{line}"),
        Err(err) => warn!(error = %err, "failed to render reload batch"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> CliArgs {
        let mut full = vec!["treewatch"];
        full.extend_from_slice(argv);
        CliArgs::try_parse_from(full).unwrap()
    }

    #[test]
    fn cli_flags_override_file_values() {
        let file: RawConfigFile = toml::from_str(
            r#"
            [watch]
            root = "from-file"
            poll_timeout_ms = 50

            [reload]
            debounce_ms = 200
            include = ["a/**"]
            "#,
        )
        .unwrap();
        let file = ConfigFile::try_from(file).unwrap();

        let cfg = apply_cli_overrides(
            &args(&["ws", "--debounce-ms", "5", "--include", "b/**", "--skip-deleted"]),
            file,
        )
        .unwrap();

        assert_eq!(cfg.watch.root, Some(PathBuf::from("ws")));
        assert_eq!(cfg.watch.poll_timeout_ms, 50);
        assert_eq!(cfg.reload.debounce_ms, 5);
        assert_eq!(cfg.reload.include, vec!["b/**"]);
        assert!(cfg.reload.skip_deleted);
    }

    #[test]
    fn overrides_are_validated() {
        let err = apply_cli_overrides(&args(&["--poll-timeout-ms", "0"]), ConfigFile::default())
            .unwrap_err();
        assert!(matches!(err, WatchError::ConfigError(_)));
    }
}
