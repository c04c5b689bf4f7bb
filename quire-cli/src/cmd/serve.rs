use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use quire_dev_server::{DevServer, DevServerConfig};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::cmd::build::add_build_args;
use crate::config::QuireConfig;

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("serve"))
        .about("Build the site, serve it, and rebuild when content or theme change")
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .value_parser(clap::value_parser!(u16))
                .help("Port to serve on [default: 3000]"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Host to bind to [default: 127.0.0.1]"),
        )
        .arg(
            Arg::new("open")
                .long("open")
                .help("Open browser automatically")
                .action(ArgAction::SetTrue),
        )
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    // Load cascading configuration
    let config = QuireConfig::load(args)?;
    let options = config.build_options()?;
    let project = config.project().clone();

    // A failed first build still leaves something to look at once fixed
    if let Err(e) = quire_core::build_site(&options) {
        log::error!("Build error: {}", e);
    }
    std::fs::create_dir_all(&options.output_dir)?;

    let server = DevServer::new(DevServerConfig {
        host: project.host.clone(),
        port: project.port,
        root: options.output_dir.clone(),
        open: project.open,
    });
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            log::error!("Dev server error: {}", e);
        }
    });

    // Watch source files and rebuild on changes
    let args = args.clone();
    let watcher_handle = tokio::spawn(async move {
        if let Err(e) = watch_source_files(config, args).await {
            log::error!("Source watcher error: {}", e);
        }
    });

    // Wait for both tasks
    let _ = tokio::try_join!(server_handle, watcher_handle)?;

    Ok(())
}

async fn watch_source_files(config: QuireConfig, args: ArgMatches) -> Result<()> {
    let watched = config.watched_paths();
    let output_dir = PathBuf::from(&config.project().output);

    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let mut debouncer = new_debouncer(
        Duration::from_millis(500),
        move |res: DebounceEventResult| match res {
            Ok(events) => {
                for event in events {
                    let _ = tx.blocking_send(event.path);
                }
            }
            Err(e) => log::warn!("Watch error: {}", e),
        },
    )?;

    for path in watched.iter().filter(|path| path.exists()) {
        let mode = if path.is_dir() {
            notify::RecursiveMode::Recursive
        } else {
            notify::RecursiveMode::NonRecursive
        };
        debouncer.watcher().watch(path, mode)?;
        log::info!("Watching {}", path.display());
    }

    let watched: Vec<PathBuf> = watched.iter().map(|path| absolute(path)).collect();
    let output_dir = absolute(&output_dir);

    while let Some(path) = rx.recv().await {
        let path = absolute(&path);
        if path.starts_with(&output_dir) || !watched.iter().any(|root| path.starts_with(root)) {
            log::debug!("Ignoring change to {}", path.display());
            continue;
        }

        // Several events usually arrive together, one rebuild covers them all
        while rx.try_recv().is_ok() {}

        log::info!("Change detected in {}, rebuilding", path.display());

        // Pick up edits to the config file too
        let options = match QuireConfig::load(&args).and_then(|config| config.build_options()) {
            Ok(options) => options,
            Err(e) => {
                log::error!("Configuration error: {}", e);
                continue;
            }
        };

        let result = tokio::task::spawn_blocking(move || quire_core::build_site(&options)).await?;
        match result {
            Ok(summary) => log::info!(
                "Site rebuilt in {:.2?} ({} documents)",
                summary.elapsed,
                summary.written
            ),
            Err(e) => log::error!("Build error: {}", e),
        }
    }

    Ok(())
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
