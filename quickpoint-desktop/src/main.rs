//! QuickPoint Desktop: terminal presenter for HTML slide decks.
//!
//! Runs the main view and a presenter view as two independent viewers
//! on one in-process channel, so the presenter drives the main view
//! exactly the way a second browser window would. Commands are read
//! from stdin, one per line.

mod loader;
mod view;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use quickpoint_core::Intent;
use quickpoint_sync::{
    ChannelRegistry, PresenterView, ViewerClient, ViewerCommand, ViewerConfig, ViewerController,
    DEFAULT_CHANNEL,
};
use view::{PresenterPane, TerminalView};

#[derive(Parser, Debug)]
#[command(name = "quickpoint")]
#[command(about = "Present an HTML slide deck with a synchronized presenter view")]
struct Args {
    /// Presentation folder containing config.json
    dir: PathBuf,

    /// Initial location, e.g. `#slide-3-step-2`
    #[arg(long)]
    start: Option<String>,

    /// Run the main view only
    #[arg(long)]
    no_presenter: bool,

    /// Reload the deck when files under the folder change
    #[arg(long)]
    watch: bool,

    #[arg(long, default_value = "1000")]
    watch_interval_ms: u64,

    /// Sync channel name
    #[arg(long, default_value = DEFAULT_CHANNEL)]
    channel: String,
}

/// Which window a stdin command goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Console {
    Main(Intent),
    MainLocation(String),
    Presenter(Intent),
    Reload,
    Quit,
}

fn parse_console(line: &str) -> Option<Console> {
    let line = line.trim();
    if line.starts_with('#') {
        return Some(Console::MainLocation(line.to_string()));
    }
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let command = match word {
        "" | "n" | "next" => Console::Main(Intent::Advance),
        "p" | "prev" => Console::Main(Intent::Retreat),
        "pn" => Console::Presenter(Intent::Advance),
        "pp" => Console::Presenter(Intent::Retreat),
        "g" | "go" if !rest.trim().is_empty() => Console::MainLocation(rest.trim().to_string()),
        "r" | "reload" => Console::Reload,
        "q" | "quit" | "exit" => Console::Quit,
        _ => return None,
    };
    Some(command)
}

async fn reload_into(dir: &Path, targets: &[mpsc::Sender<ViewerCommand>]) -> bool {
    match loader::load_folder(dir) {
        Ok(deck) => {
            for tx in targets {
                if tx.send(ViewerCommand::Reload(deck.clone())).await.is_err() {
                    return false;
                }
            }
            info!("reloaded {}", dir.display());
        }
        Err(e) => warn!("reload failed, keeping current deck: {e}"),
    }
    true
}

/// Poll the folder and reload whenever its newest mtime grows.
async fn watch(dir: PathBuf, interval: Duration, targets: Vec<mpsc::Sender<ViewerCommand>>) {
    let mut last = loader::newest_mtime(&dir).ok().flatten();
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let current = match loader::newest_mtime(&dir) {
            Ok(current) => current,
            Err(e) => {
                warn!("watch: cannot scan {}: {e}", dir.display());
                continue;
            }
        };
        if current <= last {
            continue;
        }
        last = current;
        if !reload_into(&dir, &targets).await {
            return;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut main_view = TerminalView::stdout();
    let deck = match loader::load_folder(&args.dir) {
        Ok(deck) => deck,
        Err(e) => {
            main_view.show_error(&e);
            return Err(e).with_context(|| format!("loading {}", args.dir.display()));
        }
    };

    let primary_config = ViewerConfig {
        channel_name: args.channel.clone(),
        ..ViewerConfig::primary()
    };
    let registry = ChannelRegistry::new(primary_config.broadcast_capacity);
    let group = registry.get_or_create(&primary_config.channel_name).await;

    let mut main_client = ViewerClient::new(
        "main",
        ViewerController::primary(deck.clone(), primary_config.clone()),
        main_view,
        group.clone(),
    );
    main_client.connect(args.start.as_deref()).await?;
    let (main_tx, main_rx) = mpsc::channel(32);
    let main_task = tokio::spawn(main_client.run(main_rx));
    let mut targets = vec![main_tx.clone()];

    let presenter = if args.no_presenter {
        None
    } else {
        let config = ViewerConfig {
            role: quickpoint_sync::Role::Satellite,
            ..primary_config
        };
        let mut client = ViewerClient::new(
            "presenter",
            PresenterView::new(deck, config),
            PresenterPane::stdout(),
            group.clone(),
        );
        client.connect(None).await?;
        let (tx, rx) = mpsc::channel(32);
        targets.push(tx.clone());
        Some((tx, tokio::spawn(client.run(rx))))
    };

    if args.watch {
        let interval = Duration::from_millis(args.watch_interval_ms.max(50));
        tokio::spawn(watch(args.dir.clone(), interval, targets.clone()));
        info!("watching {} every {interval:?}", args.dir.display());
    }

    info!("commands: n/p (main), pn/pp (presenter), g <token>, r, q");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_console(&line) {
            Some(Console::Main(intent)) => main_tx.send(ViewerCommand::Intent(intent)).await?,
            Some(Console::MainLocation(token)) => main_tx.send(ViewerCommand::Location(token)).await?,
            Some(Console::Presenter(intent)) => match &presenter {
                Some((tx, _)) => tx.send(ViewerCommand::Intent(intent)).await?,
                None => warn!("no presenter running"),
            },
            Some(Console::Reload) => {
                reload_into(&args.dir, &targets).await;
            }
            Some(Console::Quit) => break,
            None => warn!("unknown command {line:?}"),
        }
    }

    main_tx.send(ViewerCommand::Shutdown).await?;
    main_task.await??;
    if let Some((tx, task)) = presenter {
        tx.send(ViewerCommand::Shutdown).await?;
        task.await??;
    }
    let stats = group.stats().await;
    info!(
        "session ended: {} messages sent, {} dropped",
        stats.messages_sent, stats.messages_dropped
    );
    if !registry.remove_if_empty(&args.channel).await {
        warn!("channel {} still has viewers at exit", args.channel);
    }
    Ok(())
}
