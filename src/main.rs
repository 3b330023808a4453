mod console;

use adsync_core::{Clock, MatchRequest, SampleSource, WallClock};
use adsync_engine::{BiasController, FileBiasStore, SessionHost, SimulatedPlayer, SyncSession};
use adsync_matcher::{run_listener, MatcherRegistry};
use anyhow::{Context, Result};
use clap::Parser;
use console::ConsoleAction;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "adsync", about = "Audio description kept in sync with a live source")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Replay silence instead of recording from the microphone
    #[arg(long)]
    no_mic: bool,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = adsync_core::AppConfig::load_from_file(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::Registry::default().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false),
    );

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    if cli.list_devices {
        let devices = adsync_audio::DeviceManager::new()
            .list_input_devices()
            .context("failed to list input devices")?;
        for (name, _) in devices {
            println!("{name}");
        }
        return Ok(());
    }

    tracing::info!("adsync starting");

    let registry = MatcherRegistry::new();
    let matcher = registry
        .build(&config.matcher.engine, config.matcher.extra.clone())
        .await
        .with_context(|| {
            format!(
                "failed to initialise matcher '{}' (available: {:?})",
                config.matcher.engine,
                registry.list_matchers()
            )
        })?;

    let source: Box<dyn SampleSource> = if cli.no_mic {
        Box::new(adsync_audio::PrerecordedSource::silence(
            config.listen.sample_rate,
            config.listen.channels,
        ))
    } else {
        tracing::info!("using input device: {}", config.listen.device_name);
        Box::new(adsync_audio::MicrophoneSource::from_config(&config.listen))
    };

    let clock: Arc<dyn Clock> = Arc::new(WallClock::new());

    let store = FileBiasStore::new(&config.sync.state_file);
    let bias = BiasController::new(Box::new(store), &config.sync);
    let step_ms = bias.step_ms();
    let player = SimulatedPlayer::from_config(&config.player);
    let session = SyncSession::new(Box::new(player), Arc::clone(&clock), bias, &config.sync)
        .with_min_confidence(config.matcher.min_confidence);

    let mut host = SessionHost::new(session, config.sync.sample_interval());
    let cmd_tx = host.command_sender();
    let mut status_rx = host.subscribe();
    host.start();

    // Status printer
    tokio::spawn(async move {
        let mut prev = status_rx.borrow_and_update().clone();
        while status_rx.changed().await.is_ok() {
            let next = status_rx.borrow_and_update().clone();
            for line in console::describe_change(&prev, &next) {
                println!("{line}");
            }
            prev = next;
        }
    });

    let request = MatchRequest {
        clip_hint: config.matcher.clip_hint.clone(),
        lang: config.matcher.lang.clone(),
    };
    let (listen_tx, listen_rx) = mpsc::unbounded_channel::<()>();
    let listener = tokio::spawn(run_listener(
        source,
        matcher,
        clock,
        request,
        config.listen.duration(),
        listen_rx,
        cmd_tx.clone(),
    ));

    let _ = listen_tx.send(());
    println!("listening...");
    println!("{}", console::HELP);

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        match console::parse_line(&line, step_ms) {
            Some(ConsoleAction::Session(cmd)) => {
                if cmd_tx.send(cmd).is_err() {
                    break;
                }
            }
            Some(ConsoleAction::Listen) => {
                if listen_tx.send(()).is_ok() {
                    println!("listening...");
                }
            }
            Some(ConsoleAction::Help) => println!("{}", console::HELP),
            Some(ConsoleAction::Quit) => break,
            None if line.trim().is_empty() => {}
            None => println!("unknown command: {} (h for help)", line.trim()),
        }
    }

    tracing::info!("shutting down");
    drop(listen_tx);
    host.shutdown().await;
    let _ = listener.await;

    Ok(())
}
