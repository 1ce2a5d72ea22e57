//! Lofi audio engine (lofi-ap) - Main entry point
//!
//! Reads newline-delimited JSON commands on stdin, writes newline-delimited
//! JSON events (and optionally visualizer frames) on stdout, logs on stderr.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lofi_common::events::{EngineEvent, EventEnvelope};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lofi_ap::audio::output::AudioOutput;
use lofi_ap::audio::AudioSubsystem;
use lofi_ap::config::{Config, Overrides};
use lofi_ap::control::Command;
use lofi_ap::playback::{run, DriverConfig, PlaybackEngine};
use lofi_ap::visualizer::Frame;

/// Command-line arguments for lofi-ap
#[derive(Parser, Debug)]
#[command(name = "lofi-ap")]
#[command(about = "Lofi focus companion audio engine")]
#[command(version)]
struct Args {
    /// Config file (falls back to LOFI_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output device name
    #[arg(short, long, env = "LOFI_DEVICE")]
    device: Option<String>,

    /// Run without an audio device
    #[arg(long, env = "LOFI_HEADLESS")]
    headless: bool,

    /// Folder that relative media references resolve against
    #[arg(short, long, env = "LOFI_MEDIA_ROOT")]
    media_root: Option<PathBuf>,

    /// Also write visualizer frames to stdout
    #[arg(long)]
    frames: bool,

    /// Print output device names and exit
    #[arg(long)]
    list_devices: bool,
}

/// Visualizer frame as written to stdout
#[derive(Serialize)]
struct FrameLine<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    frame: &'a Frame,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_devices {
        for name in AudioOutput::list_devices().context("Failed to list output devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let config = Config::load(
        args.config.clone(),
        Overrides {
            device: args.device.clone(),
            headless: args.headless,
            media_root: args.media_root.clone(),
        },
    )
    .context("Failed to load configuration")?;

    // stdout carries the event stream
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting lofi-ap v{}", env!("CARGO_PKG_VERSION"));
    match &config.source {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: compiled defaults"),
    }
    info!("Media root: {}", config.settings.media_root.display());

    let settings = &config.settings;
    let host = AudioSubsystem::new(settings.output.clone(), &settings.analysis);
    let mut engine = PlaybackEngine::new(settings, host);

    let (frame_tx, frame_rx) = if args.frames {
        let (tx, rx) = mpsc::channel(8);
        (Some(tx), Some(rx))
    } else {
        (None, None)
    };
    let writer = tokio::spawn(write_output(tokio::io::stdout(), engine.subscribe(), frame_rx));

    // Detached: shutdown never waits on a blocked stdin read
    let (command_tx, command_rx) = mpsc::channel(64);
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || forward_commands(std::io::stdin().lock(), command_tx))
        .context("Failed to start stdin reader")?;

    let reason = run(
        &mut engine,
        DriverConfig::default(),
        command_rx,
        frame_tx,
        shutdown_signal(),
    )
    .await;
    info!(?reason, "Shutting down");

    drop(engine);
    if let Err(e) = writer.await {
        warn!("Output writer ended abnormally: {}", e);
    }
    Ok(())
}

/// Parse input lines into commands until EOF or until the driver is gone
///
/// Blocking; runs on a plain thread, never inside the runtime.
fn forward_commands(input: impl BufRead, tx: mpsc::Sender<Command>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                return;
            }
        };
        match Command::parse_line(&line) {
            Ok(Some(command)) => {
                if tx.blocking_send(command).is_err() {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring malformed command {:?}: {}", line, e),
        }
    }
    info!("stdin closed");
}

/// Write events and frames to `out` as JSON lines
///
/// Stops when the event bus closes or `out` fails.
async fn write_output<W: AsyncWrite + Unpin>(
    mut out: W,
    mut events: broadcast::Receiver<EngineEvent>,
    mut frames: Option<mpsc::Receiver<Frame>>,
) {
    loop {
        let line = tokio::select! {
            event = events.recv() => match event {
                Ok(event) => serde_json::to_string(&EventEnvelope::now(event)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event writer lagged, {} events dropped", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            Some(frame) = recv_frame(&mut frames) => serde_json::to_string(&FrameLine {
                kind: "Frame",
                frame: &frame,
            }),
        };

        match line {
            Ok(mut line) => {
                line.push('\n');
                if let Err(e) = out.write_all(line.as_bytes()).await {
                    warn!("stdout closed: {}", e);
                    break;
                }
                if let Err(e) = out.flush().await {
                    warn!("Failed to flush stdout: {}", e);
                    break;
                }
            }
            Err(e) => warn!("Failed to serialize output: {}", e),
        }
    }
}

async fn recv_frame(frames: &mut Option<mpsc::Receiver<Frame>>) -> Option<Frame> {
    match frames {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context as TaskContext, Poll};
    use std::time::Duration;

    use lofi_common::TrackId;

    #[test]
    fn test_forward_commands_skips_bad_lines_and_closes_at_eof() {
        let input = Cursor::new("{\"cmd\":\"play\"}\n\nnot json\n{\"cmd\":\"pause\"}\n");
        let (tx, mut rx) = mpsc::channel(8);

        forward_commands(input, tx);

        assert!(matches!(rx.blocking_recv(), Some(Command::Play)));
        assert!(matches!(rx.blocking_recv(), Some(Command::Pause)));
        assert!(rx.blocking_recv().is_none());
    }

    #[test]
    fn test_forward_commands_stops_when_receiver_dropped() {
        let input = Cursor::new("{\"cmd\":\"play\"}\n".repeat(4));
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        // Returns instead of blocking on a full channel
        forward_commands(input, tx);
    }

    /// Accepts writes, fails every flush
    struct FlushFails;

    impl AsyncWrite for FlushFails {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn track_ended() -> EngineEvent {
        EngineEvent::TrackEnded {
            track_id: TrackId::new("t1"),
        }
    }

    #[tokio::test]
    async fn test_write_output_emits_json_lines_until_bus_closes() {
        let (tx, rx) = broadcast::channel(8);
        tx.send(track_ended()).unwrap();
        tx.send(track_ended()).unwrap();
        drop(tx);

        let mut out = Vec::new();
        write_output(&mut out, rx, None).await;

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["type"], "TrackEnded");
        }
    }

    #[tokio::test]
    async fn test_write_output_stops_on_flush_error() {
        let (tx, rx) = broadcast::channel(8);
        tx.send(track_ended()).unwrap();

        // The bus stays open, so only the flush failure can end the writer
        tokio::time::timeout(Duration::from_secs(1), write_output(FlushFails, rx, None))
            .await
            .expect("writer should stop after a failed flush");
        drop(tx);
    }
}
