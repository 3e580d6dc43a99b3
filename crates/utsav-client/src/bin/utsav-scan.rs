//! Gate scanner for a terminal.
//!
//! Reads decoded QR payloads from stdin, one per line, as produced by an
//! external decoder such as `zbarcam --raw`. Lines starting with `:` are
//! operator commands: `:next`, `:stop`, `:switch`, `:quit`.

use std::sync::Arc;

use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use utsav_client::scanner::{
    Camera, CameraDevice, CameraSelection, CameraStream, ScanCommand, ScanDriver, ScanEvent, ScanOutcome, ScanState,
};
use utsav_client::{ApiClient, AuthContext, ScanError};

/// The decoder owns the real device; this only tracks whether frames should
/// be accepted.
struct ExternalCamera;

struct ExternalStream {
    selection: CameraSelection,
}

impl CameraStream for ExternalStream {
    fn stop(&mut self) {
        info!(camera = ?self.selection, "Camera released");
    }
}

impl Camera for ExternalCamera {
    type Stream = ExternalStream;

    fn devices(&mut self) -> Result<Vec<CameraDevice>, ScanError> {
        Ok(vec![CameraDevice {
            id: "stdin".into(),
            label: "External decoder".into(),
        }])
    }

    fn open(&mut self, selection: &CameraSelection) -> Result<ExternalStream, ScanError> {
        info!(camera = ?selection, "Camera opened");
        Ok(ExternalStream {
            selection: selection.clone(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("utsav=info")))
        .init();

    let url = std::env::var("UTSAV_URL").unwrap_or_else(|_| "http://localhost:3000".into());
    let email = std::env::var("UTSAV_EMAIL").context("UTSAV_EMAIL must be set")?;
    let password = std::env::var("UTSAV_PASSWORD").context("UTSAV_PASSWORD must be set")?;

    let client = ApiClient::new(url.clone(), AuthContext::new());
    let profile = client.login(&email, &password).await.context("sign in failed")?;
    if !profile.role.is_admin() {
        bail!("{} is not an admin; the server will refuse every check-in", email);
    }
    info!("Signed in to {} as {}", url, email);

    let (command_tx, command_rx) = mpsc::channel(8);
    let (frame_tx, frame_rx) = mpsc::channel(64);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let driver = ScanDriver::new(ExternalCamera, Arc::new(client.clone()), event_tx);
    let driver_task = tokio::spawn(driver.run(command_rx, frame_rx));

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            report(event);
        }
    });

    command_tx.send(ScanCommand::Start).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let command = match line {
            "" => continue,
            ":next" | ":start" => ScanCommand::Start,
            ":stop" => ScanCommand::Stop,
            ":switch" => ScanCommand::SwitchCamera,
            ":quit" => break,
            other if other.starts_with(':') => {
                warn!("Unknown command {}", other);
                continue;
            }
            payload => {
                if frame_tx.send(payload.to_string()).await.is_err() {
                    break;
                }
                continue;
            }
        };
        if command_tx.send(command).await.is_err() {
            break;
        }
    }

    drop(command_tx);
    driver_task.await?;
    client.sign_out();
    Ok(())
}

fn report(event: ScanEvent) {
    match event {
        ScanEvent::StateChanged(ScanState::Scanning) => println!("Ready. Show the next ticket."),
        ScanEvent::StateChanged(ScanState::Resolving) => println!("Checking ticket..."),
        ScanEvent::StateChanged(ScanState::Resolved) => println!("Type :next to scan another ticket."),
        ScanEvent::StateChanged(ScanState::Idle) => println!("Scanner stopped. Type :next to resume."),
        ScanEvent::CameraSwitched(selection) => println!("Using camera {selection:?}"),
        ScanEvent::Resolved(outcome) => print_outcome(&outcome),
        ScanEvent::Error(message) => eprintln!("Scanner error: {message}"),
    }
}

fn print_outcome(outcome: &ScanOutcome) {
    let mark = if outcome.is_success() { "OK " } else { "NO " };
    println!("{mark} {}", outcome.message());

    if let ScanOutcome::Answered(resp) = outcome {
        if let Some(participant) = &resp.participant {
            println!(
                "    {} / {}",
                participant.profiles.full_name.as_deref().unwrap_or("Unknown attendee"),
                participant.events.title.as_deref().unwrap_or("Unknown event"),
            );
        }
    }
}
