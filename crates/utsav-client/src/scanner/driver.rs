use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use utsav_types::api::CheckInResponse;

use super::camera::{Camera, CameraSelection};
use super::session::{Dispatch, ScanOutcome, ScanSession, ScanState};
use crate::api::ApiClient;
use crate::error::ClientError;

/// Operator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanCommand {
    /// Start scanning, or scan another ticket after a result.
    Start,
    Stop,
    SwitchCamera,
}

#[derive(Debug, Clone)]
pub enum ScanEvent {
    StateChanged(ScanState),
    CameraSwitched(CameraSelection),
    Resolved(ScanOutcome),
    Error(String),
}

/// Delivers a scanned payload to the check-in endpoint.
pub trait CheckInTransport: Send + Sync + 'static {
    fn submit(&self, payload: String) -> impl Future<Output = Result<CheckInResponse, ClientError>> + Send;
}

impl CheckInTransport for ApiClient {
    fn submit(&self, payload: String) -> impl Future<Output = Result<CheckInResponse, ClientError>> + Send {
        async move { self.check_in(&payload).await }
    }
}

struct Pending {
    session: u64,
    handle: JoinHandle<Result<CheckInResponse, ClientError>>,
}

/// Runs a [`ScanSession`] against decoded frames and operator commands.
///
/// Check-in calls run on their own tasks. Stopping the scanner or dropping
/// the driver never aborts one, since the server may already have written the
/// check-in; its result is just not shown.
pub struct ScanDriver<C: Camera, T: CheckInTransport> {
    scanner: ScanSession<C>,
    transport: Arc<T>,
    events: mpsc::UnboundedSender<ScanEvent>,
}

impl<C: Camera, T: CheckInTransport> ScanDriver<C, T> {
    pub fn new(camera: C, transport: Arc<T>, events: mpsc::UnboundedSender<ScanEvent>) -> Self {
        Self {
            scanner: ScanSession::new(camera),
            transport,
            events,
        }
    }

    /// Runs until the command channel closes. The camera is released on return.
    pub async fn run(mut self, mut commands: mpsc::Receiver<ScanCommand>, mut frames: mpsc::Receiver<String>) {
        let mut pending: Option<Pending> = None;

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    self.handle_command(command);
                }
                Some(frame) = frames.recv() => {
                    if let Some(dispatch) = self.scanner.on_decoded(&frame) {
                        self.emit_state();
                        if pending.is_some() {
                            debug!("Detaching check-in call from an earlier session");
                        }
                        pending = Some(self.spawn_check_in(dispatch));
                    }
                }
                (session, outcome) = settle(&mut pending), if pending.is_some() => {
                    pending = None;
                    if self.scanner.resolve(session, outcome.clone()) {
                        info!(session, success = outcome.is_success(), "{}", outcome.message());
                        self.emit(ScanEvent::Resolved(outcome));
                        self.emit_state();
                    }
                }
            }
        }

        debug!("Scanner driver stopped");
    }

    fn handle_command(&mut self, command: ScanCommand) {
        match command {
            ScanCommand::Start => {
                if let Err(e) = self.scanner.start() {
                    self.emit(ScanEvent::Error(e.to_string()));
                }
            }
            ScanCommand::Stop => self.scanner.stop(),
            ScanCommand::SwitchCamera => match self.scanner.switch_camera().cloned() {
                Ok(selection) => self.emit(ScanEvent::CameraSwitched(selection)),
                Err(e) => self.emit(ScanEvent::Error(e.to_string())),
            },
        }
        self.emit_state();
    }

    fn spawn_check_in(&self, dispatch: Dispatch) -> Pending {
        let Dispatch { session, payload } = dispatch;
        let transport = Arc::clone(&self.transport);
        debug!(session, "Submitting scanned payload");

        Pending {
            session,
            handle: tokio::spawn(async move { transport.submit(payload).await }),
        }
    }

    fn emit_state(&self) {
        self.emit(ScanEvent::StateChanged(self.scanner.state()));
    }

    fn emit(&self, event: ScanEvent) {
        // Nobody listening is fine; the scanner keeps working headless.
        let _ = self.events.send(event);
    }
}

async fn settle(pending: &mut Option<Pending>) -> (u64, ScanOutcome) {
    let Some(pending) = pending else {
        return std::future::pending().await;
    };

    let outcome = match (&mut pending.handle).await {
        Ok(result) => ScanOutcome::from(result),
        Err(e) => {
            warn!("Check-in task failed: {}", e);
            ScanOutcome::Failed("Check-in could not be completed. Please scan again.".into())
        }
    };
    (pending.session, outcome)
}
