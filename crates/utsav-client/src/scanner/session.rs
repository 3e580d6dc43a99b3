use tracing::{debug, info, warn};

use utsav_types::api::CheckInResponse;

use super::camera::{Camera, CameraDevice, CameraSelection, CameraStream};
use crate::error::{ClientError, ScanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// No stream, nothing shown.
    Idle,
    /// Stream open, waiting for the first decoded payload.
    Scanning,
    /// Camera stopped, check-in call in flight.
    Resolving,
    /// Outcome shown, camera stopped until the operator scans again.
    Resolved,
}

/// A payload that must be sent to the check-in endpoint exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub session: u64,
    pub payload: String,
}

#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// The server answered. `success` is false for refusals such as an
    /// already used ticket.
    Answered(CheckInResponse),
    /// No answer arrived. Rescanning the same ticket is safe.
    Failed(String),
}

impl ScanOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Answered(resp) if resp.success)
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Answered(resp) => &resp.message,
            Self::Failed(message) => message,
        }
    }
}

impl From<Result<CheckInResponse, ClientError>> for ScanOutcome {
    fn from(result: Result<CheckInResponse, ClientError>) -> Self {
        match result {
            Ok(resp) => Self::Answered(resp),
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

/// One operator's scanner. Owns the camera and at most one open stream.
///
/// Each `start` opens a new session. Within a session only the first decoded
/// payload is dispatched; later frames, even of a different ticket, are
/// ignored until the operator scans again.
pub struct ScanSession<C: Camera> {
    camera: C,
    stream: Option<C::Stream>,
    selection: CameraSelection,
    devices: Vec<CameraDevice>,
    state: ScanState,
    session: u64,
    dispatched: bool,
    outcome: Option<ScanOutcome>,
}

impl<C: Camera> ScanSession<C> {
    pub fn new(camera: C) -> Self {
        Self {
            camera,
            stream: None,
            selection: CameraSelection::default(),
            devices: Vec::new(),
            state: ScanState::Idle,
            session: 0,
            dispatched: false,
            outcome: None,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn outcome(&self) -> Option<&ScanOutcome> {
        self.outcome.as_ref()
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Starts a new session. Also serves as "scan another" after a result.
    pub fn start(&mut self) -> Result<u64, ScanError> {
        if matches!(self.state, ScanState::Scanning | ScanState::Resolving) {
            return Err(ScanError::Busy);
        }

        self.release_stream();
        self.outcome = None;
        self.dispatched = false;
        self.session += 1;

        match self.camera.open(&self.selection) {
            Ok(stream) => {
                self.stream = Some(stream);
                self.state = ScanState::Scanning;
                info!(session = self.session, camera = ?self.selection, "Scanning");
                Ok(self.session)
            }
            Err(e) => {
                self.state = ScanState::Idle;
                warn!(session = self.session, "Could not open camera: {}", e);
                Err(e)
            }
        }
    }

    /// Feeds one decoded frame. Returns the dispatch for the first payload of
    /// the session and `None` for everything else.
    pub fn on_decoded(&mut self, payload: &str) -> Option<Dispatch> {
        if self.state != ScanState::Scanning || self.dispatched {
            return None;
        }

        self.dispatched = true;
        self.release_stream();
        self.state = ScanState::Resolving;
        debug!(session = self.session, "Payload captured, camera stopped");

        Some(Dispatch {
            session: self.session,
            payload: payload.to_string(),
        })
    }

    /// Applies a check-in result. Results for an older session, or arriving
    /// after `stop`, are dropped and `false` is returned.
    pub fn resolve(&mut self, session: u64, outcome: ScanOutcome) -> bool {
        if self.state != ScanState::Resolving || session != self.session {
            debug!(session, current = self.session, "Discarding stale check-in result");
            return false;
        }

        self.release_stream();
        self.outcome = Some(outcome);
        self.state = ScanState::Resolved;
        true
    }

    /// Returns to `Idle` from any state with the camera released. A call
    /// already in flight is left to finish; its result will be discarded.
    pub fn stop(&mut self) {
        self.release_stream();
        self.outcome = None;
        if self.state != ScanState::Idle {
            info!(session = self.session, "Scanner stopped");
        }
        self.state = ScanState::Idle;
    }

    /// Moves to the next camera. Cycles through enumerated devices when there
    /// are at least two, otherwise flips the facing mode. While scanning, the
    /// old stream is released before the new one is opened.
    pub fn switch_camera(&mut self) -> Result<&CameraSelection, ScanError> {
        if self.devices.len() < 2 {
            self.devices = self.camera.devices()?;
        }

        self.selection = match (&self.selection, self.devices.as_slice()) {
            (current, devices) if devices.len() >= 2 => {
                let next = match current {
                    CameraSelection::Device(id) => {
                        devices.iter().position(|d| &d.id == id).map_or(0, |i| (i + 1) % devices.len())
                    }
                    CameraSelection::Facing(_) => 0,
                };
                CameraSelection::Device(devices[next].id.clone())
            }
            (CameraSelection::Facing(mode), _) => CameraSelection::Facing(mode.toggled()),
            (CameraSelection::Device(_), _) => CameraSelection::Facing(Default::default()),
        };

        if self.state == ScanState::Scanning {
            self.release_stream();
            match self.camera.open(&self.selection) {
                Ok(stream) => self.stream = Some(stream),
                Err(e) => {
                    self.state = ScanState::Idle;
                    warn!(camera = ?self.selection, "Could not switch camera: {}", e);
                    return Err(e);
                }
            }
        }

        info!(camera = ?self.selection, "Camera switched");
        Ok(&self.selection)
    }

    fn release_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
    }
}

impl<C: Camera> Drop for ScanSession<C> {
    fn drop(&mut self) {
        self.release_stream();
    }
}
