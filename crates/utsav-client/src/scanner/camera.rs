use crate::error::ScanError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// Rear camera, pointed at the ticket.
    #[default]
    Environment,
    User,
}

impl FacingMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Environment => Self::User,
            Self::User => Self::Environment,
        }
    }
}

/// Which camera to open: a specific enumerated device, or whichever one faces
/// the requested way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraSelection {
    Device(String),
    Facing(FacingMode),
}

impl Default for CameraSelection {
    fn default() -> Self {
        Self::Facing(FacingMode::default())
    }
}

/// An open camera stream. `stop` must release every track and be safe to
/// call more than once.
pub trait CameraStream: Send {
    fn stop(&mut self);
}

/// Camera hardware as seen by the scanner. Frame decoding happens outside;
/// decoded strings reach the scanner through a channel.
pub trait Camera: Send {
    type Stream: CameraStream;

    fn devices(&mut self) -> Result<Vec<CameraDevice>, ScanError>;

    /// Acquires a stream. May block on a permission prompt.
    fn open(&mut self, selection: &CameraSelection) -> Result<Self::Stream, ScanError>;
}
