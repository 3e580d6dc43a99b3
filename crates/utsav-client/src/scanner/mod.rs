//! Camera-driven ticket scanning.
//!
//! [`ScanSession`] is the synchronous state machine that owns the camera and
//! gates dispatch to one payload per session. [`ScanDriver`] runs it on a
//! tokio task, fed by decoded frames and operator commands.

mod camera;
mod driver;
mod session;
#[cfg(test)]
mod testing;

pub use camera::{Camera, CameraDevice, CameraSelection, CameraStream, FacingMode};
pub use driver::{CheckInTransport, ScanCommand, ScanDriver, ScanEvent};
pub use session::{Dispatch, ScanOutcome, ScanSession, ScanState};
