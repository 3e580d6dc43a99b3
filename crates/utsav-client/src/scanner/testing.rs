use std::sync::{Arc, Mutex};

use super::camera::{Camera, CameraDevice, CameraSelection, CameraStream};
use crate::error::ScanError;

#[derive(Default)]
struct Hardware {
    devices: usize,
    open: usize,
    overlapped: bool,
    denied: bool,
    log: Vec<String>,
}

/// Camera double that records opens and stops and flags any moment where two
/// streams were live at once.
#[derive(Clone, Default)]
pub(crate) struct FakeCamera {
    hw: Arc<Mutex<Hardware>>,
}

impl FakeCamera {
    pub(crate) fn new(devices: usize) -> Self {
        let camera = Self::default();
        camera.hw.lock().unwrap().devices = devices;
        camera
    }

    pub(crate) fn deny_access(&self) {
        self.hw.lock().unwrap().denied = true;
    }

    pub(crate) fn open_streams(&self) -> usize {
        self.hw.lock().unwrap().open
    }

    pub(crate) fn overlapped(&self) -> bool {
        self.hw.lock().unwrap().overlapped
    }

    pub(crate) fn log(&self) -> Vec<String> {
        self.hw.lock().unwrap().log.clone()
    }
}

pub(crate) struct FakeStream {
    hw: Arc<Mutex<Hardware>>,
    stopped: bool,
}

impl CameraStream for FakeStream {
    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            let mut hw = self.hw.lock().unwrap();
            hw.open -= 1;
            hw.log.push("stop".into());
        }
    }
}

impl Camera for FakeCamera {
    type Stream = FakeStream;

    fn devices(&mut self) -> Result<Vec<CameraDevice>, ScanError> {
        let count = self.hw.lock().unwrap().devices;
        Ok((0..count)
            .map(|i| CameraDevice {
                id: format!("cam-{i}"),
                label: format!("Camera {i}"),
            })
            .collect())
    }

    fn open(&mut self, selection: &CameraSelection) -> Result<FakeStream, ScanError> {
        let mut hw = self.hw.lock().unwrap();
        if hw.denied {
            return Err(ScanError::CameraUnavailable("permission denied".into()));
        }
        if hw.open > 0 {
            hw.overlapped = true;
        }
        hw.open += 1;
        hw.log.push(format!("open {selection:?}"));
        Ok(FakeStream {
            hw: Arc::clone(&self.hw),
            stopped: false,
        })
    }
}
