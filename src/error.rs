//! Error kinds surfaced by the tracking core.
//!
//! Only `CaptureUnavailable` is meant to reach the host. The remaining kinds are
//! absorbed by the render loop (`TrackingLost`), resolved by clamping
//! (`InvalidRoi`), or indicate a composition bug (`NoActiveSession`).

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackerError {
    /// The capture device could not be opened at startup.
    CaptureUnavailable { device: String, reason: String },
    /// The tracking capability reported failure for this frame.
    TrackingLost,
    /// The selection or frame cannot seed a tracking session.
    InvalidRoi(String),
    /// `update()` was called while no session is armed.
    NoActiveSession,
    /// The tracking backend failed to initialize.
    Backend(String),
}

impl TrackerError {
    pub fn code(&self) -> &'static str {
        match self {
            TrackerError::CaptureUnavailable { .. } => "capture_unavailable",
            TrackerError::TrackingLost => "tracking_lost",
            TrackerError::InvalidRoi(_) => "invalid_roi",
            TrackerError::NoActiveSession => "no_active_session",
            TrackerError::Backend(_) => "backend",
        }
    }

    pub(crate) fn capture_unavailable(device: &str, err: &anyhow::Error) -> Self {
        TrackerError::CaptureUnavailable {
            device: device.to_string(),
            reason: format!("{:#}", err),
        }
    }
}

impl std::fmt::Display for TrackerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerError::CaptureUnavailable { device, reason } => {
                write!(f, "{}: cannot open {}: {}", self.code(), device, reason)
            }
            TrackerError::TrackingLost => write!(f, "{}: target not found", self.code()),
            TrackerError::InvalidRoi(message) | TrackerError::Backend(message) => {
                write!(f, "{}: {}", self.code(), message)
            }
            TrackerError::NoActiveSession => {
                write!(f, "{}: update called while idle", self.code())
            }
        }
    }
}

impl std::error::Error for TrackerError {}
