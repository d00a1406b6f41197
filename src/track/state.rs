//! Tracking session state machine.
//!
//! Two states: Idle (no session) and Tracking (one session bound to a
//! backend instance). The session lives in an `Option`, so "tracking" and
//! "a backend exists" are the same fact.
//!
//! A lost target does not end the session: the backend keeps being asked on
//! every frame until the user cancels or re-arms.

use std::time::{Duration, Instant};

use super::backend::{TrackerBackend, TrackerFactory};
use crate::error::TrackerError;
use crate::frame::Frame;
use crate::geometry::Roi;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerPhase {
    Idle,
    Tracking,
}

/// One armed tracking session.
pub struct TrackerSession {
    backend: Box<dyn TrackerBackend>,
    roi: Roi,
    origin_seq: u64,
    armed_at: Instant,
    updates: u64,
    consecutive_losses: u64,
}

impl TrackerSession {
    /// Last successfully tracked region (the armed region before any update).
    pub fn roi(&self) -> Roi {
        self.roi
    }

    /// Sequence number of the frame the session was armed on.
    pub fn origin_seq(&self) -> u64 {
        self.origin_seq
    }

    pub fn age(&self) -> Duration {
        self.armed_at.elapsed()
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn consecutive_losses(&self) -> u64 {
        self.consecutive_losses
    }
}

pub struct TrackerState {
    factory: Box<dyn TrackerFactory>,
    session: Option<TrackerSession>,
}

impl TrackerState {
    pub fn new(factory: Box<dyn TrackerFactory>) -> Self {
        Self {
            factory,
            session: None,
        }
    }

    pub fn phase(&self) -> TrackerPhase {
        match self.session {
            Some(_) => TrackerPhase::Tracking,
            None => TrackerPhase::Idle,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&TrackerSession> {
        self.session.as_ref()
    }

    pub fn current_roi(&self) -> Option<Roi> {
        self.session.as_ref().map(TrackerSession::roi)
    }

    /// Start tracking `roi` in `frame`, replacing any existing session.
    ///
    /// The previous session is released before the new backend is created,
    /// so at most one backend instance exists at a time. The region is
    /// clamped into the frame; the clamped region is returned. If the new
    /// backend fails to initialize the state ends up Idle.
    pub fn arm(&mut self, frame: &Frame, roi: Roi) -> Result<Roi, TrackerError> {
        if let Some(previous) = self.session.take() {
            log::debug!(
                "tracker: releasing session armed on frame {} after {} updates",
                previous.origin_seq,
                previous.updates
            );
        }
        if frame.is_empty() {
            return Err(TrackerError::InvalidRoi("cannot arm on an empty frame".to_string()));
        }
        let clamped = roi.clamp_to(frame.width(), frame.height()).ok_or_else(|| {
            TrackerError::InvalidRoi(format!(
                "{}x{} frame is smaller than the minimum region",
                frame.width(),
                frame.height()
            ))
        })?;
        if clamped != roi {
            log::debug!("tracker: selection {:?} clamped to {:?}", roi, clamped);
        }

        let mut backend = self
            .factory
            .create()
            .map_err(|err| TrackerError::Backend(format!("{:#}", err)))?;
        backend
            .init(frame, clamped)
            .map_err(|err| TrackerError::Backend(format!("{:#}", err)))?;

        log::info!(
            "tracker: armed {} on frame {} at {},{} {}",
            backend.name(),
            frame.seq,
            clamped.x,
            clamped.y,
            clamped.label()
        );
        self.session = Some(TrackerSession {
            backend,
            roi: clamped,
            origin_seq: frame.seq,
            armed_at: Instant::now(),
            updates: 0,
            consecutive_losses: 0,
        });
        Ok(clamped)
    }

    /// Release the session. Returns `false` when already Idle.
    pub fn cancel(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                log::info!(
                    "tracker: cancelled after {} updates ({:.1}s)",
                    session.updates,
                    session.age().as_secs_f32()
                );
                true
            }
            None => false,
        }
    }

    /// Advance the session by one frame.
    ///
    /// On success the returned region becomes the session's current region.
    /// `TrackingLost` leaves the session in place.
    pub fn update(&mut self, frame: &Frame) -> Result<Roi, TrackerError> {
        let session = self
            .session
            .as_mut()
            .ok_or(TrackerError::NoActiveSession)?;
        session.updates += 1;

        let located = match session.backend.update(frame) {
            Ok(located) => located,
            Err(err) => {
                if session.consecutive_losses == 0 {
                    log::warn!(
                        "tracker: {} failed on frame {}: {:#}",
                        session.backend.name(),
                        frame.seq,
                        err
                    );
                }
                None
            }
        };

        match located {
            Some(roi) => {
                if session.consecutive_losses > 0 {
                    log::info!(
                        "tracker: target reacquired after {} lost frames",
                        session.consecutive_losses
                    );
                }
                session.consecutive_losses = 0;
                session.roi = roi;
                Ok(roi)
            }
            None => {
                if session.consecutive_losses == 0 {
                    log::info!("tracker: target lost on frame {}", frame.seq);
                }
                session.consecutive_losses += 1;
                Err(TrackerError::TrackingLost)
            }
        }
    }
}
