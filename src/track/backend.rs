use anyhow::Result;

use crate::frame::Frame;
use crate::geometry::Roi;

/// Tracking capability.
///
/// An instance is bound to one target: `init` seeds it with a frame and a
/// region, then every `update` reports where the target went. The algorithm
/// behind it is opaque to the rest of the pipeline.
pub trait TrackerBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Bind the instance to `roi` in `frame`. The region lies inside the frame.
    fn init(&mut self, frame: &Frame, roi: Roi) -> Result<()>;

    /// Locate the target in `frame`. `Ok(None)` means the target was not found
    /// this time; the instance stays usable.
    fn update(&mut self, frame: &Frame) -> Result<Option<Roi>>;
}

/// Creates a fresh backend instance for every armed session.
pub trait TrackerFactory {
    fn name(&self) -> &'static str;

    fn create(&self) -> Result<Box<dyn TrackerBackend>>;
}
