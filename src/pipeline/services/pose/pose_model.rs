use crate::common::Frame;
use crate::error::PoseError;
use crate::pipeline::types::Pose;

/// Backend-neutral single-person pose model.
///
/// Implementations keep every backend type private, so callers only ever see
/// `Frame` in and `Pose` out.
pub trait PoseModel: Send {
    /// Load weights and allocate runtime state. Safe to call more than once.
    fn initialize(&mut self) -> Result<(), PoseError>;

    /// Best single-person pose in `frame`, `None` when nobody was detected
    fn infer(&mut self, frame: &Frame) -> Result<Option<Pose>, PoseError>;

    fn name(&self) -> &'static str;
}
