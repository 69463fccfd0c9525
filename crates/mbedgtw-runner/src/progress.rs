//! Progress reporting for board-manager steps
//!
//! Board-manager commands run with captured output, so the CLI shows a
//! spinner while they are busy. Vendor tools write to the terminal directly
//! and are not reported here.

use std::fmt;
use std::path::PathBuf;

/// A board-manager step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    ListTargets,
    Flash { target_id: String, image: PathBuf },
    Reset { target_id: String },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListTargets => write!(f, "Listing targets"),
            Self::Flash { target_id, image } => {
                write!(f, "Flashing {} to {}", image.display(), target_id)
            }
            Self::Reset { target_id } => write!(f, "Resetting {}", target_id),
        }
    }
}

/// Receives step notifications
pub trait Progress {
    fn begin(&mut self, step: &Step);
    fn end(&mut self, step: &Step, ok: bool);
}

/// Progress sink that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn begin(&mut self, _step: &Step) {}
    fn end(&mut self, _step: &Step, _ok: bool) {}
}

/// Run `f` between `begin` and `end` notifications
pub fn track<T, E>(
    progress: &mut dyn Progress,
    step: Step,
    f: impl FnOnce() -> Result<T, E>,
) -> Result<T, E> {
    progress.begin(&step);
    let result = f();
    progress.end(&step, result.is_ok());
    result
}
