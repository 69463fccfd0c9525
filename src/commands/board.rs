//! Direct board manager commands (`flash`, `reset`)

use std::path::Path;

use mbedgtw_runner::adapter::BoardManager;
use mbedgtw_runner::progress::track;
use mbedgtw_runner::{AdapterError, CommandRunner, Step};

use super::progress::IndicatifProgress;

/// Look the target up and flash `image_path` to it
pub fn flash(
    runner: &dyn CommandRunner,
    script: &str,
    target_id: &str,
    image_path: &Path,
) -> Result<(), AdapterError> {
    let mut manager = BoardManager::new(runner, script)?;
    let mut progress = IndicatifProgress::new();
    track(&mut progress, Step::ListTargets, || manager.list().map(|_| ()))?;

    let step = Step::Flash {
        target_id: target_id.to_string(),
        image: image_path.to_path_buf(),
    };
    let flashed = track(&mut progress, step, || manager.flash(target_id, image_path))?;
    log::info!("Flashed {} to {}", flashed.display(), target_id);
    Ok(())
}

/// Look the target up and reset it
pub fn reset(runner: &dyn CommandRunner, script: &str, target_id: &str) -> Result<(), AdapterError> {
    let mut manager = BoardManager::new(runner, script)?;
    let mut progress = IndicatifProgress::new();
    track(&mut progress, Step::ListTargets, || manager.list().map(|_| ()))?;

    let step = Step::Reset {
        target_id: target_id.to_string(),
    };
    track(&mut progress, step, || manager.reset(target_id))
}
