use gonogo_timing::Clock;
use tracing::info;

use crate::error::RunError;
use crate::input::InputRouter;
use crate::state::TaskRunner;

/// The surface this task consumes from its hosting container (a survey
/// engine when embedded, a stand-in when run standalone). The task calls
/// `set_field` and `advance` exactly once each, at the very end of a run.
pub trait Host {
    /// Reveals the task's display region.
    fn show_task(&mut self);
    /// Removes the display region at completion.
    fn hide_task(&mut self);
    /// Stores the exported trial log under a named field.
    fn set_field(&mut self, name: &str, value: &str) -> std::io::Result<()>;
    /// Moves the container on to whatever follows the task.
    fn advance(&mut self);
}

/// End-of-run delivery, in the only legal order: finalize the log, hand the
/// field to the host, take the display down, advance, and remove the input
/// listener. Nothing is exported unless finalize succeeded, so the host can
/// never observe a partial log.
pub fn deliver_results<C: Clock, H: Host>(
    runner: &mut TaskRunner<C>,
    host: &mut H,
    router: &mut InputRouter,
) -> Result<(), RunError> {
    let payload = runner.finalize()?;
    let field = runner.task().to_string();
    host.set_field(&field, &payload)?;
    host.hide_task();
    host.advance();
    router.remove();
    info!(field = %field, bytes = payload.len(), "results delivered to host");
    Ok(())
}
