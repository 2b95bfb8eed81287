use gonogo_core::Key;
use gonogo_timing::Clock;
use tracing::{debug, info, warn};

use crate::state::TaskRunner;

/// The single process-wide keyboard listener for the lifetime of the task.
///
/// The platform layer feeds every raw keypress through `route`, which hands
/// the key to the state machine only while a step that accepts input is open
/// and drops it otherwise. Events are never queued or deferred to a future
/// step. Installed once after the display surface is ready, removed exactly
/// once (idempotently) when the run finishes.
#[derive(Debug)]
pub struct InputRouter {
    installed: bool,
}

impl InputRouter {
    /// Installs the listener. Call only once the display surface exists.
    pub fn install() -> Self {
        info!("input router installed");
        InputRouter { installed: true }
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Attributes one physical keypress to the currently open step, or drops
    /// it. A key can never reach more than one step: the machine refuses
    /// writes to closed contexts and the router never buffers.
    pub fn route<C: Clock>(&self, key: Key, runner: &mut TaskRunner<C>) {
        if !self.installed {
            warn!(%key, "keypress after router removal, dropped");
            return;
        }
        if !runner.accepts_input() {
            debug!(%key, "keypress outside any input-accepting step, dropped");
            return;
        }
        runner.handle_key(key);
    }

    /// Tears the listener down. Safe to call more than once; only the first
    /// call does anything.
    pub fn remove(&mut self) {
        if self.installed {
            self.installed = false;
            info!("input router removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskConfig;
    use gonogo_core::Screen;
    use gonogo_timing::ManualClock;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn runner() -> (TaskRunner<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut config = TaskConfig::gonogo_mri();
        config.instructions.truncate(1);
        config.pattern = vec!["go".into()];
        config.repetitions = 1;
        (
            TaskRunner::new(&config, &mut rng, clock.clone()).unwrap(),
            clock,
        )
    }

    #[test]
    fn routes_keys_only_while_a_step_accepts_input() {
        let (mut runner, clock) = runner();
        let router = InputRouter::install();

        // Not started yet: nothing to route to.
        router.route(Key(' '), &mut runner);
        runner.start();
        assert_eq!(runner.records().len(), 0);

        router.route(Key(' '), &mut runner);
        assert_eq!(runner.records().len(), 1);

        router.route(Key('5'), &mut runner);
        clock.advance_ms(1);
        assert_eq!(runner.screen(), Screen::Fixation);

        // Fixation accepts no input at all.
        router.route(Key('1'), &mut runner);
        assert_eq!(runner.records().last().unwrap().task, "mri_start");
    }

    #[test]
    fn removal_is_idempotent_and_final() {
        let (mut runner, _clock) = runner();
        let mut router = InputRouter::install();
        runner.start();

        router.remove();
        router.remove();
        assert!(!router.is_installed());

        router.route(Key(' '), &mut runner);
        assert_eq!(runner.records().len(), 0);
    }
}
