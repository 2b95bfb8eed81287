use std::time::Duration;

use gonogo_core::{Key, RecordKind, RunSummary, Screen, StepContent, StepSpec, TimingConfig, TrialRecord};
use gonogo_timing::{Clock, TimerHandle, TimerService};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::TaskConfig;
use crate::error::{ConfigError, RunError};
use crate::log::TrialLog;
use crate::sequence::{build_timeline, generate_sequences};
use crate::trial::ActiveTrial;

/// Coarse lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
    Finished,
}

/// The trial state machine: walks the timeline step by step, owns the single
/// active trial context, and is the only entity that opens or closes steps.
///
/// Control flow is a sequence of non-blocking segments: the driver loop calls
/// `tick` when a timer deadline elapses and `handle_key` (through the input
/// router) when a key arrives. Steps with a fixed duration always run it out;
/// keypress-advanced steps close immediately on a qualifying key.
pub struct TaskRunner<C: Clock> {
    clock: C,
    timers: TimerService,
    timeline: Vec<StepSpec>,
    timing: TimingConfig,
    task: String,
    phase: RunPhase,
    cursor: usize,
    current: Option<ActiveTrial>,
    step_timer: Option<TimerHandle>,
    log: TrialLog,
}

impl<C: Clock> TaskRunner<C> {
    /// Validates the config, realizes the stimulus and duration sequences,
    /// and lays out the timeline. The RNG is consulted only when the config
    /// asks for randomized blocks.
    pub fn new<R: Rng>(config: &TaskConfig, rng: &mut R, clock: C) -> Result<Self, ConfigError> {
        let seqs = generate_sequences(config, rng)?;
        let (timeline, timing) = build_timeline(config, &seqs);
        info!(
            task = %config.task,
            steps = timeline.len(),
            trials = timing.total_trials,
            randomized = config.randomize,
            "timeline built"
        );
        Ok(TaskRunner {
            clock,
            timers: TimerService::new(),
            timeline,
            timing,
            task: config.task.clone(),
            phase: RunPhase::Idle,
            cursor: 0,
            current: None,
            step_timer: None,
            log: TrialLog::new(),
        })
    }

    /// Starts the run at the first timeline step. A second call is ignored.
    pub fn start(&mut self) {
        if self.phase != RunPhase::Idle {
            warn!("start called on a run that is not idle");
            return;
        }
        self.phase = RunPhase::Running;
        info!(task = %self.task, "run started");
        self.enter_step();
    }

    /// Entry point for the input router. Attributes the key to the currently
    /// open step or drops it: late keys from a finished step and keys during
    /// non-input steps never reach a context.
    pub fn handle_key(&mut self, key: Key) {
        if self.phase != RunPhase::Running {
            debug!(%key, "key ignored, no run in progress");
            return;
        }
        let spec = &self.timeline[self.cursor];
        let Some(context) = self.current.as_mut().filter(|c| !c.is_closed()) else {
            debug!(%key, "key ignored, no open step");
            return;
        };
        if !spec.allowed.accepts(key) {
            debug!(%key, task = %spec.task, "key ignored, not accepted by this step");
            return;
        }
        let now = self.clock.now_ns();
        if !context.record_response(key, now) {
            debug!(%key, task = %spec.task, "key ignored, response already recorded");
            return;
        }
        debug!(%key, task = %spec.task, rt_ms = context.reaction_time_ms(), "response recorded");
        if spec.response_ends_step {
            self.close_step();
        }
    }

    /// Advances the machine past every timer deadline that has elapsed.
    pub fn tick(&mut self) {
        let now = self.clock.now_ns();
        for handle in self.timers.poll(now) {
            if self.step_timer == Some(handle) {
                self.step_timer = None;
                self.close_step();
            }
        }
    }

    /// Earliest pending deadline, for the driver's wait scheduling.
    pub fn next_deadline_ns(&mut self) -> Option<u64> {
        self.timers.next_deadline_ns()
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == RunPhase::Finished
    }

    /// True while the open step accepts keyboard input; the router drops
    /// events otherwise.
    pub fn accepts_input(&self) -> bool {
        self.phase == RunPhase::Running
            && self.current.as_ref().is_some_and(|c| !c.is_closed())
            && self.timeline[self.cursor].accepts_input()
    }

    /// What the display should show right now.
    pub fn screen(&self) -> Screen {
        if self.phase != RunPhase::Running {
            return Screen::Blank;
        }
        match &self.timeline[self.cursor].content {
            StepContent::Text(text) => Screen::Text(text.clone()),
            StepContent::Fixation => Screen::Fixation,
            StepContent::Stimulus { id, .. } => Screen::Stimulus { id: id.clone() },
            StepContent::Debrief => Screen::Debrief(self.log.summary()),
        }
    }

    pub fn summary(&self) -> RunSummary {
        self.log.summary()
    }

    pub fn records(&self) -> &[TrialRecord] {
        self.log.records()
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Host field name the export is written to (the task label).
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Terminal export of the full trial log. Only legal once the run has
    /// finished, and only once.
    pub fn finalize(&mut self) -> Result<String, RunError> {
        if self.phase != RunPhase::Finished {
            return Err(RunError::NotFinished);
        }
        self.log.finalize(&self.timing)
    }

    fn enter_step(&mut self) {
        let spec = &self.timeline[self.cursor];
        let now = self.clock.now_ns();
        self.current = Some(ActiveTrial::open(self.cursor, now, spec.sequence_index));
        self.step_timer = spec
            .duration_ms
            .map(|ms| self.timers.after(now, Duration::from_millis(ms)));
        debug!(
            task = %spec.task,
            index = self.cursor,
            duration_ms = spec.duration_ms,
            "step opened"
        );
    }

    /// Closes the open step: snapshots the context into a record, then moves
    /// the cursor. The context is closed before anything else so a key that
    /// races the transition can never land in either neighbor.
    fn close_step(&mut self) {
        let Some(mut context) = self.current.take() else {
            return;
        };
        context.close();
        if let Some(handle) = self.step_timer.take() {
            self.timers.cancel(handle);
        }

        let spec = &self.timeline[self.cursor];
        self.log.append(make_record(spec, &context));

        if spec.task == "mri_start" && context.response.is_some() {
            info!(rt_ms = context.reaction_time_ms(), "scanner trigger received");
        }

        self.cursor += 1;
        if self.cursor >= self.timeline.len() {
            self.phase = RunPhase::Finished;
            let summary = self.log.summary();
            info!(
                accuracy_pct = summary.accuracy_pct,
                mean_rt_ms = summary.mean_rt_ms,
                "run finished"
            );
        } else {
            self.enter_step();
        }
    }
}

fn make_record(spec: &StepSpec, context: &ActiveTrial) -> TrialRecord {
    let mut record = TrialRecord::text(spec.task.clone());
    record.response = context.response;
    record.rt_ms = context.reaction_time_ms();
    record.sequence_index = context.sequence_index;

    match &spec.content {
        StepContent::Fixation => {
            record.kind = RecordKind::Fixation;
            record.fixation_duration_ms = spec.duration_ms;
            record.response = None;
            record.rt_ms = None;
        }
        StepContent::Stimulus { id, condition } => {
            record.kind = RecordKind::Response;
            record.stimulus = Some(id.clone());
            record.stimulus_type = Some(condition.clone());
            record.stimulus_duration_ms = spec.duration_ms;
            record.correct = spec.correct.evaluate(context.response);
            record.correct_rule = Some(spec.correct);
        }
        StepContent::Text(_) | StepContent::Debrief => {}
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use gonogo_timing::ManualClock;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn runner(config: &TaskConfig) -> (TaskRunner<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let mut rng = StdRng::seed_from_u64(99);
        let runner = TaskRunner::new(config, &mut rng, clock.clone()).unwrap();
        (runner, clock)
    }

    fn two_trial_config() -> TaskConfig {
        let mut config = TaskConfig::gonogo_mri();
        config.instructions.truncate(1);
        config.pattern = vec!["go".into(), "no-go".into()];
        config.repetitions = 1;
        config.fixation_durations_ms = vec![500];
        config.stimulus_durations_ms = vec![1000];
        config
    }

    /// Runs through the instruction page and the trigger wait.
    fn advance_to_trials(runner: &mut TaskRunner<ManualClock>, clock: &ManualClock) {
        runner.start();
        clock.advance_ms(10);
        runner.handle_key(Key(' '));
        clock.advance_ms(10);
        runner.handle_key(Key('5'));
    }

    #[test]
    fn trigger_step_ignores_everything_but_the_trigger_key() {
        let (mut runner, clock) = runner(&two_trial_config());
        runner.start();
        runner.handle_key(Key('x'));
        assert_eq!(runner.records().len(), 1);

        // Now on the trigger step. Non-trigger keys must not advance it.
        clock.advance_ms(50);
        runner.handle_key(Key('1'));
        runner.handle_key(Key(' '));
        assert_eq!(runner.records().len(), 1);
        assert!(matches!(runner.screen(), Screen::Text(t) if t.contains("scanner")));

        runner.handle_key(Key('5'));
        assert_eq!(runner.records().len(), 2);
        assert_eq!(runner.screen(), Screen::Fixation);
    }

    #[test]
    fn fixation_runs_its_full_duration_and_ignores_keys() {
        let (mut runner, clock) = runner(&two_trial_config());
        advance_to_trials(&mut runner, &clock);
        assert_eq!(runner.screen(), Screen::Fixation);

        runner.handle_key(Key('1'));
        clock.advance_ms(499);
        runner.tick();
        assert_eq!(runner.screen(), Screen::Fixation);

        clock.advance_ms(1);
        runner.tick();
        assert_eq!(runner.screen(), Screen::Stimulus { id: "blue".into() });

        let fixation = runner.records().last().unwrap();
        assert_eq!(fixation.kind, RecordKind::Fixation);
        assert_eq!(fixation.fixation_duration_ms, Some(500));
        assert_eq!(fixation.response, None);
    }

    #[test]
    fn go_response_is_scored_with_its_reaction_time() {
        let (mut runner, clock) = runner(&two_trial_config());
        advance_to_trials(&mut runner, &clock);
        clock.advance_ms(500);
        runner.tick();

        clock.advance_ms(200);
        runner.handle_key(Key('1'));
        // The step must not end early in the fixed-timing protocol.
        assert_eq!(runner.screen(), Screen::Stimulus { id: "blue".into() });

        clock.advance_ms(800);
        runner.tick();

        let record = runner.records().last().unwrap();
        assert_eq!(record.kind, RecordKind::Response);
        assert_eq!(record.response, Some(Key('1')));
        assert_eq!(record.correct, Some(true));
        assert_eq!(record.rt_ms, Some(200.0));
        assert!(record.rt_ms.unwrap() < 1000.0);
    }

    #[test]
    fn repeated_keys_keep_only_the_first_response() {
        let (mut runner, clock) = runner(&two_trial_config());
        advance_to_trials(&mut runner, &clock);
        clock.advance_ms(500);
        runner.tick();

        clock.advance_ms(100);
        runner.handle_key(Key('1'));
        clock.advance_ms(100);
        runner.handle_key(Key('1'));
        clock.advance_ms(800);
        runner.tick();

        assert_eq!(runner.records().last().unwrap().rt_ms, Some(100.0));
    }

    #[test]
    fn no_go_without_response_is_correct() {
        let (mut runner, clock) = runner(&two_trial_config());
        advance_to_trials(&mut runner, &clock);
        // Walk through the whole go trial without touching a key, then the
        // no-go fixation and stimulus.
        for ms in [500, 1000, 500, 1000] {
            clock.advance_ms(ms);
            runner.tick();
        }

        let record = runner.records().last().unwrap();
        assert_eq!(record.stimulus_type.as_deref(), Some("no-go"));
        assert_eq!(record.response, None);
        assert_eq!(record.rt_ms, None);
        assert_eq!(record.correct, Some(true));
    }

    #[test]
    fn late_key_lands_in_neither_step() {
        let (mut runner, clock) = runner(&two_trial_config());
        advance_to_trials(&mut runner, &clock);
        clock.advance_ms(500);
        runner.tick();

        // Stimulus expires; the key arrives while the following fixation is
        // open (which accepts nothing), and must not be attributed to either.
        clock.advance_ms(1000);
        runner.tick();
        runner.handle_key(Key('1'));

        let stim_record = runner.records().last().unwrap();
        assert_eq!(stim_record.kind, RecordKind::Response);
        assert_eq!(stim_record.response, None);
        assert_eq!(stim_record.correct, Some(false));

        // Finish the run; the stray key must not surface anywhere later.
        for ms in [500, 1000] {
            clock.advance_ms(ms);
            runner.tick();
        }
        runner.handle_key(Key(' '));
        assert!(runner.is_finished());
        assert!(runner
            .records()
            .iter()
            .filter(|r| r.kind == RecordKind::Response)
            .all(|r| r.response.is_none()));
    }

    #[test]
    fn sequence_indices_are_non_decreasing() {
        let (mut runner, clock) = runner(&two_trial_config());
        advance_to_trials(&mut runner, &clock);
        for ms in [500, 1000, 500, 1000] {
            clock.advance_ms(ms);
            runner.tick();
        }
        runner.handle_key(Key(' '));
        assert!(runner.is_finished());

        let indices: Vec<usize> = runner
            .records()
            .iter()
            .filter_map(|r| r.sequence_index)
            .collect();
        assert!(!indices.is_empty());
        assert!(indices.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn response_ends_stimulus_when_the_protocol_asks_for_it() {
        let mut config = two_trial_config();
        config.response_ends_stimulus = true;
        let (mut runner, clock) = runner(&config);
        advance_to_trials(&mut runner, &clock);
        clock.advance_ms(500);
        runner.tick();

        clock.advance_ms(150);
        runner.handle_key(Key('1'));
        // Early close: the next fixation is already on screen.
        assert_eq!(runner.screen(), Screen::Fixation);
        assert_eq!(runner.records().last().unwrap().rt_ms, Some(150.0));

        // The cancelled stimulus timer must not close the new step early.
        clock.advance_ms(300);
        runner.tick();
        assert_eq!(runner.screen(), Screen::Fixation);
        clock.advance_ms(200);
        runner.tick();
        assert!(matches!(runner.screen(), Screen::Stimulus { .. }));
    }

    #[test]
    fn finalize_requires_a_finished_run() {
        let (mut runner, _clock) = runner(&two_trial_config());
        runner.start();
        assert!(matches!(runner.finalize(), Err(RunError::NotFinished)));
    }

    #[test]
    fn timed_trigger_advances_without_any_key() {
        let mut config = two_trial_config();
        config.trigger.key = None;
        config.trigger.duration_ms = Some(10_000);
        let (mut runner, clock) = runner(&config);
        runner.start();
        runner.handle_key(Key(' '));

        runner.handle_key(Key('5'));
        assert_eq!(runner.records().len(), 1);
        clock.advance_ms(10_000);
        runner.tick();
        assert_eq!(runner.screen(), Screen::Fixation);
    }
}
