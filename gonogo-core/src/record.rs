use serde::{Deserialize, Serialize};

use crate::key::Key;
use crate::step::CorrectRule;

/// Which per-step schema a record carries when exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Instruction pages, the trigger wait and the debrief.
    Text,
    Fixation,
    Response,
}

/// One completed timeline step, snapshotted at close. Append-only and
/// immutable thereafter; the ordered list of these is the run's sole durable
/// artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub task: String,
    pub kind: RecordKind,
    pub stimulus: Option<String>,
    /// Condition label of the presented stimulus ("go" / "no-go").
    pub stimulus_type: Option<String>,
    pub response: Option<Key>,
    /// Reaction time in milliseconds relative to step onset.
    pub rt_ms: Option<f64>,
    pub correct: Option<bool>,
    pub correct_rule: Option<CorrectRule>,
    pub fixation_duration_ms: Option<u64>,
    pub stimulus_duration_ms: Option<u64>,
    pub sequence_index: Option<usize>,
}

impl TrialRecord {
    pub fn text(task: impl Into<String>) -> Self {
        TrialRecord {
            task: task.into(),
            kind: RecordKind::Text,
            stimulus: None,
            stimulus_type: None,
            response: None,
            rt_ms: None,
            correct: None,
            correct_rule: None,
            fixation_duration_ms: None,
            stimulus_duration_ms: None,
            sequence_index: None,
        }
    }
}

/// Aggregate statistics over the response steps of one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_response_steps: usize,
    pub correct_count: usize,
    /// Rounded percentage; 0 when no response steps were recorded.
    pub accuracy_pct: u32,
    /// Mean over steps with a recorded reaction time, rounded to whole
    /// milliseconds; 0 when none exists.
    pub mean_rt_ms: u32,
    pub go_count: usize,
    pub go_correct: usize,
    pub go_accuracy_pct: u32,
    pub no_go_count: usize,
    pub no_go_correct: usize,
    pub no_go_accuracy_pct: u32,
}

/// The realized timing sequences of a run, attached once to the export so the
/// scanner alignment can be audited after the fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    pub task: String,
    pub fixation_sequence_ms: Vec<u64>,
    pub stimulus_sequence_ms: Vec<u64>,
    pub total_trials: usize,
    pub randomized: bool,
}
