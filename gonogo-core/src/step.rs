use serde::{Deserialize, Serialize};

use crate::key::{Key, KeySet};

/// How a response (or its absence) is scored when a step closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectRule {
    /// Go condition: correct iff exactly this key was pressed.
    Key(Key),
    /// No-Go condition: correct iff no key was pressed at all.
    NoResponse,
    /// Correct iff any qualifying key was pressed.
    Any,
    /// The step is not scored; `correct` stays unset in the record.
    Unscored,
}

impl CorrectRule {
    /// Evaluates the rule against the recorded response. `None` means the
    /// step is unscored.
    pub fn evaluate(&self, response: Option<Key>) -> Option<bool> {
        match self {
            CorrectRule::Key(k) => Some(response == Some(*k)),
            CorrectRule::NoResponse => Some(response.is_none()),
            CorrectRule::Any => Some(response.is_some()),
            CorrectRule::Unscored => None,
        }
    }
}

/// What a step puts on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepContent {
    /// An instruction-like text page.
    Text(String),
    /// The inter-trial fixation cross.
    Fixation,
    /// A stimulus presentation. `condition` carries the protocol label
    /// ("go", "no-go", ...) exported as `stimulus_type`.
    Stimulus { id: String, condition: String },
    /// The closing page; its text is composed from the run summary.
    Debrief,
}

/// Immutable description of one presentable timeline step.
///
/// Built once at boot by the sequence generator and never mutated afterwards;
/// the state machine only reads from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    /// Task label exported with the step's record ("welcome", "fixation",
    /// "response", ...).
    pub task: String,
    pub content: StepContent,
    /// Fixed display duration. `None` means the step runs until a qualifying
    /// keypress ends it.
    pub duration_ms: Option<u64>,
    pub allowed: KeySet,
    pub correct: CorrectRule,
    /// Whether a qualifying keypress closes the step immediately. Kept
    /// `false` for fixation/stimulus steps in the fixed-timing MRI protocol
    /// so every trial occupies its full scheduled window.
    pub response_ends_step: bool,
    /// Position in the trial sequence. Shared by a fixation/stimulus pair;
    /// unset for instruction-like steps.
    pub sequence_index: Option<usize>,
}

impl StepSpec {
    /// A keypress-advanced text page.
    pub fn page(task: impl Into<String>, text: impl Into<String>) -> Self {
        StepSpec {
            task: task.into(),
            content: StepContent::Text(text.into()),
            duration_ms: None,
            allowed: KeySet::Any,
            correct: CorrectRule::Unscored,
            response_ends_step: true,
            sequence_index: None,
        }
    }

    /// True for steps whose record carries the response schema.
    pub fn is_response_step(&self) -> bool {
        matches!(self.content, StepContent::Stimulus { .. })
    }

    pub fn accepts_input(&self) -> bool {
        self.allowed != KeySet::None
    }
}
