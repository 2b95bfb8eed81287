use gonogo_core::{CorrectRule, Key, KeySet};
use serde::{Deserialize, Serialize};

/// One entry of the base stimulus catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusDef {
    /// Opaque stimulus identifier, also used by the renderer to pick what to
    /// draw.
    pub id: String,
    /// Condition label the pattern refers to ("go", "no-go", ...).
    pub condition: String,
    pub correct: CorrectRule,
}

/// A keypress-advanced text page shown before the trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionPage {
    pub task: String,
    pub text: String,
}

/// How the run synchronizes with the scanner. Either a designated trigger
/// key gates the start (standard MRI protocol) or a fixed wait stands in for
/// it (behavioral/standalone administration).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub text: String,
    pub key: Option<Key>,
    pub duration_ms: Option<u64>,
}

/// Complete description of one task variant. Variants differ only in data,
/// never in code paths: the Go/No-Go and emotion-rating administrations are
/// both instances of this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Task label; also the host field name the export is written to.
    pub task: String,
    pub instructions: Vec<InstructionPage>,
    pub trigger: TriggerConfig,
    pub catalog: Vec<StimulusDef>,
    /// Literal condition pattern for one block, resolved against the catalog.
    pub pattern: Vec<String>,
    pub repetitions: usize,
    pub fixation_durations_ms: Vec<u64>,
    pub stimulus_durations_ms: Vec<u64>,
    /// Keys accepted while a stimulus is on screen.
    pub response_keys: KeySet,
    /// Reshuffle each block. Must stay `false` when cross-participant
    /// reproducibility is required (fixed MRI protocol).
    pub randomize: bool,
    /// Whether a response closes the stimulus step early. `false` keeps every
    /// trial at its full scheduled duration for scanner-volume alignment.
    pub response_ends_stimulus: bool,
}

impl TaskConfig {
    /// The Go/No-Go MRI protocol: 16-trial blocks (10 go / 6 no-go) repeated
    /// five times, fixed duration cycles, trigger key '5', go key '1'.
    pub fn gonogo_mri() -> Self {
        let pattern = [
            "go", "no-go", "go", "go", "no-go", "go", "no-go", "go", //
            "go", "go", "no-go", "go", "go", "go", "no-go", "no-go",
        ];
        TaskConfig {
            task: "GNG".into(),
            instructions: vec![
                InstructionPage {
                    task: "welcome".into(),
                    text: "Welcome to the Go/No-Go Task.\n\
                           In this experiment, different circles will appear in the center of the screen.\n\
                           Press any key to continue."
                        .into(),
                },
                InstructionPage {
                    task: "instructions".into(),
                    text: "If the circle is blue, you should press the '1' key as quickly as possible.\n\
                           If the circle is orange, you should not press any key.\n\
                           Press any key to begin."
                        .into(),
                },
                InstructionPage {
                    task: "questions".into(),
                    text: "If you have questions or concerns, please signal to the examiner.\n\
                           If not, press any key to continue."
                        .into(),
                },
            ],
            trigger: TriggerConfig {
                text: "Please wait while the scanner starts up. This will take 10 seconds.\n\
                       A cross (+) will appear when the task starts."
                    .into(),
                key: Some(Key('5')),
                duration_ms: None,
            },
            catalog: vec![
                StimulusDef {
                    id: "blue".into(),
                    condition: "go".into(),
                    correct: CorrectRule::Key(Key('1')),
                },
                StimulusDef {
                    id: "orange".into(),
                    condition: "no-go".into(),
                    correct: CorrectRule::NoResponse,
                },
            ],
            pattern: pattern.iter().map(|s| s.to_string()).collect(),
            repetitions: 5,
            fixation_durations_ms: vec![500, 750, 1000],
            stimulus_durations_ms: vec![2000, 2500, 3000, 3500],
            response_keys: KeySet::one(Key('1')),
            randomize: false,
            response_ends_stimulus: false,
        }
    }

    /// The emotion-rating variant: every image is rated 1-4 on the response
    /// pad, nothing is scored, and the scanner wait is a fixed ten seconds.
    pub fn emotion_rating() -> Self {
        TaskConfig {
            task: "EFAD".into(),
            instructions: vec![
                InstructionPage {
                    task: "welcome".into(),
                    text: "Welcome to the Emotion Rating Task!\nPress any button for instructions."
                        .into(),
                },
                InstructionPage {
                    task: "instructions".into(),
                    text: "In this task, an image will appear on the screen.\n\
                           Using the response pad, please rate HOW a picture makes you feel, as quickly as you can.\n\
                           Very negative: button 1. Negative: button 2. Positive: button 3. Very positive: button 4."
                        .into(),
                },
                InstructionPage {
                    task: "questions".into(),
                    text: "If you have questions or concerns, please signal to the examiner.\n\
                           If not, press any key to continue."
                        .into(),
                },
            ],
            trigger: TriggerConfig {
                text: "Please wait while the scanner starts up. This will take 10 seconds.\n\
                       A cross (+) will appear when the task starts."
                    .into(),
                key: None,
                duration_ms: Some(10_000),
            },
            catalog: vec![
                StimulusDef {
                    id: "negative".into(),
                    condition: "negative".into(),
                    correct: CorrectRule::Unscored,
                },
                StimulusDef {
                    id: "neutral".into(),
                    condition: "neutral".into(),
                    correct: CorrectRule::Unscored,
                },
                StimulusDef {
                    id: "positive".into(),
                    condition: "positive".into(),
                    correct: CorrectRule::Unscored,
                },
            ],
            pattern: ["negative", "neutral", "positive"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            repetitions: 11,
            fixation_durations_ms: vec![1000],
            stimulus_durations_ms: vec![2000],
            response_keys: KeySet::Set(vec![Key('1'), Key('2'), Key('3'), Key('4')]),
            randomize: false,
            response_ends_stimulus: false,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self::gonogo_mri()
    }
}
