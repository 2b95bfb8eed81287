pub mod key;
pub mod record;
pub mod screen;
pub mod step;

pub use key::{Key, KeySet};
pub use record::{RecordKind, RunSummary, TimingConfig, TrialRecord};
pub use screen::Screen;
pub use step::{CorrectRule, StepContent, StepSpec};
