use crate::record::RunSummary;

/// What the display surface should show for the current machine state. The
/// renderer consumes this; trial logic never depends on how it is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Blank,
    Text(String),
    Fixation,
    Stimulus { id: String },
    Debrief(RunSummary),
    /// Terminal load-failure notice; the machine never started.
    Failure(String),
}
