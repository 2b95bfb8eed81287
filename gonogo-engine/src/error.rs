use thiserror::Error;

/// Problems found while validating a task configuration. All of these are
/// fatal: the state machine is never constructed from a bad config.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("stimulus catalog is empty")]
    EmptyCatalog,
    #[error("condition pattern is empty")]
    EmptyPattern,
    #[error("pattern label `{0}` has no catalog entry")]
    UnknownCondition(String),
    #[error("repetitions must be at least 1")]
    ZeroRepetitions,
    #[error("fixation duration list is empty")]
    NoFixationDurations,
    #[error("stimulus duration list is empty")]
    NoStimulusDurations,
    #[error("trigger step needs a key or a fixed duration")]
    UnendableTrigger,
}

/// Errors on the export path at the end of a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("run has not reached the finished state")]
    NotFinished,
    #[error("trial log was already finalized")]
    AlreadyFinalized,
    #[error("failed to serialize trial log: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("host rejected the exported field: {0}")]
    Host(#[from] std::io::Error),
}
