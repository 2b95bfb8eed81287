pub mod config;
pub mod error;
pub mod host;
pub mod input;
pub mod log;
pub mod sequence;
pub mod state;
pub mod trial;

pub use config::{InstructionPage, StimulusDef, TaskConfig, TriggerConfig};
pub use error::{ConfigError, RunError};
pub use host::{deliver_results, Host};
pub use input::InputRouter;
pub use log::TrialLog;
pub use sequence::{build_timeline, generate_sequences, GeneratedSequences};
pub use state::{RunPhase, TaskRunner};
