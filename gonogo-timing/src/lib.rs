pub mod clock;
pub mod frame;
pub mod sleep;
pub mod timer;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use frame::{FrameMonitor, FrameReport};
pub use sleep::precise_sleep;
pub use timer::{TimerHandle, TimerService};
