use gonogo_core::Key;

/// The single mutable record of the currently running timeline step.
///
/// Exactly one non-closed instance exists at any time; the state machine owns
/// it outright. The input router can only cause `record_response` calls, and
/// only the machine flips `closed` - after that every write is refused.
#[derive(Debug, Clone)]
pub struct ActiveTrial {
    pub step: usize,
    pub started_ns: u64,
    pub response: Option<Key>,
    pub response_ns: Option<u64>,
    pub sequence_index: Option<usize>,
    closed: bool,
}

impl ActiveTrial {
    pub fn open(step: usize, now_ns: u64, sequence_index: Option<usize>) -> Self {
        ActiveTrial {
            step,
            started_ns: now_ns,
            response: None,
            response_ns: None,
            sequence_index,
            closed: false,
        }
    }

    /// Records the first qualifying response. Returns `false` when the write
    /// is refused because the step is closed or a response already exists.
    pub fn record_response(&mut self, key: Key, now_ns: u64) -> bool {
        if self.closed || self.response.is_some() {
            return false;
        }
        self.response = Some(key);
        self.response_ns = Some(now_ns);
        true
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Reaction time relative to step onset, in milliseconds.
    pub fn reaction_time_ms(&self) -> Option<f64> {
        self.response_ns
            .map(|ts| ts.saturating_sub(self.started_ns) as f64 / 1e6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_response_wins() {
        let mut trial = ActiveTrial::open(0, 1_000_000, Some(0));
        assert!(trial.record_response(Key('1'), 2_000_000));
        assert!(!trial.record_response(Key('2'), 3_000_000));
        assert_eq!(trial.response, Some(Key('1')));
        assert_eq!(trial.reaction_time_ms(), Some(1.0));
    }

    #[test]
    fn closed_trial_refuses_writes() {
        let mut trial = ActiveTrial::open(0, 0, None);
        trial.close();
        assert!(!trial.record_response(Key('1'), 5));
        assert_eq!(trial.response, None);
        assert_eq!(trial.reaction_time_ms(), None);
    }
}
