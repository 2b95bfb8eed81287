use std::collections::VecDeque;
use std::time::Duration;

/// Rolling window of frame render times, used to judge whether the display
/// loop is healthy enough for millisecond-level stimulus timing.
#[derive(Debug, Clone)]
pub struct FrameMonitor {
    samples: VecDeque<Duration>,
    max_samples: usize,
}

#[derive(Debug, Clone)]
pub struct FrameReport {
    pub mean_ns: f64,
    pub jitter_ns: f64,
    pub min_ns: f64,
    pub max_ns: f64,
    pub effective_fps: f64,
}

impl FrameMonitor {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    pub fn record(&mut self, frame_time: Duration) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(frame_time);
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn report(&self) -> FrameReport {
        let times: Vec<f64> = self.samples.iter().map(|d| d.as_nanos() as f64).collect();
        if times.is_empty() {
            return FrameReport {
                mean_ns: 0.0,
                jitter_ns: 0.0,
                min_ns: 0.0,
                max_ns: 0.0,
                effective_fps: 0.0,
            };
        }
        let mean = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = times.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        FrameReport {
            mean_ns: mean,
            jitter_ns: var.sqrt(),
            min_ns: min,
            max_ns: max,
            effective_fps: if mean > 0.0 { 1e9 / mean } else { 0.0 },
        }
    }
}

impl Default for FrameMonitor {
    fn default() -> Self {
        Self::new(1000)
    }
}
