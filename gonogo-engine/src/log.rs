use gonogo_core::{CorrectRule, RecordKind, RunSummary, TimingConfig, TrialRecord};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::error::RunError;

/// Append-only trial log and end-of-run aggregator.
///
/// Records arrive in presentation order and are never mutated. `finalize`
/// serializes the host payload exactly once; afterwards the log is spent.
#[derive(Debug, Default)]
pub struct TrialLog {
    records: Vec<TrialRecord>,
    finalized: bool,
}

impl TrialLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: TrialRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    /// Aggregate statistics over the response steps recorded so far. The
    /// denominators are guarded: no response steps reports 0% accuracy, not
    /// a division error.
    pub fn summary(&self) -> RunSummary {
        let response: Vec<&TrialRecord> = self
            .records
            .iter()
            .filter(|r| r.kind == RecordKind::Response)
            .collect();

        let total = response.len();
        let correct = response.iter().filter(|r| r.correct == Some(true)).count();

        let go: Vec<&&TrialRecord> = response
            .iter()
            .filter(|r| matches!(r.correct_rule, Some(CorrectRule::Key(_))))
            .collect();
        let no_go: Vec<&&TrialRecord> = response
            .iter()
            .filter(|r| matches!(r.correct_rule, Some(CorrectRule::NoResponse)))
            .collect();
        let go_correct = go.iter().filter(|r| r.correct == Some(true)).count();
        let no_go_correct = no_go.iter().filter(|r| r.correct == Some(true)).count();

        let rts: Vec<f64> = response.iter().filter_map(|r| r.rt_ms).collect();
        let mean_rt_ms = if rts.is_empty() {
            0
        } else {
            (rts.iter().sum::<f64>() / rts.len() as f64).round() as u32
        };

        RunSummary {
            total_response_steps: total,
            correct_count: correct,
            accuracy_pct: percentage(correct, total),
            mean_rt_ms,
            go_count: go.len(),
            go_correct,
            go_accuracy_pct: percentage(go_correct, go.len()),
            no_go_count: no_go.len(),
            no_go_correct,
            no_go_accuracy_pct: percentage(no_go_correct, no_go.len()),
        }
    }

    /// Terminal, one-time export: every record plus one trailing summary
    /// object carrying the realized timing configuration, as a single
    /// top-level JSON array.
    pub fn finalize(&mut self, timing: &TimingConfig) -> Result<String, RunError> {
        if self.finalized {
            return Err(RunError::AlreadyFinalized);
        }
        self.finalized = true;

        let summary = self.summary();
        info!(
            total = summary.total_response_steps,
            correct = summary.correct_count,
            accuracy_pct = summary.accuracy_pct,
            mean_rt_ms = summary.mean_rt_ms,
            "trial log finalized"
        );

        let mut rows: Vec<Value> = self.records.iter().map(record_to_json).collect();
        rows.push(summary_to_json(&summary, timing)?);
        Ok(serde_json::to_string(&Value::Array(rows))?)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

fn percentage(numerator: usize, denominator: usize) -> u32 {
    if denominator == 0 {
        return 0;
    }
    (numerator as f64 / denominator as f64 * 100.0).round() as u32
}

fn key_value(key: Option<gonogo_core::Key>) -> Value {
    match key {
        Some(k) => Value::String(k.to_string()),
        None => Value::Null,
    }
}

/// Serializes one record with the schema of its step kind; fields that do
/// not apply to the kind are omitted rather than null-padded.
fn record_to_json(record: &TrialRecord) -> Value {
    let mut row = Map::new();
    row.insert("task".into(), Value::String(record.task.clone()));

    match record.kind {
        RecordKind::Fixation => {
            row.insert("fixation_duration".into(), json!(record.fixation_duration_ms));
            row.insert("trial_sequence_index".into(), json!(record.sequence_index));
        }
        RecordKind::Response => {
            row.insert("stimulus".into(), json!(record.stimulus));
            row.insert("response".into(), key_value(record.response));
            row.insert("rt".into(), json!(record.rt_ms));
            match record.correct_rule {
                Some(CorrectRule::Key(k)) => {
                    row.insert("correct".into(), json!(record.correct));
                    row.insert("correct_response".into(), Value::String(k.to_string()));
                }
                Some(CorrectRule::NoResponse) => {
                    row.insert("correct".into(), json!(record.correct));
                    row.insert("correct_response".into(), Value::Null);
                }
                Some(CorrectRule::Any) => {
                    row.insert("correct".into(), json!(record.correct));
                    row.insert("correct_response".into(), Value::String("any".into()));
                }
                Some(CorrectRule::Unscored) | None => {}
            }
            row.insert("stimulus_duration".into(), json!(record.stimulus_duration_ms));
            row.insert("trial_sequence_index".into(), json!(record.sequence_index));
            row.insert("stimulus_type".into(), json!(record.stimulus_type));
        }
        RecordKind::Text => {
            row.insert("response".into(), key_value(record.response));
            row.insert("rt".into(), json!(record.rt_ms));
        }
    }

    Value::Object(row)
}

fn summary_to_json(summary: &RunSummary, timing: &TimingConfig) -> Result<Value, RunError> {
    Ok(json!({
        "task": "summary",
        "total_trials": summary.total_response_steps,
        "correct_trials": summary.correct_count,
        "accuracy": summary.accuracy_pct,
        "mean_rt": summary.mean_rt_ms,
        "go_trials": summary.go_count,
        "go_correct": summary.go_correct,
        "go_accuracy": summary.go_accuracy_pct,
        "no_go_trials": summary.no_go_count,
        "no_go_correct": summary.no_go_correct,
        "no_go_accuracy": summary.no_go_accuracy_pct,
        "timing_config": serde_json::to_value(timing)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gonogo_core::Key;

    fn response_record(correct: bool, rt: Option<f64>, rule: CorrectRule) -> TrialRecord {
        TrialRecord {
            kind: RecordKind::Response,
            stimulus: Some("blue".into()),
            stimulus_type: Some("go".into()),
            response: rt.map(|_| Key('1')),
            rt_ms: rt,
            correct: Some(correct),
            correct_rule: Some(rule),
            stimulus_duration_ms: Some(2000),
            sequence_index: Some(0),
            ..TrialRecord::text("response")
        }
    }

    #[test]
    fn accuracy_is_a_rounded_percentage() {
        let mut log = TrialLog::new();
        for i in 0..10 {
            log.append(response_record(i < 7, Some(300.0), CorrectRule::Key(Key('1'))));
        }
        let summary = log.summary();
        assert_eq!(summary.accuracy_pct, 70);
        assert_eq!(summary.mean_rt_ms, 300);
    }

    #[test]
    fn empty_log_reports_zero_not_nan() {
        let summary = TrialLog::new().summary();
        assert_eq!(summary.accuracy_pct, 0);
        assert_eq!(summary.mean_rt_ms, 0);
        assert_eq!(summary.total_response_steps, 0);
    }

    #[test]
    fn go_and_no_go_are_broken_out_separately() {
        let mut log = TrialLog::new();
        log.append(response_record(true, Some(250.0), CorrectRule::Key(Key('1'))));
        log.append(response_record(false, None, CorrectRule::Key(Key('1'))));
        log.append(response_record(true, None, CorrectRule::NoResponse));
        let summary = log.summary();
        assert_eq!(summary.go_count, 2);
        assert_eq!(summary.go_accuracy_pct, 50);
        assert_eq!(summary.no_go_count, 1);
        assert_eq!(summary.no_go_accuracy_pct, 100);
    }

    #[test]
    fn finalize_is_one_shot() {
        let timing = TimingConfig {
            task: "GNG".into(),
            fixation_sequence_ms: vec![500],
            stimulus_sequence_ms: vec![2000],
            total_trials: 1,
            randomized: false,
        };
        let mut log = TrialLog::new();
        log.append(response_record(true, Some(200.0), CorrectRule::Key(Key('1'))));
        let payload = log.finalize(&timing).unwrap();
        assert!(matches!(
            log.finalize(&timing),
            Err(RunError::AlreadyFinalized)
        ));

        let parsed: Value = serde_json::from_str(&payload).unwrap();
        let rows = parsed.as_array().expect("top-level array");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["correct_response"], json!("1"));
        assert_eq!(rows[1]["task"], json!("summary"));
        assert_eq!(rows[1]["timing_config"]["total_trials"], json!(1));
    }

    #[test]
    fn no_go_records_export_a_null_correct_response() {
        let row = record_to_json(&response_record(true, None, CorrectRule::NoResponse));
        assert_eq!(row["correct_response"], Value::Null);
        assert_eq!(row["response"], Value::Null);
        assert_eq!(row["rt"], Value::Null);
    }

    #[test]
    fn fixation_records_omit_response_fields() {
        let record = TrialRecord {
            kind: RecordKind::Fixation,
            fixation_duration_ms: Some(500),
            sequence_index: Some(3),
            ..TrialRecord::text("fixation")
        };
        let row = record_to_json(&record);
        assert_eq!(row["fixation_duration"], json!(500));
        assert_eq!(row["trial_sequence_index"], json!(3));
        assert!(row.get("response").is_none());
        assert!(row.get("correct").is_none());
    }
}
