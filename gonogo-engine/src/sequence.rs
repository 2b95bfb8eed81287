use gonogo_core::{CorrectRule, KeySet, StepContent, StepSpec, TimingConfig};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::{StimulusDef, TaskConfig};
use crate::error::ConfigError;

/// The realized per-run sequences: one stimulus instance and one
/// fixation/stimulus duration per trial, all of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSequences {
    pub stimuli: Vec<StimulusDef>,
    pub fixation_ms: Vec<u64>,
    pub stimulus_ms: Vec<u64>,
}

impl GeneratedSequences {
    pub fn trial_count(&self) -> usize {
        self.stimuli.len()
    }
}

/// Expands the configured pattern into the full trial sequence.
///
/// With `randomize=false` the literal pattern is repeated verbatim, which is
/// what makes two administrations of the fixed MRI protocol byte-identical.
/// With `randomize=true` each block is a fresh shuffle of the pattern, so the
/// condition ratio is preserved per block (sampling without replacement).
/// Duration sequences always cycle the admissible lists in order; they are
/// never randomized per trial, keeping inter-trial jitter reproducible.
pub fn generate_sequences<R: Rng>(
    config: &TaskConfig,
    rng: &mut R,
) -> Result<GeneratedSequences, ConfigError> {
    validate(config)?;

    let block: Vec<&StimulusDef> = config
        .pattern
        .iter()
        .map(|label| {
            config
                .catalog
                .iter()
                .find(|s| s.condition == *label)
                .ok_or_else(|| ConfigError::UnknownCondition(label.clone()))
        })
        .collect::<Result<_, _>>()?;

    let mut stimuli = Vec::with_capacity(block.len() * config.repetitions);
    for _ in 0..config.repetitions {
        let mut instances: Vec<StimulusDef> = block.iter().map(|s| (*s).clone()).collect();
        if config.randomize {
            instances.shuffle(rng);
        }
        stimuli.extend(instances);
    }

    let n = stimuli.len();
    let fixation_ms = cycle(&config.fixation_durations_ms, n);
    let stimulus_ms = cycle(&config.stimulus_durations_ms, n);

    Ok(GeneratedSequences {
        stimuli,
        fixation_ms,
        stimulus_ms,
    })
}

fn cycle(durations: &[u64], n: usize) -> Vec<u64> {
    (0..n).map(|i| durations[i % durations.len()]).collect()
}

fn validate(config: &TaskConfig) -> Result<(), ConfigError> {
    if config.catalog.is_empty() {
        return Err(ConfigError::EmptyCatalog);
    }
    if config.pattern.is_empty() {
        return Err(ConfigError::EmptyPattern);
    }
    if config.repetitions == 0 {
        return Err(ConfigError::ZeroRepetitions);
    }
    if config.fixation_durations_ms.is_empty() {
        return Err(ConfigError::NoFixationDurations);
    }
    if config.stimulus_durations_ms.is_empty() {
        return Err(ConfigError::NoStimulusDurations);
    }
    if config.trigger.key.is_none() && config.trigger.duration_ms.is_none() {
        return Err(ConfigError::UnendableTrigger);
    }
    Ok(())
}

/// Lays the full presentation order out as step specs: instruction pages,
/// the trigger wait, then one fixation/stimulus pair per trial (the pair
/// shares its sequence index), and the debrief.
pub fn build_timeline(
    config: &TaskConfig,
    seqs: &GeneratedSequences,
) -> (Vec<StepSpec>, TimingConfig) {
    let mut steps = Vec::with_capacity(config.instructions.len() + 2 + 2 * seqs.trial_count());

    for page in &config.instructions {
        steps.push(StepSpec::page(page.task.clone(), page.text.clone()));
    }

    steps.push(StepSpec {
        task: "mri_start".into(),
        content: StepContent::Text(config.trigger.text.clone()),
        duration_ms: config.trigger.duration_ms,
        allowed: match config.trigger.key {
            Some(key) => KeySet::one(key),
            None => KeySet::None,
        },
        correct: CorrectRule::Unscored,
        response_ends_step: config.trigger.key.is_some(),
        sequence_index: None,
    });

    for (i, stim) in seqs.stimuli.iter().enumerate() {
        steps.push(StepSpec {
            task: "fixation".into(),
            content: StepContent::Fixation,
            duration_ms: Some(seqs.fixation_ms[i]),
            allowed: KeySet::None,
            correct: CorrectRule::Unscored,
            response_ends_step: false,
            sequence_index: Some(i),
        });
        steps.push(StepSpec {
            task: "response".into(),
            content: StepContent::Stimulus {
                id: stim.id.clone(),
                condition: stim.condition.clone(),
            },
            duration_ms: Some(seqs.stimulus_ms[i]),
            allowed: config.response_keys.clone(),
            correct: stim.correct,
            response_ends_step: config.response_ends_stimulus,
            sequence_index: Some(i),
        });
    }

    steps.push(StepSpec {
        task: "debrief".into(),
        content: StepContent::Debrief,
        duration_ms: None,
        allowed: KeySet::Any,
        correct: CorrectRule::Unscored,
        response_ends_step: true,
        sequence_index: None,
    });

    let timing = TimingConfig {
        task: config.task.clone(),
        fixation_sequence_ms: seqs.fixation_ms.clone(),
        stimulus_sequence_ms: seqs.stimulus_ms.clone(),
        total_trials: seqs.trial_count(),
        randomized: config.randomize,
    };

    (steps, timing)
}
