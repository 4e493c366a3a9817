//! Folds A/B answers into a four-axis reader profile.

use serde::{Deserialize, Serialize};

use crate::questionnaire::{questions, Axis, Choice, Question};

/// Every axis starts at the neutral prior.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Step per answer: 100 / (2 × questions-per-axis) with 8 questions per axis.
pub const ANSWER_STEP: f64 = 6.25;

/// Four-axis profile, each value within [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisScores {
    pub emotion_logic: f64,
    pub tempo_fast_slow: f64,
    pub abstract_concrete: f64,
    pub action_reflection: f64,
}

impl Default for AxisScores {
    fn default() -> Self {
        Self {
            emotion_logic: NEUTRAL_SCORE,
            tempo_fast_slow: NEUTRAL_SCORE,
            abstract_concrete: NEUTRAL_SCORE,
            action_reflection: NEUTRAL_SCORE,
        }
    }
}

impl AxisScores {
    pub fn new(
        emotion_logic: f64,
        tempo_fast_slow: f64,
        abstract_concrete: f64,
        action_reflection: f64,
    ) -> Self {
        Self {
            emotion_logic,
            tempo_fast_slow,
            abstract_concrete,
            action_reflection,
        }
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::EmotionLogic => self.emotion_logic,
            Axis::TempoFastSlow => self.tempo_fast_slow,
            Axis::AbstractConcrete => self.abstract_concrete,
            Axis::ActionReflection => self.action_reflection,
        }
    }

    fn get_mut(&mut self, axis: Axis) -> &mut f64 {
        match axis {
            Axis::EmotionLogic => &mut self.emotion_logic,
            Axis::TempoFastSlow => &mut self.tempo_fast_slow,
            Axis::AbstractConcrete => &mut self.abstract_concrete,
            Axis::ActionReflection => &mut self.action_reflection,
        }
    }

    fn clamp(mut self) -> Self {
        for axis in Axis::ALL {
            let v = self.get_mut(axis);
            *v = v.clamp(0.0, 100.0);
        }
        self
    }
}

/// Folds answers against the built-in question bank.
pub fn accumulate(answers: &[Choice]) -> AxisScores {
    accumulate_with(questions(), answers)
}

/// Folds answers against an arbitrary bank. Answers beyond the bank are ignored;
/// a short answer list leaves the remaining questions unanswered.
pub fn accumulate_with(bank: &[Question], answers: &[Choice]) -> AxisScores {
    let mut scores = AxisScores::default();
    for (question, choice) in bank.iter().zip(answers) {
        let option = question.option(*choice);
        *scores.get_mut(option.axis) += f64::from(option.weight) * ANSWER_STEP;
    }
    scores.clamp()
}
