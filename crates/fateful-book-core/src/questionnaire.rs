//! Question bank — 16 forced-choice questions (8 visual, 8 situational).
//! Each option pushes one of the four axes toward one of its poles.

use serde::{Deserialize, Serialize};

/// One of the four personality dimensions scored 0–100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Axis {
    /// High = emotion, low = logic.
    EmotionLogic,
    /// High = fast, low = slow.
    TempoFastSlow,
    /// High = abstract, low = concrete.
    AbstractConcrete,
    /// High = action, low = reflection.
    ActionReflection,
}

impl Axis {
    pub const ALL: [Axis; 4] = [
        Axis::EmotionLogic,
        Axis::TempoFastSlow,
        Axis::AbstractConcrete,
        Axis::ActionReflection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::EmotionLogic => "emotionLogic",
            Axis::TempoFastSlow => "tempoFastSlow",
            Axis::AbstractConcrete => "abstractConcrete",
            Axis::ActionReflection => "actionReflection",
        }
    }
}

/// Which of the two options the user picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Visual,
    Situation,
}

/// A selectable answer: display text plus the axis pole it stands for.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AnswerOption {
    pub text: &'static str,
    pub axis: Axis,
    /// +1 or -1.
    pub weight: i8,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Question {
    pub id: u8,
    pub kind: QuestionKind,
    pub prompt: &'static str,
    pub option_a: AnswerOption,
    pub option_b: AnswerOption,
}

impl Question {
    pub fn option(&self, choice: Choice) -> &AnswerOption {
        match choice {
            Choice::A => &self.option_a,
            Choice::B => &self.option_b,
        }
    }
}

const fn opt(text: &'static str, axis: Axis, weight: i8) -> AnswerOption {
    AnswerOption { text, axis, weight }
}

const fn question(
    id: u8,
    kind: QuestionKind,
    prompt: &'static str,
    option_a: AnswerOption,
    option_b: AnswerOption,
) -> Question {
    Question {
        id,
        kind,
        prompt,
        option_a,
        option_b,
    }
}

use Axis::{AbstractConcrete as AC, ActionReflection as AR, EmotionLogic as EL, TempoFastSlow as TF};
use QuestionKind::{Situation, Visual};

/// The fixed, ordered catalog. Visual questions first, then situations.
pub static QUESTIONS: [Question; 16] = [
    question(1, Visual, "Which picture draws you in?",
        opt("Abstract geometric patterns", AC, 1),
        opt("A realistic landscape painting", AC, -1)),
    question(2, Visual, "Which colors do you prefer?",
        opt("Deep navy and violet (mysterious)", AC, 1),
        opt("Bright orange and yellow (energetic)", AC, -1)),
    question(3, Visual, "Which character do you like?",
        opt("A poet looking up at the moon", EL, 1),
        opt("An engineer assembling a machine", EL, -1)),
    question(4, Visual, "Which atmosphere feels right?",
        opt("Deep inside a quiet forest", AR, -1),
        opt("The heart of a busy city", AR, 1)),
    question(5, Visual, "Which pace is comfortable?",
        opt("A slowly flowing river", TF, -1),
        opt("A rushing waterfall", TF, 1)),
    question(6, Visual, "Which words sound better?",
        opt("Dream, hope, story", AC, 1),
        opt("Goal, plan, results", AC, -1)),
    question(7, Visual, "Where would you rather go?",
        opt("A silent library", AR, -1),
        opt("A lively event hall", AR, 1)),
    question(8, Visual, "Which time of day do you love?",
        opt("The stillness of late night", TF, -1),
        opt("An active morning", TF, 1)),
    question(9, Situation, "When you feel down, which words do you want to hear?",
        opt("\"It's okay, you can do this\"", EL, 1),
        opt("\"Let's sort out what the problem is\"", EL, -1)),
    question(10, Situation, "What pushes you to try something new?",
        opt("\"Failing won't kill you, just try\"", AR, 1),
        opt("\"Is it what you really want? Think it over\"", AR, -1)),
    question(11, Situation, "What matters most when picking a book?",
        opt("A story that touches the heart", EL, 1),
        opt("Useful knowledge and skills", EL, -1)),
    question(12, Situation, "When work or study stalls, what do you do?",
        opt("Think it through and move once convinced", TF, -1),
        opt("Just start and fix things along the way", TF, 1)),
    question(13, Situation, "How do you recommend a book to a friend?",
        opt("\"The world it builds is amazing\" (mood, metaphor)", AC, 1),
        opt("\"That one scene was great\" (specific example)", AC, -1)),
    question(14, Situation, "How do you like to spend a day off?",
        opt("Quietly, on my own", AR, -1),
        opt("Out and about, trying things", AR, 1)),
    question(15, Situation, "Which explanation is easier to follow?",
        opt("A picture of the whole at once", AC, 1),
        opt("Concrete step-by-step instructions", AC, -1)),
    question(16, Situation, "When listening to someone, what do you notice?",
        opt("The speaker's feelings", EL, 1),
        opt("The conclusion and key points", EL, -1)),
];

/// All questions in presentation order.
pub fn questions() -> &'static [Question] {
    &QUESTIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential() {
        for (i, q) in questions().iter().enumerate() {
            assert_eq!(q.id as usize, i + 1);
        }
    }

    #[test]
    fn options_use_unit_weights_on_the_same_axis() {
        for q in questions() {
            assert_eq!(q.option_a.axis, q.option_b.axis, "question {}", q.id);
            assert_eq!(q.option_a.weight.abs(), 1);
            assert_eq!(q.option_a.weight, -q.option_b.weight);
        }
    }

    #[test]
    fn first_eight_are_visual() {
        assert!(questions()[..8].iter().all(|q| q.kind == QuestionKind::Visual));
        assert!(questions()[8..].iter().all(|q| q.kind == QuestionKind::Situation));
    }
}
