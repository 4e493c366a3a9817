//! Reader archetypes and the matching of a four-axis profile onto one of them.
//!
//! Each archetype owns a closed "home range" per axis. A value inside the range earns 100,
//! a value outside earns `max(0, 100 - distance to the nearer bound)`. The highest total wins;
//! ties go to the archetype listed first in [`ARCHETYPES`].

use serde::Serialize;

use crate::questionnaire::Axis;
use crate::scoring::AxisScores;

/// Closed interval within [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HomeRange {
    pub min: f64,
    pub max: f64,
}

impl HomeRange {
    const LOW: HomeRange = HomeRange { min: 0.0, max: 40.0 };
    const HIGH: HomeRange = HomeRange { min: 60.0, max: 100.0 };

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// 100 inside the range, decaying linearly with distance outside it.
    pub fn affinity(&self, value: f64) -> f64 {
        if self.contains(value) {
            100.0
        } else {
            let distance = (value - self.min).abs().min((value - self.max).abs());
            (100.0 - distance).max(0.0)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Archetype {
    pub id: &'static str,
    pub name: &'static str,
    pub tagline: &'static str,
    pub description: &'static str,
    /// Four-letter code used for prescription requests.
    pub code: &'static str,
    pub emotion_logic: HomeRange,
    pub tempo_fast_slow: HomeRange,
    pub abstract_concrete: HomeRange,
    pub action_reflection: HomeRange,
}

impl Archetype {
    pub fn range(&self, axis: Axis) -> HomeRange {
        match axis {
            Axis::EmotionLogic => self.emotion_logic,
            Axis::TempoFastSlow => self.tempo_fast_slow,
            Axis::AbstractConcrete => self.abstract_concrete,
            Axis::ActionReflection => self.action_reflection,
        }
    }

    /// Sum of per-axis affinities, 0–400.
    pub fn match_score(&self, scores: &AxisScores) -> f64 {
        Axis::ALL
            .iter()
            .map(|&axis| self.range(axis).affinity(scores.get(axis)))
            .sum()
    }
}

const L: HomeRange = HomeRange::LOW;
const H: HomeRange = HomeRange::HIGH;

/// Catalog in matching order. Order matters for tie-breaks.
pub static ARCHETYPES: [Archetype; 8] = [
    Archetype {
        id: "dreamyStoryteller",
        name: "Dreamy Storyteller",
        tagline: "Drifting on waves of feeling in a sea of stories",
        description: "Moved by metaphor and world-building; savors slowly and treasures inner change.",
        code: "INFP",
        emotion_logic: H,
        tempo_fast_slow: L,
        abstract_concrete: H,
        action_reflection: L,
    },
    Archetype {
        id: "actionDreamer",
        name: "Action Dreamer",
        tagline: "An idealist repainting the world with passion",
        description: "Fired up by vision, likes the conclusion first and wants a push forward.",
        code: "ENFP",
        emotion_logic: H,
        tempo_fast_slow: H,
        abstract_concrete: H,
        action_reflection: H,
    },
    Archetype {
        id: "realist",
        name: "Everyday Realist",
        tagline: "Quietly designing a life from data and facts",
        description: "Values examples and data, likes to think things through, wants to settle the mind.",
        code: "ISTJ",
        emotion_logic: L,
        tempo_fast_slow: L,
        abstract_concrete: L,
        action_reflection: L,
    },
    Archetype {
        id: "problemSolver",
        name: "Rapid Problem Solver",
        tagline: "Decides on the spot and clears tasks in seconds",
        description: "Wants conclusions paired with examples; tempo first, action right away.",
        code: "ESTJ",
        emotion_logic: L,
        tempo_fast_slow: H,
        abstract_concrete: L,
        action_reflection: H,
    },
    Archetype {
        id: "wordMagician",
        name: "Word Magician",
        tagline: "A delicate soul who surrenders to every single word",
        description: "Moved by concrete scenery in prose, reads slowly, introspective.",
        code: "ISFP",
        emotion_logic: H,
        tempo_fast_slow: L,
        abstract_concrete: L,
        action_reflection: L,
    },
    Archetype {
        id: "passionCoach",
        name: "Passion Coach",
        tagline: "For you, heart ablaze and ready to move now",
        description: "Touched by true stories, conclusion first, wants a push forward.",
        code: "ESFP",
        emotion_logic: H,
        tempo_fast_slow: H,
        abstract_concrete: L,
        action_reflection: H,
    },
    Archetype {
        id: "philosopher",
        name: "Philosopher's Walk",
        tagline: "A seeker quietly wandering the labyrinth of thought",
        description: "Drawn to concepts and theory, thinks deeply, introspective.",
        code: "INTP",
        emotion_logic: L,
        tempo_fast_slow: L,
        abstract_concrete: H,
        action_reflection: L,
    },
    Archetype {
        id: "visionaryLeader",
        name: "Visionary Leader",
        tagline: "Draws the future and moves the world through systems",
        description: "Loves frameworks and the big picture; conclusion first, action oriented.",
        code: "ENTJ",
        emotion_logic: L,
        tempo_fast_slow: H,
        abstract_concrete: H,
        action_reflection: H,
    },
];

pub fn archetypes() -> &'static [Archetype] {
    &ARCHETYPES
}

pub fn find_archetype(id: &str) -> Option<&'static Archetype> {
    ARCHETYPES.iter().find(|a| a.id == id)
}

/// Best-fitting archetype from the built-in catalog.
pub fn match_archetype(scores: &AxisScores) -> &'static Archetype {
    // The catalog is a non-empty static array.
    match_in(&ARCHETYPES, scores).unwrap_or(&ARCHETYPES[0])
}

/// Best-fitting archetype in `catalog`; `None` only for an empty catalog.
/// Only a strictly higher score displaces the current best.
pub fn match_in<'a>(catalog: &'a [Archetype], scores: &AxisScores) -> Option<&'a Archetype> {
    let mut best: Option<(&Archetype, f64)> = None;
    for candidate in catalog {
        let score = candidate.match_score(scores);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }
    best.map(|(a, _)| a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extreme_profile_matches_dreamy_storyteller() {
        let scores = AxisScores::new(100.0, 0.0, 100.0, 0.0);
        let a = match_archetype(&scores);
        assert_eq!(a.id, "dreamyStoryteller");
        assert_eq!(a.code, "INFP");
        assert_eq!(a.match_score(&scores), 400.0);
    }

    #[test]
    fn neutral_profile_ties_resolve_to_first_entry() {
        // 50 is 10 away from every range, so every archetype scores 360.
        let scores = AxisScores::default();
        for a in archetypes() {
            assert_eq!(a.match_score(&scores), 360.0);
        }
        assert_eq!(match_archetype(&scores).id, ARCHETYPES[0].id);
    }

    #[test]
    fn tie_break_follows_catalog_order() {
        let scores = AxisScores::new(50.0, 0.0, 100.0, 0.0);
        // dreamyStoryteller and philosopher both score 390.
        let mut reversed: Vec<Archetype> = ARCHETYPES.to_vec();
        reversed.reverse();
        assert_eq!(match_archetype(&scores).id, "dreamyStoryteller");
        assert_eq!(match_in(&reversed, &scores).map(|a| a.id), Some("philosopher"));
    }

    #[test]
    fn affinity_is_total_and_never_negative() {
        let r = HomeRange::LOW;
        assert_eq!(r.affinity(40.0), 100.0);
        assert_eq!(r.affinity(41.5), 98.5);
        assert_eq!(r.affinity(500.0), 0.0);
        assert_eq!(r.affinity(-20.0), 80.0);
    }

    #[test]
    fn matching_is_deterministic() {
        let scores = AxisScores::new(12.5, 81.25, 37.5, 68.75);
        let first = match_archetype(&scores).id;
        for _ in 0..10 {
            assert_eq!(match_archetype(&scores).id, first);
        }
        assert_eq!(first, "problemSolver");
    }

    #[test]
    fn empty_catalog_has_no_match() {
        assert!(match_in(&[], &AxisScores::default()).is_none());
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(find_archetype("visionaryLeader").map(|a| a.code), Some("ENTJ"));
        assert!(find_archetype("unknown").is_none());
    }
}
