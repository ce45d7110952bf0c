//! Coherence heuristic between criterion scores and insight text
//!
//! A random baseline is drawn from [0.70, 0.95) and reduced when the text
//! criticises an aspect the scores rate highly. Pure computation; the RNG is
//! injected so tests can seed it.

use rand::Rng;
use serde::Serialize;

use crate::models::CriterionScores;

pub const BASELINE_MIN: f64 = 0.70;
pub const BASELINE_MAX: f64 = 0.95;

pub const NOTE_PROBLEMS_VS_HIGH_SCORES: &str = "Insight identifies problems but scores are very high";
pub const NOTE_AUDIO_VS_RETENTION: &str = "Audio critique conflicts with high retention score";
pub const NOTE_CTA_MISMATCH: &str = "CTA criticism doesn't align with CTA score";
pub const NOTE_ALIGNED: &str = "Scores and insight demonstrate reasonable alignment";

/// Score in [0, 1] rounded to two decimals, plus explanatory notes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoherenceResult {
    pub score: f64,
    pub notes: Vec<String>,
}

struct Penalty {
    keywords: &'static [&'static str],
    applies: fn(&CriterionScores) -> bool,
    amount: f64,
    floor: f64,
    note: &'static str,
}

const PENALTIES: &[Penalty] = &[
    Penalty {
        keywords: &["weak", "missing", "lacks"],
        applies: |s| s.hook > 8 || s.clarity > 8,
        amount: 0.30,
        floor: 0.40,
        note: NOTE_PROBLEMS_VS_HIGH_SCORES,
    },
    Penalty {
        keywords: &["audio"],
        applies: |s| s.retention > 8,
        amount: 0.25,
        floor: 0.40,
        note: NOTE_AUDIO_VS_RETENTION,
    },
    Penalty {
        keywords: &["call-to-action", "cta"],
        applies: |s| s.cta > 7,
        amount: 0.20,
        floor: 0.50,
        note: NOTE_CTA_MISMATCH,
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct CoherenceEvaluator;

impl CoherenceEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        scores: &CriterionScores,
        insight_text: &str,
    ) -> CoherenceResult {
        let baseline = rng.gen_range(BASELINE_MIN..BASELINE_MAX);
        score_from_baseline(baseline, scores, insight_text)
    }
}

/// Apply the keyword penalties to a given baseline
pub fn score_from_baseline(
    baseline: f64,
    scores: &CriterionScores,
    insight_text: &str,
) -> CoherenceResult {
    let text = insight_text.to_lowercase();
    let mut score = baseline;
    let mut notes = Vec::new();

    for penalty in PENALTIES {
        let mentioned = penalty.keywords.iter().any(|k| text.contains(k));
        if mentioned && (penalty.applies)(scores) {
            score = (score - penalty.amount).max(penalty.floor);
            notes.push(penalty.note.to_string());
        }
    }

    if notes.is_empty() {
        notes.push(NOTE_ALIGNED.to_string());
    }

    CoherenceResult {
        score: ((score * 100.0).round() / 100.0).clamp(0.0, 1.0),
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scores(hook: i64, retention: i64, clarity: i64, cta: i64) -> CriterionScores {
        CriterionScores { hook, retention, clarity, cta }
    }

    #[test]
    fn test_aligned_text_keeps_baseline() {
        let result = score_from_baseline(0.8234, &scores(9, 9, 9, 9), "Great pacing, strong open");
        assert_eq!(result.score, 0.82);
        assert_eq!(result.notes, vec![NOTE_ALIGNED.to_string()]);
    }

    #[test]
    fn test_problem_words_with_high_scores_are_penalised() {
        let result = score_from_baseline(0.90, &scores(9, 9, 9, 9), "The hook is WEAK and clarity is missing");
        assert_eq!(result.score, 0.60);
        assert_eq!(result.notes, vec![NOTE_PROBLEMS_VS_HIGH_SCORES.to_string()]);
    }

    #[test]
    fn test_penalty_floor() {
        let result = score_from_baseline(0.70, &scores(9, 5, 5, 5), "hook lacks energy");
        assert_eq!(result.score, 0.40);
    }

    #[test]
    fn test_problem_words_with_modest_scores_are_fine() {
        let result = score_from_baseline(0.75, &scores(8, 5, 8, 5), "the hook is weak");
        assert_eq!(result.score, 0.75);
        assert_eq!(result.notes, vec![NOTE_ALIGNED.to_string()]);
    }

    #[test]
    fn test_penalties_stack_with_notes_in_order() {
        let result = score_from_baseline(
            0.94,
            &scores(9, 9, 5, 9),
            "Weak audio mix and the CTA is buried",
        );
        // 0.94 - 0.30 = 0.64, - 0.25 → floor 0.40, - 0.20 → floor 0.50
        assert_eq!(result.score, 0.50);
        assert_eq!(
            result.notes,
            vec![
                NOTE_PROBLEMS_VS_HIGH_SCORES.to_string(),
                NOTE_AUDIO_VS_RETENTION.to_string(),
                NOTE_CTA_MISMATCH.to_string(),
            ]
        );
    }

    #[test]
    fn test_call_to_action_spelling_triggers_cta_penalty() {
        let result = score_from_baseline(0.90, &scores(5, 5, 5, 8), "no real call-to-action");
        assert_eq!(result.score, 0.70);
        assert_eq!(result.notes, vec![NOTE_CTA_MISMATCH.to_string()]);
    }

    #[test]
    fn test_baseline_stays_in_range() {
        let evaluator = CoherenceEvaluator::new();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let result = evaluator.evaluate(&mut rng, &scores(5, 5, 5, 5), "solid video overall");
            assert!(result.score >= BASELINE_MIN && result.score <= BASELINE_MAX);
        }
    }

    #[test]
    fn test_same_seed_same_score() {
        let evaluator = CoherenceEvaluator::new();
        let a = evaluator.evaluate(&mut StdRng::seed_from_u64(42), &scores(7, 7, 7, 7), "ok");
        let b = evaluator.evaluate(&mut StdRng::seed_from_u64(42), &scores(7, 7, 7, 7), "ok");
        assert_eq!(a, b);
    }

    #[test]
    fn test_incoherent_high_scores_always_below_default_minimum() {
        let evaluator = CoherenceEvaluator::new();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let result = evaluator.evaluate(
                &mut rng,
                &scores(9, 9, 9, 9),
                "the hook is weak and clarity is missing",
            );
            assert!(result.score < 0.70, "score {} should reject", result.score);
        }
    }
}
