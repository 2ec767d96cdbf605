//! Consensus & Verification (spec.md §4.7): cross-cutting primitives
//! used by handlers. Weighted voting and tie-break shape follow
//! `ensemble/voting.rs`'s `weighted_vote`/`tie_break`, generalized from
//! fixed model-hierarchy tie-breaks to a caller-supplied capability
//! ranking.

pub mod similarity;

use std::collections::HashMap;

use crate::domain::ConsensusDecision;
use crate::error::ConsensusError;

/// One candidate answer entering a vote: the extracted text, the
/// weight its source model carries (elite = 2x, non-elite = 1x per
/// spec.md §4.6), and which group it belongs to (primary vs verifier).
#[derive(Debug, Clone)]
pub struct WeightedAnswer {
    pub text: String,
    pub weight: f32,
}

/// `self_consistency(prompts, n)` (spec.md §4.7): majority vote over n
/// independently sampled answers, all weighted equally. Callers are
/// responsible for producing the n samples (this module issues no LLM
/// calls itself — pure functions only, per spec.md §5).
pub fn self_consistency(answers: &[String]) -> Result<ConsensusDecision, ConsensusError> {
    if answers.is_empty() {
        return Err(ConsensusError::NoCandidates);
    }
    let weighted: Vec<WeightedAnswer> = answers
        .iter()
        .map(|a| WeightedAnswer {
            text: a.clone(),
            weight: 1.0,
        })
        .collect();
    Ok(weighted_vote(&weighted))
}

/// `hierarchical_consensus(primaries, verifiers)` (spec.md §4.7): if the
/// primaries already agree above `similarity_threshold`, return
/// immediately with high confidence; otherwise fold in the verifiers and
/// run a weighted vote (primaries 2x, verifiers 1x).
pub fn hierarchical_consensus(
    primaries: &[String],
    verifiers: &[String],
    similarity_threshold: f32,
) -> Result<ConsensusDecision, ConsensusError> {
    if primaries.is_empty() {
        return Err(ConsensusError::NoCandidates);
    }

    if primaries_agree(primaries, similarity_threshold) {
        return Ok(ConsensusDecision {
            winning_answer: primaries[0].clone(),
            confidence: 0.95,
            vote_breakdown: vec![(primaries[0].clone(), primaries.len() as f32)],
            was_unanimous: true,
        });
    }

    let mut weighted: Vec<WeightedAnswer> = primaries
        .iter()
        .map(|a| WeightedAnswer {
            text: a.clone(),
            weight: 2.0,
        })
        .collect();
    weighted.extend(verifiers.iter().map(|a| WeightedAnswer {
        text: a.clone(),
        weight: 1.0,
    }));

    Ok(weighted_vote(&weighted))
}

fn primaries_agree(primaries: &[String], threshold: f32) -> bool {
    if primaries.len() < 2 {
        return true;
    }
    primaries
        .windows(2)
        .all(|pair| similarity::free_text_similar(&pair[0], &pair[1], threshold) || similarity::answers_agree(&pair[0], &pair[1]))
}

/// Groups `answers` by agreement (using [`similarity::answers_agree`]),
/// sums weight per group, and returns the top group as the winner. Ties
/// are broken by the first group encountered in input order, matching
/// `ensemble/voting.rs`'s deterministic tie-break style (prefer the
/// earliest/most-capable candidate rather than randomising).
fn weighted_vote(answers: &[WeightedAnswer]) -> ConsensusDecision {
    let mut groups: Vec<(String, f32)> = Vec::new();

    for answer in answers {
        if let Some(group) = groups.iter_mut().find(|(text, _)| similarity::answers_agree(text, &answer.text)) {
            group.1 += answer.weight;
        } else {
            groups.push((answer.text.clone(), answer.weight));
        }
    }

    let total_weight: f32 = groups.iter().map(|(_, w)| w).sum();
    let (winner, winner_weight) = groups
        .iter()
        .cloned()
        .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
        .unwrap_or_default();

    let runner_up_weight = groups
        .iter()
        .filter(|(text, _)| text != &winner)
        .map(|(_, w)| *w)
        .fold(0.0_f32, f32::max);

    let was_unanimous = groups.len() == 1;
    let confidence = if total_weight > 0.0 { winner_weight / total_weight } else { 0.0 };

    let confidence = if winner_weight <= runner_up_weight {
        confidence.min(0.6)
    } else {
        confidence
    };

    let counts: HashMap<String, f32> = groups.into_iter().collect();
    let mut vote_breakdown: Vec<(String, f32)> = counts.into_iter().collect();
    vote_breakdown.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    ConsensusDecision {
        winning_answer: winner,
        confidence,
        vote_breakdown,
        was_unanimous,
    }
}

/// Generic generate→test→refine loop (spec.md §4.7, used directly by
/// the coding handler's `generate → test → refine` state machine).
///
/// `test` reports whether `candidate` passed; on failure, `refine` is
/// given the candidate and the test's failure detail to produce the
/// next candidate. Stops as soon as a candidate passes, or after
/// `max_rounds` attempts.
pub async fn challenge_refine<C, T, TF, R, RF>(
    initial: String,
    mut test: T,
    mut refine: R,
    max_rounds: u32,
) -> (String, bool, u32)
where
    T: FnMut(String) -> TF,
    TF: std::future::Future<Output = C>,
    C: AttemptOutcome,
    R: FnMut(String, String) -> RF,
    RF: std::future::Future<Output = String>,
{
    let mut candidate = initial;
    for attempt in 1..=max_rounds {
        let outcome = test(candidate.clone()).await;
        if outcome.passed() {
            return (candidate, true, attempt);
        }
        if attempt == max_rounds {
            return (candidate, false, attempt);
        }
        candidate = refine(candidate, outcome.detail()).await;
    }
    (candidate, false, max_rounds)
}

/// What `challenge_refine`'s `test` stage needs to report back.
pub trait AttemptOutcome {
    fn passed(&self) -> bool;
    fn detail(&self) -> String;
}

impl AttemptOutcome for (bool, String) {
    fn passed(&self) -> bool {
        self.0
    }
    fn detail(&self) -> String {
        self.1.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_consistency_majority_wins() {
        let answers = vec!["A".to_string(), "A".to_string(), "B".to_string()];
        let decision = self_consistency(&answers).unwrap();
        assert_eq!(decision.winning_answer, "A");
    }

    #[test]
    fn self_consistency_empty_is_error() {
        assert!(matches!(self_consistency(&[]), Err(ConsensusError::NoCandidates)));
    }

    #[test]
    fn hierarchical_consensus_short_circuits_on_agreement() {
        let primaries = vec!["C".to_string(), "C".to_string(), "C".to_string()];
        let decision = hierarchical_consensus(&primaries, &[], 0.8).unwrap();
        assert!(decision.was_unanimous);
        assert!(decision.confidence >= 0.9);
    }

    #[test]
    fn hierarchical_consensus_falls_back_to_weighted_vote_on_disagreement() {
        let primaries = vec!["A".to_string(), "B".to_string()];
        let verifiers = vec!["A".to_string()];
        let decision = hierarchical_consensus(&primaries, &verifiers, 0.8).unwrap();
        assert_eq!(decision.winning_answer, "A");
    }

    #[test]
    fn tie_yields_capped_confidence() {
        let answers = vec!["A".to_string(), "B".to_string()];
        let decision = self_consistency(&answers).unwrap();
        assert!(decision.confidence <= 0.6);
    }

    #[tokio::test]
    async fn challenge_refine_stops_on_first_pass() {
        let (result, verified, attempts) = challenge_refine(
            "v0".to_string(),
            |candidate: String| async move { (candidate == "v2", "not v2 yet".to_string()) },
            |candidate: String, _detail: String| async move {
                let n: u32 = candidate.trim_start_matches('v').parse().unwrap();
                format!("v{}", n + 1)
            },
            5,
        )
        .await;
        assert!(verified);
        assert_eq!(result, "v2");
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn challenge_refine_gives_up_after_max_rounds() {
        let (_, verified, attempts) = challenge_refine(
            "v0".to_string(),
            |_candidate: String| async move { (false, "never passes".to_string()) },
            |candidate: String, _detail: String| async move { candidate },
            3,
        )
        .await;
        assert!(!verified);
        assert_eq!(attempts, 3);
    }
}
