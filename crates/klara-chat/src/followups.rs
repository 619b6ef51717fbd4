use rand::Rng;

/// Probability of showing follow-ups under a confident answer. Observed
/// product behavior; injectable via [`crate::ChatOptions`].
pub const DEFAULT_FOLLOW_UP_PROBABILITY: f64 = 0.3;

/// Answers shorter than this are treated as insufficient.
const MIN_CONFIDENT_ANSWER_CHARS: usize = 100;

/// Hedging phrases marking an answer as insufficient.
const HEDGING_PHRASES: &[&str] = &[
    "i don't know",
    "i do not know",
    "i'm not sure",
    "i am not sure",
    "unable to find",
    "couldn't find",
    "could not find",
    "limited functionality",
    "fallback",
    "try again later",
];

/// An insufficient answer always gets its follow-ups shown, to give the
/// user somewhere to go next.
pub fn is_insufficient(answer: &str) -> bool {
    if answer.chars().count() < MIN_CONFIDENT_ANSWER_CHARS {
        return true;
    }
    let lowered = answer.to_lowercase();
    HEDGING_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

fn decide(answer: &str, probability: f64, roll: f64) -> bool {
    is_insufficient(answer) || roll < probability
}

/// Returns the follow-up list actually attached to the message: all of
/// them when the answer is insufficient, otherwise all-or-nothing with
/// the given probability.
pub fn select_follow_ups(answer: &str, candidates: Vec<String>, probability: f64) -> Vec<String> {
    if candidates.is_empty() {
        return candidates;
    }
    let roll = rand::thread_rng().gen::<f64>();
    if decide(answer, probability, roll) {
        candidates
    } else {
        Vec::new()
    }
}
