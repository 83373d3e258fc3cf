use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

pub const ANSWER_LENGTH: usize = 6;
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A single-use token the user has to transcribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    expected_answer: String,
}

impl Challenge {
    pub fn new(expected_answer: String) -> Self {
        Self { expected_answer }
    }

    pub fn expected_answer(&self) -> &str {
        &self.expected_answer
    }

    /// Case-insensitive comparison against the submitted text.
    pub fn matches(&self, submitted: &str) -> bool {
        submitted.trim().eq_ignore_ascii_case(&self.expected_answer)
    }
}

/// Source of challenge answers, drawn uniformly from `A-Z0-9`.
pub struct AnswerGenerator {
    rng: Mutex<StdRng>,
}

impl AnswerGenerator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic generator, for replays and tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn next_challenge(&self) -> Challenge {
        let mut rng = self.rng.lock();
        let answer = (0..ANSWER_LENGTH)
            .filter_map(|_| ALPHABET.choose(&mut *rng))
            .map(|&byte| char::from(byte))
            .collect();
        Challenge::new(answer)
    }
}

impl Default for AnswerGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_shape() {
        let generator = AnswerGenerator::new();
        for _ in 0..100 {
            let challenge = generator.next_challenge();
            let answer = challenge.expected_answer();
            assert_eq!(answer.len(), ANSWER_LENGTH);
            assert!(
                answer
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            );
        }
    }

    #[test]
    fn test_matches_ignores_case_and_whitespace() {
        let challenge = Challenge::new("AB12CD".to_string());
        assert!(challenge.matches("ab12cd"));
        assert!(challenge.matches(" AB12cd\n"));
        assert!(!challenge.matches("AB12CE"));
        assert!(!challenge.matches(""));
    }

    #[test]
    fn test_seeded_generators_agree() {
        let a = AnswerGenerator::seeded(42);
        let b = AnswerGenerator::seeded(42);
        for _ in 0..10 {
            assert_eq!(a.next_challenge(), b.next_challenge());
        }
    }
}
