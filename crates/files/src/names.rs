//! Random name generation for temp files and filename salts.

use rand::Rng;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Source of random filename segments. Injected so tests can be deterministic.
pub trait NameGenerator: Send + Sync {
    /// Returns `len` characters from `[a-z0-9]`.
    fn random_seq(&self, len: usize) -> String;
}

/// Thread-local RNG backed generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNames;

impl NameGenerator for RandomNames {
    fn random_seq(&self, len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_seq_alphabet_and_length() {
        let names = RandomNames;
        for len in [0, 1, 8, 16] {
            let seq = names.random_seq(len);
            assert_eq!(seq.len(), len);
            assert!(seq
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_random_seq_varies() {
        let names = RandomNames;
        assert_ne!(names.random_seq(16), names.random_seq(16));
    }
}
