use crate::Generator;
use burrow_core::shortcode::MAX_LENGTH;
use burrow_core::ShortCode;
use rand::Rng;

/// `[a-zA-Z0-9-_]`
pub const ALPHABET: &[u8; 64] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

pub const DEFAULT_LENGTH: usize = 6;

/// Draws every character independently and uniformly from [`ALPHABET`].
///
/// Not cryptographically secure. At the default length the chance of a
/// collision per attempt is about 1 in 64^6.
#[derive(Debug, Clone, Copy)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    /// Creates a generator producing codes of `length` characters.
    ///
    /// The length is clamped to `1..=MAX_LENGTH` so every code stays a
    /// valid [`ShortCode`].
    pub fn with_length(length: usize) -> Self {
        Self {
            length: length.clamp(1, MAX_LENGTH),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::with_length(DEFAULT_LENGTH)
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let mut rng = rand::rng();
        let code: String = (0..self.length)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        ShortCode::new_unchecked(code)
    }
}
