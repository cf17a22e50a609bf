use rand::Rng;
use sha2::{Digest, Sha256};

/// Alphabet the nonce search draws from: the sixteen lowercase hex digits.
pub const NONCE_ALPHABET: &[u8] = b"0123456789abcdef";

/// Hashes a text payload with SHA-256 and returns the lowercase hex digest.
///
/// Every hash in the chain goes through this function, so its output format
/// (64 lowercase hex characters) is effectively part of the wire format.
pub fn digest(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Returns the difficulty target: a string of `n` ASCII `'0'` characters.
pub fn zero_prefix(n: usize) -> String {
    "0".repeat(n)
}

/// Draws a nonce of `len` characters uniformly from [`NONCE_ALPHABET`].
pub fn random_nonce<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| NONCE_ALPHABET[rng.gen_range(0..NONCE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_digest_is_deterministic() {
        let a = digest("hello blockchain");
        let b = digest("hello blockchain");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64); // SHA-256 hash is 64 characters in hex
    }

    #[test]
    fn test_digest_matches_known_vector() {
        // SHA-256 of the empty string
        assert_eq!(
            digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_digest_differs_on_different_input() {
        assert_ne!(digest("a"), digest("b"));
    }

    #[test]
    fn test_zero_prefix() {
        assert_eq!(zero_prefix(0), "");
        assert_eq!(zero_prefix(4), "0000");
    }

    #[test]
    fn test_random_nonce_stays_in_alphabet() {
        let mut rng = StdRng::seed_from_u64(42);
        let nonce = random_nonce(&mut rng, 32);

        assert_eq!(nonce.len(), 32);
        assert!(nonce.bytes().all(|b| NONCE_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_random_nonce_is_reproducible_with_seed() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);

        assert_eq!(random_nonce(&mut a, 16), random_nonce(&mut b, 16));
    }
}
