//! Seed handling. Every iteration draws from its own `StdRng` seeded from the run seed.

use sha2::{Digest, Sha256};

/// Reads a run seed. Decimal numbers are taken as is, any other text is hashed.
pub fn parse_seed(seed: &str) -> u64 {
    seed.trim()
        .parse::<u64>()
        .unwrap_or_else(|_| digest_to_u64(Sha256::digest(seed.as_bytes()).as_slice()))
}

/// Seed of iteration `iteration` of a run, unless `fixed` overrides it.
pub fn iteration_seed(run_seed: u64, iteration: u64, fixed: Option<u64>) -> u64 {
    if let Some(fixed) = fixed {
        return fixed;
    }
    let mut hasher = Sha256::new();
    hasher.update(run_seed.to_le_bytes());
    hasher.update(iteration.to_le_bytes());
    digest_to_u64(hasher.finalize().as_slice())
}

/// Fresh run seed for runs started without one.
pub fn random_seed() -> u64 {
    rand::random()
}

fn digest_to_u64(digest: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_seeds_are_kept() {
        assert_eq!(parse_seed("42"), 42);
        assert_eq!(parse_seed(" 7 "), 7);
    }

    #[test]
    fn text_seeds_are_hashed_deterministically() {
        assert_eq!(parse_seed("S1"), parse_seed("S1"));
        assert_ne!(parse_seed("S1"), parse_seed("S2"));
    }

    #[test]
    fn iterations_get_distinct_seeds() {
        let seed = parse_seed("S1");
        assert_ne!(iteration_seed(seed, 0, None), iteration_seed(seed, 1, None));
        assert_eq!(iteration_seed(seed, 0, None), iteration_seed(seed, 0, None));
        assert_eq!(iteration_seed(seed, 5, Some(9)), 9);
    }
}
