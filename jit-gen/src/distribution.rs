use rand::distributions;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum Distribution {
    Uniform(usize, usize),
}

impl Distribution {
    pub fn new_uniform_inclusive(low: usize, high: usize) -> Distribution {
        assert!(low <= high);
        Distribution::Uniform(low, high)
    }

    /// Uniform count in `[1, limit]`, or zero when the limit is zero.
    pub fn up_to(limit: usize) -> Distribution {
        Distribution::Uniform(limit.min(1), limit)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        match self {
            Distribution::Uniform(low, high) => {
                rng.sample(distributions::Uniform::new_inclusive(*low, *high))
            }
        }
    }

    pub fn none() -> Distribution {
        Distribution::Uniform(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn up_to_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for limit in 0..10 {
            let value = Distribution::up_to(limit).sample(&mut rng);
            assert!(value <= limit);
            assert!(limit == 0 || value >= 1);
        }
        assert_eq!(Distribution::none().sample(&mut rng), 0);
    }
}
