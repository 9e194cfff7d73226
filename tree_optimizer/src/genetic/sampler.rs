use rand::Rng;

use crate::error::{OptimizerError, Result};

/// Draws entries with a probability proportional to their weight.
///
/// Sampling searches the cumulative weights, so adding entries is constant time and drawing is
/// logarithmic. Entries can't be removed.
#[derive(Debug, Clone)]
pub struct WeightedSampler<T> {
    entries: Vec<T>,
    cumulative: Vec<f64>,
    total_weight: f64,
}

impl<T> Default for WeightedSampler<T> {
    fn default() -> Self {
        WeightedSampler {
            entries: Vec::new(),
            cumulative: Vec::new(),
            total_weight: 0.0,
        }
    }
}

impl<T> WeightedSampler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `entry`. Entries with weight 0 are never drawn and therefore not stored.
    pub fn add_entry(&mut self, entry: T, weight: f64) -> Result<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(OptimizerError::invalid(
                "weight",
                format!("must be finite and >= 0, got {weight}"),
            ));
        }
        if weight == 0.0 {
            return Ok(());
        }
        self.total_weight += weight;
        self.cumulative.push(self.total_weight);
        self.entries.push(entry);
        Ok(())
    }

    pub fn can_sample(&self) -> bool {
        self.total_weight > 0.0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A random entry, `None` if there is nothing to draw from.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&T> {
        if !self.can_sample() {
            return None;
        }
        let r = rng.gen::<f64>() * self.total_weight;
        // First entry whose cumulative weight reaches r.
        let index = self.cumulative.partition_point(|&c| c < r);
        self.entries.get(index.min(self.entries.len() - 1))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn rejects_invalid_weights() {
        let mut sampler = WeightedSampler::new();
        assert!(sampler.add_entry('a', -1.0).is_err());
        assert!(sampler.add_entry('a', f64::INFINITY).is_err());
        assert!(sampler.add_entry('a', f64::NAN).is_err());
        assert!(!sampler.can_sample());
    }

    #[test]
    fn zero_weights_are_never_drawn() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut sampler = WeightedSampler::new();
        sampler.add_entry('a', 0.0).unwrap();
        assert!(!sampler.can_sample());
        assert_eq!(sampler.sample(&mut rng), None);
        sampler.add_entry('b', 2.0).unwrap();
        assert_eq!(sampler.len(), 1);
        for _ in 0..100 {
            assert_eq!(sampler.sample(&mut rng), Some(&'b'));
        }
    }

    #[test]
    fn draws_proportional_to_weight() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut sampler = WeightedSampler::new();
        sampler.add_entry(0usize, 1.0).unwrap();
        sampler.add_entry(1usize, 3.0).unwrap();
        let mut counts = [0usize; 2];
        for _ in 0..10_000 {
            counts[*sampler.sample(&mut rng).unwrap()] += 1;
        }
        let ratio = counts[1] as f64 / counts[0] as f64;
        assert!((2.5..3.5).contains(&ratio), "ratio {ratio}");
    }
}
