use std::collections::BTreeMap;

use rand::Rng;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SamplingError {
    #[error("cannot sample from an empty distribution")]
    Empty,

    #[error("weights must be finite and >= 0, got {0}")]
    InvalidWeight(f64),
}

/// Draw one key with probability proportional to its weight.
///
/// All-zero weights fall back to a uniform draw over the keys. Otherwise a
/// single uniform draw in `[0, total)` is located on the cumulative sums.
/// Weights whose sum overflows are rescaled by their maximum first.
pub fn weighted_choice<K, R>(weights: &BTreeMap<K, f64>, rng: &mut R) -> Result<K, SamplingError>
where
    K: Clone + Ord,
    R: Rng + ?Sized,
{
    if weights.is_empty() {
        return Err(SamplingError::Empty);
    }
    for &w in weights.values() {
        if !w.is_finite() || w < 0.0 {
            return Err(SamplingError::InvalidWeight(w));
        }
    }

    // Large finite weights can overflow the sum; rescale by the maximum
    // so the cumulative draw stays finite.
    let mut scale = 1.0;
    let mut total: f64 = weights.values().sum();
    if !total.is_finite() {
        let max = weights.values().copied().fold(0.0, f64::max);
        scale = 1.0 / max;
        total = weights.values().map(|w| w * scale).sum();
    }
    if total <= 0.0 {
        let pick = rng.gen_range(0..weights.len());
        return weights
            .keys()
            .nth(pick)
            .cloned()
            .ok_or(SamplingError::Empty);
    }

    let roll = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (key, &w) in weights {
        if w <= 0.0 {
            continue;
        }
        cumulative += w * scale;
        last_positive = Some(key);
        if roll < cumulative {
            return Ok(key.clone());
        }
    }

    // Rounding can leave `roll` a hair above the final cumulative sum.
    last_positive.cloned().ok_or(SamplingError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_empty_distribution_fails() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let weights: BTreeMap<usize, f64> = BTreeMap::new();
        assert_eq!(weighted_choice(&weights, &mut rng), Err(SamplingError::Empty));
    }

    #[test]
    fn test_invalid_weights_fail() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let weights = BTreeMap::from([(0, 1.0), (1, -1.0)]);
        assert_eq!(
            weighted_choice(&weights, &mut rng),
            Err(SamplingError::InvalidWeight(-1.0))
        );
        let weights = BTreeMap::from([(0, f64::NAN)]);
        assert!(weighted_choice(&weights, &mut rng).is_err());
    }

    #[test]
    fn test_zero_weight_keys_never_drawn() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let weights = BTreeMap::from([(0, 0.0), (1, 2.0), (2, 0.0)]);
        for _ in 0..1000 {
            assert_eq!(weighted_choice(&weights, &mut rng), Ok(1));
        }
    }

    #[test]
    fn test_all_zero_is_uniform() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let weights = BTreeMap::from([(0, 0.0), (1, 0.0), (2, 0.0), (3, 0.0)]);
        let mut counts = [0usize; 4];
        for _ in 0..8000 {
            counts[weighted_choice(&weights, &mut rng).unwrap()] += 1;
        }
        for c in counts {
            assert!((1700..2300).contains(&c), "counts: {counts:?}");
        }
    }

    #[test]
    fn test_frequencies_follow_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let weights = BTreeMap::from([("a", 1.0), ("b", 3.0)]);
        let draws = 20_000;
        let b = (0..draws)
            .filter(|_| weighted_choice(&weights, &mut rng).unwrap() == "b")
            .count();
        let freq = b as f64 / draws as f64;
        assert!((freq - 0.75).abs() < 0.02, "freq = {freq}");
    }

    #[test]
    fn test_overflowing_total_is_rescaled() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let weights = BTreeMap::from([("a", f64::MAX), ("b", f64::MAX), ("c", 0.0)]);
        let draws = 10_000;
        let mut a = 0;
        for _ in 0..draws {
            match weighted_choice(&weights, &mut rng).unwrap() {
                "a" => a += 1,
                other => assert_eq!(other, "b"),
            }
        }
        let freq = a as f64 / draws as f64;
        assert!((freq - 0.5).abs() < 0.02, "freq = {freq}");
    }
}
