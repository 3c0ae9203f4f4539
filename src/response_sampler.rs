use rand::Rng;
use rand_distr::{Distribution, LogNormal};

/// Bounds on the individual response multiplier; draws outside this range
/// are rejected and resampled.
pub const MULTIPLIER_LOWER_BOUND: f64 = 0.1;
pub const MULTIPLIER_UPPER_BOUND: f64 = 10.0;

/// Draws a person's fixed immune-response multiplier from a lognormal
/// distribution with median 1 (`mu = 0`) and the given `sigma`, truncated by
/// rejection to [0.1, 10.0].
///
/// The multiplier represents biological heterogeneity in response magnitude
/// and is sampled exactly once per person, at ledger creation.
#[must_use]
pub fn sample_response_multiplier<R: Rng + ?Sized>(rng: &mut R, sigma: f64) -> f64 {
    if sigma == 0.0 {
        return 1.0;
    }
    let distribution =
        LogNormal::new(0.0, sigma).expect("sigma was validated when the model was sealed");
    loop {
        let draw = distribution.sample(rng);
        if (MULTIPLIER_LOWER_BOUND..=MULTIPLIER_UPPER_BOUND).contains(&draw) {
            return draw;
        }
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use statrs::assert_almost_eq;

    use super::{sample_response_multiplier, MULTIPLIER_LOWER_BOUND, MULTIPLIER_UPPER_BOUND};

    #[test]
    fn test_zero_sigma_yields_unit_multiplier() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_almost_eq!(sample_response_multiplier(&mut rng, 0.0), 1.0, 0.0);
    }

    #[test]
    fn test_draws_stay_within_bounds() {
        // A wide sigma forces the rejection loop to do real work
        let mut rng = StdRng::seed_from_u64(8675309);
        for _ in 0..1000 {
            let draw = sample_response_multiplier(&mut rng, 3.0);
            assert!(draw >= MULTIPLIER_LOWER_BOUND);
            assert!(draw <= MULTIPLIER_UPPER_BOUND);
        }
    }

    #[test]
    fn test_seeded_draws_are_reproducible() {
        let mut rng_a = StdRng::seed_from_u64(123);
        let mut rng_b = StdRng::seed_from_u64(123);
        for _ in 0..20 {
            let a = sample_response_multiplier(&mut rng_a, 0.5);
            let b = sample_response_multiplier(&mut rng_b, 0.5);
            assert!(a.to_bits() == b.to_bits());
        }
    }

    #[test]
    fn test_median_near_one() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut draws: Vec<f64> = (0..5001)
            .map(|_| sample_response_multiplier(&mut rng, 0.5))
            .collect();
        draws.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let median = draws[draws.len() / 2];
        // mu = 0 puts the lognormal median at exactly 1; sampling noise and
        // truncation leave it close
        assert!(median > 0.9 && median < 1.1);
    }
}
