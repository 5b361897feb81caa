//! Stochastic processes that drive arrivals and service times.
//!
//! Every process draws from a [`SimRng`] handed to it at construction. Handles
//! cloned from the same `SimRng` share one ordered stream of draws, so a
//! simulation that owns a single seeded source is fully reproducible.

use std::cell::{RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use rand::distributions::Uniform as UniformDist;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal as NormalDist};
use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Shared, seedable random source.
///
/// Cloning yields another handle onto the same stream. Use
/// [`SimRng::seed_from_u64`] to get an independent source.
#[derive(Clone)]
pub struct SimRng {
    inner: Rc<RefCell<Xoshiro256StarStar>>,
}

impl SimRng {
    pub fn seed_from_u64(seed: u64) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Xoshiro256StarStar::seed_from_u64(seed))),
        }
    }

    /// `N` non-overlapping streams from one seed, each 2^128 draws apart.
    pub fn streams<const N: usize>(seed: u64) -> [Self; N] {
        let mut base = Xoshiro256StarStar::seed_from_u64(seed);
        std::array::from_fn(|_| {
            let stream = Self {
                inner: Rc::new(RefCell::new(base.clone())),
            };
            base.jump();
            stream
        })
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Xoshiro256StarStar> {
        self.inner.borrow_mut()
    }
}

impl fmt::Debug for SimRng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimRng")
            .field("handles", &Rc::strong_count(&self.inner))
            .finish()
    }
}

/// A source of independent draws from a fixed distribution.
pub trait StochasticProcess {
    /// One fresh draw. Never memoized and never clamped.
    fn sample(&self) -> f64;

    /// Expected value of a draw.
    fn mean(&self) -> f64;
}

impl<P: StochasticProcess + ?Sized> StochasticProcess for Box<P> {
    fn sample(&self) -> f64 {
        (**self).sample()
    }

    fn mean(&self) -> f64 {
        (**self).mean()
    }
}

fn check_finite(name: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite { name, value })
    }
}

/// Uniform distribution on `[min, max]`.
#[derive(Debug, Clone)]
pub struct Uniform {
    min: f64,
    max: f64,
    dist: UniformDist<f64>,
    rng: SimRng,
}

impl Uniform {
    pub fn new(min: f64, max: f64, rng: &SimRng) -> Result<Self, ValidationError> {
        check_finite("min", min)?;
        check_finite("max", max)?;
        if min > max {
            return Err(ValidationError::InvertedBounds { min, max });
        }
        check_finite("max - min", max - min)?;

        Ok(Self {
            min,
            max,
            dist: UniformDist::new_inclusive(min, max),
            rng: rng.clone(),
        })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

impl StochasticProcess for Uniform {
    fn sample(&self) -> f64 {
        self.dist.sample(&mut *self.rng.borrow_mut())
    }

    fn mean(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// Normal distribution. Draws may fall below zero; callers clamp.
#[derive(Debug, Clone)]
pub struct Normal {
    mean: f64,
    std_dev: f64,
    dist: NormalDist<f64>,
    rng: SimRng,
}

impl Normal {
    pub fn new(mean: f64, std_dev: f64, rng: &SimRng) -> Result<Self, ValidationError> {
        check_finite("mean", mean)?;
        check_finite("std_dev", std_dev)?;
        if std_dev < 0.0 {
            return Err(ValidationError::NegativeStdDev(std_dev));
        }
        let dist =
            NormalDist::new(mean, std_dev).map_err(|_| ValidationError::NegativeStdDev(std_dev))?;

        Ok(Self {
            mean,
            std_dev,
            dist,
            rng: rng.clone(),
        })
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }
}

impl StochasticProcess for Normal {
    fn sample(&self) -> f64 {
        self.dist.sample(&mut *self.rng.borrow_mut())
    }

    fn mean(&self) -> f64 {
        self.mean
    }
}

/// Distribution description that is not yet bound to a random source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributionConfig {
    Uniform { min: f64, max: f64 },
    Normal { mean: f64, std_dev: f64 },
}

impl DistributionConfig {
    /// Bind to `rng`, checking the parameters.
    pub fn build(&self, rng: &SimRng) -> Result<Box<dyn StochasticProcess>, ValidationError> {
        Ok(match *self {
            DistributionConfig::Uniform { min, max } => Box::new(Uniform::new(min, max, rng)?),
            DistributionConfig::Normal { mean, std_dev } => {
                Box::new(Normal::new(mean, std_dev, rng)?)
            }
        })
    }

    /// Check the parameters without drawing anything.
    pub fn validate(&self) -> Result<(), ValidationError> {
        // Throwaway source; nothing is sampled.
        self.build(&SimRng::seed_from_u64(0)).map(|_| ())
    }

    pub fn mean(&self) -> f64 {
        match *self {
            DistributionConfig::Uniform { min, max } => (min + max) / 2.0,
            DistributionConfig::Normal { mean, .. } => mean,
        }
    }
}

impl fmt::Display for DistributionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionConfig::Uniform { min, max } => write!(f, "Uniform({min}, {max})"),
            DistributionConfig::Normal { mean, std_dev } => write!(f, "Normal({mean}, {std_dev})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_rejects_inverted_bounds() {
        let rng = SimRng::seed_from_u64(1);
        assert_eq!(
            Uniform::new(5.0, 1.0, &rng).unwrap_err(),
            ValidationError::InvertedBounds { min: 5.0, max: 1.0 }
        );
    }

    #[test]
    fn normal_rejects_negative_std_dev() {
        let rng = SimRng::seed_from_u64(1);
        assert_eq!(
            Normal::new(0.0, -1.0, &rng).unwrap_err(),
            ValidationError::NegativeStdDev(-1.0)
        );
    }

    #[test]
    fn rejected_construction_draws_nothing() {
        let rng = SimRng::seed_from_u64(9);
        let reference = Uniform::new(0.0, 1.0, &SimRng::seed_from_u64(9)).unwrap();

        assert!(Uniform::new(5.0, 1.0, &rng).is_err());
        assert!(Normal::new(0.0, -1.0, &rng).is_err());

        let after = Uniform::new(0.0, 1.0, &rng).unwrap();
        assert_eq!(after.sample(), reference.sample());
    }

    #[test]
    fn non_finite_parameters_are_rejected() {
        let rng = SimRng::seed_from_u64(1);
        assert!(matches!(
            Uniform::new(f64::NAN, 1.0, &rng),
            Err(ValidationError::NonFinite { name: "min", .. })
        ));
        assert!(matches!(
            Normal::new(1.0, f64::INFINITY, &rng),
            Err(ValidationError::NonFinite { name: "std_dev", .. })
        ));
    }

    #[test]
    fn uniform_samples_stay_in_bounds() {
        let rng = SimRng::seed_from_u64(7);
        let uniform = Uniform::new(1.0, 2.0, &rng).unwrap();
        for _ in 0..10_000 {
            let x = uniform.sample();
            assert!((1.0..=2.0).contains(&x), "sample {x} out of bounds");
        }
    }

    #[test]
    fn degenerate_distributions_are_constant() {
        let rng = SimRng::seed_from_u64(7);
        let uniform = Uniform::new(3.0, 3.0, &rng).unwrap();
        let normal = Normal::new(1.5, 0.0, &rng).unwrap();
        for _ in 0..100 {
            assert_eq!(uniform.sample(), 3.0);
            assert_eq!(normal.sample(), 1.5);
        }
    }

    #[test]
    fn sample_means_are_close_to_parameters() {
        let rng = SimRng::seed_from_u64(42);
        let uniform = Uniform::new(1.0, 2.0, &rng).unwrap();
        let normal = Normal::new(1.5, 0.1, &rng).unwrap();

        let n = 20_000;
        let uniform_mean = (0..n).map(|_| uniform.sample()).sum::<f64>() / n as f64;
        let normal_mean = (0..n).map(|_| normal.sample()).sum::<f64>() / n as f64;

        assert!((uniform_mean - uniform.mean()).abs() < 0.02);
        assert!((normal_mean - normal.mean()).abs() < 0.01);
    }

    #[test]
    fn shared_handles_interleave_one_stream() {
        let shared = SimRng::seed_from_u64(3);
        let a = Uniform::new(0.0, 1.0, &shared).unwrap();
        let b = Uniform::new(0.0, 1.0, &shared).unwrap();

        let solo = Uniform::new(0.0, 1.0, &SimRng::seed_from_u64(3)).unwrap();
        let expected: Vec<f64> = (0..4).map(|_| solo.sample()).collect();
        let interleaved = vec![a.sample(), b.sample(), a.sample(), b.sample()];

        assert_eq!(interleaved, expected);
    }

    #[test]
    fn streams_are_distinct_and_reproducible() {
        let first: [SimRng; 3] = SimRng::streams(21);
        let second: [SimRng; 3] = SimRng::streams(21);

        let draw = |rng: &SimRng| Uniform::new(0.0, 1.0, rng).unwrap().sample();
        let a: Vec<f64> = first.iter().map(draw).collect();
        let b: Vec<f64> = second.iter().map(draw).collect();

        assert_eq!(a, b);
        assert_ne!(a[0], a[1]);
        assert_ne!(a[1], a[2]);
    }

    #[test]
    fn distribution_config_parses_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            arrival: DistributionConfig,
        }

        let parsed: Wrapper =
            toml::from_str("arrival = { kind = \"normal\", mean = 1.5, std_dev = 0.1 }").unwrap();
        assert_eq!(
            parsed.arrival,
            DistributionConfig::Normal {
                mean: 1.5,
                std_dev: 0.1
            }
        );
        assert_eq!(parsed.arrival.mean(), 1.5);
    }

    #[test]
    fn distribution_config_validates() {
        assert!(DistributionConfig::Uniform { min: 1.0, max: 2.0 }.validate().is_ok());
        assert_eq!(
            DistributionConfig::Uniform { min: 5.0, max: 1.0 }.validate(),
            Err(ValidationError::InvertedBounds { min: 5.0, max: 1.0 })
        );
    }
}
