//! Proposal distributions for Metropolis-Hastings.
//!
//! A proposal draws a candidate point given the current one and reports the
//! log density `log q(to | from)` needed for the Hastings correction.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::sampler::{McmcError, Result};

pub trait Proposal {
    /// The dimension this proposal is restricted to, if any.
    fn dim(&self) -> Option<usize> {
        None
    }

    /// Draw a candidate given `current` and write it to `out`.
    fn propose<R: Rng + ?Sized>(&self, rng: &mut R, current: &[f64], out: &mut [f64]);

    /// `log q(to | from)`, up to an additive constant that depends on neither point.
    fn log_density(&self, from: &[f64], to: &[f64]) -> f64;

    /// Whether `q(to | from) == q(from | to)` for all points.
    ///
    /// Symmetric proposals let the sampler skip the Hastings correction.
    fn is_symmetric(&self) -> bool {
        false
    }
}

fn check_scale(scale: f64) -> Result<f64> {
    if scale.is_finite() && scale > 0. {
        Ok(scale)
    } else {
        Err(McmcError::InvalidSettings(
            "Proposal scale must be positive and finite",
        ))
    }
}

/// Log density of a normal with standard deviation `std`, without the
/// `0.5 * ln(2 pi)` term.
#[inline]
fn normal_logpdf(x: f64, mean: f64, std: f64) -> f64 {
    let z = (x - mean) / std;
    -0.5 * z * z - std.ln()
}

#[derive(Debug, Clone)]
enum Scale {
    Isotropic(f64),
    Diagonal(Box<[f64]>),
}

/// Random walk with zero-mean normal increments.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    scale: Scale,
}

impl RandomWalk {
    /// The same standard deviation in every direction.
    pub fn new(scale: f64) -> Result<Self> {
        Ok(RandomWalk {
            scale: Scale::Isotropic(check_scale(scale)?),
        })
    }

    /// One standard deviation per coordinate.
    pub fn diagonal(scales: impl Into<Box<[f64]>>) -> Result<Self> {
        let scales = scales.into();
        for &scale in scales.iter() {
            check_scale(scale)?;
        }
        Ok(RandomWalk {
            scale: Scale::Diagonal(scales),
        })
    }

    #[inline]
    fn scale(&self, idx: usize) -> f64 {
        match &self.scale {
            Scale::Isotropic(scale) => *scale,
            Scale::Diagonal(scales) => scales[idx],
        }
    }
}

impl Proposal for RandomWalk {
    fn dim(&self) -> Option<usize> {
        match &self.scale {
            Scale::Isotropic(_) => None,
            Scale::Diagonal(scales) => Some(scales.len()),
        }
    }

    fn propose<R: Rng + ?Sized>(&self, rng: &mut R, current: &[f64], out: &mut [f64]) {
        assert!(current.len() == out.len());
        for (i, (out, &x)) in out.iter_mut().zip(current).enumerate() {
            let eps: f64 = rng.sample(StandardNormal);
            *out = x + self.scale(i) * eps;
        }
    }

    fn log_density(&self, from: &[f64], to: &[f64]) -> f64 {
        from.iter()
            .zip(to)
            .enumerate()
            .map(|(i, (&from, &to))| normal_logpdf(to, from, self.scale(i)))
            .sum()
    }

    fn is_symmetric(&self) -> bool {
        true
    }
}

/// Draws from a fixed normal distribution, ignoring the current point.
#[derive(Debug, Clone)]
pub struct Independent {
    mean: Box<[f64]>,
    std: Box<[f64]>,
}

impl Independent {
    pub fn new(mean: impl Into<Box<[f64]>>, std: impl Into<Box<[f64]>>) -> Result<Self> {
        let mean = mean.into();
        let std = std.into();
        if mean.len() != std.len() {
            return Err(McmcError::DimensionMismatch {
                expected: mean.len(),
                found: std.len(),
            });
        }
        for &scale in std.iter() {
            check_scale(scale)?;
        }
        Ok(Independent { mean, std })
    }
}

impl Proposal for Independent {
    fn dim(&self) -> Option<usize> {
        Some(self.mean.len())
    }

    fn propose<R: Rng + ?Sized>(&self, rng: &mut R, _current: &[f64], out: &mut [f64]) {
        assert!(out.len() == self.mean.len());
        for ((out, &mean), &std) in out.iter_mut().zip(self.mean.iter()).zip(self.std.iter()) {
            let eps: f64 = rng.sample(StandardNormal);
            *out = mean + std * eps;
        }
    }

    fn log_density(&self, _from: &[f64], to: &[f64]) -> f64 {
        to.iter()
            .zip(self.mean.iter())
            .zip(self.std.iter())
            .map(|((&to, &mean), &std)| normal_logpdf(to, mean, std))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;

    #[test]
    fn rejects_bad_scales() {
        assert!(RandomWalk::new(0.).is_err());
        assert!(RandomWalk::new(f64::NAN).is_err());
        assert!(RandomWalk::diagonal(vec![1., -1.]).is_err());
        assert!(Independent::new(vec![0.], vec![f64::INFINITY]).is_err());
        assert!(matches!(
            Independent::new(vec![0., 0.], vec![1.]),
            Err(McmcError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn random_walk_is_symmetric() {
        let proposal = RandomWalk::diagonal(vec![0.5, 2.]).unwrap();
        let a = [0.3, -1.2];
        let b = [1.1, 0.4];
        assert!(proposal.is_symmetric());
        assert_eq!(proposal.dim(), Some(2));
        assert_abs_diff_eq!(
            proposal.log_density(&a, &b),
            proposal.log_density(&b, &a),
            epsilon = 1e-12
        );
    }

    #[test]
    fn random_walk_moves_every_coordinate() {
        let proposal = RandomWalk::new(1.).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let current = [0.; 5];
        let mut out = [0.; 5];
        proposal.propose(&mut rng, &current, &mut out);
        assert!(out.iter().all(|&x| x != 0. && x.is_finite()));
    }

    #[test]
    fn independent_is_asymmetric() {
        let proposal = Independent::new(vec![1.], vec![1.]).unwrap();
        assert!(!proposal.is_symmetric());
        assert_abs_diff_eq!(proposal.log_density(&[5.], &[1.]), 0.);
        assert_abs_diff_eq!(proposal.log_density(&[1.], &[3.]), -2.);
    }
}
