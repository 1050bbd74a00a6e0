//! Core abstractions for target distributions.
//!
//! Provides the `LogDensityModel` trait which is the only capability the
//! samplers need from a model: score a parameter vector and report its
//! dimensionality.

use std::{convert::Infallible, fmt::Debug};

use rand::Rng;

use crate::sampler::{McmcError, Result};

/// Errors that happen when we evaluate the log density
pub trait LogpError: std::error::Error + Send + Sync + 'static {
    /// Unrecoverable errors during logp computation stop sampling,
    /// recoverable errors reject the point that caused them.
    fn is_recoverable(&self) -> bool;
}

impl LogpError for Infallible {
    fn is_recoverable(&self) -> bool {
        match *self {}
    }
}

/// An unnormalized log density over `R^dim`.
///
/// `logp` must be deterministic for a given model instance: the same position
/// always yields the same value. Samplers cache the value they computed
/// and never evaluate a point twice.
pub trait LogDensityModel {
    type LogpError: LogpError;

    /// The number of parameters.
    fn dim(&self) -> usize;

    /// Compute the unnormalized log density at `position`.
    ///
    /// Points outside the support of the distribution should return
    /// `f64::NEG_INFINITY`, which samplers treat as a guaranteed rejection.
    /// NaN and positive infinity are fatal.
    fn logp(&self, position: &[f64]) -> std::result::Result<f64, Self::LogpError>;

    /// Write a candidate starting point into `position`.
    ///
    /// The default draws each coordinate from Uniform(-2, 2).
    fn init_position<R: Rng + ?Sized>(&self, rng: &mut R, position: &mut [f64]) -> Result<()> {
        position
            .iter_mut()
            .for_each(|x| *x = rng.random_range(-2f64..2f64));
        Ok(())
    }
}

impl<M: LogDensityModel> LogDensityModel for &M {
    type LogpError = M::LogpError;

    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn logp(&self, position: &[f64]) -> std::result::Result<f64, Self::LogpError> {
        (**self).logp(position)
    }

    fn init_position<R: Rng + ?Sized>(&self, rng: &mut R, position: &mut [f64]) -> Result<()> {
        (**self).init_position(rng, position)
    }
}

/// Evaluate the model and classify the result.
///
/// Recoverable model errors turn into `-inf`, so the point is rejected like
/// any other point outside the support.
pub fn evaluate<M: LogDensityModel + ?Sized>(model: &M, position: &[f64]) -> Result<f64> {
    match model.logp(position) {
        Ok(logp) if logp.is_nan() || logp == f64::INFINITY => {
            Err(McmcError::NonFiniteLogp { logp })
        }
        Ok(logp) => Ok(logp),
        Err(err) if err.is_recoverable() => Ok(f64::NEG_INFINITY),
        Err(err) => Err(McmcError::LogpFailure(Box::new(err))),
    }
}

/// A model defined by a plain closure.
pub struct DensityFn<F> {
    dim: usize,
    func: F,
}

impl<F: Fn(&[f64]) -> f64> DensityFn<F> {
    pub fn new(dim: usize, func: F) -> Self {
        DensityFn { dim, func }
    }
}

impl<F> Debug for DensityFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DensityFn").field("dim", &self.dim).finish()
    }
}

impl<F: Fn(&[f64]) -> f64> LogDensityModel for DensityFn<F> {
    type LogpError = Infallible;

    fn dim(&self) -> usize {
        self.dim
    }

    fn logp(&self, position: &[f64]) -> std::result::Result<f64, Infallible> {
        Ok((self.func)(position))
    }
}

pub mod test_logps {
    use std::convert::Infallible;

    use super::LogDensityModel;

    /// Independent normals with unit variance around `mu`.
    #[derive(Debug, Clone)]
    pub struct NormalLogp {
        dim: usize,
        mu: f64,
    }

    impl NormalLogp {
        pub fn new(dim: usize, mu: f64) -> NormalLogp {
            NormalLogp { dim, mu }
        }
    }

    impl LogDensityModel for NormalLogp {
        type LogpError = Infallible;

        fn dim(&self) -> usize {
            self.dim
        }

        fn logp(&self, position: &[f64]) -> Result<f64, Infallible> {
            let logp = position
                .iter()
                .map(|&p| {
                    let val = p - self.mu;
                    -0.5 * val * val
                })
                .sum();
            Ok(logp)
        }
    }

    /// Flat density on the box `[lower, upper]^dim`, zero density outside.
    #[derive(Debug, Clone)]
    pub struct BoxLogp {
        dim: usize,
        lower: f64,
        upper: f64,
    }

    impl BoxLogp {
        pub fn new(dim: usize, lower: f64, upper: f64) -> BoxLogp {
            BoxLogp { dim, lower, upper }
        }

        pub fn contains(&self, position: &[f64]) -> bool {
            position
                .iter()
                .all(|&p| (self.lower..=self.upper).contains(&p))
        }
    }

    impl LogDensityModel for BoxLogp {
        type LogpError = Infallible;

        fn dim(&self) -> usize {
            self.dim
        }

        fn logp(&self, position: &[f64]) -> Result<f64, Infallible> {
            if self.contains(position) {
                Ok(0.)
            } else {
                Ok(f64::NEG_INFINITY)
            }
        }
    }
}
