use arrow::error::ArrowError;
use rand::Rng;
use thiserror::Error;
use tracing::warn;

use crate::{model::LogDensityModel, transition::Transition};

#[derive(Error, Debug)]
pub enum McmcError {
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("Expected {expected} parameter names, got {found}")]
    NameCountMismatch { expected: usize, found: usize },
    #[error("Column name `{0}` appears more than once")]
    DuplicateName(String),
    #[error("Column name `{0}` is reserved for an internal column")]
    ReservedName(String),
    #[error("Transition {draw} carries sampler stats {found:?}, expected {expected:?}")]
    StatsMismatch {
        draw: usize,
        expected: Vec<&'static str>,
        found: Vec<&'static str>,
    },
    #[error("Cannot build a chain from zero transitions")]
    EmptyChain,
    #[error("Invalid settings: {0}")]
    InvalidSettings(&'static str),
    #[error("Logp function returned {logp}")]
    NonFiniteLogp { logp: f64 },
    #[error("Logp function returned unrecoverable error")]
    LogpFailure(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("No initial point with finite log density after {tries} tries")]
    InitializationFailed { tries: usize },
    #[error("Could not export chain")]
    Arrow(#[from] ArrowError),
}

pub type Result<T> = std::result::Result<T, McmcError>;

/// How often we ask the model for a new starting point before giving up.
pub const MAX_INIT_TRIES: usize = 100;

/// An MCMC transition kernel.
///
/// The sampler itself only holds configuration. Everything that evolves
/// from one draw to the next lives in `State`, which `step` consumes and
/// returns, so the order of updates is visible in the types: a state can
/// only be advanced once.
pub trait Sampler {
    type State;

    /// Produce the first transition of a chain and the initial state.
    ///
    /// If `init` is given it is used as the starting point, otherwise the
    /// model is asked for one.
    fn initialize<M, R>(
        &self,
        rng: &mut R,
        model: &M,
        init: Option<&[f64]>,
    ) -> Result<(Transition, Self::State)>
    where
        M: LogDensityModel,
        R: Rng + ?Sized;

    /// Produce exactly one new transition from the previous state.
    fn step<M, R>(
        &self,
        rng: &mut R,
        model: &M,
        state: Self::State,
    ) -> Result<(Transition, Self::State)>
    where
        M: LogDensityModel,
        R: Rng + ?Sized;

    /// Fraction of proposals accepted so far, if the sampler tracks it.
    fn acceptance_rate(&self, _state: &Self::State) -> Option<f64> {
        None
    }
}

/// Find the first point of a chain.
///
/// An explicit `init` is accepted unconditionally, even with zero density.
/// Otherwise candidates from `LogDensityModel::init_position` are tried until
/// one has a finite log density.
pub fn initial_transition<M, R>(rng: &mut R, model: &M, init: Option<&[f64]>) -> Result<Transition>
where
    M: LogDensityModel,
    R: Rng + ?Sized,
{
    let dim = model.dim();
    if let Some(init) = init {
        if init.len() != dim {
            return Err(McmcError::DimensionMismatch {
                expected: dim,
                found: init.len(),
            });
        }
        let transition = Transition::new(model, init)?;
        if transition.logp() == f64::NEG_INFINITY {
            warn!("Initial value has zero density under the model");
        }
        return Ok(transition);
    }

    let mut position = vec![0f64; dim];
    for attempt in 0..MAX_INIT_TRIES {
        model.init_position(rng, &mut position)?;
        let transition = Transition::new(model, &position)?;
        if transition.logp().is_finite() {
            return Ok(transition);
        }
        warn!(attempt, "Initial point candidate has zero density");
    }
    Err(McmcError::InitializationFailed {
        tries: MAX_INIT_TRIES,
    })
}
