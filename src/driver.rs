//! Drive a `Sampler` against a model and collect the transitions.
//!
//! All entry points thread a single random number generator through every
//! step of a chain. Independent chains each get their own generator.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::debug;

use crate::{
    chain::Chain,
    model::LogDensityModel,
    sampler::{McmcError, Result, Sampler},
    transition::Transition,
};

/// Upper bound on the transitions reserved before a chain starts.
const MAX_RESERVED_DRAWS: u64 = 4096;

/// Settings for a sampling run
#[derive(Debug, Clone, Copy)]
pub struct SampleSettings {
    /// The number of transitions returned per chain.
    pub num_draws: u64,
    /// The number of transitions dropped at the start of each chain.
    pub discard_initial: u64,
    /// Keep every `thinning`-th transition after the discarded ones.
    pub thinning: u64,
    pub num_chains: usize,
    pub seed: u64,
}

impl Default for SampleSettings {
    fn default() -> Self {
        Self {
            num_draws: 1000,
            discard_initial: 0,
            thinning: 1,
            num_chains: 4,
            seed: 0,
        }
    }
}

impl SampleSettings {
    pub fn validate(&self) -> Result<()> {
        if self.num_draws == 0 {
            return Err(McmcError::InvalidSettings("num_draws must be at least 1"));
        }
        if self.thinning == 0 {
            return Err(McmcError::InvalidSettings("thinning must be at least 1"));
        }
        if self.num_chains == 0 {
            return Err(McmcError::InvalidSettings("num_chains must be at least 1"));
        }
        Ok(())
    }
}

enum ChainState<S> {
    Uninitialized,
    Running(S),
    Stopped,
}

/// A lazily advanced chain.
///
/// The first item comes from `Sampler::initialize`, every following one from
/// `Sampler::step`. After an error the iterator is exhausted.
pub struct SampleIter<'a, M, S: Sampler, R: ?Sized> {
    rng: &'a mut R,
    model: &'a M,
    sampler: &'a S,
    init: Option<&'a [f64]>,
    state: ChainState<S::State>,
    draws: u64,
}

impl<'a, M, S, R> SampleIter<'a, M, S, R>
where
    M: LogDensityModel,
    S: Sampler,
    R: Rng + ?Sized,
{
    /// The number of transitions produced so far.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// The sampler state after the last produced transition.
    pub fn state(&self) -> Option<&S::State> {
        match &self.state {
            ChainState::Running(state) => Some(state),
            _ => None,
        }
    }

    /// Acceptance rate reported by the sampler for the current state.
    pub fn acceptance_rate(&self) -> Option<f64> {
        self.state().and_then(|state| self.sampler.acceptance_rate(state))
    }

    fn advance(&mut self, state: ChainState<S::State>) -> Option<Result<(Transition, S::State)>> {
        let result = match state {
            ChainState::Uninitialized => {
                self.sampler
                    .initialize(&mut *self.rng, self.model, self.init)
            }
            ChainState::Running(state) => self.sampler.step(&mut *self.rng, self.model, state),
            ChainState::Stopped => return None,
        };
        let dim = self.model.dim();
        Some(result.and_then(|(transition, state)| {
            if transition.dim() != dim {
                return Err(McmcError::DimensionMismatch {
                    expected: dim,
                    found: transition.dim(),
                });
            }
            Ok((transition, state))
        }))
    }
}

impl<M, S, R> Iterator for SampleIter<'_, M, S, R>
where
    M: LogDensityModel,
    S: Sampler,
    R: Rng + ?Sized,
{
    type Item = Result<Transition>;

    fn next(&mut self) -> Option<Self::Item> {
        let state = std::mem::replace(&mut self.state, ChainState::Stopped);
        match self.advance(state)? {
            Ok((transition, state)) => {
                self.state = ChainState::Running(state);
                self.draws += 1;
                Some(Ok(transition))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

/// Start a chain without fixing its length.
pub fn sample_iter<'a, M, S, R>(
    rng: &'a mut R,
    model: &'a M,
    sampler: &'a S,
    init: Option<&'a [f64]>,
) -> SampleIter<'a, M, S, R>
where
    M: LogDensityModel,
    S: Sampler,
    R: Rng + ?Sized,
{
    SampleIter {
        rng,
        model,
        sampler,
        init,
        state: ChainState::Uninitialized,
        draws: 0,
    }
}

/// Draw exactly `num_draws` transitions from one chain.
///
/// `initialize` is called once and `step` `num_draws - 1` times. Any error
/// aborts the run, no partial result is returned.
pub fn sample<M, S, R>(
    rng: &mut R,
    model: &M,
    sampler: &S,
    num_draws: u64,
    init: Option<&[f64]>,
) -> Result<Vec<Transition>>
where
    M: LogDensityModel,
    S: Sampler,
    R: Rng + ?Sized,
{
    if num_draws == 0 {
        return Err(McmcError::InvalidSettings("num_draws must be at least 1"));
    }
    let mut draws = sample_iter(rng, model, sampler, init);
    let transitions = draws
        .by_ref()
        .take(num_draws as usize)
        .collect::<Result<Vec<_>>>()?;
    let acceptance_rate = draws.acceptance_rate();
    debug!(draws = transitions.len(), ?acceptance_rate, "Finished chain");
    Ok(transitions)
}

/// Draw transitions until `is_done` returns true or `max_draws` is reached.
///
/// `is_done` sees all transitions so far after every completed step, so the
/// returned sequence is always complete up to its last element.
pub fn sample_until<M, S, R, F>(
    rng: &mut R,
    model: &M,
    sampler: &S,
    init: Option<&[f64]>,
    max_draws: u64,
    mut is_done: F,
) -> Result<Vec<Transition>>
where
    M: LogDensityModel,
    S: Sampler,
    R: Rng + ?Sized,
    F: FnMut(&[Transition]) -> bool,
{
    if max_draws == 0 {
        return Err(McmcError::InvalidSettings("max_draws must be at least 1"));
    }
    let mut transitions = Vec::new();
    let mut draws = sample_iter(rng, model, sampler, init);
    for transition in draws.by_ref() {
        transitions.push(transition?);
        if is_done(&transitions) || transitions.len() as u64 == max_draws {
            break;
        }
    }
    let acceptance_rate = draws.acceptance_rate();
    debug!(draws = transitions.len(), ?acceptance_rate, "Stopped chain");
    Ok(transitions)
}

/// Draw `settings.num_draws` transitions after burn-in and thinning.
pub fn sample_with_settings<M, S, R>(
    rng: &mut R,
    model: &M,
    sampler: &S,
    settings: &SampleSettings,
    init: Option<&[f64]>,
) -> Result<Vec<Transition>>
where
    M: LogDensityModel,
    S: Sampler,
    R: Rng + ?Sized,
{
    settings.validate()?;
    let mut transitions = Vec::with_capacity(settings.num_draws.min(MAX_RESERVED_DRAWS) as usize);
    let mut draws = sample_iter(rng, model, sampler, init);
    for (draw, transition) in (0u64..).zip(draws.by_ref()) {
        let transition = transition?;
        if draw < settings.discard_initial {
            continue;
        }
        if (draw - settings.discard_initial) % settings.thinning != 0 {
            continue;
        }
        transitions.push(transition);
        if transitions.len() as u64 == settings.num_draws {
            break;
        }
    }
    let acceptance_rate = draws.acceptance_rate();
    debug!(
        draws = transitions.len(),
        discarded = settings.discard_initial,
        ?acceptance_rate,
        "Finished chain"
    );
    Ok(transitions)
}

/// The chains of a multi-chain run, sorted by chain id.
#[derive(Debug, Clone)]
pub struct Trace {
    pub chains: Vec<Chain>,
}

impl<I: Iterator<Item = Chain>> From<I> for Trace {
    fn from(value: I) -> Self {
        let mut chains: Vec<Chain> = value.collect();
        chains.sort_unstable_by_key(|x| x.chain_id());
        Trace { chains }
    }
}

/// Run `settings.num_chains` independent chains in parallel.
///
/// Chain `i` uses a `ChaCha8Rng` seeded with `settings.seed` on stream `i`,
/// so the result does not depend on how the chains are scheduled.
pub fn sample_chains<M, S>(
    model: &M,
    sampler: &S,
    settings: &SampleSettings,
    init: Option<&[f64]>,
    names: Option<&[String]>,
) -> Result<Trace>
where
    M: LogDensityModel + Sync,
    S: Sampler + Sync,
{
    settings.validate()?;
    let chains = (0..settings.num_chains as u64)
        .into_par_iter()
        .map(|chain_id| {
            let mut rng = ChaCha8Rng::seed_from_u64(settings.seed);
            rng.set_stream(chain_id);
            debug!(chain = chain_id, "Starting chain");
            let transitions = sample_with_settings(&mut rng, model, sampler, settings, init)?;
            let chain = Chain::from_transitions(&transitions, names.map(<[String]>::to_vec))?;
            Ok(chain.with_chain_id(chain_id))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Trace::from(chains.into_iter()))
}
