use rand::Rng;
use tracing::trace;

use crate::{
    model::{evaluate, LogDensityModel},
    proposal::Proposal,
    sampler::{initial_transition, McmcError, Result, Sampler},
    transition::Transition,
};

/// Name of the stat column that records whether a proposal was accepted.
pub const IS_ACCEPT: &str = "is_accept";

/// Settings for the Metropolis-Hastings sampler
#[derive(Debug, Clone, Copy, Default)]
pub struct MhSettings {
    /// Attach an `is_accept` stat to every transition.
    pub store_accepted: bool,
}

/// Metropolis-Hastings with an arbitrary proposal distribution.
#[derive(Debug, Clone)]
pub struct MetropolisHastings<P: Proposal> {
    proposal: P,
    settings: MhSettings,
}

impl<P: Proposal> MetropolisHastings<P> {
    pub fn new(proposal: P) -> Self {
        Self::with_settings(proposal, MhSettings::default())
    }

    pub fn with_settings(proposal: P, settings: MhSettings) -> Self {
        MetropolisHastings { proposal, settings }
    }

    pub fn proposal(&self) -> &P {
        &self.proposal
    }

    pub fn settings(&self) -> MhSettings {
        self.settings
    }

    fn emit(&self, current: &Transition, accepted: bool) -> Transition {
        let transition = current.clone();
        if self.settings.store_accepted {
            transition.with_stat(IS_ACCEPT, if accepted { 1. } else { 0. })
        } else {
            transition
        }
    }
}

/// The state of a Metropolis-Hastings chain: the last accepted point.
#[derive(Debug, Clone)]
pub struct MhState {
    current: Transition,
    num_steps: u64,
    num_accepted: u64,
}

impl MhState {
    pub fn current(&self) -> &Transition {
        &self.current
    }

    pub fn num_steps(&self) -> u64 {
        self.num_steps
    }

    pub fn num_accepted(&self) -> u64 {
        self.num_accepted
    }

    /// Fraction of accepted proposals, `None` before the first step.
    pub fn acceptance_rate(&self) -> Option<f64> {
        if self.num_steps == 0 {
            None
        } else {
            Some(self.num_accepted as f64 / self.num_steps as f64)
        }
    }
}

/// `log(p(to) q(from | to)) - log(p(from) q(to | from))`.
///
/// A proposal with zero density is always rejected, leaving a zero density
/// point is always accepted.
pub fn log_acceptance_ratio(
    logp_proposed: f64,
    logp_current: f64,
    log_q_reverse: f64,
    log_q_forward: f64,
) -> f64 {
    if logp_proposed == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if logp_current == f64::NEG_INFINITY {
        return f64::INFINITY;
    }
    logp_proposed - logp_current + log_q_reverse - log_q_forward
}

/// Accept iff `ln(u) < min(log_ratio, 0)`. A NaN ratio never accepts.
#[inline]
pub fn accept(log_ratio: f64, u: f64) -> bool {
    !log_ratio.is_nan() && u.ln() < log_ratio.min(0.)
}

impl<P: Proposal> Sampler for MetropolisHastings<P> {
    type State = MhState;

    fn initialize<M, R>(
        &self,
        rng: &mut R,
        model: &M,
        init: Option<&[f64]>,
    ) -> Result<(Transition, MhState)>
    where
        M: LogDensityModel,
        R: Rng + ?Sized,
    {
        if let Some(dim) = self.proposal.dim() {
            if dim != model.dim() {
                return Err(McmcError::DimensionMismatch {
                    expected: model.dim(),
                    found: dim,
                });
            }
        }
        let current = initial_transition(rng, model, init)?;
        let transition = self.emit(&current, true);
        let state = MhState {
            current,
            num_steps: 0,
            num_accepted: 0,
        };
        Ok((transition, state))
    }

    fn step<M, R>(&self, rng: &mut R, model: &M, state: MhState) -> Result<(Transition, MhState)>
    where
        M: LogDensityModel,
        R: Rng + ?Sized,
    {
        let MhState {
            current,
            num_steps,
            mut num_accepted,
        } = state;

        let mut proposed = vec![0f64; current.dim()];
        self.proposal.propose(rng, current.value(), &mut proposed);
        let logp_proposed = evaluate(model, &proposed)?;

        let (log_q_reverse, log_q_forward) = if self.proposal.is_symmetric() {
            (0., 0.)
        } else {
            (
                self.proposal.log_density(&proposed, current.value()),
                self.proposal.log_density(current.value(), &proposed),
            )
        };
        let log_ratio =
            log_acceptance_ratio(logp_proposed, current.logp(), log_q_reverse, log_q_forward);

        let u: f64 = rng.random();
        let accepted = accept(log_ratio, u);
        trace!(draw = num_steps + 1, accepted, log_ratio, "Metropolis step");

        let current = if accepted {
            num_accepted += 1;
            Transition::from_parts(proposed.into(), logp_proposed)
        } else {
            current
        };

        let transition = self.emit(&current, accepted);
        let state = MhState {
            current,
            num_steps: num_steps + 1,
            num_accepted,
        };
        Ok((transition, state))
    }

    fn acceptance_rate(&self, state: &MhState) -> Option<f64> {
        state.acceptance_rate()
    }
}
