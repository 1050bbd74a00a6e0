//! Drive arbitrary MCMC samplers against unnormalized log densities.
//!
//! A [`Sampler`] only has to provide `initialize` and `step`; the driver
//! functions in this crate sequence the calls, thread the random number
//! generator through them and collect the resulting [`Transition`]s, which
//! can then be assembled into a [`Chain`].

pub(crate) mod chain;
pub(crate) mod driver;
pub(crate) mod metropolis;
pub(crate) mod model;
pub(crate) mod proposal;
pub(crate) mod sampler;
pub(crate) mod transition;

pub use chain::{assemble, Chain, Section, LOGP_NAME};
pub use driver::{
    sample, sample_chains, sample_iter, sample_until, sample_with_settings, SampleIter,
    SampleSettings, Trace,
};
pub use metropolis::{
    accept, log_acceptance_ratio, MetropolisHastings, MhSettings, MhState, IS_ACCEPT,
};
pub use model::{evaluate, test_logps, DensityFn, LogDensityModel, LogpError};
pub use proposal::{Independent, Proposal, RandomWalk};
pub use sampler::{initial_transition, McmcError, Result, Sampler, MAX_INIT_TRIES};
pub use transition::Transition;
