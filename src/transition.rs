use crate::{
    model::{evaluate, LogDensityModel},
    sampler::Result,
};

/// The output of a single sampler step.
///
/// Pairs a parameter vector with its log density under the model. The log
/// density is cached when the transition is created and never recomputed.
/// Samplers can attach named scalar statistics, which end up as internal
/// columns of the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    value: Box<[f64]>,
    logp: f64,
    stats: Vec<(&'static str, f64)>,
}

impl Transition {
    /// Evaluate `model` once at `value` and store the result.
    pub fn new<M: LogDensityModel + ?Sized>(model: &M, value: &[f64]) -> Result<Self> {
        let logp = evaluate(model, value)?;
        Ok(Self::from_parts(value.into(), logp))
    }

    /// Build a transition from a log density the caller already computed.
    ///
    /// `logp` must be the log density of `value` under the model that is
    /// being sampled.
    pub fn from_parts(value: Box<[f64]>, logp: f64) -> Self {
        Transition {
            value,
            logp,
            stats: Vec::new(),
        }
    }

    pub fn with_stat(mut self, name: &'static str, value: f64) -> Self {
        self.stats.push((name, value));
        self
    }

    pub fn value(&self) -> &[f64] {
        &self.value
    }

    /// The cached log density of `value`.
    pub fn logp(&self) -> f64 {
        self.logp
    }

    pub fn stats(&self) -> &[(&'static str, f64)] {
        &self.stats
    }

    pub fn dim(&self) -> usize {
        self.value.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_logps::NormalLogp;
    use pretty_assertions::assert_eq;

    #[test]
    fn caches_logp() {
        let model = NormalLogp::new(2, 0.);
        let transition = Transition::new(&model, &[1., 2.]).unwrap();
        assert_eq!(transition.value(), &[1., 2.]);
        assert_eq!(transition.logp(), -2.5);
        assert_eq!(transition.dim(), 2);
        assert!(transition.stats().is_empty());
    }

    #[test]
    fn stats_keep_order() {
        let transition = Transition::from_parts(vec![0.].into(), 0.)
            .with_stat("b", 1.)
            .with_stat("a", 2.);
        assert_eq!(transition.stats(), &[("b", 1.), ("a", 2.)]);
    }
}
