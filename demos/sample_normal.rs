use mcmc_core::{sample_chains, LogDensityModel, MetropolisHastings, RandomWalk, SampleSettings};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

struct NormalModel {
    mu: Box<[f64]>,
}

impl LogDensityModel for NormalModel {
    type LogpError = std::convert::Infallible;

    fn dim(&self) -> usize {
        self.mu.len()
    }

    fn logp(&self, position: &[f64]) -> Result<f64, Self::LogpError> {
        Ok(position
            .iter()
            .zip(self.mu.iter())
            .map(|(&p, &mu)| -0.5 * (p - mu) * (p - mu))
            .sum())
    }

    fn init_position<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        position: &mut [f64],
    ) -> mcmc_core::Result<()> {
        let normal = StandardNormal;
        position.iter_mut().for_each(|x| *x = normal.sample(rng));
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let model = NormalModel {
        mu: vec![0.5, -1., 3.].into(),
    };
    let sampler = MetropolisHastings::new(RandomWalk::new(1.)?);
    let settings = SampleSettings {
        num_draws: 2000,
        discard_initial: 500,
        seed: 42,
        ..Default::default()
    };
    let names = ["a", "b", "c"].map(String::from);

    let trace = sample_chains(&model, &sampler, &settings, None, Some(&names[..]))?;
    for chain in &trace.chains {
        let means: Vec<f64> = chain
            .parameter_names()
            .map(|name| {
                let values = chain.column(name).unwrap_or_default();
                values.iter().sum::<f64>() / values.len() as f64
            })
            .collect();
        println!("chain {:?}: means {:?}", chain.chain_id(), means);
    }
    Ok(())
}
