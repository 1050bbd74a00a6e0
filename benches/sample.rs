use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use mcmc_core::{
    assemble, sample, test_logps::NormalLogp, MetropolisHastings, RandomWalk, Sampler,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn make_sampler(dim: usize) -> MetropolisHastings<RandomWalk> {
    let scale = 2.38 / (dim as f64).sqrt();
    MetropolisHastings::new(RandomWalk::new(scale).expect("Invalid proposal scale"))
}

fn criterion_benchmark(c: &mut Criterion) {
    for dim in [10, 1000] {
        let model = NormalLogp::new(dim, 3.);
        let sampler = make_sampler(dim);
        let init = vec![3.5; dim];
        let init = Some(init.as_slice());

        c.bench_function(&format!("step normal {dim}"), |b| {
            b.iter_batched(
                || {
                    let mut rng = ChaCha8Rng::seed_from_u64(42);
                    let (_, state) = sampler.initialize(&mut rng, &model, init).unwrap();
                    (rng, state)
                },
                |(mut rng, state)| sampler.step(&mut rng, &model, black_box(state)).unwrap(),
                BatchSize::SmallInput,
            )
        });

        c.bench_function(&format!("sample 1000 normal {dim}"), |b| {
            b.iter_batched(
                || ChaCha8Rng::seed_from_u64(42),
                |mut rng| sample(&mut rng, &model, &sampler, black_box(1000), init).unwrap(),
                BatchSize::SmallInput,
            )
        });

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let transitions = sample(&mut rng, &model, &sampler, 1000, init).unwrap();
        c.bench_function(&format!("assemble 1000 normal {dim}"), |b| {
            b.iter(|| assemble(black_box(&transitions), None).unwrap())
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
