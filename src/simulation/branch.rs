//! Branch policies
//!
//! A stage with several outgoing transitions picks one of them either by
//! weighted random selection ([`BranchSampler`]) or by a two-way boolean
//! split ([`BernoulliTrial`]). Which one applies is fixed when the graph is
//! built, from the transition attributes.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

/// Produces a value in `[0, 1)` used for cumulative-probability selection
pub trait BranchSampler<E> {
    fn sample(&mut self, entity: &E) -> f64;
}

/// Produces the outcome of a two-way split
pub trait BernoulliTrial<E> {
    fn trial(&mut self, entity: &E) -> bool;
}

/// Sampler attached to a stage
pub enum Sampler<E> {
    Weighted(Box<dyn BranchSampler<E>>),
    Bernoulli(Box<dyn BernoulliTrial<E>>),
}

impl<E> Sampler<E> {
    pub fn kind(&self) -> &'static str {
        match self {
            Sampler::Weighted(_) => "weighted sampler",
            Sampler::Bernoulli(_) => "Bernoulli trial",
        }
    }
}

/// Uniform draws in `[0, 1)`, ignoring the entity
///
/// Uses its own seeded RNG when one is given, the thread RNG otherwise.
#[derive(Debug, Clone, Default)]
pub struct UniformSampler {
    rng: Option<StdRng>,
}

impl UniformSampler {
    pub fn new() -> Self {
        Self { rng: None }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Some(StdRng::seed_from_u64(seed)),
        }
    }
}

impl<E> BranchSampler<E> for UniformSampler {
    fn sample(&mut self, _entity: &E) -> f64 {
        match &mut self.rng {
            Some(rng) => rng.random::<f64>(),
            None => rand::rng().random::<f64>(),
        }
    }
}

/// Always returns the same value
#[derive(Debug, Clone, Copy)]
pub struct FixedSample(pub f64);

impl<E> BranchSampler<E> for FixedSample {
    fn sample(&mut self, _entity: &E) -> f64 {
        self.0
    }
}

/// Biased coin: `true` with the given probability
#[derive(Debug, Clone)]
pub struct CoinFlip {
    probability: f64,
    rng: Option<StdRng>,
}

impl CoinFlip {
    pub fn new(probability: f64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            rng: None,
        }
    }

    pub fn seeded(probability: f64, seed: u64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            rng: Some(StdRng::seed_from_u64(seed)),
        }
    }
}

impl<E> BernoulliTrial<E> for CoinFlip {
    fn trial(&mut self, _entity: &E) -> bool {
        match &mut self.rng {
            Some(rng) => rng.random_bool(self.probability),
            None => rand::rng().random_bool(self.probability),
        }
    }
}

/// Always returns the same outcome
#[derive(Debug, Clone, Copy)]
pub struct FixedOutcome(pub bool);

impl<E> BernoulliTrial<E> for FixedOutcome {
    fn trial(&mut self, _entity: &E) -> bool {
        self.0
    }
}

/// Adapts a closure into a [`BranchSampler`]
pub struct SamplerFn<F>(F);

pub fn sampler_fn<E, F>(f: F) -> SamplerFn<F>
where
    F: FnMut(&E) -> f64,
{
    SamplerFn(f)
}

impl<E, F> BranchSampler<E> for SamplerFn<F>
where
    F: FnMut(&E) -> f64,
{
    fn sample(&mut self, entity: &E) -> f64 {
        (self.0)(entity)
    }
}

/// Adapts a closure into a [`BernoulliTrial`]
pub struct TrialFn<F>(F);

pub fn trial_fn<E, F>(f: F) -> TrialFn<F>
where
    F: FnMut(&E) -> bool,
{
    TrialFn(f)
}

impl<E, F> BernoulliTrial<E> for TrialFn<F>
where
    F: FnMut(&E) -> bool,
{
    fn trial(&mut self, entity: &E) -> bool {
        (self.0)(entity)
    }
}
