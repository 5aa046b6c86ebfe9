use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::{Error, ErrorState, FeedforwardNetwork, Result, WeightMatrix};

use super::WeightOptimizer;

/// Noise shape used to perturb weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PerturbationDistribution {
    /// `1 - 2u` with `u` uniform in `[0, 1)`.
    Uniform,
    /// Zero-mean normal with standard deviation [`AnnealingConfig::variance`].
    Normal,
}

/// Hyperparameters of [`SimulatedAnnealing`]. Every field is required.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnnealingConfig {
    pub start_temperature: f64,
    pub stop_temperature: f64,
    /// Stop as soon as the best error reaches this value.
    pub error_threshold: f64,
    pub temperature_steps: usize,
    pub iterations_per_temperature: usize,
    /// How far the iteration counter is rolled back after an improvement.
    pub setback: usize,
    pub distribution: PerturbationDistribution,
    /// Spread of the normal noise. Unused by the uniform distribution.
    pub variance: f64,
    pub seed: u64,
}

impl AnnealingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.start_temperature.is_finite() && self.start_temperature > 0.0) {
            return Err(Error::config(format!(
                "start_temperature must be finite and > 0, got {}",
                self.start_temperature
            )));
        }
        if !(self.stop_temperature.is_finite() && self.stop_temperature > 0.0) {
            return Err(Error::config(format!(
                "stop_temperature must be finite and > 0, got {}",
                self.stop_temperature
            )));
        }
        if self.error_threshold.is_nan() {
            return Err(Error::config("error_threshold must not be NaN"));
        }
        if self.temperature_steps == 0 {
            return Err(Error::config("temperature_steps must be > 0"));
        }
        if self.iterations_per_temperature == 0 {
            return Err(Error::config("iterations_per_temperature must be > 0"));
        }
        if !(self.variance.is_finite() && self.variance >= 0.0) {
            return Err(Error::config(format!(
                "variance must be finite and >= 0, got {}",
                self.variance
            )));
        }
        Ok(())
    }

    /// Factor applied to the temperature after each step, so that the last step runs
    /// at `stop_temperature`.
    pub fn temperature_multiplier(&self) -> f64 {
        if self.temperature_steps < 2 {
            return 1.0;
        }
        ((self.stop_temperature / self.start_temperature).ln()
            / (self.temperature_steps - 1) as f64)
            .exp()
    }
}

/// Summary of the last annealing pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnealingRun {
    pub initial_error: f64,
    pub best_error: f64,
    pub temperatures_run: usize,
}

#[derive(Debug, Clone, Copy)]
enum Noise {
    Uniform,
    Normal(Normal<f64>),
}

impl Noise {
    #[inline]
    fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> f64 {
        match self {
            Noise::Uniform => 1.0 - 2.0 * rng.gen_range(0.0..1.0),
            Noise::Normal(normal) => normal.sample(rng),
        }
    }
}

/// Simulated annealing around the best weights found so far.
///
/// At each of `temperature_steps` temperatures, up to `iterations_per_temperature`
/// candidates `best + T·noise` are evaluated. Every candidate is generated from its
/// own seed, so an improvement only records the seed; the best weights are
/// regenerated from it once per temperature instead of being copied on every
/// improvement.
///
/// Always reports convergence. It is meant to run as the trainer's secondary
/// optimizer after a gradient method stalls.
#[derive(Debug, Clone)]
pub struct SimulatedAnnealing {
    config: AnnealingConfig,
    noise: Noise,
    rng: StdRng,
    best: WeightMatrix,
    last_run: Option<AnnealingRun>,
}

impl SimulatedAnnealing {
    pub fn new(config: AnnealingConfig) -> Result<Self> {
        config.validate()?;
        let noise = match config.distribution {
            PerturbationDistribution::Uniform => Noise::Uniform,
            PerturbationDistribution::Normal => Noise::Normal(
                Normal::new(0.0, config.variance).map_err(|e| Error::config(e.to_string()))?,
            ),
        };

        Ok(Self {
            noise,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            best: WeightMatrix::default(),
            last_run: None,
        })
    }

    #[inline]
    pub fn config(&self) -> &AnnealingConfig {
        &self.config
    }

    #[inline]
    pub fn last_run(&self) -> Option<AnnealingRun> {
        self.last_run
    }

    fn anneal(&mut self, state: &mut ErrorState<'_>) -> AnnealingRun {
        let AnnealingConfig {
            start_temperature,
            error_threshold,
            temperature_steps,
            iterations_per_temperature,
            setback,
            ..
        } = self.config;

        self.best.assign(state.network_mut().weights());
        let initial_error = state.compute_epoch_error(false);
        let mut best_error = initial_error;

        let multiplier = self.config.temperature_multiplier();
        let mut temperature = start_temperature;
        let mut temperatures_run = 0;

        for step in 0..temperature_steps {
            temperatures_run += 1;
            let mut best_seed = None;

            let mut j = 0;
            while j < iterations_per_temperature {
                let seed = self.rng.next_u64();
                perturb(state, &self.best, temperature, seed, self.noise);
                let error = state.compute_epoch_error(false);

                if error < best_error {
                    best_error = error;
                    best_seed = Some(seed);
                    if best_error <= error_threshold {
                        break;
                    }
                    // Keep exploring at this temperature while it pays off.
                    j = j.saturating_sub(setback);
                }
                j += 1;
            }

            if let Some(seed) = best_seed {
                perturb(state, &self.best, temperature, seed, self.noise);
                self.best.assign(state.network_mut().weights());
            }

            debug!(
                step,
                temperature,
                best_error,
                improved = best_seed.is_some(),
                "annealing temperature done"
            );

            if best_error <= error_threshold || state.abort_requested() {
                break;
            }
            temperature *= multiplier;
        }

        state.network_mut().weights_mut().copy_from(&self.best);

        AnnealingRun {
            initial_error,
            best_error,
            temperatures_run,
        }
    }
}

/// `weights = center + temperature · noise`, with noise drawn from a generator
/// seeded by `seed`.
fn perturb(
    state: &mut ErrorState<'_>,
    center: &WeightMatrix,
    temperature: f64,
    seed: u64,
    noise: Noise,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    let weights = state.network_mut().weights_mut();
    for (w, &c) in weights.iter_mut().zip(center.iter()) {
        *w = c + temperature * noise.sample(&mut rng);
    }
}

impl WeightOptimizer for SimulatedAnnealing {
    fn initialize(&mut self, _network: &mut dyn FeedforwardNetwork) {}

    fn optimize_weights(&mut self, state: &mut ErrorState<'_>) -> bool {
        let run = self.anneal(state);
        self.last_run = Some(run);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AbortHandle, Dataset, MultilayerPerceptron, RandomWeightInitializer, WeightInitializer,
    };

    fn config(distribution: PerturbationDistribution, seed: u64) -> AnnealingConfig {
        AnnealingConfig {
            start_temperature: 1.0,
            stop_temperature: 0.01,
            error_threshold: 1e-5,
            temperature_steps: 5,
            iterations_per_temperature: 50,
            setback: 10,
            distribution,
            variance: 0.5,
            seed,
        }
    }

    fn xor() -> Dataset {
        Dataset::from_pairs([
            (vec![0.0, 0.0], vec![0.0]),
            (vec![0.0, 1.0], vec![1.0]),
            (vec![1.0, 0.0], vec![1.0]),
            (vec![1.0, 1.0], vec![0.0]),
        ])
    }

    #[test]
    fn temperature_schedule_ends_at_the_stop_temperature() {
        let cfg = config(PerturbationDistribution::Uniform, 0);
        let mut t = cfg.start_temperature;
        for _ in 1..cfg.temperature_steps {
            t *= cfg.temperature_multiplier();
        }
        assert!((t - cfg.stop_temperature).abs() < 1e-12);

        let single = AnnealingConfig {
            temperature_steps: 1,
            ..cfg
        };
        assert_eq!(single.temperature_multiplier(), 1.0);
    }

    #[test]
    fn validate_rejects_bad_hyperparameters() {
        let good = config(PerturbationDistribution::Normal, 0);
        assert!(good.validate().is_ok());
        for bad in [
            AnnealingConfig {
                start_temperature: 0.0,
                ..good
            },
            AnnealingConfig {
                temperature_steps: 0,
                ..good
            },
            AnnealingConfig {
                iterations_per_temperature: 0,
                ..good
            },
            AnnealingConfig {
                variance: -1.0,
                ..good
            },
        ] {
            assert!(SimulatedAnnealing::new(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn best_error_never_exceeds_the_initial_error() {
        let data = xor();
        for (seed, distribution) in [
            (1, PerturbationDistribution::Uniform),
            (2, PerturbationDistribution::Normal),
            (3, PerturbationDistribution::Normal),
        ] {
            let mut net = MultilayerPerceptron::new(&[2, 2, 1]).unwrap();
            RandomWeightInitializer::with_seed(seed).initialize_weights(&mut net);

            let mut sa = SimulatedAnnealing::new(config(distribution, seed)).unwrap();
            sa.initialize(&mut net);
            assert!(sa.last_run().is_none());

            let mut state = ErrorState::new(&mut net, &data);
            assert!(sa.optimize_weights(&mut state));

            let run = sa.last_run().unwrap();
            assert!(run.best_error <= run.initial_error);
            assert!(run.temperatures_run >= 1 && run.temperatures_run <= 5);
            // The best weights were written back.
            let error = state.compute_epoch_error(false);
            assert!((error - run.best_error).abs() < 1e-12, "{error} vs {run:?}");
        }
    }

    #[test]
    fn same_seed_same_result() {
        let data = xor();
        let run = |seed| {
            let mut net = MultilayerPerceptron::new(&[2, 2, 1]).unwrap();
            RandomWeightInitializer::with_seed(4).initialize_weights(&mut net);
            let mut sa = SimulatedAnnealing::new(config(PerturbationDistribution::Normal, seed))
                .unwrap();
            let mut state = ErrorState::new(&mut net, &data);
            sa.optimize_weights(&mut state);
            drop(state);
            net.weights().clone()
        };
        assert_eq!(run(8), run(8));
        assert_ne!(run(8), run(9));
    }

    #[test]
    fn abort_request_stops_after_one_temperature() {
        let data = xor();
        let mut net = MultilayerPerceptron::new(&[2, 3, 1]).unwrap();
        RandomWeightInitializer::with_seed(5).initialize_weights(&mut net);

        let mut sa = SimulatedAnnealing::new(config(PerturbationDistribution::Normal, 5)).unwrap();
        let handle = AbortHandle::new();
        handle.abort();
        let mut state = ErrorState::new(&mut net, &data);
        state.set_abort_handle(handle);

        assert!(sa.optimize_weights(&mut state));

        let run = sa.last_run().unwrap();
        assert_eq!(run.temperatures_run, 1);
        assert!(run.best_error <= run.initial_error);
        let error = state.compute_epoch_error(false);
        assert!((error - run.best_error).abs() < 1e-12, "{error} vs {run:?}");
    }
}
