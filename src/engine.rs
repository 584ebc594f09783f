use crate::config::Config;
use anyhow::{Context, Result, bail};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use rand_distr::{Distribution, LogNormal, Poisson};

/// Result of one simulation run.
///
/// Index `i` refers to the same simulated year in all three vectors.
pub struct Simulation {
    pub event_counts: Vec<u64>,
    pub loss_magnitudes: Vec<f64>,
    pub aggregate_losses: Vec<f64>,
}

/// Simulation engine.
///
/// Holds the configuration and the random number generator shared by both samplers.
pub struct Engine {
    cfg: Config,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine`, seeding the generator from `seed` or, if absent, from the OS.
    pub fn new(cfg: Config, seed: Option<u64>) -> Result<Self> {
        let rng = match seed {
            Some(seed) => {
                log::info!("seeding generator with {seed}");
                ChaCha12Rng::seed_from_u64(seed)
            }
            None => {
                log::info!("seeding generator from the OS");
                ChaCha12Rng::try_from_os_rng()?
            }
        };

        Ok(Self { cfg, rng })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    /// Sample event counts and loss magnitudes for every simulated year and combine them.
    pub fn perform_simulation(&mut self) -> Result<Simulation> {
        let n_sims = self.cfg.simulations;

        let event_counts = sample_event_counts(&mut self.rng, self.cfg.event_rate, n_sims)
            .context("failed to sample event counts")?;
        log::info!("sampled {n_sims} event counts");

        let loss_magnitudes = sample_loss_magnitudes(
            &mut self.rng,
            self.cfg.loss_scale,
            self.cfg.loss_shape,
            n_sims,
        )
        .context("failed to sample loss magnitudes")?;
        log::info!("sampled {n_sims} loss magnitudes");

        let aggregate_losses = aggregate_losses(&event_counts, &loss_magnitudes)
            .context("failed to aggregate losses")?;

        Ok(Simulation {
            event_counts,
            loss_magnitudes,
            aggregate_losses,
        })
    }
}

/// Draw `n_sims` Poisson event counts with mean `event_rate`.
///
/// A zero rate is the degenerate distribution at zero.
pub fn sample_event_counts<R: Rng + ?Sized>(
    rng: &mut R,
    event_rate: f64,
    n_sims: usize,
) -> Result<Vec<u64>> {
    if event_rate == 0.0 {
        return Ok(vec![0; n_sims]);
    }
    let count_dist = Poisson::new(event_rate)?;

    let event_counts = (0..n_sims)
        .map(|_| count_dist.sample(&mut *rng) as u64)
        .collect();
    Ok(event_counts)
}

/// Draw `n_sims` Lognormal losses per event whose logarithm has
/// mean `ln(loss_scale)` and standard deviation `loss_shape`.
pub fn sample_loss_magnitudes<R: Rng + ?Sized>(
    rng: &mut R,
    loss_scale: f64,
    loss_shape: f64,
    n_sims: usize,
) -> Result<Vec<f64>> {
    if !(loss_scale > 0.0) {
        bail!("loss scale must be positive, but is {loss_scale:?}");
    }
    // exp(ln(x)) is not always x.
    if loss_shape == 0.0 {
        return Ok(vec![loss_scale; n_sims]);
    }
    let loss_dist = LogNormal::new(loss_scale.ln(), loss_shape)?;

    let loss_magnitudes = (0..n_sims).map(|_| loss_dist.sample(&mut *rng)).collect();
    Ok(loss_magnitudes)
}

/// Multiply each year's event count by its loss per event.
pub fn aggregate_losses(event_counts: &[u64], loss_magnitudes: &[f64]) -> Result<Vec<f64>> {
    let n_counts = event_counts.len();
    let n_losses = loss_magnitudes.len();
    if n_counts != n_losses {
        bail!("got {n_counts} event counts but {n_losses} loss magnitudes");
    }

    let aggregate_losses = event_counts
        .iter()
        .zip(loss_magnitudes)
        .map(|(&count, &loss)| count as f64 * loss)
        .collect();
    Ok(aggregate_losses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{Accumulator, SortedSample};

    fn rng() -> ChaCha12Rng {
        ChaCha12Rng::seed_from_u64(42)
    }

    #[test]
    fn vectors_have_simulation_length() {
        let cfg = Config {
            simulations: 1234,
            ..Config::default()
        };
        let mut engine = Engine::new(cfg, Some(7)).unwrap();
        let sim = engine.perform_simulation().unwrap();

        assert_eq!(sim.event_counts.len(), 1234);
        assert_eq!(sim.loss_magnitudes.len(), 1234);
        assert_eq!(sim.aggregate_losses.len(), 1234);
        assert!(sim.loss_magnitudes.iter().all(|&loss| loss > 0.0));
        assert!(sim.aggregate_losses.iter().all(|&loss| loss >= 0.0));
    }

    #[test]
    fn aggregate_is_count_times_magnitude() {
        let mut engine = Engine::new(Config::default(), Some(3)).unwrap();
        let sim = engine.perform_simulation().unwrap();

        let mut n_zero = 0;
        for i_sim in 0..sim.aggregate_losses.len() {
            let count = sim.event_counts[i_sim];
            let expected = count as f64 * sim.loss_magnitudes[i_sim];
            assert_eq!(sim.aggregate_losses[i_sim], expected);
            if count == 0 {
                assert_eq!(sim.aggregate_losses[i_sim], 0.0);
                n_zero += 1;
            }
        }
        // P(N = 0) = exp(-4) ≈ 1.8 %, so some zero years are expected.
        assert!(n_zero > 0);
    }

    #[test]
    fn same_seed_reproduces_run() {
        let mut a = Engine::new(Config::default(), Some(11)).unwrap();
        let mut b = Engine::new(Config::default(), Some(11)).unwrap();
        assert_eq!(
            a.perform_simulation().unwrap().aggregate_losses,
            b.perform_simulation().unwrap().aggregate_losses
        );
    }

    #[test]
    fn zero_shape_collapses_to_scale() {
        let losses = sample_loss_magnitudes(&mut rng(), 20_000.0, 0.0, 100).unwrap();
        assert!(losses.iter().all(|&loss| loss == 20_000.0));
    }

    #[test]
    fn invalid_sampler_parameters_are_rejected() {
        assert!(sample_event_counts(&mut rng(), -1.0, 10).is_err());
        assert!(sample_event_counts(&mut rng(), f64::NAN, 10).is_err());
        assert!(sample_loss_magnitudes(&mut rng(), 0.0, 0.2, 10).is_err());
        assert!(sample_loss_magnitudes(&mut rng(), 20_000.0, -0.2, 10).is_err());
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(aggregate_losses(&[1, 2], &[10.0]).is_err());
    }

    #[test]
    fn zero_rate_gives_zero_losses() {
        let mut rng = rng();
        let counts = sample_event_counts(&mut rng, 0.0, 5).unwrap();
        assert_eq!(counts, vec![0; 5]);

        let losses = sample_loss_magnitudes(&mut rng, 20_000.0, 0.2, 5).unwrap();
        let aggregate = aggregate_losses(&counts, &losses).unwrap();
        assert_eq!(aggregate, vec![0.0; 5]);

        let sample = SortedSample::new(&aggregate).unwrap();
        for pct in [0.0, 25.0, 80.0, 100.0] {
            assert_eq!(sample.checked_percentile(pct).unwrap(), 0.0);
        }
    }

    /// Mean count converges to the rate and mean aggregate loss to
    /// `rate * scale * exp(shape^2 / 2)`; 200k samples must land within ±2 %.
    #[test]
    fn sample_means_converge() {
        let cfg = Config {
            simulations: 200_000,
            ..Config::default()
        };
        let expected_loss = cfg.expected_loss();
        let mut engine = Engine::new(cfg, Some(42)).unwrap();
        let sim = engine.perform_simulation().unwrap();

        let mut count_acc = Accumulator::new();
        sim.event_counts
            .iter()
            .for_each(|&count| count_acc.add(count as f64));
        let mut loss_acc = Accumulator::new();
        sim.aggregate_losses
            .iter()
            .for_each(|&loss| loss_acc.add(loss));

        let count_mean = count_acc.report().mean;
        let loss_mean = loss_acc.report().mean;
        assert!(
            (count_mean - 4.0).abs() < 0.02 * 4.0,
            "count mean {count_mean} too far from 4"
        );
        assert!(
            (loss_mean - expected_loss).abs() < 0.02 * expected_loss,
            "loss mean {loss_mean:.0} too far from {expected_loss:.0}"
        );
    }
}
