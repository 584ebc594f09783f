use crate::utils::check_num;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, ops::Bound, path::Path};

/// Simulation parameters.
///
/// Defaults reproduce the reference scenario: 10 000 simulated years, four
/// events per year on average, 20 000 per event, a dispersion of 0.2 and the
/// 80th percentile as reserve. See [`Config::from_file`] for overriding them.
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Number of simulated years.
    pub simulations: usize,

    /// Expected number of events per year (Poisson mean).
    pub event_rate: f64,
    /// Typical loss per event (Lognormal median, `exp(mu)`).
    pub loss_scale: f64,
    /// Dispersion of the loss per event (Lognormal `sigma`).
    pub loss_shape: f64,

    /// Reserve percentile, as a fraction in `(0, 1)`.
    pub percentile: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulations: 10_000,
            event_rate: 4.0,
            loss_scale: 20_000.0,
            loss_shape: 0.2,
            percentile: 0.8,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Missing keys keep their default value and unknown keys are rejected.
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_num(self.simulations, 1..).context("invalid number of simulations")?;

        let positive = (Bound::Excluded(0.0), Bound::Excluded(f64::INFINITY));
        check_num(self.event_rate, positive).context("invalid event rate")?;
        check_num(self.loss_scale, positive).context("invalid loss scale")?;
        check_num(self.loss_shape, 0.0..f64::INFINITY).context("invalid loss shape")?;

        check_num(self.percentile, (Bound::Excluded(0.0), Bound::Excluded(1.0)))
            .context("invalid percentile")?;

        Ok(())
    }

    /// Theoretical mean of the annual aggregate loss.
    pub fn expected_loss(&self) -> f64 {
        self.event_rate * self.loss_scale * (self.loss_shape.powi(2) / 2.0).exp()
    }
}
