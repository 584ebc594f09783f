use crate::config::Config;
use crate::engine::Engine;
use crate::report::Reporter;
use crate::stats::Accumulator;
use anyhow::{Context, Result};
use std::path::Path;

pub struct Manager {
    cfg: Config,
    reporter: Reporter,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(cfg_file: Option<P>, out_dir: P) -> Result<Self> {
        let cfg = match cfg_file {
            Some(cfg_file) => {
                Config::from_file(cfg_file).context("failed to construct cfg")?
            }
            None => Config::default(),
        };
        log::info!("{cfg:#?}");

        let reporter = Reporter::new(out_dir).context("failed to construct reporter")?;

        Ok(Self { cfg, reporter })
    }

    pub fn run_simulation(&self, seed: Option<u64>) -> Result<()> {
        let mut engine =
            Engine::new(self.cfg.clone(), seed).context("failed to construct engine")?;

        let sim = engine
            .perform_simulation()
            .context("failed to perform simulation")?;

        let mut count_acc = Accumulator::new();
        for &count in &sim.event_counts {
            count_acc.add(count as f64);
        }
        let mut magnitude_acc = Accumulator::new();
        for &loss in &sim.loss_magnitudes {
            magnitude_acc.add(loss);
        }
        let mut loss_acc = Accumulator::new();
        for &loss in &sim.aggregate_losses {
            loss_acc.add(loss);
        }
        for (name, acc) in [
            ("event counts", &count_acc),
            ("loss magnitudes", &magnitude_acc),
            ("aggregate losses", &loss_acc),
        ] {
            let report = acc.report();
            log::info!("{name}: mean = {}, std_dev = {}", report.mean, report.std_dev);
        }
        log::info!("expected aggregate loss: {}", engine.cfg().expected_loss());

        self.reporter
            .report(&sim.aggregate_losses, self.cfg.percentile)
            .context("failed to report results")?;

        Ok(())
    }
}
