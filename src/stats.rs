use crate::utils::{check_finite, check_num};
use anyhow::{Context, Result, bail};

/// First and last points of the percentile curve, in steps of 0.001.
const CURVE_FIRST_STEP: usize = 10;
const CURVE_LAST_STEP: usize = 1000;
const CURVE_STEPS_PER_UNIT: f64 = 1000.0;

/// Whisker reach in units of the interquartile range.
const WHISKER_IQR_FACTOR: f64 = 1.5;

pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

/// Sorted copy of a sample, for order statistics.
pub struct SortedSample {
    vals: Vec<f64>,
}

/// Summary drawn by a box plot.
#[derive(Debug, PartialEq)]
pub struct BoxSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_lo: f64,
    pub whisker_hi: f64,
    pub outliers: Vec<f64>,
}

impl SortedSample {
    pub fn new(vals: &[f64]) -> Result<Self> {
        if vals.is_empty() {
            bail!("sample must not be empty");
        }
        check_finite(vals)?;

        let mut vals = vals.to_vec();
        vals.sort_by(f64::total_cmp);
        Ok(Self { vals })
    }

    pub fn min(&self) -> f64 {
        self.vals[0]
    }

    pub fn max(&self) -> f64 {
        self.vals[self.vals.len() - 1]
    }

    /// Compute the `pct`-th percentile, failing unless `pct` is in `[0, 100]`.
    pub fn checked_percentile(&self, pct: f64) -> Result<f64> {
        check_num(pct, 0.0..=100.0).context("invalid percentage")?;
        Ok(self.percentile(pct))
    }

    /// Linearly interpolated percentile; `pct` is clamped to `[0, 100]`.
    pub fn percentile(&self, pct: f64) -> f64 {
        let n_vals = self.vals.len();
        let rank = pct.clamp(0.0, 100.0) / 100.0 * (n_vals - 1) as f64;
        let lo = (rank.floor() as usize).min(n_vals - 1);
        let hi = (lo + 1).min(n_vals - 1);
        let frac = rank - lo as f64;

        let (val_lo, val_hi) = (self.vals[lo], self.vals[hi]);
        if frac == 0.0 {
            return val_lo;
        }
        let spread = val_hi - val_lo;
        let val = if spread.is_finite() {
            val_lo + spread * frac
        } else {
            val_lo * (1.0 - frac) + val_hi * frac
        };
        // Bounding by the upper neighbour keeps the estimate monotonic under rounding.
        val.min(val_hi)
    }

    /// Loss at every probability from 0.010 to 1.000 in steps of 0.001.
    pub fn percentile_curve(&self) -> Vec<(f64, f64)> {
        (CURVE_FIRST_STEP..=CURVE_LAST_STEP)
            .map(|step| {
                let prob = step as f64 / CURVE_STEPS_PER_UNIT;
                (prob, self.percentile(100.0 * prob))
            })
            .collect()
    }

    pub fn box_summary(&self) -> BoxSummary {
        let q1 = self.percentile(25.0);
        let median = self.percentile(50.0);
        let q3 = self.percentile(75.0);

        let reach = WHISKER_IQR_FACTOR * (q3 - q1);
        let (fence_lo, fence_hi) = (q1 - reach, q3 + reach);

        // The sample is non-empty and q1 and q3 lie inside it, so both searches succeed.
        let whisker_lo = self
            .vals
            .iter()
            .copied()
            .find(|&val| val >= fence_lo)
            .unwrap_or(q1);
        let whisker_hi = self
            .vals
            .iter()
            .rev()
            .copied()
            .find(|&val| val <= fence_hi)
            .unwrap_or(q3);

        let outliers = self
            .vals
            .iter()
            .copied()
            .filter(|&val| val < whisker_lo || val > whisker_hi)
            .collect();

        BoxSummary {
            q1,
            median,
            q3,
            whisker_lo,
            whisker_hi,
            outliers,
        }
    }
}

/// Equal-width histogram normalized to unit area.
pub struct Histogram {
    edges: Vec<f64>,
    densities: Vec<f64>,
}

impl Histogram {
    pub fn new(sample: &SortedSample, n_bins: usize) -> Result<Self> {
        check_num(n_bins, 1..=10_000).context("invalid number of bins")?;

        let (mut lo, mut hi) = (sample.min(), sample.max());
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }
        let width = (hi - lo) / n_bins as f64;

        let mut counts = vec![0_usize; n_bins];
        for &val in &sample.vals {
            // The last bin is closed on the right.
            let i_bin = (((val - lo) / width) as usize).min(n_bins - 1);
            counts[i_bin] += 1;
        }

        let edges = (0..=n_bins).map(|i_edge| lo + i_edge as f64 * width).collect();
        let norm = sample.vals.len() as f64 * width;
        let densities = counts.iter().map(|&count| count as f64 / norm).collect();

        Ok(Self { edges, densities })
    }

    #[cfg(test)]
    pub fn n_bins(&self) -> usize {
        self.densities.len()
    }

    /// Iterate over `(left edge, right edge, density)` triples.
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.edges
            .windows(2)
            .zip(&self.densities)
            .map(|(edge, &density)| (edge[0], edge[1], density))
    }

    pub fn max_density(&self) -> f64 {
        self.densities.iter().copied().fold(0.0, f64::max)
    }
}
