use crate::error::{check_dim, Error, Result};

/// Online summary of a stream of numbers.
///
/// Mean and variance are kept with Welford's update, so pushing never
/// revisits earlier values. Readings on an empty accumulator are `0.0`,
/// except `min`/`max` which stay at `+inf`/`-inf`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    count: usize,
    sum: f64,
    first: f64,
    last: f64,
    min: f64,
    max: f64,
    mean: f64,
    d_squared: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Stats::new()
    }
}

impl Stats {
    pub fn new() -> Stats {
        Stats {
            count: 0,
            sum: 0.0,
            first: 0.0,
            last: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            mean: 0.0,
            d_squared: 0.0,
        }
    }

    pub fn push(&mut self, v: f64) {
        self.count += 1;
        self.sum += v;
        let mean = self.mean + (v - self.mean) / self.count as f64;
        self.d_squared += (v - mean) * (v - self.mean);
        self.mean = mean;

        if self.count == 1 {
            self.first = v;
        }
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        self.last = v;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn average(&self) -> f64 {
        self.mean
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn first(&self) -> f64 {
        self.first
    }

    pub fn last(&self) -> f64 {
        self.last
    }

    /// Last value minus first value.
    pub fn diff(&self) -> f64 {
        self.last - self.first
    }

    /// Population variance.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.d_squared / self.count as f64
    }

    pub fn stdev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Bessel-corrected variance; needs at least two values.
    pub fn sample_variance(&self) -> Result<f64> {
        if self.count < 2 {
            return Err(Error::InvalidState(format!(
                "sample variance needs at least 2 values, got {}",
                self.count
            )));
        }
        Ok(self.d_squared / (self.count - 1) as f64)
    }

    pub fn sample_stdev(&self) -> Result<f64> {
        Ok(self.sample_variance()?.sqrt())
    }
}

/// One `Stats` per dimension of a fixed-arity sample.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsCollector {
    stats: Vec<Stats>,
}

impl StatsCollector {
    pub fn new(dim: usize) -> StatsCollector {
        StatsCollector { stats: vec![Stats::new(); dim] }
    }

    /// Pushes `values[i]` into dimension `i`. Nothing is recorded on an arity mismatch.
    pub fn push(&mut self, values: &[f64]) -> Result<()> {
        check_dim("stats collector arity", self.stats.len(), values.len())?;
        self.stats.iter_mut().zip(values).for_each(|(s, &v)| s.push(v));
        Ok(())
    }

    pub fn stats(&self) -> &[Stats] {
        &self.stats
    }

    pub fn dim(&self) -> usize {
        self.stats.len()
    }

    /// Number of samples pushed so far.
    pub fn size(&self) -> usize {
        self.stats.first().map(|s| s.count()).unwrap_or(0)
    }
}
