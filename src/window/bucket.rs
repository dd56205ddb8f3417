use log::trace;

use crate::error::{check_dim, Error, Result};
use crate::stats::StatsCollector;

/// Samples sharing one window index, with running statistics per dimension.
#[derive(Debug, Clone)]
pub struct Bucket {
    index: u64,
    stats: StatsCollector,
    samples: Vec<Vec<f64>>,
}

impl Bucket {
    pub fn new(index: u64, dim: usize) -> Bucket {
        Bucket { index, stats: StatsCollector::new(dim), samples: Vec::new() }
    }

    pub fn push(&mut self, values: &[f64]) -> Result<()> {
        self.stats.push(values)?;
        self.samples.push(values.to_vec());
        Ok(())
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn dim(&self) -> usize {
        self.stats.dim()
    }

    pub fn size(&self) -> usize {
        self.samples.len()
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }

    /// Samples in insertion order.
    pub fn samples(&self) -> &[Vec<f64>] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<Vec<f64>> {
        self.samples
    }
}

/// Groups an indexed stream into buckets spanning `size` index units.
///
/// A bucket is only known to be closed when a sample arrives past its range,
/// or when it is flushed. A closed bucket must be taken with `get` before the
/// next one can close.
#[derive(Debug, Clone)]
pub struct Window {
    size: u64,
    last_index: u64,
    seen: Option<u64>,
    last: Option<Bucket>,
    current: Option<Bucket>,
}

impl Window {
    pub fn new(size: u64) -> Result<Window> {
        if size == 0 {
            return Err(Error::InvalidConfig("window size must be positive".into()));
        }
        Ok(Window { size, last_index: 0, seen: None, last: None, current: None })
    }

    /// Adds a sample at `index`.
    ///
    /// Returns the start index of the bucket that was current before the push,
    /// and whether that bucket closed because of it.
    pub fn push(&mut self, index: u64, values: &[f64]) -> Result<(u64, bool)> {
        if let Some(seen) = self.seen {
            if index < seen {
                return Err(Error::InvalidState(format!(
                    "window index went backwards: {} after {}", index, seen
                )));
            }
        }
        // indices never go backwards, so `index >= previous` below
        let previous = self.last_index;

        let mut closed = false;
        match self.current.as_mut() {
            Some(current) if index - previous < self.size => {
                check_dim("window sample arity", current.dim(), values.len())?;
                current.push(values)?;
            }
            open => {
                if open.is_some() && self.last.is_some() {
                    return Err(Error::InvalidState(
                        "closed bucket has not been consumed".into(),
                    ));
                }
                let mut next = Bucket::new(index, values.len());
                next.push(values)?;
                if let Some(done) = self.current.replace(next) {
                    trace!("bucket {} closed by index {}", done.index(), index);
                    self.last = Some(done);
                    closed = true;
                }
                self.last_index = index;
            }
        }
        self.seen = Some(index);
        Ok((previous, closed))
    }

    /// Closes the current bucket without waiting for the next index range.
    /// Returns `false` when there is nothing to close.
    pub fn flush(&mut self) -> Result<bool> {
        if self.current.is_none() {
            return Ok(false);
        }
        if self.last.is_some() {
            return Err(Error::InvalidState("closed bucket has not been consumed".into()));
        }
        self.last = self.current.take();
        trace!("bucket {} flushed", self.last_index);
        Ok(true)
    }

    /// Takes the closed bucket.
    pub fn get(&mut self) -> Result<Bucket> {
        self.last.take()
            .ok_or_else(|| Error::InvalidState("no closed bucket pending".into()))
    }

    pub fn has_pending(&self) -> bool {
        self.last.is_some()
    }

    /// Start index of the bucket being filled.
    pub fn current(&self) -> u64 {
        self.last_index
    }

    /// Index at which the next bucket will start.
    pub fn next(&self) -> u64 {
        self.last_index.saturating_add(self.size)
    }

    /// Samples in the bucket being filled.
    pub fn current_size(&self) -> usize {
        self.current.as_ref().map(|b| b.size()).unwrap_or(0)
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Window over a stream without its own index: every sample advances a
/// counter, and a bucket is returned as soon as it holds `size` samples.
#[derive(Debug, Clone)]
pub struct SizeWindow {
    counter: u64,
    size: usize,
    window: Window,
}

impl SizeWindow {
    pub fn new(size: usize) -> Result<SizeWindow> {
        Ok(SizeWindow { counter: 0, size, window: Window::new(size as u64)? })
    }

    pub fn push(&mut self, values: &[f64]) -> Result<Option<Bucket>> {
        self.window.push(self.counter, values)?;
        self.counter += 1;
        if self.window.current_size() == self.size {
            self.window.flush()?;
            return self.window.get().map(Some);
        }
        Ok(None)
    }

    /// Samples pushed so far.
    pub fn count(&self) -> u64 {
        self.counter
    }

    pub fn size(&self) -> usize {
        self.size
    }
}
