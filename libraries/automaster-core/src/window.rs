//! Fixed-length energy windows
//!
//! `SampleWindow` accumulates squared samples until a window of fixed length
//! is complete, then yields its mean square. `EnergyHistory` keeps the most
//! recent completed window energies so longer measurement periods can be
//! formed by energy averaging (for example four 100 ms hops make one 400 ms
//! block).

/// Accumulates squared samples into fixed-size analysis windows
#[derive(Debug, Clone)]
pub struct SampleWindow {
    len: usize,
    sum: f64,
    count: usize,
}

impl SampleWindow {
    /// Create a window of `len` samples (a zero length is treated as one)
    pub fn new(len: usize) -> Self {
        Self {
            len: len.max(1),
            sum: 0.0,
            count: 0,
        }
    }

    /// Create a window spanning `secs` seconds at `sample_rate`
    pub fn from_duration(sample_rate: u32, secs: f64) -> Self {
        Self::new((f64::from(sample_rate) * secs).round() as usize)
    }

    /// Push one raw sample
    ///
    /// Returns the window's mean square when it completes.
    #[inline]
    pub fn push(&mut self, sample: f64) -> Option<f64> {
        self.push_energy(sample * sample)
    }

    /// Push an already squared (or channel-weighted) energy value
    #[inline]
    pub fn push_energy(&mut self, energy: f64) -> Option<f64> {
        self.sum += energy;
        self.count += 1;
        if self.count < self.len {
            return None;
        }
        let mean = self.sum / self.len as f64;
        self.reset();
        Some(mean)
    }

    /// Discard any partially accumulated window
    pub fn reset(&mut self) {
        self.sum = 0.0;
        self.count = 0;
    }

    /// Window length in samples
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of samples accumulated in the current (incomplete) window
    pub fn pending(&self) -> usize {
        self.count
    }

    /// True when no samples are pending
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Fixed-capacity ring of completed window energies
#[derive(Debug, Clone)]
pub struct EnergyHistory {
    values: Box<[f64]>,
    head: usize,
    filled: usize,
}

impl EnergyHistory {
    /// Create a history holding up to `capacity` energies
    pub fn new(capacity: usize) -> Self {
        Self {
            values: vec![0.0; capacity.max(1)].into_boxed_slice(),
            head: 0,
            filled: 0,
        }
    }

    /// Record a completed window energy, overwriting the oldest when full
    #[inline]
    pub fn push(&mut self, energy: f64) {
        self.values[self.head] = energy;
        self.head = (self.head + 1) % self.values.len();
        self.filled = (self.filled + 1).min(self.values.len());
    }

    /// Mean of the most recent `n` energies
    ///
    /// Returns `None` until at least `n` energies have been recorded (or when
    /// `n` is zero or exceeds the capacity).
    pub fn mean_of_last(&self, n: usize) -> Option<f64> {
        if n == 0 || n > self.filled {
            return None;
        }
        let cap = self.values.len();
        let sum: f64 = (1..=n)
            .map(|back| self.values[(self.head + cap - back) % cap])
            .sum();
        Some(sum / n as f64)
    }

    /// Most recent energy
    pub fn latest(&self) -> Option<f64> {
        self.mean_of_last(1)
    }

    /// Number of energies currently stored
    pub fn len(&self) -> usize {
        self.filled
    }

    /// True when nothing has been recorded since creation or reset
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Maximum number of stored energies
    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    /// Forget all recorded energies
    pub fn reset(&mut self) {
        self.values.fill(0.0);
        self.head = 0;
        self.filled = 0;
    }
}
