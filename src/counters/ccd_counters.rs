use crate::counters::Timer;
use std::fmt::{Display, Formatter, Result};

/// Performance counters related to continuous collision detection (CCD).
#[derive(Default, Clone, Copy)]
pub struct CCDCounters {
    /// The number of islands integrated with CCD sub-steps.
    pub num_islands: usize,
    /// The number of substeps actually performed by the CCD resolution.
    pub num_substeps: usize,
    /// The total time spent for TOI computation in the CCD resolution.
    pub toi_computation_time: Timer,
}

impl CCDCounters {
    /// Creates a new counter initialized to zero.
    pub fn new() -> Self {
        CCDCounters {
            num_islands: 0,
            num_substeps: 0,
            toi_computation_time: Timer::new(),
        }
    }

    /// Resets this counter to 0.
    pub fn reset(&mut self) {
        self.num_islands = 0;
        self.num_substeps = 0;
        self.toi_computation_time.reset();
    }

    /// Adds the counts and times of `other` to this counter.
    pub fn accumulate(&mut self, other: &CCDCounters) {
        self.num_islands += other.num_islands;
        self.num_substeps += other.num_substeps;
        self.toi_computation_time
            .accumulate(&other.toi_computation_time);
    }
}

impl Display for CCDCounters {
    fn fmt(&self, f: &mut Formatter) -> Result {
        writeln!(f, "Number of CCD islands: {}", self.num_islands)?;
        writeln!(f, "Number of substeps: {}", self.num_substeps)?;
        writeln!(f, "TOI computation time: {}", self.toi_computation_time)
    }
}
