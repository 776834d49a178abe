use crate::counters::Timer;
use std::fmt::{Display, Formatter, Result};

/// Performance counters related to the resolution of the island constraints.
#[derive(Default, Clone, Copy)]
pub struct SolverCounters {
    /// Number of islands solved.
    pub nislands: usize,
    /// Number of joints of the solved islands.
    pub njoints: usize,
    /// Number of Jacobian rows generated.
    pub nrows: usize,
    /// Total number of solver passes performed.
    pub solver_passes: usize,
    /// Number of dense skeleton solves that failed and left their forces unchanged.
    pub lcp_failures: usize,
    /// Time spent building the Jacobian rows.
    pub jacobian_assembly_time: Timer,
    /// Time spent computing the constraint forces.
    pub force_resolution_time: Timer,
    /// Time spent integrating the bodies and updating their sleep state.
    pub integration_time: Timer,
}

impl SolverCounters {
    /// Creates a new counter initialized to zero.
    pub fn new() -> Self {
        SolverCounters {
            nislands: 0,
            njoints: 0,
            nrows: 0,
            solver_passes: 0,
            lcp_failures: 0,
            jacobian_assembly_time: Timer::new(),
            force_resolution_time: Timer::new(),
            integration_time: Timer::new(),
        }
    }

    /// Reset all the counters to zero.
    pub fn reset(&mut self) {
        self.nislands = 0;
        self.njoints = 0;
        self.nrows = 0;
        self.solver_passes = 0;
        self.lcp_failures = 0;
        self.jacobian_assembly_time.reset();
        self.force_resolution_time.reset();
        self.integration_time.reset();
    }

    /// Adds the counts and times of `other` to this counter.
    pub fn accumulate(&mut self, other: &SolverCounters) {
        self.nislands += other.nislands;
        self.njoints += other.njoints;
        self.nrows += other.nrows;
        self.solver_passes += other.solver_passes;
        self.lcp_failures += other.lcp_failures;
        self.jacobian_assembly_time
            .accumulate(&other.jacobian_assembly_time);
        self.force_resolution_time
            .accumulate(&other.force_resolution_time);
        self.integration_time.accumulate(&other.integration_time);
    }
}

impl Display for SolverCounters {
    fn fmt(&self, f: &mut Formatter) -> Result {
        writeln!(f, "Number of islands: {}", self.nislands)?;
        writeln!(f, "Number of joints: {}", self.njoints)?;
        writeln!(f, "Number of rows: {}", self.nrows)?;
        writeln!(f, "Solver passes: {}", self.solver_passes)?;
        writeln!(f, "Failed skeleton solves: {}", self.lcp_failures)?;
        writeln!(f, "Jacobian assembly time: {}", self.jacobian_assembly_time)?;
        writeln!(f, "Force resolution time: {}", self.force_resolution_time)?;
        writeln!(f, "Integration time: {}", self.integration_time)
    }
}
