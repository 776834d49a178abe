//! Counters for benchmarking various parts of the dynamics pipeline.

use std::fmt::{Display, Formatter, Result};

pub use self::ccd_counters::CCDCounters;
pub use self::solver_counters::SolverCounters;
pub use self::timer::Timer;

mod ccd_counters;
mod solver_counters;
mod timer;

/// Aggregation of all the performances counters tracked by the dynamics pipeline.
#[derive(Clone, Copy)]
pub struct Counters {
    /// Whether this counter is enabled or not.
    pub enabled: bool,
    /// Timer for a whole timestep.
    pub step_time: Timer,
    /// Timer used for debugging.
    pub custom: Timer,
    /// Counters of the constraints resolution and integration, summed over all the islands.
    pub solver: SolverCounters,
    /// Counters of the continuous collision sub-steps, summed over all the islands.
    pub ccd: CCDCounters,
}

impl Counters {
    /// Create a new set of counters initialized to zero.
    pub fn new(enabled: bool) -> Self {
        Counters {
            enabled,
            step_time: Timer::new(),
            custom: Timer::new(),
            solver: SolverCounters::new(),
            ccd: CCDCounters::new(),
        }
    }

    /// Enable all the counters.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Return `true` if the counters are enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Disable all the counters.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Notify that the time-step has started.
    pub fn step_started(&mut self) {
        if self.enabled {
            self.step_time.start();
        }
    }

    /// Notify that the time-step has finished.
    pub fn step_completed(&mut self) {
        if self.enabled {
            self.step_time.pause();
        }
    }

    /// Total time spent for one step of the dynamics pipeline.
    pub fn step_time(&self) -> f64 {
        self.step_time.time()
    }

    /// Notify that the custom operation has started.
    pub fn custom_started(&mut self) {
        if self.enabled {
            self.custom.start();
        }
    }

    /// Notify that the custom operation has finished.
    pub fn custom_completed(&mut self) {
        if self.enabled {
            self.custom.pause();
        }
    }

    /// Total time of a custom event.
    pub fn custom_time(&self) -> f64 {
        self.custom.time()
    }

    /// Resets all the counters and timers.
    pub fn reset(&mut self) {
        if self.enabled {
            self.step_time.reset();
            self.custom.reset();
            self.solver.reset();
            self.ccd.reset();
        }
    }
}

macro_rules! measure_time {
    ($time:ident, $info:ident. $timer:ident) => {
        impl Counters {
            /// Gets the time elapsed for this timer, summed over all the islands.
            pub fn $time(&self) -> f64 {
                if self.enabled {
                    self.$info.$timer.time()
                } else {
                    0.0
                }
            }
        }
    };
}

measure_time!(jacobian_assembly_time, solver.jacobian_assembly_time);
measure_time!(force_resolution_time, solver.force_resolution_time);
measure_time!(integration_time, solver.integration_time);
measure_time!(toi_computation_time, ccd.toi_computation_time);

impl Display for Counters {
    fn fmt(&self, f: &mut Formatter) -> Result {
        writeln!(f, "Total timestep time: {}", self.step_time)?;
        self.solver.fmt(f)?;
        self.ccd.fmt(f)?;
        writeln!(f, "Custom timer: {}", self.custom)
    }
}

impl Default for Counters {
    fn default() -> Self {
        Self::new(false)
    }
}
