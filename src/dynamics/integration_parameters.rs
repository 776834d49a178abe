use crate::math::Real;
use std::num::NonZeroUsize;

/// Number of entries of the [`SleepTable`].
pub const SLEEP_ENTRIES: usize = 8;

/// How the constraint forces of an island are computed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum SolverMode {
    /// Joint-by-joint Dantzig refinement followed by global conjugate-gradient style passes.
    ///
    /// Slower, but converges to the exact constraint forces.
    Simulation,
    /// Warm-started Gauss-Seidel iterations over four Runge-Kutta sub-steps.
    Game {
        /// Maximum number of solver passes per sub-step.
        passes: NonZeroUsize,
    },
}

/// One entry of the [`SleepTable`].
///
/// An island whose largest body accelerations and velocities all stay below the thresholds of
/// this entry for more than `steps` consecutive steps (normalized to 60Hz) is put to sleep.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct SleepEntry {
    /// Squared linear acceleration threshold.
    pub max_accel: Real,
    /// Squared angular acceleration threshold.
    pub max_alpha: Real,
    /// Squared linear velocity threshold.
    pub max_veloc: Real,
    /// Squared angular velocity threshold.
    pub max_omega: Real,
    /// Number of 60Hz steps the island must remain below the thresholds.
    pub steps: u32,
}

/// Graduated thresholds used to decide when a slowly moving island may sleep.
///
/// Entries are sorted by increasing thresholds: the slower an island moves, the sooner it falls
/// asleep.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct SleepTable {
    /// The entries of the table.
    pub entries: [SleepEntry; SLEEP_ENTRIES],
}

impl SleepTable {
    /// Builds a table whose first entry uses the given squared freeze thresholds.
    ///
    /// Each subsequent entry scales the acceleration and velocity thresholds by `1.5` (angular
    /// acceleration by `1.4`) and waits `24` more steps than the previous one.
    pub fn from_freeze_thresholds(accel2: Real, speed2: Real, omega2: Real) -> Self {
        let mut entries = [SleepEntry {
            max_accel: 0.0,
            max_alpha: 0.0,
            max_veloc: 0.0,
            max_omega: 0.0,
            steps: 0,
        }; SLEEP_ENTRIES];

        let mut accel = accel2;
        let mut alpha = accel2;
        let mut veloc = speed2;
        let mut omega = omega2;
        let mut steps = 8;

        for entry in &mut entries {
            *entry = SleepEntry {
                max_accel: accel,
                max_alpha: alpha,
                max_veloc: veloc,
                max_omega: omega,
                steps,
            };
            accel *= 1.5;
            alpha *= 1.4;
            veloc *= 1.5;
            omega *= 1.5;
            steps += 24;
        }

        Self { entries }
    }

    /// The first entry whose thresholds all bound the given squared magnitudes.
    pub fn entry_for(
        &self,
        max_accel: Real,
        max_alpha: Real,
        max_veloc: Real,
        max_omega: Real,
    ) -> Option<&SleepEntry> {
        self.entries.iter().find(|e| {
            max_accel <= e.max_accel
                && max_alpha <= e.max_alpha
                && max_veloc <= e.max_veloc
                && max_omega <= e.max_omega
        })
    }

    /// The entry with the largest thresholds.
    pub fn last(&self) -> &SleepEntry {
        &self.entries[SLEEP_ENTRIES - 1]
    }
}

/// Parameters for a time-step of the dynamics pipeline.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct IntegrationParameters {
    /// The timestep length (default: `1.0 / 60.0`).
    pub dt: Real,
    /// The solver used for islands with joints (default: `SolverMode::Game { passes: 4 }`).
    pub solver_mode: SolverMode,
    /// Acceleration residual below which the solver stops iterating (default: `0.05`).
    pub max_acceleration_error: Real,
    /// Relative regularization added to the diagonal of every row (default: `1.0e-4`).
    ///
    /// Each row adds `psd_damp_tolerance * stiffness` times its effective inverse mass to the
    /// diagonal, keeping the joint mass matrices positive definite.
    pub psd_damp_tolerance: Real,
    /// Squared linear acceleration below which a body is in equilibrium (default: `0.1^2`).
    pub freeze_accel2: Real,
    /// Squared angular acceleration below which a body is in equilibrium (default: `0.1^2`).
    pub freeze_alpha2: Real,
    /// Squared linear velocity below which a body is in equilibrium (default: `0.032^2`).
    pub freeze_speed2: Real,
    /// Squared angular velocity below which a body is in equilibrium (default: `0.032^2`).
    pub freeze_omega2: Real,
    /// Factor applied to the velocities of bodies in equilibrium (default: `0.9`).
    pub freezing_velocity_drag: Real,
    /// Squared velocity below which a damped velocity is zeroed (default: `1.0e-8`).
    pub velocity_tolerance2: Real,
    /// Islands with at most this many joints never skip resting bodies (default: `2`).
    pub small_island_count: usize,
    /// Maximum number of continuous-collision sub-steps per step (default: `8`).
    pub max_continuous_collision_steps: usize,
    /// Factor of the second-order correction of the angular velocity update (default: `1/12`).
    pub euler_taylor_correction: Real,
    /// The sleep table.
    pub sleep_table: SleepTable,
}

impl IntegrationParameters {
    /// The inverse of the time-stepping length, i.e. the steps per seconds (Hz).
    ///
    /// This is zero if `self.dt` is zero.
    #[inline(always)]
    pub fn inv_dt(&self) -> Real {
        if self.dt == 0.0 {
            0.0
        } else {
            1.0 / self.dt
        }
    }

    /// Sets the inverse time-stepping length (i.e. the frequency).
    ///
    /// This automatically recompute `self.dt`.
    #[inline]
    pub fn set_inv_dt(&mut self, inv_dt: Real) {
        if inv_dt == 0.0 {
            self.dt = 0.0
        } else {
            self.dt = 1.0 / inv_dt
        }
    }

    /// Parameters using the exact simulation-mode solver.
    pub fn simulation() -> Self {
        Self {
            solver_mode: SolverMode::Simulation,
            ..Self::default()
        }
    }
}

impl Default for IntegrationParameters {
    fn default() -> Self {
        let freeze_accel2 = 0.1 * 0.1;
        let freeze_speed2 = 0.032 * 0.032;

        Self {
            dt: 1.0 / 60.0,
            solver_mode: SolverMode::Game {
                passes: NonZeroUsize::new(4).unwrap(),
            },
            max_acceleration_error: 0.05,
            psd_damp_tolerance: 1.0e-4,
            freeze_accel2,
            freeze_alpha2: freeze_accel2,
            freeze_speed2,
            freeze_omega2: freeze_speed2,
            freezing_velocity_drag: 0.9,
            velocity_tolerance2: 1.0e-8,
            small_island_count: 2,
            max_continuous_collision_steps: 8,
            euler_taylor_correction: 1.0 / 12.0,
            sleep_table: SleepTable::from_freeze_thresholds(
                freeze_accel2,
                freeze_speed2,
                freeze_speed2,
            ),
        }
    }
}
