use crate::core::{ANGULAR_SLOP, LINEAR_SLOP, MAX_TOI_ITERATIONS, MAX_TOI_ROOT_ITERATIONS};
use std::f32::consts::PI;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Configuration for a single world step
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct StepConf {
    /// The time step in seconds
    pub dt: f32,

    /// This step's dt times the previous step's inverse dt
    ///
    /// Scales warm-started impulses when the step size varies; 1 when
    /// it does not.
    pub dt_ratio: f32,

    /// Velocity iterations for the regular solver phase
    pub reg_velocity_iterations: u32,

    /// Position iterations for the regular solver phase
    pub reg_position_iterations: u32,

    /// Velocity iterations for the TOI solver phase
    pub toi_velocity_iterations: u32,

    /// Position iterations for the TOI solver phase
    pub toi_position_iterations: u32,

    /// Maximum TOI sub-steps per contact per world step
    pub max_sub_steps: u32,

    /// Iteration cap for the TOI separation root finder
    pub max_toi_root_iterations: u32,

    /// Iteration cap for TOI conservative advancement
    pub max_toi_iterations: u32,

    /// Relative speed below which collisions are perfectly inelastic
    pub velocity_threshold: f32,

    /// Maximum translation of a body per step
    pub max_translation: f32,

    /// Maximum rotation of a body per step
    pub max_rotation: f32,

    /// Maximum position correction applied per constraint per iteration
    pub max_linear_correction: f32,

    /// Maximum angular correction applied per constraint per iteration
    pub max_angular_correction: f32,

    /// Fraction of overlap resolved per regular position iteration
    pub reg_resolution_rate: f32,

    /// Fraction of overlap resolved per TOI position iteration
    pub toi_resolution_rate: f32,

    /// Whether to seed the velocity solver with last step's impulses
    pub do_warm_start: bool,

    /// Whether to run the TOI sub-stepper
    pub do_toi: bool,

    /// Time a body must remain still before it may sleep
    pub min_still_time_to_sleep: f32,

    /// Linear speed below which a body counts as still
    pub linear_sleep_tolerance: f32,

    /// Angular speed below which a body counts as still
    pub angular_sleep_tolerance: f32,
}

impl StepConf {
    /// Creates a configuration for the given time step with defaults
    /// for everything else
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            ..Default::default()
        }
    }

    /// Returns the inverse time step, or zero for a zero step
    pub fn inv_dt(&self) -> f32 {
        if self.dt != 0.0 {
            1.0 / self.dt
        } else {
            0.0
        }
    }
}

impl Default for StepConf {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            dt_ratio: 1.0,
            reg_velocity_iterations: 8,
            reg_position_iterations: 3,
            toi_velocity_iterations: 8,
            toi_position_iterations: 20,
            max_sub_steps: 48,
            max_toi_root_iterations: MAX_TOI_ROOT_ITERATIONS,
            max_toi_iterations: MAX_TOI_ITERATIONS,
            velocity_threshold: 0.8,
            max_translation: 4.0,
            max_rotation: PI / 2.0,
            max_linear_correction: LINEAR_SLOP * 40.0,
            max_angular_correction: ANGULAR_SLOP * 4.0,
            reg_resolution_rate: 0.2,
            toi_resolution_rate: 0.75,
            do_warm_start: true,
            do_toi: true,
            min_still_time_to_sleep: 0.5,
            linear_sleep_tolerance: 0.01,
            angular_sleep_tolerance: 2.0 / 180.0 * PI,
        }
    }
}
