//! Movement models: turn input intent into velocity and integrate position.
//!
//! The collision system calls [`MovementModel::apply_inputs`] once per fixed
//! step, after gravity and before collision resolution.

use strata_shared::Vec3;

use crate::physics::KinematicState;

/// Default walking speed (blocks per second).
pub const WALK_SPEED: f32 = 4.3;

/// Default jump velocity (blocks per second).
pub const JUMP_SPEED: f32 = 10.0;

/// Integrates a kinematic state over one step.
pub trait MovementModel {
    /// Applies input to `state.velocity`, then moves `state.position` by
    /// `velocity * dt`.
    fn apply_inputs(&mut self, state: &mut KinematicState, dt: f32);
}

/// No input: position follows velocity.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ballistic;

impl MovementModel for Ballistic {
    fn apply_inputs(&mut self, state: &mut KinematicState, dt: f32) {
        state.position += state.velocity * dt;
    }
}

/// Desired movement for the next steps.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputIntent {
    /// Forward (+) / backward (-), in `[-1, 1]`.
    pub forward: f32,
    /// Right (+) / left (-), in `[-1, 1]`.
    pub strafe: f32,
    /// Heading in degrees; 0 faces -Z.
    pub yaw: f32,
    /// Jump if standing on something.
    pub jump: bool,
}

/// Walking observer: horizontal speed from intent, jumps only when grounded.
#[derive(Clone, Copy, Debug)]
pub struct WalkController {
    /// Current intent; update it from the input layer.
    pub intent: InputIntent,
    /// Horizontal speed at full input.
    pub max_speed: f32,
    /// Vertical velocity given by a jump.
    pub jump_speed: f32,
}

impl Default for WalkController {
    fn default() -> Self {
        Self {
            intent: InputIntent::default(),
            max_speed: WALK_SPEED,
            jump_speed: JUMP_SPEED,
        }
    }
}

impl WalkController {
    /// Horizontal velocity requested by the current intent.
    #[must_use]
    pub fn desired_velocity(&self) -> Vec3 {
        let mut forward = self.intent.forward;
        let mut strafe = self.intent.strafe;
        let magnitude = (forward * forward + strafe * strafe).sqrt();
        if magnitude > 1.0 {
            forward /= magnitude;
            strafe /= magnitude;
        }

        let yaw = self.intent.yaw.to_radians();
        let (sin_yaw, cos_yaw) = yaw.sin_cos();
        Vec3::new(
            (sin_yaw * forward + cos_yaw * strafe) * self.max_speed,
            0.0,
            (-cos_yaw * forward + sin_yaw * strafe) * self.max_speed,
        )
    }
}

impl MovementModel for WalkController {
    fn apply_inputs(&mut self, state: &mut KinematicState, dt: f32) {
        let desired = self.desired_velocity();
        state.velocity.x = desired.x;
        state.velocity.z = desired.z;

        if self.intent.jump && state.grounded {
            state.velocity.y = self.jump_speed;
            state.grounded = false;
        }

        state.position += state.velocity * dt;
    }
}
