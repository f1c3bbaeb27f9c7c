//! Jump intent handed from the state machine to the physics step.
//!
//! Jump states never touch the body. They raise a [`JumpRequest`] which the next
//! pre-step consumes: if the ground ray hit, the launch velocity is applied and
//! `just_jumped` is set so the following post-step skips ground snapping.

use bevy::prelude::*;

/// Pending physical jump of one character.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct JumpRequest {
    /// Set by a jump state, cleared by every pre-step.
    pub wants_to_jump: bool,
    /// Set by a pre-step that launched the body, cleared by the next post-step.
    pub just_jumped: bool,
    /// Minimum horizontal launch speed. `None` keeps the current horizontal
    /// velocity as is.
    pub init_speed: Option<f32>,
}

impl JumpRequest {
    /// Ask for a jump on the next physics step.
    pub fn request(&mut self, init_speed: Option<f32>) {
        self.wants_to_jump = true;
        self.init_speed = init_speed;
    }

    /// Take the pending request. Returns whether one was pending.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.wants_to_jump)
    }

    /// Consume the post-jump flag. Returns whether it was set.
    pub fn take_just_jumped(&mut self) -> bool {
        std::mem::take(&mut self.just_jumped)
    }

    /// Launch velocity for a body moving at `velocity`.
    ///
    /// With an `init_speed`, vertical velocity is dropped first and the
    /// remaining speed raised to at least `init_speed` along its current
    /// direction. A body at rest stays at rest horizontally.
    pub fn launch_velocity(&self, velocity: Vec3, impulse: f32) -> Vec3 {
        let mut velocity = velocity;

        if let Some(speed) = self.init_speed {
            velocity.y = 0.0;
            if velocity.length_squared() < speed * speed {
                velocity = velocity.normalize_or_zero() * speed;
            }
        }

        velocity.y += impulse;
        velocity
    }
}
