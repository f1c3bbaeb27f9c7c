//! Controller configuration.
//!
//! This module defines the tuning of a character (body height, ground ray,
//! jump impulse, default spring feel) and of the stepping orchestrator.

use bevy::prelude::*;

use crate::spring::{SpringParams, DEFAULT_SPRING_FPS};

/// Configuration parameters for one character.
///
/// Ray lengths are measured from the body center, which sits `height / 2` above
/// the feet.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct CharacterConfig {
    // === Body ===
    /// Total height of the character body.
    pub height: f32,

    // === Movement ===
    /// Scale from the smoothed arcade velocity (0 = idle, 0.8 = walk, 1.4 = sprint)
    /// to world units per second.
    pub move_speed: f32,

    // === Ground Ray ===
    /// Farthest distance below the body center at which ground still counts.
    pub ray_cast_length: f32,

    /// Extra clearance added to the ray start and used to lift the body on jump.
    pub ray_safe_offset: f32,

    // === Jump / Landing ===
    /// Vertical velocity added at liftoff.
    pub jump_impulse: f32,

    /// Vertical impact velocity below which a landing turns into a roll.
    pub hard_landing_velocity: f32,

    // === Springs ===
    /// Velocity spring parameters every state starts from.
    pub velocity_spring: SpringParams,

    /// Rotation spring parameters every state starts from.
    pub rotation_spring: SpringParams,

    /// Internal integration rate of both springs.
    pub spring_fps: f32,

    // === Visuals ===
    /// How strongly angular velocity tilts the model into turns.
    pub tilt_factor: f32,

    // === Animation ===
    /// Duration assumed for clips missing from the loaded model.
    pub missing_clip_duration: f32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            height: 1.0,
            move_speed: 8.0,
            ray_cast_length: 0.63,
            ray_safe_offset: 0.03,
            jump_impulse: 4.0,
            hard_landing_velocity: -6.0,
            velocity_spring: SpringParams::new(50.0, 0.8),
            rotation_spring: SpringParams::new(10.0, 0.5),
            spring_fps: DEFAULT_SPRING_FPS,
            tilt_factor: 2.3,
            missing_clip_duration: 0.1,
        }
    }
}

impl CharacterConfig {
    /// Near end of the ground ray, measured from the body center.
    #[inline]
    pub fn ray_near(&self) -> f32 {
        self.height / 2.0 + self.ray_safe_offset
    }

    /// Height of the body center above a ground hit once snapped.
    #[inline]
    pub fn ground_clearance(&self) -> f32 {
        self.ray_cast_length - self.ray_safe_offset
    }

    /// Config for a player-driven character.
    pub fn player() -> Self {
        Self::default()
    }

    /// Config for behavior-driven characters: slightly slower with heavier turning.
    pub fn npc() -> Self {
        Self {
            move_speed: 6.5,
            rotation_spring: SpringParams::new(15.0, 0.5),
            ..default()
        }
    }

    /// Builder: set body height.
    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    /// Builder: set move speed.
    pub fn with_move_speed(mut self, move_speed: f32) -> Self {
        self.move_speed = move_speed;
        self
    }

    /// Builder: set ground ray length and safety offset.
    pub fn with_ground_ray(mut self, length: f32, safe_offset: f32) -> Self {
        self.ray_cast_length = length;
        self.ray_safe_offset = safe_offset;
        self
    }

    /// Builder: set jump impulse.
    pub fn with_jump_impulse(mut self, impulse: f32) -> Self {
        self.jump_impulse = impulse;
        self
    }

    /// Builder: set the hard landing threshold.
    pub fn with_hard_landing_velocity(mut self, velocity: f32) -> Self {
        self.hard_landing_velocity = velocity;
        self
    }

    /// Builder: set default spring parameters.
    pub fn with_springs(mut self, velocity: SpringParams, rotation: SpringParams) -> Self {
        self.velocity_spring = velocity;
        self.rotation_spring = rotation;
        self
    }

    /// Builder: set spring integration rate.
    pub fn with_spring_fps(mut self, fps: f32) -> Self {
        self.spring_fps = fps;
        self
    }
}

/// Plane below which bodies are teleported back into the level.
///
/// Only the translation is reset. Linear velocity is kept on purpose so a
/// respawned body keeps falling and lands through the normal airborne states.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct KillPlane {
    /// Bodies whose center drops below this height are respawned.
    pub height: f32,
    /// Where respawned bodies are placed.
    pub respawn: Vec3,
}

impl Default for KillPlane {
    fn default() -> Self {
        Self {
            height: -5.0,
            respawn: Vec3::new(0.0, 10.0, 0.0),
        }
    }
}

/// Configuration of the stepping orchestrator.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct OrchestratorConfig {
    /// Upper bound on the frame delta fed to physics and states.
    pub max_delta: f32,

    /// Optional respawn plane. `None` disables respawning.
    pub kill_plane: Option<KillPlane>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_delta: 0.1,
            kill_plane: Some(KillPlane::default()),
        }
    }
}

impl OrchestratorConfig {
    /// Builder: set the delta clamp.
    pub fn with_max_delta(mut self, max_delta: f32) -> Self {
        self.max_delta = max_delta;
        self
    }

    /// Builder: set the kill plane.
    pub fn with_kill_plane(mut self, kill_plane: KillPlane) -> Self {
        self.kill_plane = Some(kill_plane);
        self
    }

    /// Builder: disable respawning.
    pub fn without_kill_plane(mut self) -> Self {
        self.kill_plane = None;
        self
    }
}
