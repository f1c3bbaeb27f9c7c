//! Spring simulators.
//!
//! Springs turn discrete target values (an arcade speed, a facing angle) into
//! continuous motion. Integration always happens at a fixed internal rate, so the
//! result does not depend on how often or how irregularly `simulate` is called:
//! elapsed time is accumulated, as many fixed sub-steps as fit are run, and the
//! output is interpolated between the two most recent sub-step frames using the
//! leftover fraction.
//!
//! Each sub-step is a mass-spring-damper update where `damping` is the fraction of
//! velocity retained per step:
//!
//! ```text
//! velocity = (velocity + (target - position) / mass) * damping
//! position = position + velocity
//! ```

use std::fmt;
use std::ops::{Add, Mul, Sub};

use bevy::prelude::*;

/// Default number of internal integration steps per second.
pub const DEFAULT_SPRING_FPS: f32 = 60.0;

/// Values a [`SpringSimulator`] can drive.
///
/// Implemented for every type with vector-space arithmetic, which covers `f32`
/// and `Vec3`.
pub trait SpringValue:
    Copy
    + Default
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f32, Output = Self>
    + Send
    + Sync
    + fmt::Debug
    + 'static
{
}

impl<T> SpringValue for T where
    T: Copy
        + Default
        + Add<Output = T>
        + Sub<Output = T>
        + Mul<f32, Output = T>
        + Send
        + Sync
        + fmt::Debug
        + 'static
{
}

/// Mass and damping of a spring.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    /// Inertia of the spring. Must be positive.
    pub mass: f32,
    /// Fraction of velocity retained per sub-step (0.0-1.0).
    pub damping: f32,
}

impl SpringParams {
    pub const fn new(mass: f32, damping: f32) -> Self {
        Self { mass, damping }
    }
}

/// One fixed-rate integration result.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpringFrame<T> {
    pub position: T,
    pub velocity: T,
}

#[inline]
fn lerp<T: SpringValue>(a: T, b: T, t: f32) -> T {
    a + (b - a) * t
}

#[inline]
fn spring_step<T: SpringValue>(frame: SpringFrame<T>, target: T, params: SpringParams) -> SpringFrame<T> {
    let acceleration = (target - frame.position) * (1.0 / params.mass);
    let velocity = (frame.velocity + acceleration) * params.damping;
    SpringFrame {
        position: frame.position + velocity,
        velocity,
    }
}

/// Fixed-rate time accumulator shared by the simulators.
#[derive(Debug, Clone, Copy)]
struct FrameClock {
    frame_time: f32,
    offset: f32,
}

impl FrameClock {
    fn new(fps: f32) -> Self {
        Self {
            frame_time: 1.0 / fps,
            offset: 0.0,
        }
    }

    /// Accumulate `delta` and return how many whole sub-steps are due.
    fn advance(&mut self, delta: f32) -> usize {
        let total = self.offset + delta.max(0.0);
        let frames = (total / self.frame_time).floor();
        self.offset = total % self.frame_time;
        frames as usize
    }

    /// Interpolation factor between the last two frames.
    fn alpha(&self) -> f32 {
        (self.offset / self.frame_time).clamp(0.0, 1.0)
    }
}

/// Spring simulator that moves `position` toward `target`.
///
/// Owned by exactly one character. States reconfigure `mass`/`damping` to give
/// each locomotion state its own feel.
#[derive(Debug, Clone)]
pub struct SpringSimulator<T: SpringValue> {
    /// Interpolated output position.
    pub position: T,
    /// Interpolated output velocity.
    pub velocity: T,
    target: T,
    params: SpringParams,
    clock: FrameClock,
    cache: [SpringFrame<T>; 2],
}

/// Spring over a single scalar.
pub type ScalarSpringSimulator = SpringSimulator<f32>;

/// Spring over a 3D vector (used for the arcade velocity).
pub type VectorSpringSimulator = SpringSimulator<Vec3>;

impl<T: SpringValue> SpringSimulator<T> {
    /// Create a simulator at rest at the default value.
    pub fn new(fps: f32, mass: f32, damping: f32) -> Self {
        Self {
            position: T::default(),
            velocity: T::default(),
            target: T::default(),
            params: SpringParams::new(mass, damping),
            clock: FrameClock::new(fps),
            cache: [SpringFrame::default(); 2],
        }
    }

    /// Create a simulator from a parameter pair.
    pub fn with_params(fps: f32, params: SpringParams) -> Self {
        Self::new(fps, params.mass, params.damping)
    }

    pub fn target(&self) -> T {
        self.target
    }

    pub fn set_target(&mut self, target: T) {
        self.target = target;
    }

    pub fn mass(&self) -> f32 {
        self.params.mass
    }

    pub fn set_mass(&mut self, mass: f32) {
        self.params.mass = mass;
    }

    pub fn damping(&self) -> f32 {
        self.params.damping
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.params.damping = damping;
    }

    pub fn params(&self) -> SpringParams {
        self.params
    }

    pub fn set_params(&mut self, params: SpringParams) {
        self.params = params;
    }

    /// Change the internal integration rate.
    pub fn set_fps(&mut self, fps: f32) {
        self.clock.frame_time = 1.0 / fps;
    }

    /// Advance by `delta` seconds.
    pub fn simulate(&mut self, delta: f32) {
        let frames = self.clock.advance(delta);
        for _ in 0..frames {
            let next = spring_step(self.cache[1], self.target, self.params);
            self.cache = [self.cache[1], next];
        }

        let alpha = self.clock.alpha();
        self.position = lerp(self.cache[0].position, self.cache[1].position, alpha);
        self.velocity = lerp(self.cache[0].velocity, self.cache[1].velocity, alpha);
    }
}

/// Scalar spring whose output is relative.
///
/// `position` holds the change since the previous `simulate` call rather than an
/// absolute value, so the caller can apply it as an increment (e.g. rotate a facing
/// vector by it) and re-express `target` as "remaining distance" every frame.
#[derive(Debug, Clone)]
pub struct RelativeSpringSimulator {
    /// Increment produced by the last `simulate` call.
    pub position: f32,
    /// Interpolated spring velocity.
    pub velocity: f32,
    target: f32,
    params: SpringParams,
    clock: FrameClock,
    cache: [SpringFrame<f32>; 2],
    last_lerp: f32,
}

impl RelativeSpringSimulator {
    pub fn new(fps: f32, mass: f32, damping: f32) -> Self {
        Self {
            position: 0.0,
            velocity: 0.0,
            target: 0.0,
            params: SpringParams::new(mass, damping),
            clock: FrameClock::new(fps),
            cache: [SpringFrame::default(); 2],
            last_lerp: 0.0,
        }
    }

    pub fn with_params(fps: f32, params: SpringParams) -> Self {
        Self::new(fps, params.mass, params.damping)
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    pub fn mass(&self) -> f32 {
        self.params.mass
    }

    pub fn set_mass(&mut self, mass: f32) {
        self.params.mass = mass;
    }

    pub fn damping(&self) -> f32 {
        self.params.damping
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.params.damping = damping;
    }

    pub fn params(&self) -> SpringParams {
        self.params
    }

    pub fn set_params(&mut self, params: SpringParams) {
        self.params = params;
    }

    /// Advance by `delta` seconds.
    pub fn simulate(&mut self, delta: f32) {
        let frames = self.clock.advance(delta);
        for i in 0..frames {
            let mut start = self.cache[1];
            if i + 1 == frames {
                // The newest frame restarts from zero; what was already consumed is
                // carried in `last_lerp`.
                self.last_lerp -= start.position;
                start.position = 0.0;
            }
            let next = spring_step(start, self.target, self.params);
            self.cache = [self.cache[1], next];
        }

        let alpha = self.clock.alpha();
        let lerped = lerp(0.0, self.cache[1].position, alpha);
        self.position = lerped - self.last_lerp;
        self.last_lerp = lerped;
        self.velocity = lerp(self.cache[0].velocity, self.cache[1].velocity, alpha);
    }
}
