//! Physics backend abstraction.
//!
//! This module defines the contract the locomotion controller needs from a
//! rigid-body physics engine. The controller never touches contacts, constraints
//! or integration; it reads and writes body translation and velocity, casts rays
//! and asks the world to step.
//!
//! Two implementations ship with the crate: [`SandboxWorld`](crate::sandbox::SandboxWorld)
//! and, with the `rapier3d` feature, `RapierWorld`.

use std::fmt::Debug;
use std::hash::Hash;

use bevy::prelude::*;

use crate::collision::RayHit;

/// Trait for physics world implementations.
///
/// Reads of unknown bodies return zero/identity values and writes to them are
/// ignored, so a despawned body can never bring the controller down.
pub trait PhysicsWorld: 'static + Send + Sync {
    /// Handle identifying a rigid body.
    type Body: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Current position of a body's center.
    fn translation(&self, body: Self::Body) -> Vec3;

    /// Current linear velocity of a body.
    fn linvel(&self, body: Self::Body) -> Vec3;

    /// Current orientation of a body.
    fn rotation(&self, body: Self::Body) -> Quat;

    /// Teleport a body.
    fn set_translation(&mut self, body: Self::Body, translation: Vec3, wake: bool);

    /// Overwrite a body's linear velocity.
    fn set_linvel(&mut self, body: Self::Body, velocity: Vec3, wake: bool);

    /// Prevent (or allow) a body from rotating.
    fn lock_rotations(&mut self, body: Self::Body, locked: bool);

    /// Advance the simulation by `delta` seconds.
    fn step(&mut self, delta: f32);

    /// Cast a ray and return every hit within the query range, nearest first.
    fn cast_ray(&self, query: &RayQuery<Self::Body>) -> Vec<RayHit<Self::Body>>;

    /// Every body in the world, for render synchronisation.
    fn bodies(&self) -> Vec<Self::Body>;

    /// Whether `body` exists.
    fn contains(&self, body: Self::Body) -> bool;
}

/// Helper struct for building ray queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayQuery<B> {
    /// Origin point of the ray.
    pub origin: Vec3,
    /// Direction of the ray (normalized).
    pub direction: Vec3,
    /// Hits closer than this are ignored.
    pub near: f32,
    /// Maximum distance to cast.
    pub far: f32,
    /// Body to exclude from results.
    pub exclude: Option<B>,
}

impl<B> RayQuery<B> {
    /// Create a new ray query over `[0, far]`.
    pub fn new(origin: Vec3, direction: Vec3, far: f32) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
            near: 0.0,
            far,
            exclude: None,
        }
    }

    /// Ray pointing straight down.
    pub fn down(origin: Vec3, near: f32, far: f32) -> Self {
        Self::new(origin, Vec3::NEG_Y, far).with_near(near)
    }

    /// Ignore hits closer than `near`.
    pub fn with_near(mut self, near: f32) -> Self {
        self.near = near;
        self
    }

    /// Exclude a body from the query.
    pub fn excluding(mut self, body: B) -> Self {
        self.exclude = Some(body);
        self
    }

    /// Whether a hit distance lies in the query range.
    #[inline]
    pub fn accepts(&self, distance: f32) -> bool {
        distance >= self.near && distance <= self.far
    }

    /// Point at `distance` along the ray.
    #[inline]
    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}
