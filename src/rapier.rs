//! Rapier3D physics backend implementation.
//!
//! This module provides [`RapierWorld`], a self-contained Rapier pipeline that
//! implements [`PhysicsWorld`]. Enable with the `rapier3d` feature.

use bevy::prelude::*;
use bevy_rapier3d::rapier::prelude::*;
use bevy_rapier3d::rapier::prelude::Real;

use crate::backend::{PhysicsWorld, RayQuery};
use crate::collision::RayHit;

fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// Rapier3D physics world owned by the locomotion orchestrator.
///
/// Bodies are addressed by [`RigidBodyHandle`]. Characters use dynamic
/// capsules with locked rotations and zero friction so the arcade velocity
/// written every frame is not eaten by ground contact.
pub struct RapierWorld {
    pub gravity: Vector<Real>,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl std::fmt::Debug for RapierWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RapierWorld")
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .finish_non_exhaustive()
    }
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierWorld {
    /// Empty world with standard gravity.
    pub fn new() -> Self {
        Self {
            gravity: vector![0.0, -9.81, 0.0],
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Builder: set gravity.
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = to_vector(gravity);
        self
    }

    fn insert(&mut self, body: RigidBody, collider: Collider) -> RigidBodyHandle {
        let handle = self.bodies.insert(body);
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        // Make the new collider visible to ray casts before the next step.
        self.query_pipeline.update(&self.colliders);
        handle
    }

    /// Add a fixed box.
    pub fn add_static_box(&mut self, center: Vec3, half_extents: Vec3) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed()
            .translation(to_vector(center))
            .build();
        let collider =
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z).build();
        self.insert(body, collider)
    }

    /// Add a dynamic box.
    pub fn add_dynamic_box(&mut self, center: Vec3, half_extents: Vec3) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(to_vector(center))
            .build();
        let collider =
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z).build();
        self.insert(body, collider)
    }

    /// Add a large flat ground whose top surface sits at `height`.
    pub fn add_ground(&mut self, height: f32) -> RigidBodyHandle {
        self.add_static_box(
            Vec3::new(0.0, height - 0.5, 0.0),
            Vec3::new(100.0, 0.5, 100.0),
        )
    }

    /// Add a character capsule of total `height` centered on `position`.
    ///
    /// The capsule radius is a quarter of the height. Rotations are locked and
    /// friction is zero.
    pub fn add_capsule_character(&mut self, position: Vec3, height: f32) -> RigidBodyHandle {
        let radius = height / 4.0;
        let half_segment = (height / 2.0 - radius).max(0.0);

        let body = RigidBodyBuilder::dynamic()
            .translation(to_vector(position))
            .lock_rotations()
            .ccd_enabled(true)
            .build();
        let collider = ColliderBuilder::capsule_y(half_segment, radius)
            .friction(0.0)
            .friction_combine_rule(CoefficientCombineRule::Min)
            .build();
        self.insert(body, collider)
    }

    /// Remove a body and its colliders.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        let removed = self
            .bodies
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some();
        if removed {
            self.query_pipeline.update(&self.colliders);
        }
        removed
    }

    /// Whether rotations of a body are locked on all axes.
    pub fn rotation_locked(&self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .get(handle)
            .map(|body| body.locked_axes().contains(LockedAxes::ROTATION_LOCKED))
            .unwrap_or(false)
    }
}

impl PhysicsWorld for RapierWorld {
    type Body = RigidBodyHandle;

    fn translation(&self, body: RigidBodyHandle) -> Vec3 {
        self.bodies
            .get(body)
            .map(|b| from_vector(b.translation()))
            .unwrap_or(Vec3::ZERO)
    }

    fn linvel(&self, body: RigidBodyHandle) -> Vec3 {
        self.bodies
            .get(body)
            .map(|b| from_vector(b.linvel()))
            .unwrap_or(Vec3::ZERO)
    }

    fn rotation(&self, body: RigidBodyHandle) -> Quat {
        self.bodies
            .get(body)
            .map(|b| {
                let r = b.rotation();
                Quat::from_xyzw(r.i, r.j, r.k, r.w)
            })
            .unwrap_or(Quat::IDENTITY)
    }

    fn set_translation(&mut self, body: RigidBodyHandle, translation: Vec3, wake: bool) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.set_translation(to_vector(translation), wake);
        }
    }

    fn set_linvel(&mut self, body: RigidBodyHandle, velocity: Vec3, wake: bool) {
        if let Some(b) = self.bodies.get_mut(body) {
            if b.is_dynamic() {
                b.set_linvel(to_vector(velocity), wake);
            }
        }
    }

    fn lock_rotations(&mut self, body: RigidBodyHandle, locked: bool) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.lock_rotations(locked, true);
        }
    }

    fn step(&mut self, delta: f32) {
        if delta <= 0.0 {
            return;
        }

        self.integration_parameters.dt = delta;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    fn cast_ray(&self, query: &RayQuery<RigidBodyHandle>) -> Vec<RayHit<RigidBodyHandle>> {
        let ray = Ray::new(
            point![query.origin.x, query.origin.y, query.origin.z],
            to_vector(query.direction),
        );
        let filter = match query.exclude {
            Some(body) => QueryFilter::default().exclude_rigid_body(body),
            None => QueryFilter::default(),
        };

        let mut hits = Vec::new();
        self.query_pipeline.intersections_with_ray(
            &self.bodies,
            &self.colliders,
            &ray,
            query.far,
            true,
            filter,
            |handle, intersection| {
                let distance = intersection.time_of_impact;
                if query.accepts(distance) {
                    let body = self.colliders.get(handle).and_then(|c| c.parent());
                    hits.push(RayHit::new(distance, query.point_at(distance), body));
                }
                true
            },
        );

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn bodies(&self) -> Vec<RigidBodyHandle> {
        self.bodies.iter().map(|(handle, _)| handle).collect()
    }

    fn contains(&self, body: RigidBodyHandle) -> bool {
        self.bodies.contains(body)
    }
}
