//! Ground ray and velocity reconciliation around the physics step.
//!
//! [`pre_step`] runs right before the physics world steps. It casts the ground
//! ray and applies a pending jump. [`post_step`] runs right after. It blends
//! the arcade velocity with the velocity the engine produced and either snaps
//! the body onto the ground or lets it fly.

use bevy::prelude::*;

use crate::backend::{PhysicsWorld, RayQuery};
use crate::character::Locomotion;
use crate::collision::RayHit;
use crate::math::{apply_vector_matrix_xz, lerp_per_axis};

/// Cast the ground ray for `body`. Returns the nearest accepted hit.
pub fn cast_ground_ray<P: PhysicsWorld>(
    locomotion: &Locomotion,
    physics: &P,
    body: P::Body,
) -> Option<RayHit<P::Body>> {
    let config = locomotion.config();
    let query = RayQuery::down(
        physics.translation(body),
        config.ray_near(),
        config.ray_cast_length,
    )
    .excluding(body);

    physics
        .cast_ray(&query)
        .into_iter()
        .find(|hit| query.accepts(hit.distance))
}

/// Pre-step hook: refresh ground contact and launch a pending jump.
pub fn pre_step<P: PhysicsWorld>(locomotion: &mut Locomotion, physics: &mut P, body: P::Body) {
    let mut position = physics.translation(body);
    let mut velocity = physics.linvel(body);

    let hit = cast_ground_ray(locomotion, physics, body);
    locomotion.ground_mut().record(hit.as_ref());

    let jump_impulse = locomotion.config().jump_impulse;
    let safe_offset = locomotion.config().ray_safe_offset;
    let jump = locomotion.jump_request_mut();

    if jump.take() && hit.is_some() {
        velocity = jump.launch_velocity(velocity, jump_impulse);
        // Move above ground
        position.y += safe_offset;
        jump.just_jumped = true;
        trace!("Jump launched for {:?} at {:?}", body, velocity);
    }

    physics.set_translation(body, position, true);
    physics.set_linvel(body, velocity, true);
}

/// Arcade velocity in world space.
pub fn arcade_velocity(locomotion: &Locomotion) -> Vec3 {
    apply_vector_matrix_xz(
        locomotion.orientation(),
        locomotion.velocity() * locomotion.config().move_speed,
    )
}

/// Per-axis blend between the arcade velocity and the simulated one.
pub fn blend_velocity(arcade: Vec3, simulated: Vec3, influence: Vec3) -> Vec3 {
    lerp_per_axis(arcade, simulated, influence)
}

/// Post-step hook: reconcile velocities and stick to the ground.
pub fn post_step<P: PhysicsWorld>(locomotion: &mut Locomotion, physics: &mut P, body: P::Body) {
    let mut position = physics.translation(body);
    let mut velocity = physics.linvel(body);

    let blended = blend_velocity(
        arcade_velocity(locomotion),
        velocity,
        locomotion.simulated_velocity_influence(),
    );

    // If just jumped, don't stick to ground
    if !locomotion.jump_request_mut().take_just_jumped() {
        let clearance = locomotion.config().ground_clearance();
        let ground = locomotion.ground_mut();
        let hit_point = ground.hit_point.filter(|_| ground.ray_has_hit);

        match hit_point {
            Some(point) => {
                position.y = point.y + clearance;
                velocity = Vec3::new(blended.x, 0.0, blended.z);
            }
            None => {
                velocity = blended;
                ground.last_impact_velocity = velocity;
            }
        }
    }

    physics.set_translation(body, position, true);
    physics.set_linvel(body, velocity, true);
}
