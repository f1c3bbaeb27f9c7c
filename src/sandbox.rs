//! Minimal deterministic physics world.
//!
//! Bodies are axis-aligned boxes. Dynamic boxes fall under gravity and are
//! pushed out of static boxes along the axis of least penetration; dynamic
//! boxes do not collide with each other. That is enough to stand, walk, jump
//! and land a character in tests and headless runs without a full engine.

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::backend::{PhysicsWorld, RayQuery};
use crate::collision::RayHit;

/// Handle of a [`SandboxWorld`] body.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SandboxBody(pub u32);

/// Whether a body moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy)]
struct BoxBody {
    kind: BodyKind,
    translation: Vec3,
    velocity: Vec3,
    half_extents: Vec3,
    rotation: Quat,
    rotation_locked: bool,
}

impl BoxBody {
    fn min(&self) -> Vec3 {
        self.translation - self.half_extents
    }

    fn max(&self) -> Vec3 {
        self.translation + self.half_extents
    }
}

/// Box-only physics world.
#[derive(Debug, Clone)]
pub struct SandboxWorld {
    gravity: Vec3,
    bodies: BTreeMap<SandboxBody, BoxBody>,
    next_id: u32,
}

impl Default for SandboxWorld {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            bodies: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl SandboxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set gravity.
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    fn insert(&mut self, kind: BodyKind, center: Vec3, half_extents: Vec3) -> SandboxBody {
        let handle = SandboxBody(self.next_id);
        self.next_id += 1;
        self.bodies.insert(
            handle,
            BoxBody {
                kind,
                translation: center,
                velocity: Vec3::ZERO,
                half_extents: half_extents.abs(),
                rotation: Quat::IDENTITY,
                rotation_locked: false,
            },
        );
        handle
    }

    /// Add an immovable box.
    pub fn add_static_box(&mut self, center: Vec3, half_extents: Vec3) -> SandboxBody {
        self.insert(BodyKind::Static, center, half_extents)
    }

    /// Add a box affected by gravity.
    pub fn add_dynamic_box(&mut self, center: Vec3, half_extents: Vec3) -> SandboxBody {
        self.insert(BodyKind::Dynamic, center, half_extents)
    }

    /// Add a wide, one unit thick floor whose top face is at `height`.
    pub fn add_ground(&mut self, height: f32) -> SandboxBody {
        self.add_static_box(Vec3::new(0.0, height - 0.5, 0.0), Vec3::new(100.0, 0.5, 100.0))
    }

    /// Add a dynamic box sized for a character of `height`.
    pub fn add_character_body(&mut self, position: Vec3, height: f32) -> SandboxBody {
        let body = self.add_dynamic_box(position, Vec3::new(height / 4.0, height / 2.0, height / 4.0));
        self.lock_rotations(body, true);
        body
    }

    pub fn remove_body(&mut self, body: SandboxBody) -> bool {
        self.bodies.remove(&body).is_some()
    }

    pub fn kind(&self, body: SandboxBody) -> Option<BodyKind> {
        self.bodies.get(&body).map(|b| b.kind)
    }

    pub fn rotation_locked(&self, body: SandboxBody) -> bool {
        self.bodies.get(&body).is_some_and(|b| b.rotation_locked)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Push `body` out of every static box it overlaps.
    fn resolve_static_contacts(&mut self, handle: SandboxBody) {
        let obstacles: Vec<(Vec3, Vec3)> = self
            .bodies
            .iter()
            .filter(|(h, b)| **h != handle && b.kind == BodyKind::Static)
            .map(|(_, b)| (b.min(), b.max()))
            .collect();

        let Some(body) = self.bodies.get_mut(&handle) else {
            return;
        };

        for (min, max) in obstacles {
            let overlap = body.max().min(max) - body.min().max(min);
            if overlap.x <= 0.0 || overlap.y <= 0.0 || overlap.z <= 0.0 {
                continue;
            }

            // Separate along the axis of least penetration.
            let center = (min + max) * 0.5;
            let side = (body.translation - center).signum();
            let (axis, depth) = [overlap.x, overlap.y, overlap.z]
                .into_iter()
                .enumerate()
                .fold((0, f32::MAX), |best, (axis, depth)| {
                    if depth < best.1 {
                        (axis, depth)
                    } else {
                        best
                    }
                });

            body.translation[axis] += side[axis] * depth;
            if body.velocity[axis] * side[axis] < 0.0 {
                body.velocity[axis] = 0.0;
            }
        }
    }
}

/// Slab test. Returns the entry distance, or the exit distance if the ray
/// starts inside the box.
fn ray_aabb_distance(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;

    for axis in 0..3 {
        if direction[axis].abs() < 1e-8 {
            // Parallel to this slab: must already be inside it.
            if origin[axis] < min[axis] || origin[axis] > max[axis] {
                return None;
            }
            continue;
        }

        let inv = 1.0 / direction[axis];
        let t1 = (min[axis] - origin[axis]) * inv;
        let t2 = (max[axis] - origin[axis]) * inv;
        t_min = t_min.max(t1.min(t2));
        t_max = t_max.min(t1.max(t2));
    }

    if t_max < t_min || t_max < 0.0 {
        return None;
    }
    Some(if t_min >= 0.0 { t_min } else { t_max })
}

impl PhysicsWorld for SandboxWorld {
    type Body = SandboxBody;

    fn translation(&self, body: SandboxBody) -> Vec3 {
        self.bodies
            .get(&body)
            .map(|b| b.translation)
            .unwrap_or(Vec3::ZERO)
    }

    fn linvel(&self, body: SandboxBody) -> Vec3 {
        self.bodies
            .get(&body)
            .map(|b| b.velocity)
            .unwrap_or(Vec3::ZERO)
    }

    fn rotation(&self, body: SandboxBody) -> Quat {
        self.bodies
            .get(&body)
            .map(|b| b.rotation)
            .unwrap_or(Quat::IDENTITY)
    }

    fn set_translation(&mut self, body: SandboxBody, translation: Vec3, _wake: bool) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.translation = translation;
        }
    }

    fn set_linvel(&mut self, body: SandboxBody, velocity: Vec3, _wake: bool) {
        if let Some(b) = self.bodies.get_mut(&body) {
            if b.kind == BodyKind::Dynamic {
                b.velocity = velocity;
            }
        }
    }

    fn lock_rotations(&mut self, body: SandboxBody, locked: bool) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.rotation_locked = locked;
        }
    }

    fn step(&mut self, delta: f32) {
        if delta <= 0.0 {
            return;
        }

        let dynamic: Vec<SandboxBody> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.kind == BodyKind::Dynamic)
            .map(|(h, _)| *h)
            .collect();

        for handle in dynamic {
            if let Some(body) = self.bodies.get_mut(&handle) {
                body.velocity += self.gravity * delta;
                body.translation += body.velocity * delta;
            }
            self.resolve_static_contacts(handle);
        }
    }

    fn cast_ray(&self, query: &RayQuery<SandboxBody>) -> Vec<RayHit<SandboxBody>> {
        let mut hits: Vec<RayHit<SandboxBody>> = self
            .bodies
            .iter()
            .filter(|(handle, _)| query.exclude != Some(**handle))
            .filter_map(|(handle, body)| {
                let distance =
                    ray_aabb_distance(query.origin, query.direction, body.min(), body.max())?;
                query
                    .accepts(distance)
                    .then(|| RayHit::new(distance, query.point_at(distance), Some(*handle)))
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn bodies(&self) -> Vec<SandboxBody> {
        self.bodies.keys().copied().collect()
    }

    fn contains(&self, body: SandboxBody) -> bool {
        self.bodies.contains_key(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gravity_accelerates_dynamic_bodies() {
        let mut world = SandboxWorld::new();
        let body = world.add_dynamic_box(Vec3::new(0.0, 10.0, 0.0), Vec3::splat(0.5));

        world.step(0.1);
        assert!((world.linvel(body).y + 0.981).abs() < 1e-5);
        assert!(world.translation(body).y < 10.0);
    }

    #[test]
    fn static_bodies_do_not_move() {
        let mut world = SandboxWorld::new();
        let ground = world.add_ground(0.0);
        world.set_linvel(ground, Vec3::X, true);
        world.step(0.1);

        assert_eq!(world.linvel(ground), Vec3::ZERO);
        assert_eq!(world.translation(ground), Vec3::new(0.0, -0.5, 0.0));
    }

    #[test]
    fn boxes_rest_on_ground() {
        let mut world = SandboxWorld::new();
        world.add_ground(0.0);
        let body = world.add_dynamic_box(Vec3::new(0.0, 2.0, 0.0), Vec3::splat(0.5));

        for _ in 0..200 {
            world.step(1.0 / 60.0);
        }

        assert!((world.translation(body).y - 0.5).abs() < 1e-3);
        assert_eq!(world.linvel(body).y, 0.0);
    }

    #[test]
    fn walls_stop_horizontal_motion() {
        let mut world = SandboxWorld::new().with_gravity(Vec3::ZERO);
        world.add_static_box(Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.5, 2.0, 2.0));
        let body = world.add_dynamic_box(Vec3::ZERO, Vec3::splat(0.5));
        world.set_linvel(body, Vec3::new(5.0, 0.0, 0.0), true);

        for _ in 0..60 {
            world.step(1.0 / 60.0);
        }

        assert!((world.translation(body).x - 1.0).abs() < 1e-3);
        assert_eq!(world.linvel(body).x, 0.0);
    }

    #[test]
    fn ray_hits_are_ordered_and_filtered() {
        let mut world = SandboxWorld::new();
        let low = world.add_static_box(Vec3::new(0.0, -0.5, 0.0), Vec3::splat(0.5));
        let high = world.add_static_box(Vec3::new(0.0, 2.5, 0.0), Vec3::splat(0.5));
        let origin = world.add_dynamic_box(Vec3::new(0.0, 5.0, 0.0), Vec3::splat(0.5));

        let query = RayQuery::down(Vec3::new(0.0, 5.0, 0.0), 0.0, 10.0);
        let hits = world.cast_ray(&query);
        assert_eq!(hits.len(), 3);
        // Starts inside its own box, so that hit is the exit face.
        assert_eq!(hits[0].body, Some(origin));
        assert_eq!(hits[1].body, Some(high));
        assert_eq!(hits[2].body, Some(low));
        assert!((hits[1].point.y - 3.0).abs() < 1e-5);

        let query = query.excluding(origin).with_near(2.5);
        let hits = world.cast_ray(&query);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].body, Some(low));
        assert!((hits[0].distance - 5.0).abs() < 1e-5);
    }

    #[test]
    fn missing_bodies_read_zero() {
        let mut world = SandboxWorld::new();
        let body = SandboxBody(42);
        world.set_translation(body, Vec3::ONE, true);

        assert!(!world.contains(body));
        assert_eq!(world.translation(body), Vec3::ZERO);
        assert_eq!(world.rotation(body), Quat::IDENTITY);
    }

    #[test]
    fn slab_misses_parallel_ray_outside() {
        assert_eq!(
            ray_aabb_distance(Vec3::new(2.0, 5.0, 0.0), Vec3::NEG_Y, Vec3::splat(-1.0), Vec3::splat(1.0)),
            None
        );
    }
}
