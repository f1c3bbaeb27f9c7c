//! Ray query results and per-character ground contact data.

use bevy::prelude::*;

/// One ray intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit<B> {
    /// Distance from the ray origin.
    pub distance: f32,
    /// World position of the hit point.
    pub point: Vec3,
    /// Body that was hit, if the collider belongs to one.
    pub body: Option<B>,
}

impl<B> RayHit<B> {
    /// Create a hit.
    pub fn new(distance: f32, point: Vec3, body: Option<B>) -> Self {
        Self {
            distance,
            point,
            body,
        }
    }
}

/// Ground contact scratch data, refreshed every physics step.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct GroundContact {
    /// Whether the ground ray hit anything during the last pre-step.
    pub ray_has_hit: bool,
    /// Hit point of the last ground ray, if any.
    pub hit_point: Option<Vec3>,
    /// Velocity recorded while airborne; read on landing to pick the drop state.
    pub last_impact_velocity: Vec3,
}

impl GroundContact {
    /// Record the result of a ground ray.
    pub fn record<B>(&mut self, hit: Option<&RayHit<B>>) {
        self.ray_has_hit = hit.is_some();
        self.hit_point = hit.map(|h| h.point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hit_new() {
        let hit = RayHit::new(0.55, Vec3::new(1.0, 0.0, 2.0), Some(7u32));

        assert_eq!(hit.distance, 0.55);
        assert_eq!(hit.point, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(hit.body, Some(7));
    }

    #[test]
    fn record_hit_and_miss() {
        let mut contact = GroundContact::default();
        let hit = RayHit::<u32>::new(0.6, Vec3::new(0.0, -0.1, 0.0), None);

        contact.record(Some(&hit));
        assert!(contact.ray_has_hit);
        assert_eq!(contact.hit_point, Some(Vec3::new(0.0, -0.1, 0.0)));

        contact.record::<u32>(None);
        assert!(!contact.ray_has_hit);
        assert_eq!(contact.hit_point, None);
    }
}
