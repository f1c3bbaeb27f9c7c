//! Character behaviors.
//!
//! A behavior is what drives a character each frame: it runs the state
//! machine's update and may press or release controls and set targets on the
//! character, just like player input would.

use std::collections::BTreeMap;
use std::fmt;

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::character::{Character, CharacterId};
use crate::controls::ControlName;

/// World information available to behaviors.
#[derive(Debug, Clone, Copy)]
pub struct BehaviorContext<'a> {
    /// The character being updated, if it is registered with an orchestrator.
    pub id: Option<CharacterId>,
    positions: Option<&'a BTreeMap<CharacterId, Vec3>>,
}

impl<'a> BehaviorContext<'a> {
    pub fn new(id: CharacterId, positions: &'a BTreeMap<CharacterId, Vec3>) -> Self {
        Self {
            id: Some(id),
            positions: Some(positions),
        }
    }

    /// Context for a character updated outside of an orchestrator.
    pub fn detached() -> Self {
        Self {
            id: None,
            positions: None,
        }
    }

    /// Feet position of another character, as of the start of this frame's
    /// behavior pass.
    pub fn position_of(&self, id: CharacterId) -> Option<Vec3> {
        self.positions.and_then(|positions| positions.get(&id).copied())
    }
}

/// Something that drives a character every frame.
pub trait Behavior: fmt::Debug + Send + Sync + 'static {
    fn update(&mut self, character: &mut Character, context: &BehaviorContext, delta: f32);
}

/// Only runs the state machine. Used for player-controlled characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBehavior;

impl Behavior for DefaultBehavior {
    fn update(&mut self, character: &mut Character, _context: &BehaviorContext, delta: f32) {
        character.update_state(delta);
    }
}

/// Walks toward another character and stops close to it.
#[derive(Debug, Clone, Copy)]
pub struct FollowTarget {
    pub target: CharacterId,
    /// Distance at which the follower stops and turns to face the target.
    pub stop_distance: f32,
}

impl FollowTarget {
    pub fn new(target: CharacterId) -> Self {
        Self {
            target,
            stop_distance: 1.3,
        }
    }

    /// Builder: set the stop distance.
    pub fn with_stop_distance(mut self, stop_distance: f32) -> Self {
        self.stop_distance = stop_distance;
        self
    }
}

impl Behavior for FollowTarget {
    fn update(&mut self, character: &mut Character, context: &BehaviorContext, delta: f32) {
        character.update_state(delta);

        let Some(target) = context.position_of(self.target) else {
            debug!("Follow target {:?} is not registered", self.target);
            return;
        };

        let view = target - character.feet_position();
        character.set_view_vector(view);

        let walking = character.controls().is_pressed(ControlName::Up);
        if view.length() > self.stop_distance {
            if !walking {
                character.set_control(ControlName::Up, true);
            }
        } else {
            if walking {
                character.set_control(ControlName::Up, false);
            }
            character.set_orientation_target(view);
        }
    }
}

/// Wanders around by pressing controls at random.
pub struct RandomBehavior {
    /// One in `frequency` frames triggers each action.
    pub frequency: u32,
    rng: StdRng,
}

impl fmt::Debug for RandomBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomBehavior")
            .field("frequency", &self.frequency)
            .finish_non_exhaustive()
    }
}

impl Default for RandomBehavior {
    fn default() -> Self {
        Self {
            frequency: 100,
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomBehavior {
    /// Deterministic behavior for a given seed.
    pub fn seeded(frequency: u32, seed: u64) -> Self {
        Self {
            frequency: frequency.max(1),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Builder: set the frequency.
    pub fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency.max(1);
        self
    }
}

impl Behavior for RandomBehavior {
    fn update(&mut self, character: &mut Character, _context: &BehaviorContext, delta: f32) {
        character.update_state(delta);

        let roll = self.rng.gen_range(0..self.frequency.max(1));
        let pressed = self.rng.gen_bool(0.5);

        match roll {
            0 => {
                let view = Vec3::new(
                    self.rng.gen::<f32>() - 0.5,
                    self.rng.gen::<f32>() - 0.5,
                    self.rng.gen::<f32>() - 0.5,
                );
                character.set_view_vector(view);

                // Tap forward with one extra state update in between.
                character.set_control(ControlName::Up, true);
                character.update_state(delta);
                character.set_control(ControlName::Up, false);
            }
            1 => character.set_control(ControlName::Up, pressed),
            2 => character.set_control(ControlName::Run, pressed),
            3 => character.set_control(ControlName::Jump, pressed),
            _ => {}
        }
    }
}
