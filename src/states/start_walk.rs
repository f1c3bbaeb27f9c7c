//! Start-walk states.
//!
//! Played once when the character starts moving from a standstill. The five
//! variants only differ in clip; each hands over to [`Walk`](super::Walk) when
//! the clip ends.

use std::f32::consts::PI;

use crate::character::Locomotion;
use crate::controls::ControlName;
use crate::math::signed_angle_between;

use super::{fall_in_air, CharacterState, StateCore, StateKind};

/// Releasing the direction this early counts as a turn on the spot.
const CANCEL_WINDOW: f32 = 0.1;

#[derive(Debug)]
pub struct StartWalk {
    kind: StateKind,
    core: StateCore,
}

impl StartWalk {
    pub fn new(kind: StateKind, core: StateCore) -> Self {
        Self { kind, core }
    }

    fn cancelled(&self, locomotion: &Locomotion) -> StateKind {
        if self.core.timer >= CANCEL_WINDOW {
            return StateKind::Idle;
        }

        let angle = signed_angle_between(locomotion.orientation(), locomotion.orientation_target());
        if angle > 0.4 * PI {
            StateKind::IdleRotateLeft
        } else if angle < -0.4 * PI {
            StateKind::IdleRotateRight
        } else {
            StateKind::Idle
        }
    }
}

impl CharacterState for StartWalk {
    fn kind(&self) -> StateKind {
        self.kind
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn update(&mut self, locomotion: &mut Locomotion, delta: f32) -> Option<StateKind> {
        self.core.tick(delta);

        let mut next = None;
        if self.core.animation_ended(self.kind, locomotion, delta) {
            next = Some(StateKind::Walk);
        }

        locomotion.set_global_direction_goal();
        locomotion.update(delta);

        fall_in_air(locomotion).or(next)
    }

    fn change_state(&self, locomotion: &Locomotion) -> Option<StateKind> {
        let controls = locomotion.controls();
        let mut next = None;

        if controls.just_pressed(ControlName::Jump) {
            next = Some(StateKind::JumpRunning);
        }

        if controls.no_direction() {
            next = Some(self.cancelled(locomotion));
        }

        if controls.just_pressed(ControlName::Run) {
            next = Some(StateKind::Sprint);
        }

        next
    }
}
