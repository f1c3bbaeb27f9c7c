//! Landing states, chosen by [`drop_kind`](super::drop_kind).

use crate::character::Locomotion;
use crate::controls::ControlName;

use super::{fall_in_air, just_pressed, CharacterState, StateCore, StateKind};

/// Soft landing without input.
#[derive(Debug)]
pub struct DropIdle {
    core: StateCore,
}

impl DropIdle {
    pub fn new(core: StateCore) -> Self {
        Self { core }
    }
}

impl CharacterState for DropIdle {
    fn kind(&self) -> StateKind {
        StateKind::DropIdle
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn on_enter(&mut self, locomotion: &mut Locomotion) -> Option<StateKind> {
        locomotion
            .controls()
            .any_direction()
            .then_some(StateKind::StartWalkForward)
    }

    fn update(&mut self, locomotion: &mut Locomotion, delta: f32) -> Option<StateKind> {
        self.core.tick(delta);

        locomotion.set_global_direction_goal();
        locomotion.update(delta);

        let mut next = None;
        if self.core.animation_ended(StateKind::DropIdle, locomotion, delta) {
            next = Some(StateKind::Idle);
        }
        fall_in_air(locomotion).or(next)
    }

    fn change_state(&self, locomotion: &Locomotion) -> Option<StateKind> {
        let mut next = None;

        if just_pressed(locomotion, ControlName::Jump) {
            next = Some(StateKind::JumpIdle);
        }

        if locomotion.controls().any_direction() {
            next = Some(StateKind::StartWalkForward);
        }

        next
    }
}

/// Landing while moving.
#[derive(Debug)]
pub struct DropRunning {
    core: StateCore,
}

impl DropRunning {
    pub fn new(core: StateCore) -> Self {
        Self { core }
    }
}

impl CharacterState for DropRunning {
    fn kind(&self) -> StateKind {
        StateKind::DropRunning
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn update(&mut self, locomotion: &mut Locomotion, delta: f32) -> Option<StateKind> {
        self.core.tick(delta);

        locomotion.set_global_direction_goal();
        locomotion.update(delta);

        let mut next = None;
        if self.core.animation_ended(StateKind::DropRunning, locomotion, delta) {
            next = Some(StateKind::Walk);
        }
        fall_in_air(locomotion).or(next)
    }

    fn change_state(&self, locomotion: &Locomotion) -> Option<StateKind> {
        let controls = locomotion.controls();
        let mut next = None;

        if controls.no_direction() {
            next = Some(StateKind::EndWalk);
        }

        if controls.any_direction() && controls.just_pressed(ControlName::Run) {
            next = Some(StateKind::Sprint);
        }

        if controls.just_pressed(ControlName::Jump) {
            next = Some(StateKind::JumpRunning);
        }

        next
    }
}

/// Hard landing. Rolls through the impact and cannot be interrupted.
#[derive(Debug)]
pub struct DropRolling {
    core: StateCore,
}

impl DropRolling {
    pub fn new(core: StateCore) -> Self {
        Self { core }
    }
}

impl CharacterState for DropRolling {
    fn kind(&self) -> StateKind {
        StateKind::DropRolling
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn update(&mut self, locomotion: &mut Locomotion, delta: f32) -> Option<StateKind> {
        self.core.tick(delta);

        locomotion.set_global_direction_goal();
        locomotion.update(delta);

        if !self.core.animation_ended(StateKind::DropRolling, locomotion, delta) {
            return None;
        }

        Some(if locomotion.controls().any_direction() {
            StateKind::Walk
        } else {
            StateKind::EndWalk
        })
    }
}
