//! Standing and walking states.

use crate::character::Locomotion;
use crate::controls::ControlName;

use super::{fall_in_air, just_pressed, start_walk_kind, CharacterState, StateCore, StateKind};

/// Start moving from a standstill: keep walking if still moving fast enough,
/// otherwise pick the start-walk variant for the input direction.
fn walk_off(locomotion: &Locomotion) -> StateKind {
    if locomotion.arcade_speed() > 0.5 {
        StateKind::Walk
    } else {
        start_walk_kind(locomotion)
    }
}

/// Transitions shared by the standing states.
fn standing_transition(locomotion: &Locomotion) -> Option<StateKind> {
    let mut next = None;

    if just_pressed(locomotion, ControlName::Jump) {
        next = Some(StateKind::JumpIdle);
    }

    if locomotion.controls().any_direction() {
        next = Some(walk_off(locomotion));
    }

    next
}

#[derive(Debug)]
pub struct Idle {
    core: StateCore,
}

impl Idle {
    pub fn new(core: StateCore) -> Self {
        Self { core }
    }
}

impl CharacterState for Idle {
    fn kind(&self) -> StateKind {
        StateKind::Idle
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn update(&mut self, locomotion: &mut Locomotion, delta: f32) -> Option<StateKind> {
        self.core.tick(delta);
        locomotion.update(delta);
        fall_in_air(locomotion)
    }

    fn change_state(&self, locomotion: &Locomotion) -> Option<StateKind> {
        standing_transition(locomotion)
    }
}

/// Turning on the spot after a start-walk was cancelled early.
#[derive(Debug)]
pub struct IdleRotate {
    kind: StateKind,
    core: StateCore,
}

impl IdleRotate {
    pub fn new(kind: StateKind, core: StateCore) -> Self {
        Self { kind, core }
    }
}

impl CharacterState for IdleRotate {
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
            next = Some(StateKind::Idle);
        }

        locomotion.update(delta);
        fall_in_air(locomotion).or(next)
    }

    fn change_state(&self, locomotion: &Locomotion) -> Option<StateKind> {
        standing_transition(locomotion)
    }
}

#[derive(Debug)]
pub struct Walk {
    core: StateCore,
}

impl Walk {
    pub fn new(core: StateCore) -> Self {
        Self { core }
    }
}

impl CharacterState for Walk {
    fn kind(&self) -> StateKind {
        StateKind::Walk
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn on_enter(&mut self, locomotion: &mut Locomotion) -> Option<StateKind> {
        locomotion
            .controls()
            .no_direction()
            .then_some(StateKind::EndWalk)
    }

    fn update(&mut self, locomotion: &mut Locomotion, delta: f32) -> Option<StateKind> {
        self.core.tick(delta);

        locomotion.set_global_direction_goal();
        locomotion.update(delta);

        let mut next = fall_in_air(locomotion);
        if locomotion.controls().is_pressed(ControlName::Run) {
            next = Some(StateKind::Sprint);
        }
        next
    }

    fn change_state(&self, locomotion: &Locomotion) -> Option<StateKind> {
        let mut next = None;

        if just_pressed(locomotion, ControlName::Jump) {
            next = Some(StateKind::JumpRunning);
        }

        if locomotion.controls().no_direction() {
            next = Some(if locomotion.arcade_speed() > 1.0 {
                StateKind::EndWalk
            } else {
                StateKind::Idle
            });
        }

        next
    }
}

#[derive(Debug)]
pub struct Sprint {
    core: StateCore,
}

impl Sprint {
    pub fn new(core: StateCore) -> Self {
        Self { core }
    }
}

impl CharacterState for Sprint {
    fn kind(&self) -> StateKind {
        StateKind::Sprint
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn update(&mut self, locomotion: &mut Locomotion, delta: f32) -> Option<StateKind> {
        self.core.tick(delta);

        locomotion.set_global_direction_goal();
        locomotion.update(delta);
        fall_in_air(locomotion)
    }

    fn change_state(&self, locomotion: &Locomotion) -> Option<StateKind> {
        let controls = locomotion.controls();
        let mut next = None;

        if controls.just_released(ControlName::Run) {
            next = Some(StateKind::Walk);
        }

        if controls.just_pressed(ControlName::Jump) {
            next = Some(StateKind::JumpRunning);
        }

        if controls.no_direction() {
            next = Some(StateKind::EndWalk);
        }

        next
    }
}

/// Stopping animation after walking or sprinting.
#[derive(Debug)]
pub struct EndWalk {
    core: StateCore,
}

impl EndWalk {
    pub fn new(core: StateCore) -> Self {
        Self { core }
    }
}

impl CharacterState for EndWalk {
    fn kind(&self) -> StateKind {
        StateKind::EndWalk
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn update(&mut self, locomotion: &mut Locomotion, delta: f32) -> Option<StateKind> {
        self.core.tick(delta);

        let mut next = None;
        if self.core.animation_ended(StateKind::EndWalk, locomotion, delta) {
            next = Some(StateKind::Idle);
        }

        locomotion.update(delta);
        fall_in_air(locomotion).or(next)
    }

    fn change_state(&self, locomotion: &Locomotion) -> Option<StateKind> {
        let controls = locomotion.controls();
        let mut next = None;

        if controls.just_pressed(ControlName::Jump) {
            next = Some(StateKind::JumpIdle);
        }

        if controls.any_direction() {
            next = Some(if controls.is_pressed(ControlName::Run) {
                StateKind::Sprint
            } else {
                walk_off(locomotion)
            });
        }

        next
    }
}
