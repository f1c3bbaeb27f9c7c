//! Jumping and falling.
//!
//! Jumps are two-phase. The first part of the clip is wind-up only; once the
//! state timer passes [`Liftoff::at`] the physical jump is requested exactly
//! once, and the velocity blend shifts toward the simulated velocity so the
//! body keeps its momentum and reacts to collisions in the air.

use crate::character::Locomotion;

use super::{air_speed, drop_kind, CharacterState, Liftoff, StateCore, StateKind};

/// [`StateKind::JumpIdle`] and [`StateKind::JumpRunning`].
#[derive(Debug)]
pub struct JumpState {
    kind: StateKind,
    core: StateCore,
    liftoff: Liftoff,
    already_jumped: bool,
}

impl JumpState {
    pub fn new(kind: StateKind, core: StateCore, liftoff: Liftoff) -> Self {
        Self {
            kind,
            core,
            liftoff,
            already_jumped: false,
        }
    }

    fn lift_off(&mut self, locomotion: &mut Locomotion) {
        locomotion.jump(self.liftoff.init_speed);
        self.already_jumped = true;

        locomotion.tweak_springs(self.liftoff.velocity_spring, self.liftoff.rotation_spring);
        locomotion.set_simulated_velocity_influence(self.liftoff.influence);
    }
}

impl CharacterState for JumpState {
    fn kind(&self) -> StateKind {
        self.kind
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn already_jumped(&self) -> bool {
        self.already_jumped
    }

    fn update(&mut self, locomotion: &mut Locomotion, delta: f32) -> Option<StateKind> {
        self.core.tick(delta);

        // Move in air
        if self.already_jumped || self.liftoff.steer_before_liftoff {
            locomotion.set_global_direction_goal();
        }
        if self.already_jumped {
            let speed = air_speed(locomotion);
            locomotion.set_arcade_velocity_target(speed, 0.0);
        }
        locomotion.update(delta);

        let timer = self.core.timer;
        if timer > self.liftoff.at && !self.already_jumped {
            self.lift_off(locomotion);
            None
        } else if timer > self.liftoff.land_after && locomotion.ray_has_hit() {
            Some(drop_kind(locomotion))
        } else if timer > self.core.animation_length.unwrap_or_default() - delta {
            Some(StateKind::Falling)
        } else {
            None
        }
    }
}

#[derive(Debug)]
pub struct Falling {
    core: StateCore,
}

impl Falling {
    pub fn new(core: StateCore) -> Self {
        Self { core }
    }
}

impl CharacterState for Falling {
    fn kind(&self) -> StateKind {
        StateKind::Falling
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn update(&mut self, locomotion: &mut Locomotion, delta: f32) -> Option<StateKind> {
        self.core.tick(delta);

        locomotion.set_global_direction_goal();
        let speed = air_speed(locomotion);
        locomotion.set_arcade_velocity_target(speed, 0.0);
        locomotion.update(delta);

        locomotion.ray_has_hit().then(|| drop_kind(locomotion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationLibrary;
    use crate::config::CharacterConfig;
    use crate::controls::ControlName;
    use crate::spring::SpringParams;
    use bevy::prelude::*;

    fn locomotion() -> Locomotion {
        let mut loco = Locomotion::new(CharacterConfig::default());
        loco.animator_mut().set_library(
            AnimationLibrary::new()
                .with_clip("idle", 2.0)
                .with_clip("jump_idle", 1.0)
                .with_clip("jump_running", 0.8),
        );
        loco.ground_mut().ray_has_hit = true;
        loco
    }

    #[test]
    fn jump_idle_lifts_off_once() {
        let mut loco = locomotion();
        let mut state = StateKind::JumpIdle.enter(&mut loco);

        for _ in 0..12 {
            state.update(&mut loco, 0.016);
        }
        assert!(!state.already_jumped());
        assert!(!loco.jump_request().wants_to_jump);

        state.update(&mut loco, 0.016);
        state.update(&mut loco, 0.016);
        assert!(state.already_jumped());
        assert!(loco.jump_request().wants_to_jump);
        assert_eq!(loco.jump_request().init_speed, None);
        assert_eq!(loco.velocity_spring().params(), SpringParams::new(100.0, 0.8));
        assert_eq!(loco.rotation_spring().params(), SpringParams::new(10.0, 0.3));
        assert_eq!(loco.simulated_velocity_influence(), Vec3::new(0.7, 1.0, 0.7));

        // Consumed by the next pre-step; further updates must not request again.
        loco.jump_request_mut().wants_to_jump = false;
        loco.ground_mut().ray_has_hit = false;
        for _ in 0..3 {
            state.update(&mut loco, 0.016);
        }
        assert!(!loco.jump_request().wants_to_jump);
    }

    #[test]
    fn jump_running_requests_minimum_speed() {
        let mut loco = locomotion();
        let mut state = StateKind::JumpRunning.enter(&mut loco);

        state.update(&mut loco, 0.1);
        assert!(!state.already_jumped());
        state.update(&mut loco, 0.1);
        assert!(state.already_jumped());
        assert_eq!(loco.jump_request().init_speed, Some(4.0));
        assert_eq!(loco.simulated_velocity_influence(), Vec3::new(0.98, 1.0, 0.98));
    }

    #[test]
    fn landing_after_liftoff_picks_drop_state() {
        let mut loco = locomotion();
        let mut state = StateKind::JumpIdle.enter(&mut loco);

        state.update(&mut loco, 0.25);
        assert!(state.already_jumped());
        assert_eq!(state.update(&mut loco, 0.1), Some(StateKind::DropIdle));
    }

    #[test]
    fn jump_times_out_into_falling() {
        let mut loco = locomotion();
        let mut state = StateKind::JumpRunning.enter(&mut loco);
        state.update(&mut loco, 0.15);

        loco.ground_mut().ray_has_hit = false;
        assert_eq!(state.update(&mut loco, 0.2), None);
        assert_eq!(state.update(&mut loco, 0.3), Some(StateKind::Falling));
    }

    #[test]
    fn falling_steers_and_lands() {
        let mut loco = locomotion();
        loco.ground_mut().ray_has_hit = false;
        let mut state = StateKind::Falling.enter(&mut loco);

        assert_eq!(state.update(&mut loco, 0.016), None);
        assert_eq!(loco.velocity_target().z, 0.0);

        loco.controls_mut().apply(ControlName::Up, true);
        state.update(&mut loco, 0.016);
        assert_eq!(loco.velocity_target().z, 0.8);

        loco.ground_mut().ray_has_hit = true;
        assert_eq!(state.update(&mut loco, 0.016), Some(StateKind::DropRunning));
    }

    #[test]
    fn hard_landing_rolls() {
        let mut loco = locomotion();
        loco.ground_mut().last_impact_velocity = Vec3::new(0.0, -9.0, 0.0);
        let mut state = StateKind::Falling.enter(&mut loco);
        assert_eq!(state.update(&mut loco, 0.016), Some(StateKind::DropRolling));
    }
}
