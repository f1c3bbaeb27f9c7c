//! Character locomotion states.
//!
//! A character always has exactly one active [`CharacterState`]. States are
//! built by [`StateKind::enter`], which first applies the kind's [`Tuning`]
//! (spring feel, velocity influence, arcade speed target, animation clip) to
//! the character's [`Locomotion`] and then constructs the concrete state.
//!
//! State hooks never replace themselves. They return the kind they want to
//! transition to and the owning [`Character`](crate::character::Character)
//! performs the replacement. When several checks inside one hook fire, the
//! last one wins.

use std::fmt;

use bevy::prelude::*;

use crate::animation::Clip;
use crate::character::Locomotion;
use crate::controls::ControlName;
use crate::math::signed_angle_between;
use crate::spring::SpringParams;

mod airborne;
mod grounded;
mod landing;
mod start_walk;

pub use airborne::{Falling, JumpState};
pub use grounded::{EndWalk, Idle, IdleRotate, Sprint, Walk};
pub use landing::{DropIdle, DropRolling, DropRunning};
pub use start_walk::StartWalk;

/// Arcade speed target while walking.
pub const WALK_SPEED: f32 = 0.8;

/// Arcade speed target while sprinting.
pub const SPRINT_SPEED: f32 = 1.4;

/// Every locomotion state a character can be in.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Idle,
    IdleRotateLeft,
    IdleRotateRight,
    Walk,
    Sprint,
    StartWalkForward,
    StartWalkLeft,
    StartWalkRight,
    StartWalkBackLeft,
    StartWalkBackRight,
    EndWalk,
    JumpIdle,
    JumpRunning,
    Falling,
    DropIdle,
    DropRunning,
    DropRolling,
}

impl StateKind {
    pub const ALL: [StateKind; 17] = [
        StateKind::Idle,
        StateKind::IdleRotateLeft,
        StateKind::IdleRotateRight,
        StateKind::Walk,
        StateKind::Sprint,
        StateKind::StartWalkForward,
        StateKind::StartWalkLeft,
        StateKind::StartWalkRight,
        StateKind::StartWalkBackLeft,
        StateKind::StartWalkBackRight,
        StateKind::EndWalk,
        StateKind::JumpIdle,
        StateKind::JumpRunning,
        StateKind::Falling,
        StateKind::DropIdle,
        StateKind::DropRunning,
        StateKind::DropRolling,
    ];

    /// Whether the character is expected to be off the ground in this state.
    pub fn is_airborne(self) -> bool {
        matches!(
            self,
            StateKind::JumpIdle | StateKind::JumpRunning | StateKind::Falling
        )
    }

    /// Whether this is one of the five start-walk variants.
    pub fn is_start_walk(self) -> bool {
        matches!(
            self,
            StateKind::StartWalkForward
                | StateKind::StartWalkLeft
                | StateKind::StartWalkRight
                | StateKind::StartWalkBackLeft
                | StateKind::StartWalkBackRight
        )
    }

    /// Construction parameters of this kind.
    pub fn tuning(self) -> Tuning {
        use StateKind::*;

        match self {
            Idle => Tuning::new(Clip::Idle, 0.3)
                .velocity(SpringTweak::both(10.0, 0.6))
                .target(0.0)
                .untracked(),
            IdleRotateLeft => Tuning::new(Clip::RotateLeft, 0.1)
                .velocity(SpringTweak::both(10.0, 0.6))
                .rotation(SpringTweak::both(30.0, 0.6))
                .target(0.0),
            IdleRotateRight => Tuning::new(Clip::RotateRight, 0.1)
                .velocity(SpringTweak::both(10.0, 0.6))
                .rotation(SpringTweak::both(30.0, 0.6))
                .target(0.0),
            Walk => Tuning::new(Clip::Run, 0.1).target(WALK_SPEED).untracked(),
            Sprint => Tuning::new(Clip::Sprint, 0.3)
                .velocity(SpringTweak::mass(10.0))
                .rotation(SpringTweak::both(50.0, 0.8))
                .target(SPRINT_SPEED)
                .untracked(),
            StartWalkForward => start_walk_tuning(Clip::StartForward),
            StartWalkLeft => start_walk_tuning(Clip::StartLeft),
            StartWalkRight => start_walk_tuning(Clip::StartRight),
            StartWalkBackLeft => start_walk_tuning(Clip::StartBackLeft),
            StartWalkBackRight => start_walk_tuning(Clip::StartBackRight),
            EndWalk => Tuning::new(Clip::Stop, 0.1).target(0.0),
            JumpIdle => Tuning::new(Clip::JumpIdle, 0.1)
                .velocity(SpringTweak::mass(50.0))
                .target(0.0),
            // Keeps whatever speed the character had when leaving the ground.
            JumpRunning => Tuning::new(Clip::JumpRunning, 0.1).velocity(SpringTweak::mass(100.0)),
            Falling => Tuning::new(Clip::Falling, 0.3)
                .velocity(SpringTweak::mass(100.0))
                .rotation(SpringTweak::damping(0.3))
                .influence(Vec3::new(0.98, 1.0, 0.98))
                .untracked(),
            DropIdle => Tuning::new(Clip::DropIdle, 0.1)
                .velocity(SpringTweak::both(7.0, 0.5))
                .target(0.0),
            DropRunning => Tuning::new(Clip::DropRunning, 0.1).target(WALK_SPEED),
            DropRolling => Tuning::new(Clip::DropRunningRoll, 0.03)
                .velocity(SpringTweak::both(1.0, 0.6))
                .target(WALK_SPEED),
        }
    }

    /// Liftoff parameters for the two jump kinds.
    pub fn liftoff(self) -> Option<Liftoff> {
        match self {
            StateKind::JumpIdle => Some(Liftoff {
                at: 0.2,
                land_after: 0.3,
                init_speed: None,
                velocity_spring: SpringTweak::mass(100.0),
                rotation_spring: SpringTweak::damping(0.3),
                influence: Vec3::new(0.7, 1.0, 0.7),
                steer_before_liftoff: false,
            }),
            StateKind::JumpRunning => Some(Liftoff {
                at: 0.14,
                land_after: 0.24,
                init_speed: Some(4.0),
                velocity_spring: SpringTweak::NONE,
                rotation_spring: SpringTweak::damping(0.3),
                influence: Vec3::new(0.98, 1.0, 0.98),
                steer_before_liftoff: true,
            }),
            _ => None,
        }
    }

    /// Apply this kind's tuning and build the state.
    ///
    /// Constructor redirects are not followed here; see
    /// [`Character::set_state`](crate::character::Character::set_state).
    pub fn enter(self, locomotion: &mut Locomotion) -> Box<dyn CharacterState> {
        let core = StateCore::new(self.tuning().apply(locomotion));

        match self {
            StateKind::Idle => Box::new(Idle::new(core)),
            StateKind::IdleRotateLeft | StateKind::IdleRotateRight => {
                Box::new(IdleRotate::new(self, core))
            }
            StateKind::Walk => Box::new(Walk::new(core)),
            StateKind::Sprint => Box::new(Sprint::new(core)),
            StateKind::StartWalkForward
            | StateKind::StartWalkLeft
            | StateKind::StartWalkRight
            | StateKind::StartWalkBackLeft
            | StateKind::StartWalkBackRight => Box::new(StartWalk::new(self, core)),
            StateKind::EndWalk => Box::new(EndWalk::new(core)),
            StateKind::JumpIdle | StateKind::JumpRunning => match self.liftoff() {
                Some(liftoff) => Box::new(JumpState::new(self, core, liftoff)),
                None => Box::new(Falling::new(core)),
            },
            StateKind::Falling => Box::new(Falling::new(core)),
            StateKind::DropIdle => Box::new(DropIdle::new(core)),
            StateKind::DropRunning => Box::new(DropRunning::new(core)),
            StateKind::DropRolling => Box::new(DropRolling::new(core)),
        }
    }
}

fn start_walk_tuning(clip: Clip) -> Tuning {
    Tuning::new(clip, 0.1)
        .rotation(SpringTweak::both(20.0, 0.7))
        .target(WALK_SPEED)
}

/// Partial override of a spring's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpringTweak {
    pub mass: Option<f32>,
    pub damping: Option<f32>,
}

impl SpringTweak {
    /// Leave the spring as it is.
    pub const NONE: SpringTweak = SpringTweak {
        mass: None,
        damping: None,
    };

    pub const fn both(mass: f32, damping: f32) -> Self {
        Self {
            mass: Some(mass),
            damping: Some(damping),
        }
    }

    pub const fn mass(mass: f32) -> Self {
        Self {
            mass: Some(mass),
            damping: None,
        }
    }

    pub const fn damping(damping: f32) -> Self {
        Self {
            mass: None,
            damping: Some(damping),
        }
    }

    /// Apply the override on top of `base`.
    pub fn apply(self, base: SpringParams) -> SpringParams {
        SpringParams::new(
            self.mass.unwrap_or(base.mass),
            self.damping.unwrap_or(base.damping),
        )
    }
}

/// Everything a state kind configures on entry.
///
/// Both springs are reset to the character's configured defaults before the
/// tweaks are applied, so a state never inherits its predecessor's feel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub velocity_spring: SpringTweak,
    pub rotation_spring: SpringTweak,
    /// Per-axis blend toward the simulated velocity.
    pub influence: Vec3,
    /// Forward arcade speed target. `None` keeps the current target.
    pub arcade_target: Option<f32>,
    pub clip: Clip,
    pub fade_in: f32,
    /// Whether the clip duration becomes the state's animation length.
    pub tracks_animation: bool,
}

impl Tuning {
    pub const fn new(clip: Clip, fade_in: f32) -> Self {
        Self {
            velocity_spring: SpringTweak::NONE,
            rotation_spring: SpringTweak::NONE,
            influence: Vec3::new(0.0, 1.0, 0.0),
            arcade_target: None,
            clip,
            fade_in,
            tracks_animation: true,
        }
    }

    /// Builder: override the velocity spring.
    pub const fn velocity(mut self, tweak: SpringTweak) -> Self {
        self.velocity_spring = tweak;
        self
    }

    /// Builder: override the rotation spring.
    pub const fn rotation(mut self, tweak: SpringTweak) -> Self {
        self.rotation_spring = tweak;
        self
    }

    /// Builder: set the simulated velocity influence.
    pub const fn influence(mut self, influence: Vec3) -> Self {
        self.influence = influence;
        self
    }

    /// Builder: set the arcade speed target.
    pub const fn target(mut self, speed: f32) -> Self {
        self.arcade_target = Some(speed);
        self
    }

    /// Builder: do not record the clip duration.
    pub const fn untracked(mut self) -> Self {
        self.tracks_animation = false;
        self
    }

    /// Configure `locomotion` and start the clip. Returns the animation length
    /// the new state should use.
    pub fn apply(&self, locomotion: &mut Locomotion) -> Option<f32> {
        locomotion.reset_springs();
        locomotion.tweak_springs(self.velocity_spring, self.rotation_spring);
        locomotion.set_simulated_velocity_influence(self.influence);
        if let Some(speed) = self.arcade_target {
            locomotion.set_arcade_velocity_target(speed, 0.0);
        }

        let duration = locomotion.animator_mut().set_animation(self.clip, self.fade_in);
        self.tracks_animation.then_some(duration)
    }
}

/// Physical jump parameters of a jump state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Liftoff {
    /// State time after which the jump impulse is requested.
    pub at: f32,
    /// State time after which a ground hit ends the jump.
    pub land_after: f32,
    /// Minimum horizontal launch speed.
    pub init_speed: Option<f32>,
    pub velocity_spring: SpringTweak,
    pub rotation_spring: SpringTweak,
    /// Influence once in the air.
    pub influence: Vec3,
    /// Whether the direction goal follows input before liftoff.
    pub steer_before_liftoff: bool,
}

/// Timer and animation length shared by every state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StateCore {
    /// Seconds since the state was entered.
    pub timer: f32,
    /// Duration of the state's clip, if it tracks one.
    pub animation_length: Option<f32>,
}

impl StateCore {
    pub fn new(animation_length: Option<f32>) -> Self {
        Self {
            timer: 0.0,
            animation_length,
        }
    }

    #[inline]
    pub fn tick(&mut self, delta: f32) {
        self.timer += delta;
    }

    /// Whether the state's clip has played out within one frame.
    ///
    /// Always true without a loaded model. A state that never recorded an
    /// animation length is a bug; it is logged and treated as ended so the
    /// machine keeps moving.
    pub fn animation_ended(&self, kind: StateKind, locomotion: &Locomotion, delta: f32) -> bool {
        if !locomotion.animator().has_model() {
            return true;
        }

        match self.animation_length {
            Some(length) => self.timer > length - delta,
            None => {
                error!(
                    "{:?} checked animation end without an animation length; treating it as ended",
                    kind
                );
                true
            }
        }
    }
}

/// Behavior of one locomotion state.
pub trait CharacterState: fmt::Debug + Send + Sync {
    fn kind(&self) -> StateKind;

    fn core(&self) -> &StateCore;

    fn timer(&self) -> f32 {
        self.core().timer
    }

    fn animation_length(&self) -> Option<f32> {
        self.core().animation_length
    }

    /// Whether the physical jump of this state has been requested.
    fn already_jumped(&self) -> bool {
        false
    }

    /// Runs once after construction. May redirect to another kind.
    fn on_enter(&mut self, _locomotion: &mut Locomotion) -> Option<StateKind> {
        None
    }

    /// Per-frame update.
    fn update(&mut self, locomotion: &mut Locomotion, delta: f32) -> Option<StateKind>;

    /// Classify the current controls. Runs right after every control change.
    fn change_state(&self, _locomotion: &Locomotion) -> Option<StateKind> {
        None
    }
}

/// Falling when the ground ray found nothing this step.
pub fn fall_in_air(locomotion: &Locomotion) -> Option<StateKind> {
    (!locomotion.ray_has_hit()).then_some(StateKind::Falling)
}

/// Start-walk variant for a signed turn angle.
pub fn start_walk_for_angle(angle: f32) -> StateKind {
    use std::f32::consts::PI;

    if angle > 0.7 * PI {
        StateKind::StartWalkBackLeft
    } else if angle > 0.4 * PI {
        StateKind::StartWalkLeft
    } else if angle < -0.7 * PI {
        StateKind::StartWalkBackRight
    } else if angle < -0.4 * PI {
        StateKind::StartWalkRight
    } else {
        StateKind::StartWalkForward
    }
}

/// Start-walk variant for the current input direction.
pub fn start_walk_kind(locomotion: &Locomotion) -> StateKind {
    let angle = signed_angle_between(
        locomotion.orientation(),
        locomotion.camera_relative_movement(),
    );
    start_walk_for_angle(angle)
}

/// Landing variant for the recorded impact.
pub fn drop_kind(locomotion: &Locomotion) -> StateKind {
    if locomotion.ground().last_impact_velocity.y < locomotion.config().hard_landing_velocity {
        StateKind::DropRolling
    } else if locomotion.controls().any_direction() {
        StateKind::DropRunning
    } else {
        StateKind::DropIdle
    }
}

/// Arcade speed target for airborne steering.
pub(crate) fn air_speed(locomotion: &Locomotion) -> f32 {
    if locomotion.controls().any_direction() {
        WALK_SPEED
    } else {
        0.0
    }
}

#[inline]
pub(crate) fn just_pressed(locomotion: &Locomotion, name: ControlName) -> bool {
    locomotion.controls().just_pressed(name)
}
