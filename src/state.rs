//! Status components mirrored from the orchestrator onto entities.
//!
//! These components indicate the current locomotion status of a character.
//! They are added and removed by [`crate::systems::sync_character_status`]
//! based on the ground ray result and the active state.

use bevy::prelude::*;

use crate::states::StateKind;

/// Marker component indicating the ground ray hit something last step.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_locomotion::prelude::*;
///
/// fn check_grounded(grounded: Option<&Grounded>) -> bool {
///     grounded.is_some()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// The character's current locomotion state.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct ActiveState {
    pub kind: StateKind,
    /// Seconds spent in the state.
    pub timer: f32,
}

impl Default for ActiveState {
    fn default() -> Self {
        Self {
            kind: StateKind::Idle,
            timer: 0.0,
        }
    }
}

impl ActiveState {
    pub fn new(kind: StateKind, timer: f32) -> Self {
        Self { kind, timer }
    }

    /// Whether the state is one of the in-air states.
    pub fn is_airborne(&self) -> bool {
        self.kind.is_airborne()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_state_defaults_to_idle() {
        let state = ActiveState::default();
        assert_eq!(state.kind, StateKind::Idle);
        assert!(!state.is_airborne());
    }

    #[test]
    fn falling_is_airborne() {
        assert!(ActiveState::new(StateKind::Falling, 0.2).is_airborne());
        assert!(!ActiveState::new(StateKind::DropIdle, 0.2).is_airborne());
    }
}
