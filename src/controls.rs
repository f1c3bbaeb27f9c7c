//! Named boolean controls with edge tracking.
//!
//! Controls are what input devices and behaviors write to. Besides the held
//! level, each control carries one-shot `just_pressed`/`just_released` edges
//! that are only visible to the state machine hook that runs right after the
//! change (see [`Character::set_control`](crate::character::Character::set_control)).

use bevy::prelude::*;

/// The controls a character understands.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControlName {
    Up,
    Down,
    Left,
    Right,
    Run,
    Jump,
    Use,
    Primary,
    Secondary,
    Tertiary,
}

impl ControlName {
    /// All controls, in the order `reset_controls` releases them.
    pub const ALL: [ControlName; 10] = [
        ControlName::Up,
        ControlName::Down,
        ControlName::Left,
        ControlName::Right,
        ControlName::Run,
        ControlName::Jump,
        ControlName::Use,
        ControlName::Primary,
        ControlName::Secondary,
        ControlName::Tertiary,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Whether this is one of the four movement directions.
    pub fn is_direction(self) -> bool {
        matches!(
            self,
            ControlName::Up | ControlName::Down | ControlName::Left | ControlName::Right
        )
    }

    /// Default key binding for a lower-cased key or mouse button name.
    ///
    /// Mouse buttons are named `mouse0`, `mouse1`, `mouse2`. The space bar is `" "`.
    pub fn from_binding(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "w" => Some(ControlName::Up),
            "s" => Some(ControlName::Down),
            "a" => Some(ControlName::Left),
            "d" => Some(ControlName::Right),
            "shift" => Some(ControlName::Run),
            " " => Some(ControlName::Jump),
            "e" => Some(ControlName::Use),
            "mouse0" => Some(ControlName::Primary),
            "mouse2" => Some(ControlName::Secondary),
            "mouse1" => Some(ControlName::Tertiary),
            _ => None,
        }
    }
}

/// State of a single control.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Control {
    /// Whether the control is currently held.
    pub value: bool,
    /// Set for the duration of one state hook after the control went down.
    pub just_pressed: bool,
    /// Set for the duration of one state hook after the control went up.
    pub just_released: bool,
}

/// The full set of controls of one character.
#[derive(Reflect, Debug, Clone, Default)]
pub struct Controls {
    controls: [Control; 10],
    last_activated: Option<ControlName>,
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a control.
    pub fn get(&self, name: ControlName) -> &Control {
        &self.controls[name.index()]
    }

    /// Held level of a control.
    #[inline]
    pub fn is_pressed(&self, name: ControlName) -> bool {
        self.get(name).value
    }

    /// Control that changed most recently.
    pub fn last_activated(&self) -> Option<ControlName> {
        self.last_activated
    }

    /// True only while the change hook for a press of `name` is running.
    pub fn just_pressed(&self, name: ControlName) -> bool {
        self.last_activated == Some(name) && self.get(name).just_pressed
    }

    /// True only while the change hook for a release of `name` is running.
    pub fn just_released(&self, name: ControlName) -> bool {
        self.last_activated == Some(name) && self.get(name).just_released
    }

    /// Whether any direction control is held.
    pub fn any_direction(&self) -> bool {
        ControlName::ALL
            .iter()
            .any(|name| name.is_direction() && self.is_pressed(*name))
    }

    /// Whether no direction control is held.
    pub fn no_direction(&self) -> bool {
        !self.any_direction()
    }

    /// Store a new level. Returns `true` if the level changed, in which case the
    /// matching edge flag is raised and `name` becomes the last activated control.
    pub fn apply(&mut self, name: ControlName, value: bool) -> bool {
        let control = &mut self.controls[name.index()];
        if control.value == value {
            return false;
        }

        control.value = value;
        if value {
            control.just_pressed = true;
        } else {
            control.just_released = true;
        }
        self.last_activated = Some(name);
        true
    }

    /// Drop the edge flags of `name`.
    pub fn clear_edges(&mut self, name: ControlName) {
        let control = &mut self.controls[name.index()];
        control.just_pressed = false;
        control.just_released = false;
    }

    /// Local movement direction from the held direction controls.
    ///
    /// `+Z` is forward (up), `+X` is to the left.
    pub fn local_movement_direction(&self) -> Vec3 {
        let right = if self.is_pressed(ControlName::Right) { -1.0 } else { 0.0 };
        let left = if self.is_pressed(ControlName::Left) { 1.0 } else { 0.0 };
        let forward = if self.is_pressed(ControlName::Up) { 1.0 } else { 0.0 };
        let back = if self.is_pressed(ControlName::Down) { -1.0 } else { 0.0 };

        Vec3::new(right + left, 0.0, forward + back)
    }
}
