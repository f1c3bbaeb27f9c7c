//! Characters and their locomotion data.
//!
//! [`Locomotion`] is the mutable data every state operates on: controls,
//! springs, orientation, ground contact and the jump request. [`Character`]
//! owns one `Locomotion` together with the active state and behavior and is the
//! only place that replaces states.

use bevy::prelude::*;

use crate::animation::{AnimationLibrary, Animator};
use crate::behavior::{Behavior, BehaviorContext, DefaultBehavior};
use crate::collision::GroundContact;
use crate::config::CharacterConfig;
use crate::controls::{ControlName, Controls};
use crate::intent::JumpRequest;
use crate::math::{apply_vector_matrix_xz, flat_direction, signed_angle_between};
use crate::spring::{RelativeSpringSimulator, VectorSpringSimulator};
use crate::states::{CharacterState, SpringTweak, StateKind};

/// Upper bound on constructor redirects followed by [`Character::set_state`].
const MAX_STATE_REDIRECTS: usize = 8;

/// Stable handle of a character inside a
/// [`SteppingOrchestrator`](crate::orchestrator::SteppingOrchestrator).
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharacterId(pub u32);

/// Model pose derived from the springs, for the rendering layer.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct VisualPose {
    /// Yaw facing the current orientation.
    pub facing: Quat,
    /// Lean into turns around the model's forward axis.
    pub roll: f32,
    /// Vertical model offset; dips while turning quickly.
    pub vertical_offset: f32,
}

impl Default for VisualPose {
    fn default() -> Self {
        Self {
            facing: Quat::IDENTITY,
            roll: 0.0,
            vertical_offset: 0.5,
        }
    }
}

impl VisualPose {
    /// Model rotation: facing, then roll about the local forward axis.
    pub fn rotation(&self) -> Quat {
        self.facing * Quat::from_rotation_z(self.roll)
    }
}

/// Per-character locomotion data.
#[derive(Debug, Clone)]
pub struct Locomotion {
    config: CharacterConfig,
    controls: Controls,

    // === Movement ===
    velocity: Vec3,
    velocity_target: Vec3,
    acceleration: Vec3,
    simulated_velocity_influence: Vec3,
    velocity_spring: VectorSpringSimulator,

    // === Rotation ===
    orientation: Vec3,
    orientation_target: Vec3,
    angular_velocity: f32,
    rotation_spring: RelativeSpringSimulator,
    view_vector: Vec3,

    // === Physics Scratch ===
    ground: GroundContact,
    jump: JumpRequest,
    feet_position: Vec3,

    // === Presentation ===
    animator: Animator,
    pose: VisualPose,
}

impl Locomotion {
    pub fn new(config: CharacterConfig) -> Self {
        Self {
            controls: Controls::new(),
            velocity: Vec3::ZERO,
            velocity_target: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            simulated_velocity_influence: Vec3::new(0.0, 1.0, 0.0),
            velocity_spring: VectorSpringSimulator::with_params(
                config.spring_fps,
                config.velocity_spring,
            ),
            orientation: Vec3::Z,
            orientation_target: Vec3::Z,
            angular_velocity: 0.0,
            rotation_spring: RelativeSpringSimulator::with_params(
                config.spring_fps,
                config.rotation_spring,
            ),
            view_vector: Vec3::Z,
            ground: GroundContact::default(),
            jump: JumpRequest::default(),
            feet_position: Vec3::ZERO,
            animator: Animator::new(config.missing_clip_duration),
            pose: VisualPose::default(),
            config,
        }
    }

    pub fn config(&self) -> &CharacterConfig {
        &self.config
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub(crate) fn controls_mut(&mut self) -> &mut Controls {
        &mut self.controls
    }

    // === Movement ===

    /// Smoothed arcade velocity (local frame, `+Z` forward).
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Current arcade speed.
    pub fn arcade_speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn velocity_target(&self) -> Vec3 {
        self.velocity_target
    }

    pub fn acceleration(&self) -> Vec3 {
        self.acceleration
    }

    /// Overwrite the arcade velocity.
    pub fn set_arcade_velocity(&mut self, forward: f32, sideways: f32) {
        self.velocity.z = forward;
        self.velocity.x = sideways;
    }

    /// Set the arcade speed the velocity spring moves toward.
    pub fn set_arcade_velocity_target(&mut self, forward: f32, sideways: f32) {
        self.velocity_target.z = forward;
        self.velocity_target.x = sideways;
    }

    pub fn simulated_velocity_influence(&self) -> Vec3 {
        self.simulated_velocity_influence
    }

    /// Per-axis blend between arcade (0) and simulated (1) velocity.
    pub fn set_simulated_velocity_influence(&mut self, influence: Vec3) {
        self.simulated_velocity_influence = influence;
    }

    pub fn velocity_spring(&self) -> &VectorSpringSimulator {
        &self.velocity_spring
    }

    pub fn velocity_spring_mut(&mut self) -> &mut VectorSpringSimulator {
        &mut self.velocity_spring
    }

    // === Rotation ===

    /// Current facing on the ground plane.
    pub fn orientation(&self) -> Vec3 {
        self.orientation
    }

    /// Facing the rotation spring turns toward.
    pub fn orientation_target(&self) -> Vec3 {
        self.orientation_target
    }

    /// Set the facing goal. Only the ground-plane direction is kept; vertical or
    /// zero vectors are ignored.
    pub fn set_orientation_target(&mut self, target: Vec3) {
        if let Some(direction) = flat_direction(target) {
            self.orientation_target = direction;
        }
    }

    /// Snap the facing, and its goal, to `orientation`.
    pub fn set_orientation(&mut self, orientation: Vec3) {
        if let Some(direction) = flat_direction(orientation) {
            self.orientation = direction;
            self.orientation_target = direction;
        }
    }

    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    pub fn rotation_spring(&self) -> &RelativeSpringSimulator {
        &self.rotation_spring
    }

    pub fn rotation_spring_mut(&mut self) -> &mut RelativeSpringSimulator {
        &mut self.rotation_spring
    }

    /// Camera (or behavior) view direction movement input is relative to.
    pub fn view_vector(&self) -> Vec3 {
        self.view_vector
    }

    pub fn set_view_vector(&mut self, view: Vec3) {
        self.view_vector = view.normalize_or_zero();
    }

    /// Held direction input rotated into the view frame.
    pub fn camera_relative_movement(&self) -> Vec3 {
        let flat_view = Vec3::new(self.view_vector.x, 0.0, self.view_vector.z);
        apply_vector_matrix_xz(flat_view, self.controls.local_movement_direction())
    }

    /// Point the orientation goal along the input direction, or hold the
    /// current facing when there is no input.
    pub fn set_global_direction_goal(&mut self) {
        let movement = self.camera_relative_movement();
        if movement == Vec3::ZERO {
            self.orientation_target = self.orientation;
        } else {
            self.set_orientation_target(movement);
        }
    }

    // === Spring Tuning ===

    /// Reset both springs to the configured defaults.
    pub fn reset_springs(&mut self) {
        self.velocity_spring.set_params(self.config.velocity_spring);
        self.rotation_spring.set_params(self.config.rotation_spring);
    }

    /// Override parts of the current spring parameters.
    pub fn tweak_springs(&mut self, velocity: SpringTweak, rotation: SpringTweak) {
        let params = velocity.apply(self.velocity_spring.params());
        self.velocity_spring.set_params(params);

        let params = rotation.apply(self.rotation_spring.params());
        self.rotation_spring.set_params(params);
    }

    // === Physics Scratch ===

    pub fn ground(&self) -> &GroundContact {
        &self.ground
    }

    pub fn ground_mut(&mut self) -> &mut GroundContact {
        &mut self.ground
    }

    /// Whether the last pre-step found ground.
    #[inline]
    pub fn ray_has_hit(&self) -> bool {
        self.ground.ray_has_hit
    }

    pub fn jump_request(&self) -> &JumpRequest {
        &self.jump
    }

    pub fn jump_request_mut(&mut self) -> &mut JumpRequest {
        &mut self.jump
    }

    /// Request a physical jump on the next physics step.
    pub fn jump(&mut self, init_speed: Option<f32>) {
        self.jump.request(init_speed);
    }

    /// Position of the character's feet, refreshed once per frame.
    pub fn feet_position(&self) -> Vec3 {
        self.feet_position
    }

    pub fn set_feet_position(&mut self, position: Vec3) {
        self.feet_position = position;
    }

    // === Presentation ===

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn animator_mut(&mut self) -> &mut Animator {
        &mut self.animator
    }

    pub fn pose(&self) -> &VisualPose {
        &self.pose
    }

    /// Per-frame target update: springs, rotation, pose and animation.
    pub fn update(&mut self, delta: f32) {
        self.spring_movement(delta);
        self.spring_rotation(delta);
        self.update_pose();
        self.animator.advance(delta);
    }

    fn spring_movement(&mut self, delta: f32) {
        self.velocity_spring.set_target(self.velocity_target);
        self.velocity_spring.simulate(delta);

        self.velocity = self.velocity_spring.position;
        self.acceleration = self.velocity_spring.velocity;
    }

    fn spring_rotation(&mut self, delta: f32) {
        let angle = signed_angle_between(self.orientation, self.orientation_target);
        self.rotation_spring.set_target(angle);
        self.rotation_spring.simulate(delta);

        let step = self.rotation_spring.position;
        self.orientation = Quat::from_rotation_y(step) * self.orientation;
        self.angular_velocity = self.rotation_spring.velocity;
    }

    fn update_pose(&mut self) {
        let tilt = self.angular_velocity * self.config.tilt_factor;
        self.pose = VisualPose {
            facing: Quat::from_rotation_y(self.orientation.x.atan2(self.orientation.z)),
            roll: -tilt * self.velocity.length(),
            vertical_offset: tilt.abs().cos() / 2.0,
        };
    }
}

/// A controllable character: locomotion data, active state and behavior.
#[derive(Debug)]
pub struct Character {
    locomotion: Locomotion,
    state: Box<dyn CharacterState>,
    behavior: Option<Box<dyn Behavior>>,
}

impl Default for Character {
    fn default() -> Self {
        Self::new(CharacterConfig::default())
    }
}

impl Character {
    /// Create an idle character driven by [`DefaultBehavior`].
    pub fn new(config: CharacterConfig) -> Self {
        let mut locomotion = Locomotion::new(config);
        let state = StateKind::Idle.enter(&mut locomotion);

        Self {
            locomotion,
            state,
            behavior: Some(Box::new(DefaultBehavior)),
        }
    }

    /// Builder: load the clips of a model.
    pub fn with_animations(mut self, library: AnimationLibrary) -> Self {
        self.set_animations(library);
        self
    }

    /// Load the clips of a model and restart in [`StateKind::Idle`].
    pub fn set_animations(&mut self, library: AnimationLibrary) {
        self.locomotion.animator_mut().set_library(library);
        self.set_state(StateKind::Idle);
    }

    /// Builder: set the behavior.
    pub fn with_behavior(mut self, behavior: impl Behavior) -> Self {
        self.set_behavior(behavior);
        self
    }

    pub fn locomotion(&self) -> &Locomotion {
        &self.locomotion
    }

    pub fn locomotion_mut(&mut self) -> &mut Locomotion {
        &mut self.locomotion
    }

    pub fn config(&self) -> &CharacterConfig {
        self.locomotion.config()
    }

    pub fn controls(&self) -> &Controls {
        self.locomotion.controls()
    }

    pub fn state(&self) -> &dyn CharacterState {
        self.state.as_ref()
    }

    pub fn state_kind(&self) -> StateKind {
        self.state.kind()
    }

    /// Replace the active state.
    ///
    /// The new state's tuning is applied first. If its `on_enter` redirects,
    /// the redirect target is entered instead, up to a fixed depth.
    pub fn set_state(&mut self, kind: StateKind) {
        let from = self.state.kind();
        let mut kind = kind;

        for _ in 0..MAX_STATE_REDIRECTS {
            let mut state = kind.enter(&mut self.locomotion);
            match state.on_enter(&mut self.locomotion) {
                Some(redirect) => {
                    trace!("{:?} redirected to {:?} on entry", kind, redirect);
                    kind = redirect;
                }
                None => {
                    debug!("State {:?} -> {:?}", from, kind);
                    self.state = state;
                    return;
                }
            }
        }

        warn!(
            "State redirects from {:?} did not settle, staying in {:?}",
            from, kind
        );
        self.state = kind.enter(&mut self.locomotion);
    }

    /// Set a control and let the active state react to it.
    ///
    /// Edges raised by the change are only visible to this one `change_state`
    /// call. The state is consulted even when the level did not change so that
    /// level-based transitions are re-evaluated.
    pub fn set_control(&mut self, name: ControlName, value: bool) {
        self.locomotion.controls_mut().apply(name, value);

        if let Some(next) = self.state.change_state(&self.locomotion) {
            self.set_state(next);
        }

        self.locomotion.controls_mut().clear_edges(name);
    }

    /// Apply several control changes in order, each as its own
    /// [`set_control`](Self::set_control).
    pub fn set_controls(&mut self, changes: &[(ControlName, bool)]) {
        for &(name, value) in changes {
            self.set_control(name, value);
        }
    }

    /// Release every control, in [`ControlName::ALL`] order.
    pub fn reset_controls(&mut self) {
        for name in ControlName::ALL {
            self.set_control(name, false);
        }
    }

    /// Run the active state's per-frame update.
    pub fn update_state(&mut self, delta: f32) {
        if let Some(next) = self.state.update(&mut self.locomotion, delta) {
            self.set_state(next);
        }
    }

    /// Run the behavior, which drives the state machine.
    pub fn update_behavior(&mut self, context: &BehaviorContext, delta: f32) {
        let Some(mut behavior) = self.behavior.take() else {
            self.update_state(delta);
            return;
        };

        behavior.update(self, context, delta);

        // The behavior may have installed a replacement for itself.
        if self.behavior.is_none() {
            self.behavior = Some(behavior);
        }
    }

    pub fn behavior(&self) -> Option<&dyn Behavior> {
        self.behavior.as_deref()
    }

    /// Replace the behavior. Controls are released so nothing stays held.
    pub fn set_behavior(&mut self, behavior: impl Behavior) {
        self.reset_controls();
        self.behavior = Some(Box::new(behavior));
    }

    // === Public target operations ===

    /// Request a physical jump on the next physics step.
    pub fn jump(&mut self, init_speed: Option<f32>) {
        self.locomotion.jump(init_speed);
    }

    pub fn set_view_vector(&mut self, view: Vec3) {
        self.locomotion.set_view_vector(view);
    }

    pub fn set_orientation_target(&mut self, target: Vec3) {
        self.locomotion.set_orientation_target(target);
    }

    pub fn set_arcade_velocity_target(&mut self, forward: f32, sideways: f32) {
        self.locomotion.set_arcade_velocity_target(forward, sideways);
    }

    pub fn set_arcade_velocity(&mut self, forward: f32, sideways: f32) {
        self.locomotion.set_arcade_velocity(forward, sideways);
    }

    pub fn set_simulated_velocity_influence(&mut self, influence: Vec3) {
        self.locomotion.set_simulated_velocity_influence(influence);
    }

    pub fn feet_position(&self) -> Vec3 {
        self.locomotion.feet_position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spring::SpringParams;

    fn grounded() -> Character {
        let mut character = Character::default();
        character.locomotion_mut().ground_mut().ray_has_hit = true;
        character
    }

    #[test]
    fn starts_idle_with_idle_tuning() {
        let character = Character::default();
        assert_eq!(character.state_kind(), StateKind::Idle);
        assert_eq!(
            character.locomotion().velocity_spring().params(),
            SpringParams::new(10.0, 0.6)
        );
    }

    #[test]
    fn control_edges_do_not_outlive_the_hook() {
        let mut character = grounded();
        character.set_control(ControlName::Jump, true);

        assert_eq!(character.state_kind(), StateKind::JumpIdle);
        assert!(character.controls().is_pressed(ControlName::Jump));
        assert!(!character.controls().just_pressed(ControlName::Jump));
    }

    #[test]
    fn unchanged_control_still_reevaluates_state() {
        let mut character = grounded();
        character.locomotion_mut().controls_mut().apply(ControlName::Up, true);
        character.locomotion_mut().controls_mut().clear_edges(ControlName::Up);
        assert_eq!(character.state_kind(), StateKind::Idle);

        character.set_control(ControlName::Up, true);
        assert_eq!(character.state_kind(), StateKind::StartWalkForward);
    }

    #[test]
    fn walk_without_direction_redirects() {
        let mut character = grounded();
        character.set_state(StateKind::Walk);
        assert_eq!(character.state_kind(), StateKind::EndWalk);
    }

    #[test]
    fn drop_idle_with_direction_redirects() {
        let mut character = grounded();
        character.set_control(ControlName::Left, true);
        character.set_state(StateKind::DropIdle);
        assert_eq!(character.state_kind(), StateKind::StartWalkForward);
    }

    #[test]
    fn reset_controls_releases_everything() {
        let mut character = grounded();
        character.set_controls(&[(ControlName::Up, true), (ControlName::Run, true)]);
        character.reset_controls();

        for name in ControlName::ALL {
            assert!(!character.controls().is_pressed(name));
        }
        assert_eq!(character.controls().last_activated(), Some(ControlName::Run));
    }

    #[test]
    fn direction_goal_follows_view() {
        let mut locomotion = Locomotion::new(CharacterConfig::default());
        locomotion.set_view_vector(Vec3::new(0.0, -0.5, -2.0));
        locomotion.controls_mut().apply(ControlName::Up, true);
        locomotion.set_global_direction_goal();
        assert!((locomotion.orientation_target() - Vec3::NEG_Z).length() < 1e-5);

        locomotion.controls_mut().apply(ControlName::Up, false);
        locomotion.set_global_direction_goal();
        assert_eq!(locomotion.orientation_target(), locomotion.orientation());
    }

    #[test]
    fn rotation_spring_turns_toward_target() {
        let mut locomotion = Locomotion::new(CharacterConfig::default());
        locomotion.set_orientation_target(Vec3::X);

        for _ in 0..300 {
            locomotion.update(1.0 / 60.0);
        }
        assert!((locomotion.orientation() - Vec3::X).length() < 1e-2);
    }

    #[test]
    fn velocity_spring_follows_target() {
        let mut locomotion = Locomotion::new(CharacterConfig::default());
        locomotion.set_arcade_velocity_target(0.8, 0.0);

        for _ in 0..600 {
            locomotion.update(1.0 / 60.0);
        }
        assert!((locomotion.arcade_speed() - 0.8).abs() < 1e-2);
    }

    #[test]
    fn pose_leans_into_turns() {
        let mut locomotion = Locomotion::new(CharacterConfig::default());
        locomotion.set_arcade_velocity_target(0.8, 0.0);
        for _ in 0..120 {
            locomotion.update(1.0 / 60.0);
        }
        assert_eq!(locomotion.pose().roll, 0.0);
        assert_eq!(locomotion.pose().vertical_offset, 0.5);

        locomotion.set_orientation_target(Vec3::X);
        locomotion.update(1.0 / 30.0);
        assert!(locomotion.angular_velocity() > 0.0);
        assert!(locomotion.pose().roll < 0.0);
        assert!(locomotion.pose().vertical_offset < 0.5);
    }

    #[test]
    fn zero_orientation_target_is_ignored() {
        let mut locomotion = Locomotion::new(CharacterConfig::default());
        locomotion.set_orientation_target(Vec3::ZERO);
        locomotion.set_orientation_target(Vec3::Y);
        assert_eq!(locomotion.orientation_target(), Vec3::Z);
    }
}
