//! Per-frame stepping order.
//!
//! [`SteppingOrchestrator`] owns the physics world and every registered
//! character, and runs one frame in a fixed order:
//!
//! 1. pre-step hooks (ground ray, jump launch), in registration order
//! 2. physics step
//! 3. post-step hooks (velocity blend, ground snap), in registration order
//! 4. behaviors, which drive the state machines, in character id order
//! 5. camera ([`FrameHooks::update_camera`])
//! 6. kill plane respawn
//! 7. render sync ([`FrameHooks::sync_visual`]) for every body
//!
//! Post-step blending needs the physics output and state transitions need the
//! post-step ground result, so this order never changes.

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::backend::PhysicsWorld;
use crate::behavior::BehaviorContext;
use crate::character::{Character, CharacterId};
use crate::config::OrchestratorConfig;
use crate::grounding;

/// Handle of a registered pre- or post-step hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepHookId(u32);

/// Phases of one [`SteppingOrchestrator::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickPhase {
    PreStep,
    PhysicsStep,
    PostStep,
    Behaviors,
    Camera,
    KillPlane,
    RenderSync,
}

/// Host callbacks invoked during a tick.
pub trait FrameHooks<B> {
    /// Called when a phase starts.
    fn on_phase(&mut self, _phase: TickPhase) {}

    /// Update camera and game-mode input.
    fn update_camera(&mut self, _delta: f32) {}

    /// Copy a body's transform to its visual.
    fn sync_visual(&mut self, _body: B, _translation: Vec3, _rotation: Quat) {}
}

/// Frame hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFrameHooks;

impl<B> FrameHooks<B> for NoFrameHooks {}

/// Boxed custom step hook. Receives the physics world.
pub type StepFn<P> = Box<dyn FnMut(&mut P) + Send + Sync>;

enum HookAction<P> {
    /// Built-in grounding for a character.
    Character(CharacterId),
    Custom(StepFn<P>),
}

struct StepHook<P> {
    id: StepHookId,
    action: HookAction<P>,
}

impl<P> StepHook<P> {
    fn character(&self) -> Option<CharacterId> {
        match self.action {
            HookAction::Character(id) => Some(id),
            HookAction::Custom(_) => None,
        }
    }
}

impl<P> std::fmt::Debug for StepHook<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepHook")
            .field("id", &self.id)
            .field("character", &self.character())
            .finish()
    }
}

#[derive(Debug)]
struct CharacterSlot<B> {
    character: Character,
    body: B,
    pre_step: StepHookId,
    post_step: StepHookId,
}

/// Owns the physics world and characters and runs frames.
#[derive(Resource, Debug)]
pub struct SteppingOrchestrator<P: PhysicsWorld> {
    pub config: OrchestratorConfig,
    physics: P,
    characters: BTreeMap<CharacterId, CharacterSlot<P::Body>>,
    pre_step: Vec<StepHook<P>>,
    post_step: Vec<StepHook<P>>,
    next_character: u32,
    next_hook: u32,
}

impl<P: PhysicsWorld> SteppingOrchestrator<P> {
    pub fn new(physics: P) -> Self {
        Self::with_config(physics, OrchestratorConfig::default())
    }

    pub fn with_config(physics: P, config: OrchestratorConfig) -> Self {
        Self {
            config,
            physics,
            characters: BTreeMap::new(),
            pre_step: Vec::new(),
            post_step: Vec::new(),
            next_character: 0,
            next_hook: 0,
        }
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    fn next_hook_id(&mut self) -> StepHookId {
        let id = StepHookId(self.next_hook);
        self.next_hook += 1;
        id
    }

    /// Register a character driving `body`. Appends one pre-step and one
    /// post-step hook for it.
    pub fn spawn_character(&mut self, mut character: Character, body: P::Body) -> CharacterId {
        let id = CharacterId(self.next_character);
        self.next_character += 1;

        self.physics.lock_rotations(body, true);
        let feet = self.physics.translation(body) - Vec3::Y * character.config().height / 2.0;
        character.locomotion_mut().set_feet_position(feet);

        let pre_step = self.next_hook_id();
        let post_step = self.next_hook_id();
        self.pre_step.push(StepHook {
            id: pre_step,
            action: HookAction::Character(id),
        });
        self.post_step.push(StepHook {
            id: post_step,
            action: HookAction::Character(id),
        });

        self.characters.insert(
            id,
            CharacterSlot {
                character,
                body,
                pre_step,
                post_step,
            },
        );

        debug!("Spawned character {:?} on body {:?}", id, body);
        id
    }

    /// Unregister a character and its hooks. The body stays in the world.
    pub fn despawn_character(&mut self, id: CharacterId) -> Option<Character> {
        let slot = self.characters.remove(&id)?;
        self.pre_step.retain(|hook| hook.id != slot.pre_step);
        self.post_step.retain(|hook| hook.id != slot.post_step);
        Some(slot.character)
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id).map(|slot| &slot.character)
    }

    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(&id).map(|slot| &mut slot.character)
    }

    /// Body driven by a character.
    pub fn body(&self, id: CharacterId) -> Option<P::Body> {
        self.characters.get(&id).map(|slot| slot.body)
    }

    /// Registered characters in id order.
    pub fn characters(&self) -> impl Iterator<Item = (CharacterId, &Character)> {
        self.characters.iter().map(|(id, slot)| (*id, &slot.character))
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    /// Append a custom hook that runs right before the physics step, after
    /// the hooks already registered.
    pub fn add_pre_step_hook(
        &mut self,
        hook: impl FnMut(&mut P) + Send + Sync + 'static,
    ) -> StepHookId {
        let id = self.next_hook_id();
        self.pre_step.push(StepHook {
            id,
            action: HookAction::Custom(Box::new(hook)),
        });
        id
    }

    /// Append a custom hook that runs right after the physics step, after
    /// the hooks already registered.
    pub fn add_post_step_hook(
        &mut self,
        hook: impl FnMut(&mut P) + Send + Sync + 'static,
    ) -> StepHookId {
        let id = self.next_hook_id();
        self.post_step.push(StepHook {
            id,
            action: HookAction::Custom(Box::new(hook)),
        });
        id
    }

    /// Remove a custom hook. Character hooks are only removed through
    /// [`Self::despawn_character`].
    pub fn remove_step_hook(&mut self, id: StepHookId) -> bool {
        let custom = |hook: &StepHook<P>| hook.id == id && hook.character().is_none();
        let before = self.pre_step.len() + self.post_step.len();
        self.pre_step.retain(|hook| !custom(hook));
        self.post_step.retain(|hook| !custom(hook));
        before != self.pre_step.len() + self.post_step.len()
    }

    /// Pre-step hooks in run order, with the character each one grounds.
    /// Custom hooks have no character.
    pub fn pre_step_hooks(&self) -> impl Iterator<Item = (StepHookId, Option<CharacterId>)> + '_ {
        self.pre_step.iter().map(|hook| (hook.id, hook.character()))
    }

    /// Post-step hooks in run order.
    pub fn post_step_hooks(&self) -> impl Iterator<Item = (StepHookId, Option<CharacterId>)> + '_ {
        self.post_step.iter().map(|hook| (hook.id, hook.character()))
    }

    /// Clamp a frame delta to `[0, max_delta]`. Non-finite deltas become zero.
    pub fn clamp_delta(&self, delta: f32) -> f32 {
        if delta.is_finite() {
            delta.clamp(0.0, self.config.max_delta)
        } else {
            0.0
        }
    }

    /// Run one frame. Returns the delta actually used.
    pub fn tick(&mut self, delta: f32, hooks: &mut impl FrameHooks<P::Body>) -> f32 {
        let delta = self.clamp_delta(delta);

        hooks.on_phase(TickPhase::PreStep);
        for hook in self.pre_step.iter_mut() {
            match &mut hook.action {
                HookAction::Character(id) => {
                    if let Some(slot) = self.characters.get_mut(id) {
                        grounding::pre_step(
                            slot.character.locomotion_mut(),
                            &mut self.physics,
                            slot.body,
                        );
                    }
                }
                HookAction::Custom(run) => run(&mut self.physics),
            }
        }

        hooks.on_phase(TickPhase::PhysicsStep);
        self.physics.step(delta);

        hooks.on_phase(TickPhase::PostStep);
        for hook in self.post_step.iter_mut() {
            match &mut hook.action {
                HookAction::Character(id) => {
                    if let Some(slot) = self.characters.get_mut(id) {
                        grounding::post_step(
                            slot.character.locomotion_mut(),
                            &mut self.physics,
                            slot.body,
                        );
                    }
                }
                HookAction::Custom(run) => run(&mut self.physics),
            }
        }

        hooks.on_phase(TickPhase::Behaviors);
        self.update_behaviors(delta);

        hooks.on_phase(TickPhase::Camera);
        hooks.update_camera(delta);

        hooks.on_phase(TickPhase::KillPlane);
        self.apply_kill_plane();

        hooks.on_phase(TickPhase::RenderSync);
        for body in self.physics.bodies() {
            hooks.sync_visual(
                body,
                self.physics.translation(body),
                self.physics.rotation(body),
            );
        }

        delta
    }

    fn update_behaviors(&mut self, delta: f32) {
        for slot in self.characters.values_mut() {
            let half_height = slot.character.config().height / 2.0;
            let feet = self.physics.translation(slot.body) - Vec3::Y * half_height;
            slot.character.locomotion_mut().set_feet_position(feet);
        }

        let positions: BTreeMap<CharacterId, Vec3> = self
            .characters
            .iter()
            .map(|(id, slot)| (*id, slot.character.feet_position()))
            .collect();

        for (id, slot) in self.characters.iter_mut() {
            let context = BehaviorContext::new(*id, &positions);
            slot.character.update_behavior(&context, delta);
        }
    }

    fn apply_kill_plane(&mut self) {
        let Some(plane) = self.config.kill_plane else {
            return;
        };

        for body in self.physics.bodies() {
            if self.physics.translation(body).y < plane.height {
                debug!("Body {:?} fell below {}, respawning", body, plane.height);
                self.physics.set_translation(body, plane.respawn, true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KillPlane;
    use crate::sandbox::SandboxWorld;

    #[derive(Default)]
    struct Recorder {
        phases: Vec<TickPhase>,
        synced: usize,
        camera_delta: Option<f32>,
    }

    impl<B> FrameHooks<B> for Recorder {
        fn on_phase(&mut self, phase: TickPhase) {
            self.phases.push(phase);
        }

        fn update_camera(&mut self, delta: f32) {
            self.camera_delta = Some(delta);
        }

        fn sync_visual(&mut self, _body: B, _translation: Vec3, _rotation: Quat) {
            self.synced += 1;
        }
    }

    fn world() -> SteppingOrchestrator<SandboxWorld> {
        let mut physics = SandboxWorld::new();
        physics.add_ground(0.0);
        SteppingOrchestrator::new(physics)
    }

    #[test]
    fn delta_is_clamped() {
        let orchestrator = world();
        assert_eq!(orchestrator.clamp_delta(0.5), 0.1);
        assert_eq!(orchestrator.clamp_delta(-1.0), 0.0);
        assert_eq!(orchestrator.clamp_delta(f32::NAN), 0.0);
        assert_eq!(orchestrator.clamp_delta(0.016), 0.016);
    }

    #[test]
    fn phases_run_in_order() {
        let mut orchestrator = world();
        let mut recorder = Recorder::default();

        let used = orchestrator.tick(3.0, &mut recorder);
        assert_eq!(used, 0.1);
        assert_eq!(recorder.camera_delta, Some(0.1));
        assert_eq!(
            recorder.phases,
            vec![
                TickPhase::PreStep,
                TickPhase::PhysicsStep,
                TickPhase::PostStep,
                TickPhase::Behaviors,
                TickPhase::Camera,
                TickPhase::KillPlane,
                TickPhase::RenderSync,
            ]
        );
        assert_eq!(recorder.synced, 1);
    }

    #[test]
    fn hooks_follow_character_lifetime() {
        let mut orchestrator = world();
        let a_body = orchestrator
            .physics_mut()
            .add_character_body(Vec3::new(0.0, 0.6, 0.0), 1.0);
        let b_body = orchestrator
            .physics_mut()
            .add_character_body(Vec3::new(3.0, 0.6, 0.0), 1.0);

        let a = orchestrator.spawn_character(Character::default(), a_body);
        let b = orchestrator.spawn_character(Character::default(), b_body);

        let pre: Vec<CharacterId> = orchestrator.pre_step_hooks().filter_map(|(_, c)| c).collect();
        assert_eq!(pre, vec![a, b]);
        assert_eq!(orchestrator.post_step_hooks().count(), 2);

        assert!(orchestrator.despawn_character(a).is_some());
        assert!(orchestrator.despawn_character(a).is_none());

        let post: Vec<CharacterId> = orchestrator.post_step_hooks().filter_map(|(_, c)| c).collect();
        assert_eq!(post, vec![b]);
        assert_eq!(orchestrator.pre_step_hooks().count(), 1);
        assert!(orchestrator.character(a).is_none());

        // The body outlives its character.
        assert!(orchestrator.physics().contains(a_body));
    }

    #[test]
    fn custom_hooks_run_around_the_step() {
        let mut orchestrator = world();
        let body = orchestrator
            .physics_mut()
            .add_dynamic_box(Vec3::new(0.0, 5.0, 0.0), Vec3::splat(0.5));

        // Pre-step lifts the box, post-step zeroes its velocity.
        let pre = orchestrator.add_pre_step_hook(move |physics: &mut SandboxWorld| {
            physics.set_translation(body, Vec3::new(0.0, 8.0, 0.0), true);
        });
        let post = orchestrator.add_post_step_hook(move |physics: &mut SandboxWorld| {
            physics.set_linvel(body, Vec3::ZERO, true);
        });
        assert_eq!(orchestrator.pre_step_hooks().next(), Some((pre, None)));

        orchestrator.tick(0.1, &mut NoFrameHooks);
        let y = orchestrator.physics().translation(body).y;
        assert!(y < 8.0 && y > 7.5, "stepped from the lifted height, y {}", y);
        assert_eq!(orchestrator.physics().linvel(body), Vec3::ZERO);

        assert!(orchestrator.remove_step_hook(pre));
        assert!(orchestrator.remove_step_hook(post));
        assert!(!orchestrator.remove_step_hook(post));
        assert_eq!(orchestrator.pre_step_hooks().count(), 0);

        orchestrator.tick(0.1, &mut NoFrameHooks);
        assert!(orchestrator.physics().translation(body).y < y);
    }

    #[test]
    fn character_hooks_are_not_removable_directly() {
        let mut orchestrator = world();
        let body = orchestrator
            .physics_mut()
            .add_character_body(Vec3::new(0.0, 0.6, 0.0), 1.0);
        orchestrator.spawn_character(Character::default(), body);

        let ids: Vec<StepHookId> = orchestrator.pre_step_hooks().map(|(id, _)| id).collect();
        assert!(!orchestrator.remove_step_hook(ids[0]));
        assert_eq!(orchestrator.pre_step_hooks().count(), 1);
    }

    #[test]
    fn spawn_locks_rotation_and_sets_feet() {
        let mut orchestrator = world();
        let body = orchestrator
            .physics_mut()
            .add_dynamic_box(Vec3::new(1.0, 2.0, 0.0), Vec3::new(0.25, 0.5, 0.25));
        let id = orchestrator.spawn_character(Character::default(), body);

        assert!(orchestrator.physics().rotation_locked(body));
        assert_eq!(
            orchestrator.character(id).map(|c| c.feet_position()),
            Some(Vec3::new(1.0, 1.5, 0.0))
        );
    }

    #[test]
    fn kill_plane_respawns_bodies() {
        let mut orchestrator = SteppingOrchestrator::with_config(
            SandboxWorld::new(),
            OrchestratorConfig::default().with_kill_plane(KillPlane {
                height: -5.0,
                respawn: Vec3::new(0.0, 10.0, 0.0),
            }),
        );
        let body = orchestrator
            .physics_mut()
            .add_dynamic_box(Vec3::new(4.0, -4.99, 0.0), Vec3::splat(0.5));

        orchestrator.tick(0.1, &mut NoFrameHooks);
        assert_eq!(orchestrator.physics().translation(body), Vec3::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn kill_plane_can_be_disabled() {
        let mut orchestrator = SteppingOrchestrator::with_config(
            SandboxWorld::new(),
            OrchestratorConfig::default().without_kill_plane(),
        );
        let body = orchestrator
            .physics_mut()
            .add_dynamic_box(Vec3::new(0.0, -6.0, 0.0), Vec3::splat(0.5));

        orchestrator.tick(0.1, &mut NoFrameHooks);
        assert!(orchestrator.physics().translation(body).y < -6.0);
    }
}
