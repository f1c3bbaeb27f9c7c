//! # `msg_locomotion`
//!
//! A state-machine driven 3D character locomotion controller with physics
//! backend abstraction.
//!
//! This crate provides a responsive character controller that:
//! - Smooths movement and turning with fixed-rate spring simulators
//! - Drives 17 locomotion states from edge-triggered controls
//! - Keeps characters on the ground with a downward raycast and position snap
//! - Blends arcade velocity with simulated velocity per axis while airborne
//! - Runs pre-step, physics, post-step and behavior phases in a fixed order
//! - Abstracts physics backend for easy swapping (Rapier3D included)
//!
//! ## Architecture
//!
//! Every frame the [`orchestrator::SteppingOrchestrator`]:
//! 1. Casts each character's ground ray and launches pending jumps
//! 2. Steps the physics world
//! 3. Blends velocities and snaps grounded characters onto the hit point
//! 4. Runs each character's behavior, which updates its state machine
//! 5. Teleports bodies that fell below the kill plane
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use msg_locomotion::prelude::*;
//!
//! let mut world = SandboxWorld::new();
//! world.add_ground(0.0);
//! let body = world.add_character_body(Vec3::new(0.0, 1.0, 0.0), 1.0);
//!
//! let mut orchestrator = SteppingOrchestrator::new(world);
//! let id = orchestrator.spawn_character(Character::new(CharacterConfig::player()), body);
//!
//! orchestrator.tick(1.0 / 60.0, &mut NoFrameHooks);
//! assert!(orchestrator.character(id).is_some());
//! ```

use bevy::prelude::*;

pub mod animation;
pub mod backend;
pub mod behavior;
pub mod character;
pub mod collision;
pub mod config;
pub mod controls;
pub mod grounding;
pub mod intent;
pub mod math;
pub mod orchestrator;
pub mod sandbox;
pub mod spring;
pub mod state;
pub mod states;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::animation::{AnimationLibrary, Animator, Clip, CrossFade};
    pub use crate::backend::{PhysicsWorld, RayQuery};
    pub use crate::behavior::{
        Behavior, BehaviorContext, DefaultBehavior, FollowTarget, RandomBehavior,
    };
    pub use crate::character::{Character, CharacterId, Locomotion, VisualPose};
    pub use crate::collision::{GroundContact, RayHit};
    pub use crate::config::{CharacterConfig, KillPlane, OrchestratorConfig};
    pub use crate::controls::{ControlName, Controls};
    pub use crate::intent::JumpRequest;
    pub use crate::orchestrator::{FrameHooks, NoFrameHooks, SteppingOrchestrator, TickPhase};
    pub use crate::sandbox::{SandboxBody, SandboxWorld};
    pub use crate::spring::{SpringParams, SpringSimulator};
    pub use crate::state::{ActiveState, Airborne, Grounded};
    pub use crate::states::{CharacterState, StateKind};
    pub use crate::systems::{BodyVisual, CharacterCrossFade, CharacterLink};
    pub use crate::{LocomotionPlugin, LocomotionSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::RapierWorld;
}

/// System sets for ordering the locomotion systems in `Update`.
///
/// The sets run in declaration order. Systems that write controls for the
/// next frame should run before [`LocomotionSet::Step`]; systems that read
/// [`systems::CharacterCrossFade`] events should run after
/// [`LocomotionSet::Animation`].
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocomotionSet {
    /// Tick the orchestrator: ground rays, physics step, states, kill plane.
    Step,
    /// Forward animator cross-fades as events.
    Animation,
    /// Copy poses and status onto linked entities.
    Sync,
}

/// Main plugin for the locomotion controller.
///
/// This plugin is generic over a physics world `P`. It does not create the
/// [`orchestrator::SteppingOrchestrator`]; insert one as a resource and its
/// systems start running.
///
/// # Examples
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use msg_locomotion::prelude::*;
///
/// let mut world = RapierWorld::new();
/// world.add_ground(0.0);
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(LocomotionPlugin::<RapierWorld>::default())
///     .insert_resource(SteppingOrchestrator::new(world))
///     .run();
/// ```
pub struct LocomotionPlugin<P: backend::PhysicsWorld> {
    _marker: std::marker::PhantomData<P>,
}

impl<P: backend::PhysicsWorld> Default for LocomotionPlugin<P> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<P: backend::PhysicsWorld> Plugin for LocomotionPlugin<P> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::CharacterConfig>();
        app.register_type::<config::KillPlane>();
        app.register_type::<config::OrchestratorConfig>();
        app.register_type::<spring::SpringParams>();
        app.register_type::<controls::ControlName>();
        app.register_type::<controls::Controls>();
        app.register_type::<intent::JumpRequest>();
        app.register_type::<collision::GroundContact>();
        app.register_type::<character::CharacterId>();
        app.register_type::<character::VisualPose>();
        app.register_type::<states::StateKind>();
        app.register_type::<animation::Clip>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::ActiveState>();
        app.register_type::<systems::CharacterLink>();

        app.add_event::<systems::CharacterCrossFade>();

        app.configure_sets(
            Update,
            (
                LocomotionSet::Step,
                LocomotionSet::Animation,
                LocomotionSet::Sync,
            )
                .chain()
                .run_if(resource_exists::<orchestrator::SteppingOrchestrator<P>>),
        );

        app.add_systems(
            Update,
            systems::step_locomotion::<P>.in_set(LocomotionSet::Step),
        );
        app.add_systems(
            Update,
            systems::forward_cross_fades::<P>.in_set(LocomotionSet::Animation),
        );
        app.add_systems(
            Update,
            (
                systems::sync_character_pose::<P>,
                systems::sync_character_status::<P>,
            )
                .chain()
                .in_set(LocomotionSet::Sync),
        );
    }
}
