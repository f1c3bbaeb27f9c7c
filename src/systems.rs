//! Bevy systems driving the orchestrator.
//!
//! These systems are generic over the physics world so the same plugin runs
//! on Rapier or on the sandbox world.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::animation::CrossFade;
use crate::backend::PhysicsWorld;
use crate::character::CharacterId;
use crate::orchestrator::{FrameHooks, SteppingOrchestrator, TickPhase};
use crate::state::{ActiveState, Airborne, Grounded};

/// Makes an entity's [`Transform`] follow a physics body.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyVisual<B: Send + Sync + 'static>(pub B);

/// Links an entity to a character registered with the orchestrator.
///
/// The entity's transform follows the character's visual pose and it receives
/// the [`Grounded`], [`Airborne`] and [`ActiveState`] components.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Eq)]
#[reflect(Component)]
pub struct CharacterLink(pub CharacterId);

/// A cross-fade requested by a linked character's animator.
///
/// Sent once per fade after the frame that started it.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct CharacterCrossFade {
    pub entity: Entity,
    pub character: CharacterId,
    pub fade: CrossFade,
}

/// Collects body transforms during the render sync phase.
struct TransformSync<B> {
    poses: HashMap<B, (Vec3, Quat)>,
}

impl<B: std::hash::Hash + Eq> FrameHooks<B> for TransformSync<B> {
    fn on_phase(&mut self, phase: TickPhase) {
        trace!("Locomotion tick phase {:?}", phase);
    }

    fn sync_visual(&mut self, body: B, translation: Vec3, rotation: Quat) {
        self.poses.insert(body, (translation, rotation));
    }
}

/// Run one orchestrator frame and copy body transforms to their visuals.
pub fn step_locomotion<P: PhysicsWorld>(
    time: Res<Time>,
    mut orchestrator: ResMut<SteppingOrchestrator<P>>,
    mut q_visuals: Query<(&BodyVisual<P::Body>, &mut Transform), Without<CharacterLink>>,
) {
    let mut sync = TransformSync {
        poses: HashMap::new(),
    };
    orchestrator.tick(time.delta_secs(), &mut sync);

    for (visual, mut transform) in &mut q_visuals {
        if let Some((translation, rotation)) = sync.poses.get(&visual.0) {
            transform.translation = *translation;
            transform.rotation = *rotation;
        }
    }
}

/// Drain every character's cross-fade queue.
///
/// Fades of characters linked to an entity are forwarded as
/// [`CharacterCrossFade`] events; the rest are discarded.
pub fn forward_cross_fades<P: PhysicsWorld>(
    mut orchestrator: ResMut<SteppingOrchestrator<P>>,
    q_links: Query<(Entity, &CharacterLink)>,
    mut fades: EventWriter<CharacterCrossFade>,
) {
    let links: HashMap<CharacterId, Entity> =
        q_links.iter().map(|(entity, link)| (link.0, entity)).collect();
    let ids: Vec<CharacterId> = orchestrator.characters().map(|(id, _)| id).collect();

    for id in ids {
        let Some(character) = orchestrator.character_mut(id) else {
            continue;
        };
        let drained = character.locomotion_mut().animator_mut().drain_cross_fades();
        let Some(&entity) = links.get(&id) else {
            continue;
        };
        for fade in drained {
            fades.write(CharacterCrossFade {
                entity,
                character: id,
                fade,
            });
        }
    }
}

/// Place linked character entities using the body position and the
/// character's facing, tilt and vertical offset.
pub fn sync_character_pose<P: PhysicsWorld>(
    orchestrator: Res<SteppingOrchestrator<P>>,
    mut q_characters: Query<(&CharacterLink, &mut Transform)>,
) {
    for (link, mut transform) in &mut q_characters {
        let (Some(character), Some(body)) =
            (orchestrator.character(link.0), orchestrator.body(link.0))
        else {
            continue;
        };

        let pose = character.locomotion().pose();
        // The pose offset is 0.5 when upright.
        let lift = pose.vertical_offset - 0.5;
        transform.translation = orchestrator.physics().translation(body) + Vec3::Y * lift;
        transform.rotation = pose.rotation();
    }
}

/// Synchronize status components with the orchestrator.
pub fn sync_character_status<P: PhysicsWorld>(
    mut commands: Commands,
    orchestrator: Res<SteppingOrchestrator<P>>,
    mut q_characters: Query<(
        Entity,
        &CharacterLink,
        Has<Grounded>,
        Has<Airborne>,
        Option<&mut ActiveState>,
    )>,
) {
    for (entity, link, has_grounded, has_airborne, active) in &mut q_characters {
        let Some(character) = orchestrator.character(link.0) else {
            continue;
        };

        // Sync Grounded/Airborne
        let grounded = character.locomotion().ray_has_hit();
        if grounded && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !grounded && !has_airborne {
            commands.entity(entity).insert(Airborne).remove::<Grounded>();
        }

        let current = ActiveState::new(character.state_kind(), character.state().timer());
        match active {
            Some(mut active) => {
                if active.kind != current.kind {
                    debug!(
                        "Character {:?} state {:?} -> {:?}",
                        link.0, active.kind, current.kind
                    );
                }
                *active = current;
            }
            None => {
                commands.entity(entity).insert(current);
            }
        }
    }
}
