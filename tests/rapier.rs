//! Integration tests on the Rapier3D backend.
//!
//! Characters are zero-friction capsules. These tests check that the ground
//! ray, snap and jump launch behave the same on a real engine as on the
//! sandbox world.

#![cfg(feature = "rapier3d")]

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use bevy_rapier3d::rapier::prelude::RigidBodyHandle;
use msg_locomotion::prelude::*;

const DT: f32 = 1.0 / 60.0;
const TOLERANCE: f32 = 1e-3;

fn create_world() -> SteppingOrchestrator<RapierWorld> {
    let mut world = RapierWorld::new();
    world.add_ground(0.0);
    SteppingOrchestrator::new(world)
}

fn boxman() -> AnimationLibrary {
    AnimationLibrary::new()
        .with_clip("idle", 2.0)
        .with_clip("run", 0.7)
        .with_clip("start_forward", 0.3)
        .with_clip("stop", 0.5)
        .with_clip("jump_idle", 1.0)
        .with_clip("jump_running", 0.8)
        .with_clip("falling", 0.5)
        .with_clip("drop_idle", 0.4)
        .with_clip("drop_running", 0.5)
        .with_clip("drop_running_roll", 0.9)
}

fn spawn_character(
    orchestrator: &mut SteppingOrchestrator<RapierWorld>,
    position: Vec3,
    character: Character,
) -> (CharacterId, RigidBodyHandle) {
    let height = character.config().height;
    let body = orchestrator
        .physics_mut()
        .add_capsule_character(position, height);
    let id = orchestrator.spawn_character(character, body);
    (id, body)
}

fn run_frames(orchestrator: &mut SteppingOrchestrator<RapierWorld>, frames: usize) {
    for _ in 0..frames {
        orchestrator.tick(DT, &mut NoFrameHooks);
    }
}

fn state_of(orchestrator: &SteppingOrchestrator<RapierWorld>, id: CharacterId) -> StateKind {
    orchestrator
        .character(id)
        .map(|c| c.state_kind())
        .expect("character registered")
}

fn press(
    orchestrator: &mut SteppingOrchestrator<RapierWorld>,
    id: CharacterId,
    control: ControlName,
    value: bool,
) {
    orchestrator
        .character_mut(id)
        .expect("character registered")
        .set_control(control, value);
}

// ==================== Grounding Tests ====================

mod grounding {
    use super::*;

    #[test]
    fn capsule_snaps_to_ground() {
        let mut orchestrator = create_world();
        let (id, body) =
            spawn_character(&mut orchestrator, Vec3::new(0.0, 0.62, 0.0), Character::default());

        orchestrator.tick(DT, &mut NoFrameHooks);

        let position = orchestrator.physics().translation(body);
        let velocity = orchestrator.physics().linvel(body);
        println!("PROOF: position={:?}, velocity={:?}", position, velocity);

        // PROOF: capsule bottom hovers 0.1 above the ground top
        assert!((position.y - 0.6).abs() < TOLERANCE);
        assert_eq!(velocity.y, 0.0);
        assert!(orchestrator
            .character(id)
            .map(|c| c.locomotion().ray_has_hit())
            .unwrap_or(false));
    }

    #[test]
    fn capsule_stays_put_without_sliding() {
        let mut orchestrator = create_world();
        let (id, body) =
            spawn_character(&mut orchestrator, Vec3::new(0.0, 0.6, 0.0), Character::default());

        run_frames(&mut orchestrator, 120);

        let position = orchestrator.physics().translation(body);
        println!("PROOF: position after 2s {:?}", position);
        assert!((position - Vec3::new(0.0, 0.6, 0.0)).length() < TOLERANCE);
        assert!(orchestrator.physics().rotation_locked(body));
        assert_eq!(state_of(&orchestrator, id), StateKind::Idle);
    }

    #[test]
    fn capsule_falls_and_lands_softly() {
        let mut orchestrator = create_world();
        let (id, body) =
            spawn_character(&mut orchestrator, Vec3::new(0.0, 2.0, 0.0), Character::default());

        let mut seen = Vec::new();
        for _ in 0..180 {
            orchestrator.tick(DT, &mut NoFrameHooks);
            let kind = state_of(&orchestrator, id);
            if seen.last() != Some(&kind) {
                seen.push(kind);
            }
        }
        println!("PROOF: state sequence {:?}", seen);

        assert_eq!(
            seen,
            vec![StateKind::Falling, StateKind::DropIdle, StateKind::Idle]
        );
        assert!((orchestrator.physics().translation(body).y - 0.6).abs() < TOLERANCE);
    }
}

// ==================== Jump Tests ====================

mod jumping {
    use super::*;

    #[test]
    fn idle_jump_lifts_off_once_and_lands() {
        let mut orchestrator = create_world();
        let (id, body) = spawn_character(
            &mut orchestrator,
            Vec3::new(0.0, 0.6, 0.0),
            Character::default().with_animations(boxman()),
        );
        run_frames(&mut orchestrator, 5);

        press(&mut orchestrator, id, ControlName::Jump, true);
        assert_eq!(state_of(&orchestrator, id), StateKind::JumpIdle);

        let mut launches = 0;
        let mut peak: f32 = 0.0;
        let mut previous = orchestrator.physics().linvel(body).y;
        for _ in 0..240 {
            orchestrator.tick(DT, &mut NoFrameHooks);
            let vy = orchestrator.physics().linvel(body).y;
            if vy > 2.0 && previous < 1.0 {
                launches += 1;
            }
            previous = vy;
            peak = peak.max(orchestrator.physics().translation(body).y);
        }
        println!("PROOF: launches={}, peak={}", launches, peak);

        assert_eq!(launches, 1);
        assert!(peak > 1.0, "Jump should clear the ground, peak {}", peak);
        assert_eq!(state_of(&orchestrator, id), StateKind::Idle);
        assert!((orchestrator.physics().translation(body).y - 0.6).abs() < TOLERANCE);
    }

    #[test]
    fn running_jump_keeps_horizontal_speed() {
        let mut orchestrator = create_world();
        let (id, body) = spawn_character(
            &mut orchestrator,
            Vec3::new(0.0, 0.6, 0.0),
            Character::default().with_animations(boxman()),
        );

        press(&mut orchestrator, id, ControlName::Up, true);
        run_frames(&mut orchestrator, 60);
        assert_eq!(state_of(&orchestrator, id), StateKind::Walk);

        press(&mut orchestrator, id, ControlName::Jump, true);

        let mut launch_velocity = None;
        let mut previous = orchestrator.physics().linvel(body).y;
        for _ in 0..30 {
            orchestrator.tick(DT, &mut NoFrameHooks);
            let velocity = orchestrator.physics().linvel(body);
            if velocity.y > 2.0 && previous < 1.0 {
                launch_velocity = Some(velocity);
            }
            previous = velocity.y;
        }

        let launch = launch_velocity.expect("character should lift off");
        println!("PROOF: launch velocity {:?}", launch);
        assert!(Vec2::new(launch.x, launch.z).length() >= 4.0 - TOLERANCE);
    }
}

// ==================== Walking Tests ====================

mod walking {
    use super::*;

    #[test]
    fn zero_friction_capsule_walks_forward() {
        let mut orchestrator = create_world();
        let (id, body) =
            spawn_character(&mut orchestrator, Vec3::new(0.0, 0.6, 0.0), Character::default());
        run_frames(&mut orchestrator, 2);

        press(&mut orchestrator, id, ControlName::Up, true);
        run_frames(&mut orchestrator, 60);
        assert_eq!(state_of(&orchestrator, id), StateKind::Walk);

        let position = orchestrator.physics().translation(body);
        let velocity = orchestrator.physics().linvel(body);
        println!("PROOF: position={:?}, velocity={:?}", position, velocity);

        // PROOF: moving along +Z at walk speed while held at ride height
        assert!(position.z > 1.0);
        assert!(position.x.abs() < TOLERANCE);
        assert!((position.y - 0.6).abs() < TOLERANCE);
        assert!(velocity.z > 4.0);

        press(&mut orchestrator, id, ControlName::Up, false);
        run_frames(&mut orchestrator, 120);
        assert_eq!(state_of(&orchestrator, id), StateKind::Idle);
    }
}

// ==================== Plugin Tests ====================

mod plugin {
    use super::*;

    #[test]
    fn plugin_drives_rapier_world() {
        let mut orchestrator = create_world();
        let (id, body) =
            spawn_character(&mut orchestrator, Vec3::new(0.0, 0.6, 0.0), Character::default());

        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(LocomotionPlugin::<RapierWorld>::default());
        app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / 60.0,
        )));
        app.insert_resource(orchestrator);

        let entity = app
            .world_mut()
            .spawn((Transform::default(), CharacterLink(id)))
            .id();

        for _ in 0..30 {
            app.update();
        }

        let world = app.world();
        assert!(world.get::<Grounded>(entity).is_some());
        assert_eq!(
            world.get::<ActiveState>(entity).map(|s| s.kind),
            Some(StateKind::Idle)
        );

        let expected = world
            .resource::<SteppingOrchestrator<RapierWorld>>()
            .physics()
            .translation(body);
        let transform = world.get::<Transform>(entity).expect("transform");
        assert!((transform.translation - expected).length() < TOLERANCE);
    }
}
