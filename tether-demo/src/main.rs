//! Headless demo: a player lands on a floor, rides a moving platform and
//! swings up to a ceiling on a grappling hook.
//!
//! Run with `RUST_LOG=debug` to also see the library's lifecycle events.

use anyhow::{Context, Result};
use glam::DVec2;
use log::info;
use tether::ecs::components::physics::{Attribute, Attributes, MotionType, SpaceType, Sticky};
use tether::{ColliderOptions, Connection, Grid, ObjectId, PhysicsConfig, PhysicsWorld, Profile};

const TICKS: u32 = 300;
const HOOK_FIRE_TICK: u32 = 120;
const HOOK_RELEASE_TICK: u32 = 220;
const PLATFORM_TURN_TICKS: u32 = 90;

struct Level {
    player: ObjectId,
    lift: ObjectId,
}

fn solid(grid: &mut Grid, pos: DVec2, dim: DVec2, motion: MotionType, extra: &[Attribute]) -> ObjectId {
    let mut attributes = Attributes::from_slice(extra);
    attributes.add(Attribute::Solid);
    grid.spawn_with(SpaceType::Wall, motion, Profile::new(pos, dim), attributes)
}

fn build_level(grid: &mut Grid) -> Level {
    solid(grid, DVec2::ZERO, DVec2::new(30.0, 1.0), MotionType::Static, &[]);
    solid(grid, DVec2::new(6.0, 8.0), DVec2::new(8.0, 1.0), MotionType::Static, &[]);
    solid(grid, DVec2::new(-5.0, 3.0), DVec2::new(3.0, 0.4), MotionType::Static, &[Attribute::Platform]);
    solid(grid, DVec2::new(-8.0, 0.7), DVec2::new(2.0, 0.4), MotionType::Static, &[Attribute::Stair]);

    let lift = solid(grid, DVec2::new(5.0, 2.0), DVec2::new(3.0, 0.5), MotionType::Kinematic, &[]);
    if let Some(mut profile) = grid.profile_mut(lift) {
        profile.set_vel(DVec2::new(1.5, 0.0));
    }

    let player = grid.spawn(
        SpaceType::Player,
        MotionType::Dynamic,
        Profile::new(DVec2::new(5.0, 5.0), DVec2::new(0.8, 1.0))
            .with_snap_options(ColliderOptions::new().with_attribute(Attribute::Solid)),
    );

    Level { player, lift }
}

fn fire_hook(grid: &mut Grid, from: DVec2) -> Result<ObjectId> {
    let hook = grid.spawn(
        SpaceType::GrapplingHook,
        MotionType::Dynamic,
        Profile::new(from + DVec2::new(0.0, 0.8), DVec2::splat(0.3))
            .with_vel(DVec2::new(0.0, 28.0))
            .with_overlap_options(ColliderOptions::new().with_space(SpaceType::Wall)),
    );
    grid.upsert(hook, Sticky::default()).context("hook vanished before it flew")?;
    Ok(hook)
}

/// Grounded when this tick's resolution pushed the player up.
fn update_grounded(grid: &mut Grid, physics: &PhysicsWorld, player: ObjectId) {
    let grounded = physics
        .results(player)
        .is_some_and(|results| results.snap && results.pos_adjustment.y > 0.0);
    if grounded {
        grid.add_attribute(player, Attribute::Grounded);
    } else {
        grid.remove_attribute(player, Attribute::Grounded);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = PhysicsConfig::default();
    let dt = config.fixed_timestep;
    let mut physics = PhysicsWorld::new(config).context("invalid physics config")?;
    let mut grid = Grid::new();
    let level = build_level(&mut grid);

    let mut hook: Option<ObjectId> = None;
    let mut hook_connected = false;

    for tick in 0..TICKS {
        if tick > 0 && tick % PLATFORM_TURN_TICKS == 0 {
            if let Some(mut lift) = grid.profile_mut(level.lift) {
                let vel = lift.vel();
                lift.set_vel(-vel);
            }
        }

        if tick == HOOK_FIRE_TICK {
            let from = grid.profile(level.player).map(|p| p.pos()).context("player missing")?;
            hook = Some(fire_hook(&mut grid, from)?);
            info!("tick {tick}: hook fired from {from}");
        }

        if let (Some(id), false) = (hook, hook_connected) {
            let stuck = grid
                .world()
                .get::<&Sticky>(id)
                .map(|sticky| sticky.stuck_to.is_some())
                .unwrap_or(false);
            if stuck {
                let length = match (grid.profile(level.player), grid.profile(id)) {
                    (Some(player), Some(anchor)) => player.dist(&*anchor),
                    _ => 0.0,
                };
                grid.connect(level.player, id, Connection::grapple(length))
                    .context("attaching player to hook")?;
                hook_connected = true;
                info!("tick {tick}: hook caught, rope length {length:.2}");
            }
        }

        if tick == HOOK_RELEASE_TICK {
            if let Some(id) = hook.take() {
                grid.delete(id);
                info!("tick {tick}: hook released");
            }
        }

        physics.fixed_step(&mut grid, dt);
        update_grounded(&mut grid, &physics, level.player);

        if tick % 10 == 0 {
            let profile = grid.profile(level.player).context("player missing")?;
            info!(
                "tick {tick}: pos=({:.2}, {:.2}) vel=({:.2}, {:.2}) ext_vel=({:.2}, {:.2}) grounded={} attached={}",
                profile.pos().x,
                profile.pos().y,
                profile.vel().x,
                profile.vel().y,
                profile.ext_vel().x,
                profile.ext_vel().y,
                grid.has_attribute(level.player, Attribute::Grounded),
                grid.has_attribute(level.player, Attribute::Attached),
            );
        }
    }

    info!("done after {} ticks", physics.ticks());
    Ok(())
}
