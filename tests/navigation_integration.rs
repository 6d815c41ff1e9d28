use bevy::prelude::*;
use lodestar::nav::grid::{Obstacle, ObstacleFlags, ObstacleGrid};
use lodestar::nav::navigation::{GridPosition, NavTick, NextStep, Seeker, Steering, TrackedAgent, TrackedAgents};
use lodestar::nav::{Coord, NavConfig, NavigationPlugin, NavigationService};

fn test_config() -> NavConfig {
    NavConfig {
        bounds_padding: 6,
        target_filter: ObstacleFlags::PLAYER_BUILT,
        ..Default::default()
    }
}

fn wall(durability: u32) -> Obstacle {
    Obstacle::new(ObstacleFlags::SOLID | ObstacleFlags::PLAYER_BUILT, durability)
}

fn setup_app(grid: ObstacleGrid) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.insert_resource(grid);
    app.add_plugins(NavigationPlugin::with_config(test_config()));
    app
}

fn tick(app: &mut App, n: usize) {
    for _ in 0..n {
        app.world_mut().run_schedule(FixedUpdate);
    }
}

#[test]
fn test_plugin_seeds_field_from_existing_grid() {
    let mut grid = ObstacleGrid::default();
    grid.place(Coord::new(10, 10), wall(3));
    let app = setup_app(grid);

    let service = app.world().resource::<NavigationService>();
    assert!(service.field().is_valid());
    assert_eq!(service.next_step(Coord::new(10, 10)), Some(Coord::new(10, 10)));
}

#[test]
fn test_seekers_follow_field_to_target() {
    let mut grid = ObstacleGrid::default();
    grid.place(Coord::new(10, 10), wall(3));
    let mut app = setup_app(grid);

    let seeker = app.world_mut().spawn((GridPosition(Coord::new(5, 7)), Seeker)).id();
    tick(&mut app, 1);

    let next = app.world().get::<NextStep>(seeker).unwrap().0;
    assert_eq!(next, Some(Steering::Field { next: Coord::new(6, 8) }));
    assert_eq!(app.world().resource::<NavTick>().0, 1);
}

#[test]
fn test_seeker_outside_field_moves_directly() {
    let mut grid = ObstacleGrid::default();
    grid.place(Coord::ZERO, wall(3));
    let mut app = setup_app(grid);

    let seeker = app.world_mut().spawn((GridPosition(Coord::new(-40, 0)), Seeker)).id();
    tick(&mut app, 1);

    let next = app.world().get::<NextStep>(seeker).unwrap().0;
    assert_eq!(
        next,
        Some(Steering::Direct {
            target: Coord::ZERO,
            next: Coord::new(-39, 0),
        })
    );
}

#[test]
fn test_grid_edits_rebuild_field_on_next_tick() {
    let mut app = setup_app(ObstacleGrid::default());
    let seeker = app.world_mut().spawn((GridPosition(Coord::new(3, 0)), Seeker)).id();

    tick(&mut app, 1);
    assert_eq!(app.world().get::<NextStep>(seeker).unwrap().0, None, "No targets yet");

    app.world_mut().resource_mut::<ObstacleGrid>().place(Coord::ZERO, wall(1));
    tick(&mut app, 1);
    assert_eq!(app.world().resource::<NavigationService>().rebuild_count(), 1);
    assert_eq!(
        app.world().get::<NextStep>(seeker).unwrap().0,
        Some(Steering::Field { next: Coord::new(2, 0) })
    );

    // Destroying the last target drops the field again.
    app.world_mut().resource_mut::<ObstacleGrid>().damage(Coord::ZERO, 1);
    tick(&mut app, 1);
    assert!(!app.world().resource::<NavigationService>().field().is_valid());
    assert_eq!(app.world().get::<NextStep>(seeker).unwrap().0, None);
}

#[test]
fn test_tracked_agents_indexed_over_ticks() {
    let mut app = setup_app(ObstacleGrid::default());
    let near = app.world_mut().spawn((GridPosition(Coord::new(1, 0)), TrackedAgent)).id();
    let far = app.world_mut().spawn((GridPosition(Coord::new(20, 0)), TrackedAgent)).id();

    // Two insert steps, then the swap.
    tick(&mut app, 3);

    let world = app.world_mut();
    let positions: Vec<(Entity, Coord)> = world
        .query::<(Entity, &GridPosition)>()
        .iter(world)
        .map(|(e, p)| (e, p.0))
        .collect();
    let roster = |entity: Entity| positions.iter().find(|(e, _)| *e == entity).map(|(_, c)| *c);

    let agents = world.resource::<TrackedAgents>();
    assert_eq!(agents.completed_cycles(), 1);
    let hits = agents.query_k_nearest(&roster, Coord::ZERO, 2, 100);
    assert_eq!(hits.iter().map(|h| h.handle).collect::<Vec<_>>(), vec![near, far]);
}

#[test]
fn test_despawned_agents_leave_index() {
    let mut app = setup_app(ObstacleGrid::default());
    let doomed = app.world_mut().spawn((GridPosition(Coord::ZERO), TrackedAgent)).id();
    let survivor = app.world_mut().spawn((GridPosition(Coord::new(2, 0)), TrackedAgent)).id();
    tick(&mut app, 3);

    app.world_mut().despawn(doomed);
    tick(&mut app, 1);
    assert_eq!(app.world().resource::<TrackedAgents>().len(), 2, "Slot is reclaimed at the next swap");

    // Finish the current cycle so the slot is compacted away.
    tick(&mut app, 4);
    let agents = app.world().resource::<TrackedAgents>();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents.pending_removals(), 0);

    let roster = |entity: Entity| (entity == survivor).then_some(Coord::new(2, 0));
    let hits = agents.query_k_nearest(&roster, Coord::ZERO, 5, 10);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].handle, survivor);
}

#[test]
fn test_seekers_erode_ring_of_targets() {
    let mut grid = ObstacleGrid::default();
    for x in -3..=3 {
        grid.place(Coord::new(x, 5), wall(2));
    }
    let mut app = setup_app(grid);
    for x in -3..=3 {
        app.world_mut().spawn((GridPosition(Coord::new(x, -5)), Seeker));
    }

    // Walk along the plan and chip away at targets on arrival.
    for _ in 0..40 {
        tick(&mut app, 1);
        let world = app.world_mut();
        let plans: Vec<(Entity, Coord, Steering)> = world
            .query::<(Entity, &GridPosition, &NextStep)>()
            .iter(world)
            .filter_map(|(e, p, n)| n.0.map(|s| (e, p.0, s)))
            .collect();
        for (entity, at, steering) in plans {
            if steering.next() == at {
                world.resource_mut::<ObstacleGrid>().damage(at, 1);
            } else if let Some(mut position) = world.get_mut::<GridPosition>(entity) {
                position.0 = steering.next();
            }
        }
    }

    let service = app.world().resource::<NavigationService>();
    assert!(service.bounds().is_empty(), "All targets destroyed");
    assert!(!service.field().is_valid());
}
