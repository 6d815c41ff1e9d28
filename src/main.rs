use bevy::prelude::*;

use lodestar::nav::grid::{Obstacle, ObstacleFlags, ObstacleGrid};
use lodestar::nav::navigation::{GridPosition, NavSet, NavTick, NextStep, Seeker, Steering, TrackedAgent, TrackedAgents};
use lodestar::nav::{Coord, NavConfig, NavigationPlugin, NavigationService};

use rand::Rng;
use std::fs;
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEMO_TICKS: u64 = 1200;
const SEEKER_COUNT: usize = 400;
const TARGET_RING_RADIUS: i32 = 12;
const SPAWN_RADIUS: i32 = 60;

fn setup_file_logging() -> String {
    let log_dir = PathBuf::from("logs");
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("Failed to create logs directory: {}", e);
    }

    // Clean up old log files, keeping only the last 25
    cleanup_old_logs(&log_dir, 25);

    let now = chrono::Local::now();
    let log_filename = format!("lodestar_{}.log", now.format("%Y%m%d_%H%M%S"));
    let log_file_path = log_dir.join(&log_filename);
    let log_path_str = log_file_path.to_string_lossy().to_string();

    let file_appender = RollingFileAppender::new(
        Rotation::NEVER, // Don't rotate during a single run
        &log_dir,
        &log_filename
    );

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bevy_ecs=info,lodestar=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    log_path_str
}

fn cleanup_old_logs(log_dir: &PathBuf, keep_count: usize) {
    if let Ok(entries) = fs::read_dir(log_dir) {
        let mut log_files: Vec<_> = entries
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|s| s.starts_with("lodestar") && s.ends_with(".log"))
                    .unwrap_or(false)
            })
            .collect();

        // Sort by modified time (oldest first)
        log_files.sort_by_key(|e| e.metadata().ok().and_then(|m| m.modified().ok()));

        if log_files.len() > keep_count {
            for file in log_files.iter().take(log_files.len() - keep_count) {
                let _ = fs::remove_file(file.path());
            }
        }
    }
}

/// Ring of destructible walls around the origin, with a few gaps.
fn build_target_ring(grid: &mut ObstacleGrid, rng: &mut impl Rng) {
    let flags = ObstacleFlags::SOLID | ObstacleFlags::PLAYER_BUILT | ObstacleFlags::DESTRUCTIBLE;
    for x in -TARGET_RING_RADIUS..=TARGET_RING_RADIUS {
        for y in -TARGET_RING_RADIUS..=TARGET_RING_RADIUS {
            let on_ring = x.abs() == TARGET_RING_RADIUS || y.abs() == TARGET_RING_RADIUS;
            if on_ring && rng.random_range(0..10) > 0 {
                grid.place(Coord::new(x, y), Obstacle::new(flags, rng.random_range(20..80)));
            }
        }
    }
    // Scenery the navigator should ignore.
    for _ in 0..40 {
        let c = Coord::new(
            rng.random_range(-SPAWN_RADIUS..=SPAWN_RADIUS),
            rng.random_range(-SPAWN_RADIUS..=SPAWN_RADIUS),
        );
        if !grid.contains(c) {
            grid.place(c, Obstacle::new(ObstacleFlags::SOLID | ObstacleFlags::NATURAL, 500));
        }
    }
}

fn spawn_seekers(world: &mut World, rng: &mut impl Rng) {
    for _ in 0..SEEKER_COUNT {
        let c = Coord::new(
            rng.random_range(-SPAWN_RADIUS..=SPAWN_RADIUS),
            rng.random_range(-SPAWN_RADIUS..=SPAWN_RADIUS),
        );
        world.spawn((GridPosition(c), TrackedAgent, Seeker));
    }
}

/// Moves each seeker one cell along its plan; seekers standing on a target
/// wear it down instead.
fn advance_seekers(
    mut grid: ResMut<ObstacleGrid>,
    mut seekers: Query<(&mut GridPosition, &NextStep), With<Seeker>>,
) {
    for (mut position, next) in &mut seekers {
        let Some(steering) = next.0 else { continue };
        let at_target = match steering {
            Steering::Field { next } => next == position.0,
            Steering::Direct { target, .. } => target == position.0,
        };
        if at_target {
            grid.damage(position.0, 1);
        } else {
            position.0 = steering.next();
        }
    }
}

fn report_progress(
    tick: Res<NavTick>,
    grid: Res<ObstacleGrid>,
    service: Res<NavigationService>,
    agents: Res<TrackedAgents>,
    positions: Query<&GridPosition, With<TrackedAgent>>,
) {
    if tick.0 % 100 != 0 {
        return;
    }
    let roster = |entity: Entity| positions.get(entity).ok().map(|p| p.0);
    let crowding = agents.query_nearby(&roster, Coord::ZERO).len();
    info!(
        "tick {}: {} cells, {} targets, region {:?}, {} field rebuilds, {} agent cycles, {} agents near origin",
        tick.0,
        grid.len(),
        service.bounds().len(),
        service.region(),
        service.rebuild_count(),
        agents.completed_cycles(),
        crowding
    );
}

fn main() {
    let log_file = setup_file_logging();

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  Lodestar navigation demo - Logging to file              ║");
    println!("╠══════════════════════════════════════════════════════════╣");
    println!("║  Log file: {:<42} ║", log_file);
    println!("╚══════════════════════════════════════════════════════════╝");

    let mut rng = rand::rng();
    let mut grid = ObstacleGrid::default();
    build_target_ring(&mut grid, &mut rng);
    info!("Placed {} obstacles", grid.len());

    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.insert_resource(grid);
    app.add_plugins(NavigationPlugin::default());
    app.add_systems(FixedUpdate, (advance_seekers, report_progress).chain().after(NavSet::Steering));

    spawn_seekers(app.world_mut(), &mut rng);

    let tick_rate = app.world().resource::<NavConfig>().tick_rate;
    info!("Running {} ticks ({:.1}s of simulated time)", DEMO_TICKS, DEMO_TICKS as f64 / tick_rate);
    for _ in 0..DEMO_TICKS {
        app.world_mut().run_schedule(FixedUpdate);
    }

    let service = app.world().resource::<NavigationService>();
    info!(
        "Done: {} targets left, {} field rebuilds, {} obstacle index rebuilds",
        service.bounds().len(),
        service.rebuild_count(),
        service.targets().rebuild_count()
    );
}
