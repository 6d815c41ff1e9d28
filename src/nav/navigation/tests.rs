use super::*;
use crate::nav::coord::{CellRect, Coord};
use crate::nav::grid::{Obstacle, ObstacleFlags};

fn config() -> NavConfig {
    NavConfig {
        bounds_padding: 4,
        target_filter: ObstacleFlags::PLAYER_BUILT,
        ..Default::default()
    }
}

fn wall(durability: u32) -> Obstacle {
    Obstacle::new(ObstacleFlags::SOLID | ObstacleFlags::PLAYER_BUILT, durability)
}

fn rock() -> Obstacle {
    Obstacle::new(ObstacleFlags::SOLID | ObstacleFlags::NATURAL, 100)
}

fn follow(service: &NavigationService, from: Coord, max_hops: usize) -> Option<Coord> {
    let mut current = from;
    for _ in 0..=max_hops {
        let next = service.next_step(current)?;
        if next == current {
            return Some(current);
        }
        current = next;
    }
    None
}

#[test]
fn test_empty_grid_has_no_field() {
    let mut grid = ObstacleGrid::default();
    let mut service = NavigationService::new(&mut grid, &config());
    assert!(service.region().is_none());
    assert_eq!(service.rebuild_count(), 0);
    assert_eq!(service.steer(&grid, Coord::ZERO), None);
    assert_eq!(service.sync(&mut grid), SyncOutcome::Unchanged);
}

#[test]
fn test_target_placement_rebuilds_padded_region() {
    let mut grid = ObstacleGrid::default();
    let mut service = NavigationService::new(&mut grid, &config());

    grid.place(Coord::new(3, 7), wall(0));
    let region = CellRect::new(Coord::new(-1, 3), Coord::new(7, 11));
    assert_eq!(service.sync(&mut grid), SyncOutcome::FieldRebuilt(region));
    assert_eq!(service.region(), Some(region));

    assert_eq!(follow(&service, Coord::new(-1, 3), 8), Some(Coord::new(3, 7)));
    assert_eq!(service.next_step(Coord::new(8, 7)), None, "Outside the padded region");
}

#[test]
fn test_non_target_changes_are_ignored() {
    let mut grid = ObstacleGrid::default();
    let mut service = NavigationService::new(&mut grid, &config());

    grid.place(Coord::new(1, 1), rock());
    assert_eq!(service.sync(&mut grid), SyncOutcome::Unchanged);
    grid.set_durability(Coord::new(1, 1), 3);
    assert_eq!(service.sync(&mut grid), SyncOutcome::Unchanged);
    assert_eq!(service.rebuild_count(), 0);
    assert!(service.bounds().is_empty());
}

#[test]
fn test_changes_batch_into_one_rebuild() {
    let mut grid = ObstacleGrid::default();
    let mut service = NavigationService::new(&mut grid, &config());

    grid.place(Coord::new(0, 0), wall(1));
    grid.place(Coord::new(10, 0), wall(1));
    grid.place(Coord::new(5, 5), wall(1));
    service.sync(&mut grid);

    assert_eq!(service.rebuild_count(), 1);
    assert_eq!(service.bounds().bounds(), Some(CellRect::new(Coord::ZERO, Coord::new(10, 5))));
}

#[test]
fn test_direct_fallback_outside_field() {
    let mut grid = ObstacleGrid::default();
    let mut service = NavigationService::new(&mut grid, &config());
    grid.place(Coord::ZERO, wall(1));
    service.sync(&mut grid);

    assert_eq!(service.next_step(Coord::new(50, -3)), None);
    assert_eq!(
        service.steer(&grid, Coord::new(50, -3)),
        Some(Steering::Direct {
            target: Coord::ZERO,
            next: Coord::new(49, -2),
        })
    );
    assert!(matches!(
        service.steer(&grid, Coord::new(2, 2)),
        Some(Steering::Field { next }) if next == Coord::new(1, 1)
    ));
}

#[test]
fn test_last_target_removed_invalidates_field() {
    let mut grid = ObstacleGrid::default();
    let mut service = NavigationService::new(&mut grid, &config());
    grid.place(Coord::new(2, 2), wall(5));
    service.sync(&mut grid);
    assert!(service.field().is_valid());

    assert_eq!(grid.damage(Coord::new(2, 2), 5), Some(0));
    assert_eq!(service.sync(&mut grid), SyncOutcome::FieldInvalidated);
    assert!(!service.field().is_valid());
    assert_eq!(service.next_step(Coord::new(2, 2)), None);
    assert_eq!(service.steer(&grid, Coord::new(2, 2)), None);
}

#[test]
fn test_flag_change_shrinks_region() {
    let mut grid = ObstacleGrid::default();
    let mut service = NavigationService::new(&mut grid, &config());
    grid.place(Coord::ZERO, wall(1));
    grid.place(Coord::new(30, 0), wall(1));
    service.sync(&mut grid);

    grid.set_flags(Coord::new(30, 0), ObstacleFlags::SOLID);
    assert_eq!(
        service.sync(&mut grid),
        SyncOutcome::FieldRebuilt(CellRect::point(Coord::ZERO).padded(4))
    );
    assert_eq!(service.nearest_targets(&grid, Coord::new(29, 0), 5, 100), vec![Coord::ZERO]);
}

#[test]
fn test_seeds_from_existing_grid() {
    let mut grid = ObstacleGrid::default();
    grid.place(Coord::new(-5, -5), wall(1));
    grid.place(Coord::new(4, 4), rock());

    let service = NavigationService::new(&mut grid, &config());
    assert_eq!(service.region(), Some(CellRect::point(Coord::new(-5, -5)).padded(4)));
    assert_eq!(service.bounds().len(), 1);
    assert_eq!(service.targets_in_range(&grid, CellRect::new(Coord::new(-9, -9), Coord::new(9, 9))).len(), 1);
}

#[test]
fn test_duplicate_placement_keeps_bounds_consistent() {
    let mut grid = ObstacleGrid::default();
    let mut service = NavigationService::new(&mut grid, &config());

    grid.place(Coord::new(1, 1), wall(1));
    grid.place(Coord::new(1, 1), wall(9));
    service.sync(&mut grid);
    assert_eq!(service.bounds().len(), 1);

    grid.remove(Coord::new(1, 1));
    assert_eq!(service.sync(&mut grid), SyncOutcome::FieldInvalidated);
    assert!(service.bounds().is_empty());
}

#[test]
fn test_unsynced_target_removal_does_not_break_lookups() {
    let mut grid = ObstacleGrid::default();
    let mut service = NavigationService::new(&mut grid, &config());
    grid.place(Coord::new(3, 3), wall(1));
    grid.place(Coord::new(8, 8), wall(1));
    service.sync(&mut grid);

    grid.remove(Coord::new(3, 3));
    assert_eq!(
        service.nearest_targets(&grid, Coord::new(3, 3), 2, 100),
        vec![Coord::new(8, 8)]
    );
    assert!(service.steer(&grid, Coord::new(3, 3)).is_some());
    assert!(matches!(
        service.steer(&grid, Coord::new(40, 40)),
        Some(Steering::Direct { target, .. }) if target == Coord::new(8, 8)
    ));

    assert!(matches!(service.sync(&mut grid), SyncOutcome::FieldRebuilt(_)));
    assert_eq!(service.bounds().len(), 1);
}

#[test]
fn test_oversized_region_falls_back_to_direct() {
    let mut grid = ObstacleGrid::default();
    let mut service = NavigationService::new(
        &mut grid,
        &NavConfig {
            max_field_cells: 400,
            ..config()
        },
    );

    grid.place(Coord::ZERO, wall(1));
    let region = CellRect::point(Coord::ZERO).padded(4);
    assert_eq!(service.sync(&mut grid), SyncOutcome::FieldRebuilt(region));

    grid.place(Coord::new(100, 0), wall(1));
    assert_eq!(service.sync(&mut grid), SyncOutcome::FieldInvalidated);
    assert!(!service.field().is_valid());
    assert_eq!(service.rebuild_count(), 1);
    assert_eq!(
        service.steer(&grid, Coord::new(95, 0)),
        Some(Steering::Direct {
            target: Coord::new(100, 0),
            next: Coord::new(96, 0),
        })
    );

    grid.remove(Coord::new(100, 0));
    assert_eq!(service.sync(&mut grid), SyncOutcome::FieldRebuilt(region));
}
