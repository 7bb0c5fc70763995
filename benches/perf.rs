use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use vpfs_dashboard::model::{Fare, FareModifier, Millis, Point, Team};
use vpfs_dashboard::reconcile::{FareReconciler, TeamReconciler};
use vpfs_dashboard::render::NodeTree;
use vpfs_dashboard::state::{AppState, Update, apply_update};
use vpfs_dashboard::vpfs_api::{parse_fare_snapshot_json, parse_team_snapshot_json};

const NOW: Millis = 1_700_000_000_000;

fn sample_fares(count: u64) -> Vec<Fare> {
    (0..count)
        .map(|id| Fare {
            id,
            src: Point::new(id as f64 * 0.1, 1.0),
            dest: Point::new(2.0, id as f64 * 0.2),
            pay: 40.0 + id as f64,
            reputation: 5.0,
            modifiers: if id % 5 == 0 {
                FareModifier::Senior
            } else {
                FareModifier::None
            },
            claimed: id % 3 == 0,
            team: (id % 3 == 0).then_some((id % 8 + 1) as u32),
            // Half expired, half live.
            expiry: NOW + if id % 2 == 0 { 30_000 } else { -30_000 },
            in_position: false,
            picked_up: false,
            completed: false,
            paid: false,
            active: None,
        })
        .collect()
}

fn sample_teams(count: u32) -> Vec<Team> {
    (1..=count)
        .rev()
        .map(|number| Team {
            number,
            money: number as f64 * 12.5,
            karma: 100.0,
            current_fare: None,
            position: Point::new(1.0, 1.0),
            last_pos_update: NOW - 300,
            last_status: NOW - 300,
        })
        .collect()
}

fn bench_fare_snapshot_parse(c: &mut Criterion) {
    c.bench_function("fare_snapshot_parse", |b| {
        b.iter(|| {
            let fares = parse_fare_snapshot_json(black_box(FARES_JSON)).unwrap();
            black_box(fares.len());
        })
    });
    c.bench_function("partitioned_fare_snapshot_parse", |b| {
        b.iter(|| {
            let fares = parse_fare_snapshot_json(black_box(PARTITIONED_FARES_JSON)).unwrap();
            black_box(fares.len());
        })
    });
}

fn bench_team_snapshot_parse(c: &mut Criterion) {
    c.bench_function("team_snapshot_parse", |b| {
        b.iter(|| {
            let teams = parse_team_snapshot_json(black_box(TEAMS_JSON)).unwrap();
            black_box(teams.len());
        })
    });
}

fn bench_fare_reconcile_steady(c: &mut Criterion) {
    let fares = sample_fares(500);
    let mut tree = NodeTree::new();
    let mut reconciler = FareReconciler::new();
    reconciler.apply(&mut tree, &fares, NOW);

    c.bench_function("fare_reconcile_steady_500", |b| {
        b.iter(|| {
            let stats = reconciler.apply(&mut tree, black_box(&fares), NOW);
            black_box(stats.updated);
        })
    });
}

fn bench_fare_reconcile_cold(c: &mut Criterion) {
    let fares = sample_fares(500);
    c.bench_function("fare_reconcile_cold_500", |b| {
        b.iter(|| {
            let mut tree = NodeTree::new();
            let mut reconciler = FareReconciler::new();
            let stats = reconciler.apply(&mut tree, black_box(&fares), NOW);
            black_box(stats.created);
        })
    });
}

fn bench_team_reconcile_churn(c: &mut Criterion) {
    let full = sample_teams(64);
    let partial: Vec<Team> = full.iter().filter(|t| t.number % 2 == 0).cloned().collect();
    let mut tree = NodeTree::new();
    let mut reconciler = TeamReconciler::new();

    c.bench_function("team_reconcile_churn_64", |b| {
        b.iter(|| {
            reconciler.apply(&mut tree, black_box(&full), NOW);
            let stats = reconciler.apply(&mut tree, black_box(&partial), NOW);
            black_box(stats.removed);
        })
    });
}

fn bench_apply_update_mix(c: &mut Criterion) {
    let fares = sample_fares(100);
    let teams = sample_teams(16);
    let mut state = AppState::new();

    c.bench_function("apply_update_mix", |b| {
        b.iter(|| {
            apply_update(&mut state, Update::Fares(fares.clone()), NOW);
            apply_update(&mut state, Update::Teams(teams.clone()), NOW);
            black_box(state.tree.len());
        })
    });
}

criterion_group!(
    perf,
    bench_fare_snapshot_parse,
    bench_team_snapshot_parse,
    bench_fare_reconcile_steady,
    bench_fare_reconcile_cold,
    bench_team_reconcile_churn,
    bench_apply_update_mix
);
criterion_main!(perf);

static FARES_JSON: &str = include_str!("../tests/fixtures/dashboard_fares.json");
static PARTITIONED_FARES_JSON: &str = include_str!("../tests/fixtures/partitioned_fares.json");
static TEAMS_JSON: &str = include_str!("../tests/fixtures/dashboard_teams.json");
