use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow, bail};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::classify::{FarePartition, fare_partition};
use crate::model::{AdminCommand, Fare, FareModifier, MatchStatus, Millis, Point, Team, now_ms};
use crate::vpfs_api::VpfsSource;

pub const FAKE_MODE: &str = "lab";

const STEP_MS: Millis = 250;
const TARGET_FARES: usize = 5;
const DIST_MIN: f64 = 2.5;
const BASE_FARE: f64 = 10.0;
const DIST_FARE_NORMAL: f64 = 10.0;
const DIST_FARE_SUBSIDIZED: f64 = 5.0;
const REPUTATION_NORMAL: f64 = 5.0;
const REPUTATION_SUBSIDIZED: f64 = 10.0;

const SPAWN_POINTS: [(f64, f64); 14] = [
    (0.42, 0.42),
    (1.77, 0.29),
    (3.80, 0.29),
    (5.20, 0.29),
    (1.74, 1.35),
    (3.80, 1.35),
    (5.25, 1.35),
    (1.00, 2.96),
    (5.25, 2.33),
    (1.13, 4.59),
    (2.46, 4.49),
    (3.76, 4.34),
    (5.25, 4.75),
    (0.29, 2.80),
];

// Share of active fares each special type should settle around.
const TARGET_SUBSIDIZED: f64 = 1.5 / TARGET_FARES as f64;
const TARGET_SENIOR: f64 = 1.5 / TARGET_FARES as f64;

pub struct FakeSource {
    world: Mutex<World>,
}

struct World {
    rng: StdRng,
    next_fare_id: u64,
    fares: Vec<Fare>,
    teams: BTreeMap<u32, Team>,
    match_number: u32,
    duration_secs: u32,
    match_end: Option<Millis>,
    last_step: Millis,
}

impl Default for FakeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSource {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy(), now_ms())
    }

    pub fn with_seed(seed: u64, now: Millis) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed), now)
    }

    fn from_rng(rng: StdRng, now: Millis) -> Self {
        let mut world = World {
            rng,
            next_fare_id: 0,
            fares: Vec::new(),
            teams: BTreeMap::new(),
            match_number: 1,
            duration_secs: 300,
            match_end: None,
            last_step: now,
        };
        for number in [3, 5, 12] {
            world.add_team(number, now);
        }
        world.fill_fares(now);
        Self {
            world: Mutex::new(world),
        }
    }

    pub fn fares_at(&self, now: Millis) -> Vec<Fare> {
        let mut world = self.world.lock().expect("fake world lock poisoned");
        world.step(now);
        world.fares.clone()
    }

    pub fn teams_at(&self, now: Millis) -> Vec<Team> {
        let mut world = self.world.lock().expect("fake world lock poisoned");
        world.step(now);
        world.teams.values().cloned().collect()
    }

    pub fn status_at(&self, now: Millis) -> MatchStatus {
        let world = self.world.lock().expect("fake world lock poisoned");
        MatchStatus {
            mode: FAKE_MODE.to_string(),
            match_start: world.match_end.is_some(),
            match_index: world.match_number as i64,
            time_remaining: match world.match_end {
                Some(end) => end - now,
                None => world.duration_secs as Millis * 1000,
            },
            in_match: None,
            team: None,
        }
    }

    pub fn admin_at(&self, cmd: &AdminCommand, now: Millis) -> Result<String> {
        let mut world = self.world.lock().expect("fake world lock poisoned");
        match *cmd {
            AdminCommand::AddTeam(number) => {
                if world.teams.contains_key(&number) {
                    bail!("Team {number} already exists");
                }
                world.add_team(number, now);
                Ok(format!("Team {number} added"))
            }
            AdminCommand::RemoveTeam(number) => {
                world
                    .teams
                    .remove(&number)
                    .ok_or_else(|| anyhow!("Team {number} not found"))?;
                Ok(format!("Team {number} removed"))
            }
            AdminCommand::ConfigMatch { number, duration } => {
                world.match_number = number;
                world.duration_secs = duration;
                world.match_end = None;
                Ok("OK".to_string())
            }
            AdminCommand::StartMatch => {
                world.match_end = Some(now + world.duration_secs as Millis * 1000);
                Ok("OK".to_string())
            }
        }
    }
}

impl VpfsSource for FakeSource {
    fn fetch_fares(&self) -> Result<Vec<Fare>> {
        Ok(self.fares_at(now_ms()))
    }

    fn fetch_teams(&self) -> Result<Vec<Team>> {
        Ok(self.teams_at(now_ms()))
    }

    fn fetch_match_status(&self) -> Result<MatchStatus> {
        Ok(self.status_at(now_ms()))
    }

    fn run_admin(&self, cmd: &AdminCommand) -> Result<String> {
        self.admin_at(cmd, now_ms())
    }
}

impl World {
    fn add_team(&mut self, number: u32, now: Millis) {
        let (x, y) = SPAWN_POINTS[number as usize % SPAWN_POINTS.len()];
        self.teams.insert(
            number,
            Team {
                number,
                money: 0.0,
                karma: 100.0,
                current_fare: None,
                position: Point::new(x, y),
                last_pos_update: now,
                last_status: now,
            },
        );
    }

    fn step(&mut self, now: Millis) {
        if now - self.last_step < STEP_MS {
            return;
        }
        self.last_step = now;

        self.move_teams(now);
        self.claim_fares(now);
        self.progress_fares();
        self.fill_fares(now);
    }

    fn move_teams(&mut self, now: Millis) {
        for team in self.teams.values_mut() {
            // Every fourth team drops off the positioning system.
            if team.number % 4 != 0 {
                let dx = self.rng.gen_range(-0.05..0.05);
                let dy = self.rng.gen_range(-0.05..0.05);
                team.position.x = (team.position.x + dx).clamp(0.0, 6.0);
                team.position.y = (team.position.y + dy).clamp(0.0, 5.0);
                team.last_pos_update = now;
            }
            if self.rng.gen_bool(0.7) {
                team.last_status = now;
            }
        }
    }

    fn claim_fares(&mut self, now: Millis) {
        let idle: Vec<u32> = self
            .teams
            .values()
            .filter(|t| t.current_fare.is_none())
            .map(|t| t.number)
            .collect();
        if idle.is_empty() {
            return;
        }
        for fare in &mut self.fares {
            if fare.claimed || fare_partition(fare, now) != FarePartition::Active {
                continue;
            }
            if !self.rng.gen_bool(0.05) {
                continue;
            }
            let number = idle[self.rng.gen_range(0..idle.len())];
            let Some(team) = self.teams.get_mut(&number) else {
                continue;
            };
            if team.current_fare.is_some() {
                continue;
            }
            team.current_fare = Some(fare.id.to_string());
            fare.claimed = true;
            fare.team = Some(number);
        }
    }

    fn progress_fares(&mut self) {
        for fare in &mut self.fares {
            if !fare.claimed || fare.paid || !self.rng.gen_bool(0.1) {
                continue;
            }
            if !fare.in_position {
                fare.in_position = true;
            } else if !fare.picked_up {
                fare.picked_up = true;
            } else if !fare.completed {
                fare.completed = true;
            } else {
                fare.paid = true;
                if let Some(team) = fare.team.and_then(|n| self.teams.get_mut(&n)) {
                    team.money += fare.pay;
                    team.karma = (team.karma + fare.reputation).min(100.0);
                    team.current_fare = None;
                }
            }
        }
    }

    fn fill_fares(&mut self, now: Millis) {
        let mut active = self
            .fares
            .iter()
            .filter(|f| fare_partition(f, now) == FarePartition::Active)
            .count();
        while active < TARGET_FARES {
            let Some(fare) = self.generate_fare(now) else {
                break;
            };
            self.fares.push(fare);
            active += 1;
        }
    }

    fn generate_fare(&mut self, now: Millis) -> Option<Fare> {
        let active: Vec<&Fare> = self
            .fares
            .iter()
            .filter(|f| fare_partition(f, now) == FarePartition::Active)
            .collect();
        let in_use: Vec<Point> = active.iter().flat_map(|f| [f.src, f.dest]).collect();

        let mut pair = None;
        for _ in 0..10 {
            let (sx, sy) = SPAWN_POINTS[self.rng.gen_range(0..SPAWN_POINTS.len())];
            let (dx, dy) = SPAWN_POINTS[self.rng.gen_range(0..SPAWN_POINTS.len())];
            let (src, dest) = (Point::new(sx, sy), Point::new(dx, dy));
            if src == dest
                || src.dist(&dest) < DIST_MIN
                || in_use.contains(&src)
                || in_use.contains(&dest)
            {
                continue;
            }
            pair = Some((src, dest));
            break;
        }
        let (src, dest) = pair?;

        let total = active.len().max(1) as f64;
        let share = |kind: FareModifier| {
            let count = active.iter().filter(|f| f.modifiers == kind).count() as f64;
            (count / total).max(0.01)
        };
        let weight_sub = (TARGET_SUBSIDIZED / share(FareModifier::Subsidized)).clamp(0.25, 10.0);
        let weight_senior = (TARGET_SENIOR / share(FareModifier::Senior)).clamp(0.25, 10.0);
        let target_normal = 1.0 - TARGET_SUBSIDIZED - TARGET_SENIOR;
        let weight_normal = (target_normal / share(FareModifier::None)).clamp(0.25, 10.0);
        let roll = self
            .rng
            .gen_range(0.0..weight_normal + weight_sub + weight_senior);
        let modifiers = if roll < weight_sub {
            FareModifier::Subsidized
        } else if roll < weight_sub + weight_senior {
            FareModifier::Senior
        } else {
            FareModifier::None
        };

        let dist = src.dist(&dest);
        let (rate, reputation) = match modifiers {
            FareModifier::Subsidized => (DIST_FARE_SUBSIDIZED, REPUTATION_SUBSIDIZED),
            FareModifier::Senior => (DIST_FARE_NORMAL, REPUTATION_SUBSIDIZED),
            FareModifier::None => (DIST_FARE_NORMAL, REPUTATION_NORMAL),
        };

        let id = self.next_fare_id;
        self.next_fare_id += 1;
        Some(Fare {
            id,
            src,
            dest,
            pay: BASE_FARE + dist * rate,
            reputation,
            modifiers,
            claimed: false,
            team: None,
            expiry: now + self.rng.gen_range(30_000..90_000),
            in_position: false,
            picked_up: false,
            completed: false,
            paid: false,
            active: None,
        })
    }
}
