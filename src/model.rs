use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

pub fn now_ms() -> Millis {
    Utc::now().timestamp_millis()
}

pub fn secs_to_ms(secs: f64) -> Millis {
    if !secs.is_finite() {
        return 0;
    }
    (secs * 1000.0).round() as Millis
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dist(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FareModifier {
    #[default]
    None,
    Subsidized,
    Senior,
}

impl FareModifier {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => FareModifier::Subsidized,
            2 => FareModifier::Senior,
            _ => FareModifier::None,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "subsidized" | "subsidised" => FareModifier::Subsidized,
            "senior" => FareModifier::Senior,
            other => other
                .parse::<i64>()
                .map(FareModifier::from_code)
                .unwrap_or(FareModifier::None),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fare {
    pub id: u64,
    pub src: Point,
    pub dest: Point,
    pub pay: f64,
    pub reputation: f64,
    pub modifiers: FareModifier,
    pub claimed: bool,
    /// Claiming team; only meaningful while `claimed` is set.
    pub team: Option<u32>,
    pub expiry: Millis,
    pub in_position: bool,
    pub picked_up: bool,
    pub completed: bool,
    pub paid: bool,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub number: u32,
    pub money: f64,
    pub karma: f64,
    pub current_fare: Option<String>,
    pub position: Point,
    pub last_pos_update: Millis,
    pub last_status: Millis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchStatus {
    pub mode: String,
    pub match_start: bool,
    pub match_index: i64,
    pub time_remaining: Millis,
    pub in_match: Option<bool>,
    pub team: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    AddTeam(u32),
    RemoveTeam(u32),
    ConfigMatch { number: u32, duration: u32 },
    StartMatch,
}

impl AdminCommand {
    pub fn label(&self) -> String {
        match self {
            AdminCommand::AddTeam(team) => format!("Add team {team}"),
            AdminCommand::RemoveTeam(team) => format!("Remove team {team}"),
            AdminCommand::ConfigMatch { number, duration } => {
                format!("Configure match {number} ({duration}s)")
            }
            AdminCommand::StartMatch => "Start match".to_string(),
        }
    }

    pub fn refreshes_teams(&self) -> bool {
        matches!(self, AdminCommand::AddTeam(_) | AdminCommand::RemoveTeam(_))
    }
}
