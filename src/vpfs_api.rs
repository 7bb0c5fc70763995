use anyhow::{Context, Result, anyhow};
use reqwest::blocking::RequestBuilder;
use serde::Serialize;
use serde_json::Value;

use crate::http_client::http_client;
use crate::model::{AdminCommand, Fare, FareModifier, MatchStatus, Point, Team, secs_to_ms};

const ACTIVE_LIST_KEYS: &[&str] = &["active", "activeFares", "current"];
const PAST_LIST_KEYS: &[&str] = &["past", "pastFares", "expired", "inactive"];

pub trait VpfsSource: Send + Sync {
    fn fetch_fares(&self) -> Result<Vec<Fare>>;
    fn fetch_teams(&self) -> Result<Vec<Team>>;
    fn fetch_match_status(&self) -> Result<MatchStatus>;
    fn run_admin(&self, cmd: &AdminCommand) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    base: String,
    auth: Option<String>,
}

impl HttpSource {
    pub fn new(base: &str, auth: Option<String>) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            auth,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }
}

#[derive(Debug, Serialize)]
struct ConfigMatchBody {
    number: u32,
    duration: u32,
}

impl VpfsSource for HttpSource {
    fn fetch_fares(&self) -> Result<Vec<Fare>> {
        let client = http_client()?;
        let body = fetch_text(client.get(self.url("/dashboard/fares")))?;
        parse_fare_snapshot_json(&body)
    }

    fn fetch_teams(&self) -> Result<Vec<Team>> {
        let client = http_client()?;
        let body = fetch_text(client.get(self.url("/dashboard/teams")))?;
        parse_team_snapshot_json(&body)
    }

    fn fetch_match_status(&self) -> Result<MatchStatus> {
        let client = http_client()?;
        let mut req = client.get(self.url("/match"));
        if let Some(auth) = self.auth.as_deref() {
            req = req.query(&[("auth", auth)]);
        }
        let body = fetch_text(req)?;
        parse_match_status_json(&body)
    }

    fn run_admin(&self, cmd: &AdminCommand) -> Result<String> {
        let client = http_client()?;
        let req = match *cmd {
            AdminCommand::AddTeam(team) => client.get(self.url(&format!("/Lab/AddTeam/{team}"))),
            AdminCommand::RemoveTeam(team) => {
                client.get(self.url(&format!("/Lab/RemoveTeam/{team}")))
            }
            AdminCommand::ConfigMatch { number, duration } => client
                .post(self.url("/Lab/ConfigMatch"))
                .json(&ConfigMatchBody { number, duration }),
            AdminCommand::StartMatch => client.post(self.url("/Lab/StartMatch")),
        };
        let resp = req.send().context("request failed")?;
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        let message = body.trim();
        if !status.is_success() {
            if message.is_empty() {
                return Err(anyhow!("HTTP {}", status.as_u16()));
            }
            return Err(anyhow!("{message}"));
        }
        Ok(message.to_string())
    }
}

fn fetch_text(req: RequestBuilder) -> Result<String> {
    let resp = req.send().context("request failed")?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {}: {}", status, body.trim()));
    }
    Ok(body)
}

/// Flat array, or an object with an active list and a past list (active first).
pub fn parse_fare_snapshot_json(raw: &str) -> Result<Vec<Fare>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid fare snapshot json")?;
    normalize_fare_snapshot(&root)
}

pub fn normalize_fare_snapshot(root: &Value) -> Result<Vec<Fare>> {
    match root {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items.iter().filter_map(|v| parse_fare(v, None)).collect()),
        Value::Object(_) => {
            let active = pick_array(root, ACTIVE_LIST_KEYS)
                .iter()
                .filter_map(|v| parse_fare(v, Some(true)));
            let past = pick_array(root, PAST_LIST_KEYS)
                .iter()
                .filter_map(|v| parse_fare(v, Some(false)));
            Ok(active.chain(past).collect())
        }
        other => Err(anyhow!("unexpected fare snapshot shape: {}", value_kind(other))),
    }
}

pub fn parse_team_snapshot_json(raw: &str) -> Result<Vec<Team>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid team snapshot json")?;
    let Some(items) = root.as_array() else {
        return Err(anyhow!("unexpected team snapshot shape: {}", value_kind(&root)));
    };
    Ok(items.iter().filter_map(parse_team).collect())
}

pub fn parse_match_status_json(raw: &str) -> Result<MatchStatus> {
    let root: Value = serde_json::from_str(raw.trim()).context("invalid match status json")?;
    if !root.is_object() {
        return Err(anyhow!("unexpected match status shape: {}", value_kind(&root)));
    }
    Ok(MatchStatus {
        mode: pick_string(&root, &["mode"]).unwrap_or_default(),
        match_start: pick_bool(&root, &["matchStart", "match_start"]).unwrap_or(false),
        match_index: pick_f64(&root, &["match", "matchIndex", "matchNum"]).unwrap_or(0.0) as i64,
        time_remaining: secs_to_ms(
            pick_f64(&root, &["timeRemain", "timeRemaining"]).unwrap_or(0.0),
        ),
        in_match: pick_bool(&root, &["inMatch"]),
        team: pick_f64(&root, &["team"]).map(|t| t as i64),
    })
}

fn parse_fare(value: &Value, list_active: Option<bool>) -> Option<Fare> {
    let id = pick_u64(value, &["id", "idx"])?;
    let modifiers = match pick_value(value, &["modifiers", "modifier", "type"]) {
        Some(Value::Number(n)) => FareModifier::from_code(n.as_i64().unwrap_or(0)),
        Some(Value::String(s)) => FareModifier::from_name(s),
        _ => FareModifier::None,
    };
    let claimed = pick_bool(value, &["claimed"]).unwrap_or(false);
    Some(Fare {
        id,
        src: pick_point(value, &["src", "source"]),
        dest: pick_point(value, &["dest", "destination"]),
        pay: pick_f64(value, &["pay"]).unwrap_or(0.0),
        reputation: pick_f64(value, &["reputation", "rep"]).unwrap_or(0.0),
        modifiers,
        claimed,
        team: if claimed {
            pick_u64(value, &["team"]).and_then(team_number)
        } else {
            None
        },
        expiry: secs_to_ms(pick_f64(value, &["expiry"]).unwrap_or(0.0)),
        in_position: pick_bool(value, &["inPosition", "in_position"]).unwrap_or(false),
        picked_up: pick_bool(value, &["pickedUp", "picked_up"]).unwrap_or(false),
        completed: pick_bool(value, &["completed"]).unwrap_or(false),
        paid: pick_bool(value, &["paid"]).unwrap_or(false),
        active: pick_bool(value, &["active", "isActive"]).or(list_active),
    })
}

fn parse_team(value: &Value) -> Option<Team> {
    let number = pick_u64(value, &["number", "team"]).and_then(team_number)?;
    Some(Team {
        number,
        money: pick_f64(value, &["money"]).unwrap_or(0.0),
        karma: pick_f64(value, &["karma", "rep", "reputation"]).unwrap_or(0.0),
        current_fare: pick_string(value, &["currentFare", "current_fare"]),
        position: pick_point(value, &["position", "pos"]),
        last_pos_update: secs_to_ms(
            pick_f64(value, &["lastPosUpdate", "last_pos_update"]).unwrap_or(0.0),
        ),
        last_status: secs_to_ms(pick_f64(value, &["lastStatus", "last_status"]).unwrap_or(0.0)),
    })
}

// Team numbers are positive and fit in u32; anything else is not a team.
fn team_number(raw: u64) -> Option<u32> {
    u32::try_from(raw).ok().filter(|n| *n > 0)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn pick_value<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find(|v| !v.is_null())
}

fn pick_array<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    for key in keys {
        if let Some(items) = value.get(*key).and_then(|v| v.as_array()) {
            return items;
        }
    }
    &[]
}

fn pick_string(value: &Value, keys: &[&str]) -> Option<String> {
    match pick_value(value, keys)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn pick_f64(value: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        if let Some(v) = value.get(*key) {
            if let Some(num) = v.as_f64() {
                return Some(num);
            }
            if let Some(s) = v.as_str()
                && let Ok(num) = s.trim().parse::<f64>()
            {
                return Some(num);
            }
        }
    }
    None
}

fn pick_u64(value: &Value, keys: &[&str]) -> Option<u64> {
    for key in keys {
        if let Some(v) = value.get(*key) {
            if let Some(num) = v.as_u64() {
                return Some(num);
            }
            if let Some(s) = v.as_str()
                && let Ok(num) = s.trim().parse::<u64>()
            {
                return Some(num);
            }
        }
    }
    None
}

fn pick_bool(value: &Value, keys: &[&str]) -> Option<bool> {
    match pick_value(value, keys)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn pick_point(value: &Value, keys: &[&str]) -> Point {
    let Some(point) = pick_value(value, keys) else {
        return Point::default();
    };
    match point {
        Value::Array(xy) => Point::new(
            xy.first().and_then(|v| v.as_f64()).unwrap_or(0.0),
            xy.get(1).and_then(|v| v.as_f64()).unwrap_or(0.0),
        ),
        _ => Point::new(
            pick_f64(point, &["x"]).unwrap_or(0.0),
            pick_f64(point, &["y"]).unwrap_or(0.0),
        ),
    }
}
