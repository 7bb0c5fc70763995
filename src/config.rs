use std::env;
use std::time::Duration;

use crate::state::DEFAULT_PRIVILEGED_MODE;

pub const DEFAULT_SERVER: &str = "http://localhost:5000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Http,
    Fake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub fares: Duration,
    pub teams: Duration,
    pub mode: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            fares: Duration::from_millis(1000),
            teams: Duration::from_millis(1000),
            mode: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub server: String,
    pub auth: Option<String>,
    pub source: SourceKind,
    pub intervals: PollIntervals,
    pub privileged_mode: String,
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        let server = env::var("VPFS_SERVER")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string());
        let auth = env::var("VPFS_AUTH")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let source = match env::var("DASHBOARD_SOURCE")
            .unwrap_or_else(|_| "http".to_string())
            .trim()
            .to_lowercase()
            .as_str()
        {
            "fake" | "demo" => SourceKind::Fake,
            _ => SourceKind::Http,
        };
        let privileged_mode = env::var("PRIVILEGED_MODE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PRIVILEGED_MODE.to_string());

        Self {
            server,
            auth,
            source,
            intervals: PollIntervals {
                fares: env_millis("FARE_POLL_MS", 1000, 100),
                teams: env_millis("TEAM_POLL_MS", 1000, 100),
                mode: env_millis("MODE_POLL_MS", 5000, 500),
            },
            privileged_mode,
        }
    }
}

fn env_millis(name: &str, default: u64, floor: u64) -> Duration {
    Duration::from_millis(
        env::var(name)
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(default)
            .max(floor),
    )
}
