use crate::model::{Fare, FareModifier, MatchStatus, Millis, Team};

pub const STALE_SENTINEL_MS: Millis = 10_000_000;
pub const STALE_MILLIS_TIER_MS: Millis = 10_000;
pub const STALE_WARNING_MS: Millis = 5_000;

pub const POSITION_SENTINEL: &str = "Never";
pub const STATUS_SENTINEL: &str = "Not Connected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FarePartition {
    Active,
    PastClaimed,
    PastUnclaimed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Normal,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staleness {
    pub label: String,
    pub tone: Tone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FareCard {
    pub id: u64,
    pub route: String,
    pub pay: String,
    pub reputation: String,
    pub modifier: Option<&'static str>,
    pub claim: Option<String>,
    pub countdown: Option<String>,
    pub badges: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamRow {
    pub number: u32,
    pub money: String,
    pub reputation: String,
    pub current_fare: String,
    pub position: String,
    pub position_age: Staleness,
    pub status_age: Staleness,
}

pub fn fare_partition(fare: &Fare, now: Millis) -> FarePartition {
    let active = fare
        .active
        .unwrap_or_else(|| now <= fare.expiry && !fare.completed && !fare.paid);
    if active {
        FarePartition::Active
    } else if fare.claimed {
        FarePartition::PastClaimed
    } else {
        FarePartition::PastUnclaimed
    }
}

pub fn modifier_label(modifier: FareModifier) -> &'static str {
    match modifier {
        FareModifier::Subsidized => "Subsidized",
        FareModifier::Senior => "Senior",
        FareModifier::None => "Normal",
    }
}

pub fn claim_and_countdown(fare: &Fare, now: Millis) -> (Option<String>, Option<String>) {
    if fare.claimed {
        let team = fare
            .team
            .map(|t| t.to_string())
            .unwrap_or_else(|| "?".to_string());
        return (Some(format!("Team {team}")), None);
    }
    let remaining = fare.expiry - now;
    if remaining < 0 {
        (None, Some("Expired".to_string()))
    } else {
        (None, Some(format!("Expires in {}", remaining / 1000)))
    }
}

pub fn progress_badges(fare: &Fare) -> Vec<&'static str> {
    [
        (fare.in_position, "In position"),
        (fare.picked_up, "Picked up"),
        (fare.completed, "Completed"),
        (fare.paid, "Paid"),
    ]
    .into_iter()
    .filter_map(|(shown, label)| shown.then_some(label))
    .collect()
}

pub fn fare_card(fare: &Fare, now: Millis) -> FareCard {
    let (claim, countdown) = claim_and_countdown(fare, now);
    FareCard {
        id: fare.id,
        route: format!(
            "({:.2}, {:.2}) -> ({:.2}, {:.2})",
            fare.src.x, fare.src.y, fare.dest.x, fare.dest.y
        ),
        pay: format!("${:.2}", fare.pay),
        reputation: format!("{:.0}%", fare.reputation),
        modifier: (fare.modifiers != FareModifier::None).then(|| modifier_label(fare.modifiers)),
        claim,
        countdown,
        badges: progress_badges(fare),
    }
}

// Past the sentinel threshold the age means "never reported", so the tone stays normal.
pub fn staleness(age: Millis, sentinel: &str) -> Staleness {
    let age = age.max(0);
    if age > STALE_SENTINEL_MS {
        return Staleness {
            label: sentinel.to_string(),
            tone: Tone::Normal,
        };
    }
    let label = if age > STALE_MILLIS_TIER_MS {
        format!("{}s", age / 1000)
    } else {
        format!("{age}ms")
    };
    let tone = if age > STALE_WARNING_MS {
        Tone::Warning
    } else {
        Tone::Normal
    };
    Staleness { label, tone }
}

pub fn team_row(team: &Team, now: Millis) -> TeamRow {
    TeamRow {
        number: team.number,
        money: format!("${:.2}", team.money),
        reputation: format!("{:.0}%", team.karma),
        current_fare: team
            .current_fare
            .clone()
            .unwrap_or_else(|| "None".to_string()),
        position: format!("({:.2}, {:.2})", team.position.x, team.position.y),
        position_age: staleness(now - team.last_pos_update, POSITION_SENTINEL),
        status_age: staleness(now - team.last_status, STATUS_SENTINEL),
    }
}

pub fn match_status_line(status: &MatchStatus) -> String {
    if !status.match_start {
        "Ready".to_string()
    } else if status.time_remaining < 0 {
        "Finished".to_string()
    } else {
        format!("{}s", status.time_remaining / 1000)
    }
}

// Only present when the status request was made with a team credential.
pub fn participation_label(status: &MatchStatus) -> Option<String> {
    match (status.team.filter(|t| *t > 0), status.in_match) {
        (Some(team), Some(true)) => Some(format!("Team {team} in match")),
        (Some(team), Some(false)) => Some(format!("Team {team} waiting")),
        (Some(team), None) => Some(format!("Team {team}")),
        (None, Some(true)) => Some("In match".to_string()),
        (None, _) => None,
    }
}

pub fn is_privileged_mode(mode: &str, privileged: &str) -> bool {
    mode.trim().eq_ignore_ascii_case(privileged.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;

    const NOW: Millis = 1_700_000_000_000;

    fn fare(expiry: Millis) -> Fare {
        Fare {
            id: 1,
            src: Point::new(0.0, 0.0),
            dest: Point::new(1.0, 1.0),
            pay: 24.14,
            reputation: 5.0,
            modifiers: FareModifier::None,
            claimed: false,
            team: None,
            expiry,
            in_position: false,
            picked_up: false,
            completed: false,
            paid: false,
            active: None,
        }
    }

    #[test]
    fn expired_unclaimed_fare_is_past_unclaimed() {
        let f = fare(NOW - 1);
        assert_eq!(fare_partition(&f, NOW), FarePartition::PastUnclaimed);
    }

    #[test]
    fn completed_or_paid_fare_leaves_active() {
        let mut f = fare(NOW + 60_000);
        assert_eq!(fare_partition(&f, NOW), FarePartition::Active);
        f.completed = true;
        f.claimed = true;
        assert_eq!(fare_partition(&f, NOW), FarePartition::PastClaimed);
        f.completed = false;
        f.paid = true;
        assert_eq!(fare_partition(&f, NOW), FarePartition::PastClaimed);
    }

    #[test]
    fn explicit_active_flag_overrides_expiry() {
        let mut f = fare(NOW - 60_000);
        f.active = Some(true);
        assert_eq!(fare_partition(&f, NOW), FarePartition::Active);
        f.expiry = NOW + 60_000;
        f.active = Some(false);
        assert_eq!(fare_partition(&f, NOW), FarePartition::PastUnclaimed);
    }

    #[test]
    fn claimed_fare_hides_countdown_regardless_of_expiry() {
        for expiry in [NOW - 100_000, NOW, NOW + 100_000] {
            let mut f = fare(expiry);
            f.claimed = true;
            f.team = Some(7);
            let card = fare_card(&f, NOW);
            assert_eq!(card.claim.as_deref(), Some("Team 7"));
            assert!(card.countdown.is_none());
        }
    }

    #[test]
    fn countdown_uses_whole_seconds_and_expired_label() {
        let card = fare_card(&fare(NOW + 30_000), NOW);
        assert_eq!(card.countdown.as_deref(), Some("Expires in 30"));
        assert!(card.claim.is_none());

        let card = fare_card(&fare(NOW + 29_999), NOW);
        assert_eq!(card.countdown.as_deref(), Some("Expires in 29"));

        let card = fare_card(&fare(NOW - 1), NOW);
        assert_eq!(card.countdown.as_deref(), Some("Expired"));
    }

    #[test]
    fn modifier_badge_hidden_for_plain_fares() {
        let mut f = fare(NOW);
        assert!(fare_card(&f, NOW).modifier.is_none());
        f.modifiers = FareModifier::Senior;
        assert_eq!(fare_card(&f, NOW).modifier, Some("Senior"));
    }

    #[test]
    fn badges_follow_flags() {
        let mut f = fare(NOW);
        f.picked_up = true;
        f.paid = true;
        assert_eq!(progress_badges(&f), vec!["Picked up", "Paid"]);
    }

    #[test]
    fn staleness_tier_boundaries() {
        assert_eq!(staleness(10_000, POSITION_SENTINEL).label, "10000ms");
        assert_eq!(staleness(10_001, POSITION_SENTINEL).label, "10s");
        assert_eq!(staleness(10_000_000, POSITION_SENTINEL).label, "10000s");
        assert_eq!(staleness(10_000_001, POSITION_SENTINEL).label, "Never");
        assert_eq!(staleness(10_000_001, STATUS_SENTINEL).label, "Not Connected");
    }

    #[test]
    fn staleness_warning_boundary() {
        assert_eq!(staleness(5_000, STATUS_SENTINEL).tone, Tone::Normal);
        assert_eq!(staleness(5_001, STATUS_SENTINEL).tone, Tone::Warning);
        assert_eq!(staleness(20_000, STATUS_SENTINEL).tone, Tone::Warning);
        assert_eq!(staleness(10_000_001, STATUS_SENTINEL).tone, Tone::Normal);
    }

    #[test]
    fn status_line_states() {
        let mut status = MatchStatus {
            mode: "lab".to_string(),
            match_start: false,
            match_index: 2,
            time_remaining: 90_000,
            in_match: None,
            team: None,
        };
        assert_eq!(match_status_line(&status), "Ready");
        status.match_start = true;
        assert_eq!(match_status_line(&status), "90s");
        status.time_remaining = -1;
        assert_eq!(match_status_line(&status), "Finished");
    }

    #[test]
    fn participation_follows_team_credential() {
        let mut status = MatchStatus {
            mode: "match".to_string(),
            match_start: true,
            match_index: 1,
            time_remaining: 0,
            in_match: None,
            team: Some(-1),
        };
        assert_eq!(participation_label(&status), None);
        status.in_match = Some(true);
        assert_eq!(participation_label(&status).as_deref(), Some("In match"));
        status.team = Some(7);
        assert_eq!(participation_label(&status).as_deref(), Some("Team 7 in match"));
        status.in_match = Some(false);
        assert_eq!(participation_label(&status).as_deref(), Some("Team 7 waiting"));
    }
}
