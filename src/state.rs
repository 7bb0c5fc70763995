use std::collections::VecDeque;

use anyhow::{Result, anyhow, bail};

use crate::classify::{is_privileged_mode, match_status_line};
use crate::model::{AdminCommand, Fare, MatchStatus, Millis, Team};
use crate::reconcile::{FareReconciler, PassStats, TeamReconciler};
use crate::render::{Container, NodeContent, NodeId, NodeTree};

pub const DEFAULT_PRIVILEGED_MODE: &str = "lab";
const MAX_LOGS: usize = 200;

#[derive(Debug, Clone)]
pub enum Update {
    Fares(Vec<Fare>),
    Teams(Vec<Team>),
    MatchStatus(MatchStatus),
    // `None` when the probe failed.
    Mode(Option<String>),
    Log(String),
    // Blocks key input until dismissed; updates keep applying.
    Notify(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    AddTeam,
    RemoveTeam,
    ConfigMatch,
}

impl PromptKind {
    pub fn title(&self) -> &'static str {
        match self {
            PromptKind::AddTeam => "Add team (number)",
            PromptKind::RemoveTeam => "Remove team (number)",
            PromptKind::ConfigMatch => "Configure match (number duration)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

#[derive(Debug)]
pub struct AppState {
    pub tree: NodeTree,
    pub fares: FareReconciler,
    pub teams: TeamReconciler,
    pub match_status: Option<MatchStatus>,
    pub status_line: String,
    pub privileged_mode: String,
    pub privileged_visible: bool,
    pub selected_team: Option<NodeId>,
    pub notifications: VecDeque<String>,
    pub prompt: Option<Prompt>,
    pub logs: VecDeque<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_privileged_mode(DEFAULT_PRIVILEGED_MODE)
    }

    pub fn with_privileged_mode(mode: &str) -> Self {
        Self {
            tree: NodeTree::new(),
            fares: FareReconciler::new(),
            teams: TeamReconciler::new(),
            match_status: None,
            status_line: "Connecting".to_string(),
            privileged_mode: mode.to_string(),
            privileged_visible: false,
            selected_team: None,
            notifications: VecDeque::new(),
            prompt: None,
            logs: VecDeque::new(),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn notification(&self) -> Option<&str> {
        self.notifications.front().map(|s| s.as_str())
    }

    pub fn dismiss_notification(&mut self) {
        self.notifications.pop_front();
    }

    pub fn select_next_team(&mut self) {
        self.step_selection(1);
    }

    pub fn select_prev_team(&mut self) {
        self.step_selection(-1);
    }

    fn step_selection(&mut self, step: isize) {
        let ids = self.tree.node_ids(Container::Teams);
        if ids.is_empty() {
            self.selected_team = None;
            return;
        }
        let next = match self
            .selected_team
            .and_then(|sel| ids.iter().position(|id| *id == sel))
        {
            Some(pos) => (pos as isize + step).clamp(0, ids.len() as isize - 1) as usize,
            None if step < 0 => ids.len() - 1,
            None => 0,
        };
        self.selected_team = Some(ids[next]);
    }

    pub fn selected_team_number(&self) -> Option<u32> {
        let node = self.tree.node(self.selected_team?)?;
        match &node.content {
            NodeContent::Team(row) => Some(row.number),
            NodeContent::Fare(_) => None,
        }
    }

    pub fn open_prompt(&mut self, kind: PromptKind) {
        if !self.privileged_visible {
            return;
        }
        self.prompt = Some(Prompt {
            kind,
            input: String::new(),
        });
    }

    fn log_pass(&mut self, what: &str, stats: PassStats) {
        if !stats.is_structural() {
            return;
        }
        self.push_log(format!(
            "[INFO] {what}: {} new, {} moved, {} removed",
            stats.created, stats.moved, stats.removed
        ));
    }
}

pub fn parse_prompt(kind: PromptKind, input: &str) -> Result<AdminCommand> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let number = |raw: &str| -> Result<u32> {
        raw.parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| anyhow!("expected a positive number, got {raw:?}"))
    };
    match (kind, parts.as_slice()) {
        (PromptKind::AddTeam, [team]) => Ok(AdminCommand::AddTeam(number(*team)?)),
        (PromptKind::RemoveTeam, [team]) => Ok(AdminCommand::RemoveTeam(number(*team)?)),
        (PromptKind::ConfigMatch, [match_number, duration]) => Ok(AdminCommand::ConfigMatch {
            number: number(*match_number)?,
            duration: number(*duration)?,
        }),
        (PromptKind::ConfigMatch, _) => bail!("expected \"<match number> <duration secs>\""),
        _ => bail!("expected a single team number"),
    }
}

pub fn apply_update(state: &mut AppState, update: Update, now: Millis) {
    match update {
        Update::Fares(fares) => {
            let stats = state.fares.apply(&mut state.tree, &fares, now);
            state.log_pass("Fares", stats);
        }
        Update::Teams(teams) => {
            let stats = state.teams.apply(&mut state.tree, &teams, now);
            if let Some(sel) = state.selected_team
                && !state.tree.contains(sel)
            {
                state.selected_team = None;
            }
            state.log_pass("Teams", stats);
        }
        Update::MatchStatus(status) => {
            state.status_line = match_status_line(&status);
            state.match_status = Some(status);
        }
        Update::Mode(mode) => {
            let visible = mode
                .as_deref()
                .is_some_and(|m| is_privileged_mode(m, &state.privileged_mode));
            if visible != state.privileged_visible {
                state.push_log(if visible {
                    "[INFO] Operator controls enabled"
                } else {
                    "[INFO] Operator controls hidden"
                });
            }
            state.privileged_visible = visible;
            if !visible {
                state.prompt = None;
            }
        }
        Update::Log(msg) => state.push_log(msg),
        Update::Notify(msg) => {
            state.push_log(format!("[WARN] {msg}"));
            state.notifications.push_back(msg);
        }
    }
}
