use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::config::PollIntervals;
use crate::model::AdminCommand;
use crate::state::Update;
use crate::vpfs_api::VpfsSource;

pub const UPDATE_QUEUE_DEPTH: usize = 256;
/// Outstanding fetches allowed per stream before ticks are skipped.
pub const MAX_IN_FLIGHT: usize = 4;

pub struct Poller {
    stop: Arc<AtomicBool>,
    timers: Vec<JoinHandle<()>>,
}

impl Poller {
    pub fn is_running(&self) -> bool {
        !self.stop.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn shutdown(mut self) {
        self.stop();
        for timer in std::mem::take(&mut self.timers) {
            let _ = timer.join();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

pub fn spawn_poller(
    source: Arc<dyn VpfsSource>,
    intervals: PollIntervals,
    tx: SyncSender<Update>,
) -> Result<Poller> {
    let stop = Arc::new(AtomicBool::new(false));
    let mut timers = Vec::new();

    let fares_source = Arc::clone(&source);
    timers.push(spawn_stream(
        "fares",
        intervals.fares,
        Arc::clone(&stop),
        tx.clone(),
        move || fare_tick(fares_source.as_ref()),
    )?);

    // Same cadence as fares, separate workers so a hung fare fetch leaves the
    // status line alone.
    let status_source = Arc::clone(&source);
    timers.push(spawn_stream(
        "match",
        intervals.fares,
        Arc::clone(&stop),
        tx.clone(),
        move || status_tick(status_source.as_ref()),
    )?);

    let teams_source = Arc::clone(&source);
    timers.push(spawn_stream(
        "teams",
        intervals.teams,
        Arc::clone(&stop),
        tx.clone(),
        move || team_tick(teams_source.as_ref()),
    )?);

    let mode_source = source;
    timers.push(spawn_stream(
        "mode",
        intervals.mode,
        Arc::clone(&stop),
        tx,
        move || mode_tick(mode_source.as_ref()),
    )?);

    Ok(Poller { stop, timers })
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn spawn_stream<F>(
    name: &'static str,
    interval: Duration,
    stop: Arc<AtomicBool>,
    tx: SyncSender<Update>,
    tick: F,
) -> Result<JoinHandle<()>>
where
    F: Fn() -> Vec<Update> + Send + Sync + 'static,
{
    let tick = Arc::new(tick);
    thread::Builder::new()
        .name(format!("poll-{name}"))
        .spawn(move || {
            let in_flight = Arc::new(AtomicUsize::new(0));
            let mut saturated = false;
            let mut next = Instant::now();
            while !stop.load(Ordering::Relaxed) {
                if in_flight.load(Ordering::SeqCst) >= MAX_IN_FLIGHT {
                    if !saturated {
                        saturated = true;
                        let _ = tx.try_send(Update::Log(format!(
                            "[WARN] {name} poll skipping ticks: {MAX_IN_FLIGHT} requests pending"
                        )));
                    }
                } else {
                    saturated = false;
                    in_flight.fetch_add(1, Ordering::SeqCst);
                    let guard = InFlight(Arc::clone(&in_flight));
                    let tick = Arc::clone(&tick);
                    let worker_tx = tx.clone();
                    let worker_stop = Arc::clone(&stop);
                    let spawned = thread::Builder::new()
                        .name(format!("fetch-{name}"))
                        .spawn(move || {
                            let _guard = guard;
                            for update in tick() {
                                if worker_tx.send(update).is_err() {
                                    // Consumer is gone; wind every stream down.
                                    worker_stop.store(true, Ordering::Relaxed);
                                    return;
                                }
                            }
                        });
                    // A failed spawn drops the closure, which releases the slot.
                    if let Err(err) = spawned {
                        let _ = tx.try_send(Update::Log(format!(
                            "[WARN] {name} poll worker failed to start: {err}"
                        )));
                    }
                }

                next += interval;
                let now = Instant::now();
                if next > now {
                    thread::sleep(next - now);
                } else {
                    // Fell behind (suspended host); resume from now instead of bursting.
                    next = now;
                }
            }
        })
        .with_context(|| format!("failed to spawn {name} poll timer"))
}

pub fn fare_tick(source: &dyn VpfsSource) -> Vec<Update> {
    match source.fetch_fares() {
        Ok(fares) => vec![Update::Fares(fares)],
        Err(err) => vec![Update::Log(format!("[WARN] Fare poll failed: {err:#}"))],
    }
}

pub fn status_tick(source: &dyn VpfsSource) -> Vec<Update> {
    match source.fetch_match_status() {
        Ok(status) => vec![Update::MatchStatus(status)],
        Err(err) => vec![Update::Log(format!("[WARN] Match poll failed: {err:#}"))],
    }
}

pub fn team_tick(source: &dyn VpfsSource) -> Vec<Update> {
    match source.fetch_teams() {
        Ok(teams) => vec![Update::Teams(teams)],
        Err(err) => vec![Update::Log(format!("[WARN] Team poll failed: {err:#}"))],
    }
}

// Fails closed: any probe error hides the operator controls.
pub fn mode_tick(source: &dyn VpfsSource) -> Vec<Update> {
    match source.fetch_match_status() {
        Ok(status) => vec![Update::Mode(Some(status.mode))],
        Err(err) => vec![
            Update::Log(format!("[WARN] Mode probe failed: {err:#}")),
            Update::Mode(None),
        ],
    }
}

pub fn spawn_admin_worker(
    source: Arc<dyn VpfsSource>,
    cmd_rx: Receiver<AdminCommand>,
    tx: SyncSender<Update>,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("admin".to_string())
        .spawn(move || {
            while let Ok(cmd) = cmd_rx.recv() {
                for update in run_admin_command(source.as_ref(), &cmd) {
                    if tx.send(update).is_err() {
                        return;
                    }
                }
            }
        })
        .context("failed to spawn admin worker")
}

pub fn run_admin_command(source: &dyn VpfsSource, cmd: &AdminCommand) -> Vec<Update> {
    match source.run_admin(cmd) {
        Ok(reply) => {
            let mut updates = vec![Update::Log(if reply.is_empty() {
                format!("[INFO] {}: ok", cmd.label())
            } else {
                format!("[INFO] {}: {reply}", cmd.label())
            })];
            if cmd.refreshes_teams() {
                updates.extend(team_tick(source));
            }
            updates
        }
        Err(err) => vec![Update::Notify(format!("{} failed: {err:#}", cmd.label()))],
    }
}
