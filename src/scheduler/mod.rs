// Polling scheduler: every tick, work out which containers should be running
// and start/stop them through the runtime, at most once per action per day.

mod window;

pub use window::{DayFlags, Decision, decide, is_timer_active_now};

use crate::models::{DataDocument, TargetType};
use crate::runtime::Runtime;
use crate::store::SnapshotSource;
use crate::task::TaskHandle;
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::{Duration, interval};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub poll_interval_secs: u64,
}

/// What one tick did; used for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub started: Vec<String>,
    pub stopped: Vec<String>,
    pub failed: Vec<String>,
}

/// Desired running state for every known container at wall-clock time `now`.
pub fn desired_running(doc: &DataDocument, now: NaiveDateTime) -> HashMap<String, bool> {
    let mut desired: HashMap<String, bool> = doc
        .containers
        .iter()
        .map(|c| (c.name.clone(), false))
        .collect();

    for schedule in &doc.schedules {
        let members: Vec<&str> = match schedule.target_type {
            TargetType::Container => doc
                .container(&schedule.target)
                .map(|c| vec![c.name.as_str()])
                .unwrap_or_default(),
            TargetType::Group => match doc.group(&schedule.target) {
                Some(g) if g.is_active() => g.container.iter().map(String::as_str).collect(),
                _ => Vec::new(),
            },
        };
        if members.is_empty() {
            continue;
        }
        let in_window = schedule
            .timers
            .iter()
            .any(|t| t.is_active() && is_timer_active_now(t, now));
        if !in_window {
            continue;
        }
        for member in members {
            if doc.container(member).is_some_and(|c| c.is_active()) {
                desired.insert(member.to_string(), true);
            }
        }
    }
    desired
}

pub struct PollingScheduler {
    store: Arc<dyn SnapshotSource>,
    runtime: Arc<dyn Runtime>,
    timezone: Tz,
    flags: Mutex<HashMap<String, DayFlags>>,
}

impl PollingScheduler {
    pub fn new(store: Arc<dyn SnapshotSource>, runtime: Arc<dyn Runtime>, timezone: Tz) -> Self {
        Self {
            store,
            runtime,
            timezone,
            flags: Mutex::new(HashMap::new()),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Current wall-clock time in the scheduler's timezone.
    pub fn now(&self) -> NaiveDateTime {
        self.local_time(Utc::now())
    }

    /// `at` as wall-clock time in the scheduler's timezone.
    pub fn local_time(&self, at: DateTime<Utc>) -> NaiveDateTime {
        at.with_timezone(&self.timezone).naive_local()
    }

    pub fn day_flags(&self, name: &str) -> Option<DayFlags> {
        self.with_flags(|flags| flags.get(name).cloned())
    }

    fn with_flags<R>(&self, f: impl FnOnce(&mut HashMap<String, DayFlags>) -> R) -> R {
        let mut guard = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// One evaluation pass at wall-clock time `now`.
    #[instrument(skip(self, token))]
    pub async fn tick_at(&self, now: NaiveDateTime, token: &CancellationToken) -> TickReport {
        let doc = self.store.snapshot();
        let desired = desired_running(&doc, now);
        let today = now.date().format("%Y-%m-%d").to_string();
        let mut report = TickReport::default();

        let live: HashSet<&str> = doc.containers.iter().map(|c| c.name.as_str()).collect();
        self.with_flags(|flags| flags.retain(|name, _| live.contains(name.as_str())));

        for container in doc.ordered_containers() {
            if token.is_cancelled() {
                tracing::debug!("tick cancelled");
                break;
            }
            let name = container.name.as_str();
            let should_run = desired.get(name).copied().unwrap_or(false);
            let flags = self.day_flags(name).unwrap_or_default();

            match decide(should_run, &flags, &today) {
                Decision::Nothing => {}
                Decision::EnsureStarted => {
                    let running = match self.runtime.is_running(name).await {
                        Ok(r) => r,
                        Err(e) => {
                            tracing::warn!(container = %name, error = %e, operation = "is_running", "runtime check failed");
                            report.failed.push(name.to_string());
                            continue;
                        }
                    };
                    if !running {
                        match self.runtime.start(name).await {
                            Ok(()) => {
                                tracing::info!(container = %name, "scheduled start");
                                report.started.push(name.to_string());
                            }
                            Err(e) => {
                                tracing::warn!(container = %name, error = %e, operation = "start", "scheduled start failed");
                                report.failed.push(name.to_string());
                            }
                        }
                    }
                    self.with_flags(|f| {
                        f.entry(name.to_string()).or_default().started_day = Some(today.clone());
                    });
                }
                Decision::EnsureStopped => {
                    let running = match self.runtime.is_running(name).await {
                        Ok(r) => r,
                        Err(e) => {
                            tracing::warn!(container = %name, error = %e, operation = "is_running", "runtime check failed");
                            report.failed.push(name.to_string());
                            continue;
                        }
                    };
                    if running {
                        match self.runtime.stop(name).await {
                            Ok(()) => {
                                tracing::info!(container = %name, "scheduled stop");
                                report.stopped.push(name.to_string());
                            }
                            Err(e) => {
                                tracing::warn!(container = %name, error = %e, operation = "stop", "scheduled stop failed");
                                report.failed.push(name.to_string());
                            }
                        }
                    }
                    self.with_flags(|f| {
                        f.entry(name.to_string()).or_default().stopped_day = Some(today.clone());
                    });
                }
            }
        }
        report
    }
}

pub fn spawn(
    scheduler: Arc<PollingScheduler>,
    config: SchedulerConfig,
    parent: &CancellationToken,
) -> TaskHandle {
    TaskHandle::spawn("scheduler", parent, move |token| async move {
        let mut tick = interval(Duration::from_secs(config.poll_interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tracing::info!(
            poll_interval_secs = config.poll_interval_secs,
            timezone = %scheduler.timezone(),
            "scheduler started"
        );
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tick.tick() => {
                    let report = scheduler.tick_at(scheduler.now(), &token).await;
                    if !report.started.is_empty() || !report.stopped.is_empty() || !report.failed.is_empty() {
                        tracing::debug!(
                            started = report.started.len(),
                            stopped = report.stopped.len(),
                            failed = report.failed.len(),
                            "scheduler tick"
                        );
                    }
                }
            }
        }
        tracing::debug!("Scheduler shutting down");
    })
}
