use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use punchclock_core::config::ScheduleConfig;
use punchclock_core::types::AttendanceAction;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::{
    error::{Result, SchedulerError},
    schedule::compute_next_run,
    types::{FiredTrigger, Trigger},
};

/// Drives the weekly triggers at ±1 s precision.
pub struct SchedulerEngine {
    triggers: Vec<Trigger>,
    tz: Tz,
    /// Fired triggers are forwarded here for dispatch.
    fired_tx: mpsc::Sender<FiredTrigger>,
}

impl SchedulerEngine {
    /// Create an engine and plan each trigger's first run after `now`.
    ///
    /// Runs whose time passed while the process was down are not replayed.
    pub fn new(
        triggers: Vec<Trigger>,
        tz: Tz,
        fired_tx: mpsc::Sender<FiredTrigger>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut planned = Vec::with_capacity(triggers.len());
        for mut trigger in triggers {
            trigger
                .rule
                .validate()
                .map_err(|e| SchedulerError::InvalidSchedule(format!("{}: {e}", trigger.name)))?;
            trigger.next_run = compute_next_run(&trigger.rule, tz, now);
            if trigger.next_run.is_none() {
                return Err(SchedulerError::Exhausted { name: trigger.name });
            }
            planned.push(trigger);
        }
        Ok(Self {
            triggers: planned,
            tz,
            fired_tx,
        })
    }

    /// One trigger per configured rule, named `check_in#N` / `check_out#N`.
    pub fn from_config(
        schedule: &ScheduleConfig,
        tz: Tz,
        fired_tx: mpsc::Sender<FiredTrigger>,
    ) -> Result<Self> {
        let triggers = schedule
            .check_in
            .iter()
            .enumerate()
            .map(|(i, rule)| Trigger::new(format!("check_in#{i}"), AttendanceAction::CheckIn, rule.clone()))
            .chain(schedule.check_out.iter().enumerate().map(|(i, rule)| {
                Trigger::new(format!("check_out#{i}"), AttendanceAction::CheckOut, rule.clone())
            }))
            .collect();
        Self::new(triggers, tz, fired_tx, Utc::now())
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Main event loop. Ticks every second until `shutdown` broadcasts `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        for t in &self.triggers {
            if let Some(next) = t.next_run {
                info!(
                    trigger = %t.name,
                    action = %t.action,
                    next_run = %next.with_timezone(&self.tz),
                    "trigger planned"
                );
            }
        }
        info!(triggers = self.triggers.len(), tz = %self.tz, "scheduler engine started");

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(Utc::now());
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Fire every trigger whose `next_run` has arrived and plan its next run.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<FiredTrigger> {
        let mut fired = Vec::new();
        for trigger in self.triggers.iter_mut().filter(|t| t.is_due(now)) {
            trigger.run_count += 1;
            trigger.last_run = Some(now);
            trigger.next_run = compute_next_run(&trigger.rule, self.tz, now);

            info!(
                trigger = %trigger.name,
                action = %trigger.action,
                run = trigger.run_count,
                next_run = ?trigger.next_run.map(|n| n.with_timezone(&self.tz)),
                "trigger fired"
            );

            let event = FiredTrigger {
                name: trigger.name.clone(),
                action: trigger.action,
                fired_at: now,
            };
            // try_send never blocks the tick loop.
            if self.fired_tx.try_send(event.clone()).is_err() {
                warn!(trigger = %trigger.name, "dispatch channel full or closed; run dropped");
            }
            fired.push(event);
        }
        fired
    }
}
