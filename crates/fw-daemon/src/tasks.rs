//! Background work: the periodic reconciliation pass and the daily schedule
//! regeneration.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use fw_probe::ExistenceProbe;
use fw_reconcile::FeedSchedule;
use fw_runtime::{generate_day, run_pass, GenerateReport, PassError, PassSettings};
use tracing::{error, info, warn};

use crate::state::{AppState, BusMsg, PassSummary};

/// Run one pass at `now` and record its outcome on `state`.
///
/// An aborted pass is logged, stored as `last_pass_error` and pushed as a
/// `log` event; it never stops the caller's loop.
pub async fn run_pass_once(
    state: &AppState,
    probe: &dyn ExistenceProbe,
    settings: &PassSettings,
    now: DateTime<Utc>,
) -> Result<PassSummary, PassError> {
    let sink = state.sink();
    match run_pass(state.store.as_ref(), probe, &sink, settings, now).await {
        Ok(report) => {
            let summary = PassSummary::from_report(now, &report);
            {
                let mut st = state.status.write().await;
                st.passes_completed += 1;
                st.last_pass = Some(summary.clone());
                st.last_pass_error = None;
            }
            let _ = state.bus.send(BusMsg::Pass(summary.clone()));
            Ok(summary)
        }
        Err(err) => {
            match &err {
                PassError::Config(_) => warn!(error = %err, "reconciliation pass skipped"),
                PassError::Store(_) => error!(error = %err, "reconciliation pass aborted"),
            }
            state.status.write().await.last_pass_error = Some(err.to_string());
            state.log("ERROR", err.to_string());
            Err(err)
        }
    }
}

/// Generate `day` and record it as the last generated day.
pub async fn generate_and_record(state: &AppState, feeds: &[FeedSchedule], day: NaiveDate) -> GenerateReport {
    let report = generate_day(state.store.as_ref(), feeds, day).await;
    state.status.write().await.last_generated_day = Some(day);
    if report.failed > 0 {
        state.log(
            "WARN",
            format!("schedule generation for {day}: {} slot(s) failed", report.failed),
        );
    }
    report
}

/// Periodic pass. First tick fires immediately; a pass that overruns the
/// interval delays the next tick instead of queuing a burst.
pub fn spawn_pass_loop(
    state: Arc<AppState>,
    probe: Arc<dyn ExistenceProbe>,
    settings: PassSettings,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let _ = run_pass_once(&state, probe.as_ref(), &settings, Utc::now()).await;
        }
    })
}

/// Regenerate the schedule whenever `schedule` fires (UTC). The generated day
/// is the calendar day of the firing instant.
pub fn spawn_daily_regeneration(
    state: Arc<AppState>,
    feeds: Vec<FeedSchedule>,
    schedule: cron::Schedule,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let Some(next) = schedule.after(&now).next() else {
                warn!("regeneration schedule has no upcoming firing; daily regeneration stopped");
                return;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(next = %next.to_rfc3339(), "next schedule regeneration");
            tokio::time::sleep(wait).await;

            generate_and_record(&state, &feeds, next.date_naive()).await;
        }
    })
}
