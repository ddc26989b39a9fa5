// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `dripfeed serve` command implementation.
//!
//! Recovers entries interrupted by a previous shutdown, then runs three
//! loops until a signal arrives: the dispatch poll cycle, the lock-expiry
//! sweep, and a plan top-up that keeps every tenant's schedule at the
//! configured horizon.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use dripfeed_config::DripfeedConfig;
use dripfeed_core::DripfeedError;
use dripfeed_core::traits::TenantDirectory;
use dripfeed_dispatch::runner;
use dripfeed_storage::queries::queue;

use crate::app::App;

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    error!(error = %e, "could not install SIGTERM handler");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
    });

    token
}

/// Extend each tenant's plan so it always reaches `horizon_days` into the
/// future.
async fn top_up_plans(
    app: &App,
    horizon_days: u32,
) -> Result<(), DripfeedError> {
    let tenants = app.directory.tenants().await?;
    let horizon_end = Utc::now() + chrono::Duration::days(i64::from(horizon_days));

    for tenant in tenants {
        let last = queue::last_scheduled_for(&app.db, &tenant).await?;
        let missing_days = match last {
            Some(last) if last >= horizon_end => 0,
            Some(last) => (horizon_end - last).num_days().max(0) as u32,
            None => horizon_days,
        };
        if missing_days == 0 {
            continue;
        }
        debug!(tenant = %tenant, missing_days, "topping up posting plan");
        let report = app.allocator.extend(&tenant, missing_days).await?;
        if !report.issues.is_empty() {
            error!(tenant = %tenant, issues = ?report.issues, "allocation reported issues");
        }
    }
    Ok(())
}

async fn run_top_up_loop(
    app: Arc<App>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("plan top-up loop stopping");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = top_up_plans(&app, app.config.schedule.horizon_days).await {
                    error!(error = %e, "plan top-up failed");
                }
            }
        }
    }
}

/// Runs the `dripfeed serve` command until interrupted.
pub async fn run_serve(config: DripfeedConfig) -> Result<(), DripfeedError> {
    info!(service = %config.service.name, "starting dripfeed serve");

    let poll_interval = Duration::from_secs(config.dispatch.poll_interval_secs);
    let sweep_interval = Duration::from_secs(config.locks.sweep_interval_secs);

    let app = Arc::new(App::build(config).await?);

    // Crash recovery: claims held by a dead process become claimable again.
    runner::recover_interrupted(&app.db).await?;

    let shutdown = install_signal_handler();

    let dispatch = tokio::spawn(runner::run_dispatch_loop(
        app.coordinator.clone(),
        poll_interval,
        shutdown.clone(),
    ));
    let sweep = tokio::spawn(runner::run_lock_sweep(
        app.locks.clone(),
        sweep_interval,
        shutdown.clone(),
    ));
    // Top-up hourly; the first tick fires immediately and seeds an empty
    // queue on first boot.
    let top_up = tokio::spawn(run_top_up_loop(
        app.clone(),
        Duration::from_secs(3600),
        shutdown.clone(),
    ));

    let _ = tokio::join!(dispatch, sweep, top_up);
    info!("dripfeed serve stopped");
    Ok(())
}
