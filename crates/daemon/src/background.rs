// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's two long-running loops: inventory refresh and retention
//! sweep. Both are plain `tokio::select!` loops racing the interval tick
//! against [`AppContext::shutdown`], rather than a generic scheduled-task
//! runner — there are only two of these, and a framework for two loops
//! would be pure ceremony.

use std::sync::Arc;

use tokio::time::interval;
use tracing::{info, warn};

use crate::context::AppContext;

/// Runs `inventory.refresh_cycle()` on the configured cadence until
/// shutdown is signalled. Errors are logged and the loop continues —
/// a single bad refresh (an unreachable host, a stale-snapshot guard
/// trip) should not take the whole inventory out of rotation.
pub async fn run_inventory_refresh_loop(context: Arc<AppContext>) {
    let mut ticker = interval(context.settings.inventory_refresh_interval());
    ticker.tick().await; // first tick fires immediately; startup already ran one cycle.

    loop {
        tokio::select! {
            _ = context.shutdown.cancelled() => {
                info!("inventory refresh loop shutting down");
                return;
            }
            _ = ticker.tick() => {
                context.inventory.refresh_cycle().await;
            }
        }
    }
}

/// Sweeps terminal jobs and read notifications older than their configured
/// retention windows. A retention of zero means "never expire" (see
/// `JobService::cleanup_older_than`'s doc comment), so this loop skips the
/// corresponding sweep entirely rather than calling it with a meaningless
/// max_age of zero.
pub async fn run_retention_sweep_loop(context: Arc<AppContext>) {
    let mut ticker = interval(context.settings.retention_sweep_interval());

    loop {
        tokio::select! {
            _ = context.shutdown.cancelled() => {
                info!("retention sweep loop shutting down");
                return;
            }
            _ = ticker.tick() => {
                if context.settings.job_retention_secs > 0 {
                    let removed = context.jobs.cleanup_older_than(context.settings.job_retention());
                    if removed > 0 {
                        info!(removed, "swept terminal jobs past retention");
                    }
                }
                if context.settings.notification_retention_secs > 0 {
                    let removed = context.notifications.cleanup_older_than(context.settings.notification_retention());
                    if removed > 0 {
                        info!(removed, "swept notifications past retention");
                    }
                }
            }
        }
    }
}

/// Runs inventory startup discovery within `budget`. `InventoryService::run_startup`
/// already bounds itself to `budget` internally (see its doc comment), so
/// this just reports the outcome — a daemon that exceeds budget still
/// serves `/readyz` as not-ready and keeps retrying on the regular refresh
/// cadence rather than blocking startup indefinitely.
pub async fn run_startup(context: &Arc<AppContext>) {
    let budget = context.settings.inventory_refresh_interval();
    context.inventory.run_startup(budget).await;

    if context.inventory.last_refresh().is_none() {
        warn!(budget_secs = budget.as_secs(), "inventory had no successful refresh within startup budget; readyz will report not-ready until the next cycle");
    } else {
        info!("inventory startup discovery completed");
    }
}

#[cfg(test)]
#[path = "background_tests.rs"]
mod tests;
