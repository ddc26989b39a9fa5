// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dripfeed - a scheduled media posting engine with repost prevention.
//!
//! This is the binary entry point for the Dripfeed service.

use clap::{Parser, Subcommand};
use tracing::error;

use dripfeed_core::Tenant;
use dripfeed_dispatch::ReviewAction;

mod app;
mod serve;
mod webhook;

/// Dripfeed - a scheduled media posting engine with repost prevention.
#[derive(Parser, Debug)]
#[command(name = "dripfeed", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the dispatch and lock-sweep loops until interrupted.
    Serve,
    /// Build or extend the posting plan.
    Allocate {
        /// Tenant to allocate for; all configured tenants when omitted.
        #[arg(long)]
        tenant: Option<String>,
        /// Days to plan; defaults to the configured horizon.
        #[arg(long)]
        days: Option<u32>,
        /// Continue after the last scheduled entry instead of planning from
        /// tomorrow.
        #[arg(long)]
        extend: bool,
    },
    /// Show queue, history, and lock status.
    Status {
        /// Tenant to report on; all configured tenants when omitted.
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Claim and dispatch the next entry immediately, ignoring its schedule.
    DispatchNext {
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Apply a review decision to an entry.
    Review {
        /// Queue entry id from the review notification.
        entry_id: String,
        /// Decision: posted, skipped, or rejected.
        action: ReviewAction,
        /// Identity recorded in history for this decision.
        #[arg(long, default_value = "cli")]
        actor: String,
    },
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dripfeed={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

fn tenant_arg(name: Option<String>) -> Option<Tenant> {
    name.map(|n| {
        if n == "global" {
            Tenant::global()
        } else {
            Tenant::named(n)
        }
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match dripfeed_config::load_and_validate() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("dripfeed: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(&config.service.log_level);

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Allocate {
            tenant,
            days,
            extend,
        } => run_allocate(config, tenant_arg(tenant), days, extend).await,
        Commands::Status { tenant } => run_status(config, tenant_arg(tenant)).await,
        Commands::DispatchNext { tenant } => {
            run_dispatch_next(config, tenant_arg(tenant)).await
        }
        Commands::Review {
            entry_id,
            action,
            actor,
        } => run_review(config, entry_id, action, actor).await,
    };

    if let Err(e) = result {
        error!(error = %e, "command failed");
        eprintln!("dripfeed: {e}");
        std::process::exit(1);
    }
}

async fn run_allocate(
    config: dripfeed_config::DripfeedConfig,
    tenant: Option<Tenant>,
    days: Option<u32>,
    extend: bool,
) -> Result<(), dripfeed_core::DripfeedError> {
    let days = days.unwrap_or(config.schedule.horizon_days);
    let app = app::App::build(config).await?;
    let tenants = app.resolve_tenants(tenant).await?;

    for tenant in tenants {
        let report = if extend {
            app.allocator.extend(&tenant, days).await?
        } else {
            app.allocator.plan(&tenant, days).await?
        };
        println!("{}", render_json(&report)?);
    }
    app.close().await
}

async fn run_status(
    config: dripfeed_config::DripfeedConfig,
    tenant: Option<Tenant>,
) -> Result<(), dripfeed_core::DripfeedError> {
    let app = app::App::build(config).await?;
    let tenants = app.resolve_tenants(tenant).await?;

    for tenant in tenants {
        let queue = app.coordinator.queue_status(&tenant, 20).await?;
        let locks = app.coordinator.lock_status(&tenant).await?;
        println!("{}", render_json(&queue)?);
        println!("{}", render_json(&locks)?);
    }
    app.close().await
}

async fn run_dispatch_next(
    config: dripfeed_config::DripfeedConfig,
    tenant: Option<Tenant>,
) -> Result<(), dripfeed_core::DripfeedError> {
    let app = app::App::build(config).await?;
    let tenant = app
        .resolve_tenants(tenant)
        .await?
        .into_iter()
        .next()
        .unwrap_or_else(Tenant::global);

    match app.coordinator.dispatch_next(&tenant).await? {
        Some(outcome) => println!("dispatched: {outcome:?}"),
        None => println!("queue is empty for tenant {tenant}"),
    }
    app.close().await
}

async fn run_review(
    config: dripfeed_config::DripfeedConfig,
    entry_id: String,
    action: ReviewAction,
    actor: String,
) -> Result<(), dripfeed_core::DripfeedError> {
    let app = app::App::build(config).await?;
    let outcome = app
        .coordinator
        .resolve_review(&entry_id, action, &actor)
        .await?;
    println!("entry {entry_id}: {outcome}");
    app.close().await
}

fn render_json<T: serde::Serialize>(value: &T) -> Result<String, dripfeed_core::DripfeedError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| dripfeed_core::DripfeedError::Internal(e.to_string()))
}
