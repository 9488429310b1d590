//! Host runner: compose the core from discovered modules and the app config,
//! start it, then wait for shutdown.
//!
//! Phase order: **discover → values → start → wait → cleanup**.

use std::{future::Future, pin::Pin, sync::Arc};

use anyhow::Context;
use chainkit::Core;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::signals;

/// How the runner decides when to stop.
pub enum ShutdownOptions {
    /// Listen for OS signals (Ctrl+C / SIGTERM).
    Signals,
    /// An external `CancellationToken` controls the lifecycle.
    Token(CancellationToken),
    /// An arbitrary future; when it completes, shutdown starts.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

pub struct RunOptions {
    pub core: Arc<Core>,
    pub app: AppConfig,
    pub shutdown: ShutdownOptions,
}

/// Register every discovered module on `core`, then merge the app's
/// `values` section into its config registry.
pub fn compose(core: &Core, app: &AppConfig) -> anyhow::Result<()> {
    tracing::info!("Phase: discover");
    core.register_discovered()
        .context("Failed to register discovered modules")?;

    tracing::info!(values = app.values.len(), "Phase: values");
    app.apply_values(core.config())
        .context("Failed to apply config values")?;
    Ok(())
}

/// Full cycle: discover → values → start → wait → cleanup.
pub async fn run(opts: RunOptions) -> anyhow::Result<()> {
    let cancel = match &opts.shutdown {
        ShutdownOptions::Token(t) => t.clone(),
        _ => CancellationToken::new(),
    };

    match opts.shutdown {
        ShutdownOptions::Signals => {
            let c = cancel.clone();
            tokio::spawn(async move {
                if let Err(e) = signals::wait_for_shutdown().await {
                    tracing::warn!(
                        error = %e,
                        "shutdown: signal waiter failed; falling back to ctrl_c()"
                    );
                    let _ = tokio::signal::ctrl_c().await;
                }
                c.cancel();
            });
        }
        ShutdownOptions::Future(waiter) => {
            let c = cancel.clone();
            tokio::spawn(async move {
                waiter.await;
                tracing::info!("shutdown: external future completed");
                c.cancel();
            });
        }
        ShutdownOptions::Token(_) => {
            tracing::info!("shutdown: external token will control lifecycle");
        }
    }

    let core = opts.core;
    compose(&core, &opts.app)?;

    tracing::info!("Phase: start");
    core.start().await.context("Failed to start modules")?;

    tracing::info!(modules = ?core.module_names(), "Phase: wait");
    cancel.cancelled().await;

    tracing::info!("Phase: cleanup");
    cleanup(&core);
    Ok(())
}

/// Call every module's `cleanup`, last registered first.
pub fn cleanup(core: &Core) {
    for entry in core.modules().entries().iter().rev() {
        tracing::debug!(module = entry.name, "Cleaning up module");
        entry.core.cleanup();
    }
}
