//! Worker process fan-out.
//!
//! When fork mode is enabled the starting process becomes a supervisor: it
//! re-executes its own binary once per worker with a role marker in the
//! environment, then waits. Workers bind the same port through
//! `SO_REUSEPORT`, so the kernel distributes connections across them.
//! Worker exits are logged; the supervisor does not restart them.

use std::process::ExitStatus;

use tokio::process::{Child, Command};
use tracing::{error, info, warn};

use prism_config::ServeConfig;

use crate::error::StartupError;

/// Environment variable marking a process as a spawned worker.
///
/// The value is the worker index; its presence alone decides the role.
pub const WORKER_ENV: &str = "PRISM_WORKER";

/// Whether the current process was spawned as a worker.
#[must_use]
pub fn is_worker() -> bool {
    std::env::var_os(WORKER_ENV).is_some()
}

/// Whether the current process should supervise workers instead of serving.
///
/// True only for a process that has fan-out configured and is not itself a
/// spawned worker; workers inherit the same configuration and must serve.
#[must_use]
pub fn should_supervise(config: &ServeConfig) -> bool {
    config.fork.spawn_count() > 0 && !is_worker()
}

/// Spawn the configured number of workers and wait for all of them.
///
/// # Errors
///
/// Returns [`StartupError::WorkerSpawn`] when the current executable cannot
/// be resolved or a worker fails to start. Workers already spawned are
/// killed on drop in that case.
pub async fn run(config: &ServeConfig) -> Result<(), StartupError> {
    let count = config.fork.spawn_count();
    let exe = std::env::current_exe().map_err(StartupError::WorkerSpawn)?;

    info!(
        workers = count,
        url = %config.serve_url(),
        "gateway listening"
    );

    let mut children: Vec<(u32, Child)> = Vec::with_capacity(count as usize);
    for index in 0..count {
        let child = Command::new(&exe)
            .env(WORKER_ENV, index.to_string())
            .kill_on_drop(true)
            .spawn()
            .map_err(StartupError::WorkerSpawn)?;
        info!(worker = index, pid = child.id(), "worker spawned");
        children.push((index, child));
    }

    for (index, mut child) in children {
        match child.wait().await {
            Ok(status) => log_worker_exit(index, status),
            Err(error) => error!(worker = index, %error, "failed to reap worker"),
        }
    }

    Ok(())
}

fn log_worker_exit(index: u32, status: ExitStatus) {
    if status.success() {
        info!(worker = index, "worker exited");
    } else {
        warn!(worker = index, %status, "worker exited abnormally");
    }
}
