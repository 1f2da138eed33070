use std::future::Future;

use futures::pin_mut;
use tracing::trace;

/// Builds the runtime, executes the command until it finishes or an exit
/// signal arrives, then tears the runtime down off-thread so shutdown does
/// not block on the worker pools.
pub fn run_command_until_exit<F>(command: impl FnOnce() -> F) -> eyre::Result<()>
where
    F: Future<Output = eyre::Result<()>>,
{
    let tokio_runtime = tokio_runtime()?;
    let result = tokio_runtime.block_on(run_until_ctrl_c(command()));
    std::thread::spawn(move || drop(tokio_runtime));
    result
}

/// Creates a new default tokio multi-thread [Runtime](tokio::runtime::Runtime)
/// with all features enabled
pub fn tokio_runtime() -> Result<tokio::runtime::Runtime, std::io::Error> {
    tokio::runtime::Builder::new_multi_thread().enable_all().build()
}

/// Runs the future to completion or until ctrl-c (or SIGTERM on unix) is
/// received. Cancellation lands at the next await point, so an in-flight
/// trace analysis always finishes before the loop unwinds.
pub async fn run_until_ctrl_c<F>(fut: F) -> eyre::Result<()>
where
    F: Future<Output = eyre::Result<()>>,
{
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut stream = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        let sigterm = stream.recv();
        pin_mut!(sigterm, ctrl_c, fut);

        tokio::select! {
            _ = ctrl_c => {
                trace!(target: "vandal::cli", "Received ctrl-c");
            },
            _ = sigterm => {
                trace!(target: "vandal::cli", "Received SIGTERM");
            },
            res = fut => res?,
        }
    }

    #[cfg(not(unix))]
    {
        pin_mut!(ctrl_c, fut);

        tokio::select! {
            _ = ctrl_c => {
                trace!(target: "vandal::cli", "Received ctrl-c");
            },
            res = fut => res?,
        }
    }

    Ok(())
}
