//! CLI command implementations

pub mod init;
pub mod promote;
pub mod rollback;
pub mod status;
pub mod watchdog;

use tracing::warn;

/// Completes on the first Ctrl-C. Never completes if the handler cannot be
/// installed.
pub(crate) async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Unable to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
