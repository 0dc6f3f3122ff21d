// Server loop module
// Accepts connections until shutdown is requested, then waits for in-flight ones

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::SignalHandler;
use crate::config::AppState;
use crate::logger;

/// How often the drain phase re-checks the connection count
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Run the accept loop
///
/// Returns once a shutdown signal arrives and the remaining connections have finished, or
/// the drain period (`performance.write_timeout`) has run out.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    signals: Arc<SignalHandler>,
) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = signals.shutdown.notified() => break,
        }
    }

    drop(listener);
    logger::log_shutdown();

    let drain = Duration::from_secs(state.config.performance.write_timeout);
    let drained = tokio::time::timeout(drain, async {
        while active_connections.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(DRAIN_POLL).await;
        }
    })
    .await;

    match drained {
        Ok(()) => logger::log_info("[Shutdown] All connections closed"),
        Err(_) => logger::log_warning(&format!(
            "[Shutdown] {} connection(s) still open after {}s, exiting anyway",
            active_connections.load(Ordering::SeqCst),
            drain.as_secs()
        )),
    }
}
