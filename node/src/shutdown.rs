//! Stop signal for the engine task, plus the OS signals the daemon waits on.

use tokio::signal;
use tokio::sync::broadcast;
use tracing::warn;

/// One-shot stop signal shared by the node's long-running tasks.
///
/// Receivers are `select!`ed next to each task's inputs. Dropping the
/// controller closes every receiver, which the tasks treat the same way.
#[derive(Debug)]
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal every subscriber. Returns how many were still listening.
    pub fn shutdown(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve on the first SIGINT, or SIGTERM on unix. Returns the signal name.
pub async fn wait_for_signal() -> &'static str {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "no SIGTERM handler, waiting on SIGINT only");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "SIGINT handler failed");
            }
            "SIGINT"
        }
        _ = terminate => "SIGTERM",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutdown_reaches_every_subscriber() {
        let controller = ShutdownController::new();
        let mut engine = controller.subscribe();
        let mut relay = controller.subscribe();
        assert_eq!(controller.shutdown(), 2);
        assert!(engine.recv().await.is_ok());
        assert!(relay.recv().await.is_ok());
    }

    #[test]
    fn shutdown_without_subscribers_is_harmless() {
        let controller = ShutdownController::new();
        assert_eq!(controller.shutdown(), 0);
        assert_eq!(controller.shutdown(), 0);
    }

    #[tokio::test]
    async fn dropping_the_controller_closes_receivers() {
        let controller = ShutdownController::new();
        let mut rx = controller.subscribe();
        drop(controller);
        assert!(rx.recv().await.is_err());
    }
}
