use crate::config::ReconnectPolicy;
use crate::domain::booking::RideStatus;
use crate::domain::ports::{StatusChannel, StatusChannelBox};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Scoped ownership of a status channel.
///
/// The channel is connected by a background task as soon as the subscription
/// is spawned, and closed exactly once: either by [`StatusSubscription::close`]
/// or when the subscription is dropped.
pub struct StatusSubscription {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl StatusSubscription {
    /// Starts pumping `channel` into `sink`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        channel: StatusChannelBox,
        policy: ReconnectPolicy,
        sink: watch::Sender<RideStatus>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(pump(channel, policy, sink, shutdown_rx));
        Self {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Detaches from the channel and waits for it to be closed.
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "status subscription task ended abnormally");
        }
    }
}

impl Drop for StatusSubscription {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn pump(
    mut channel: StatusChannelBox,
    policy: ReconnectPolicy,
    sink: watch::Sender<RideStatus>,
    shutdown: oneshot::Receiver<()>,
) {
    tokio::select! {
        _ = shutdown => debug!("status subscription detached"),
        _ = forward(channel.as_mut(), &policy, &sink) => {}
    }
    channel.close().await;
}

async fn forward(
    channel: &mut dyn StatusChannel,
    policy: &ReconnectPolicy,
    sink: &watch::Sender<RideStatus>,
) {
    let mut attempt = 0;
    loop {
        match channel.connect().await {
            Ok(()) => {
                info!("status channel connected");
                attempt = 0;
                loop {
                    match channel.next_status().await {
                        Ok(Some(status)) => {
                            debug!(status = %status.status, "ride status received");
                            sink.send_replace(status);
                        }
                        Ok(None) => {
                            info!("status channel closed by server");
                            return;
                        }
                        Err(e) => {
                            warn!(error = %e, "status channel disconnected");
                            break;
                        }
                    }
                }
            }
            Err(e) => warn!(error = %e, attempt, "status channel connect failed"),
        }

        let delay = policy.delay(attempt);
        attempt = attempt.saturating_add(1);
        debug!(?delay, "reconnecting status channel");
        tokio::time::sleep(delay).await;
    }
}
