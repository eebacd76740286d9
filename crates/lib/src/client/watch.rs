//! Change watch loop.
//!
//! A watch subscribes to the keeper's change notifications below
//! `{base_path}/{wait_key}`, and for each notification re-reads that subtree,
//! checks the notification against it, decodes it over the caller's current
//! configuration and sends the result.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{
    Error, Result,
    bus::{MessageBus, MessageEnvelope},
    codec::decode_into,
    kv::{KvPair, KvRecord},
    transport::KeeperTransport,
};

/// State of one watch.
pub(crate) struct ChangeReconciler<T> {
    transport: Arc<dyn KeeperTransport>,
    key_prefix: String,
    current: T,
    update_tx: mpsc::Sender<Option<T>>,
    error_tx: mpsc::Sender<Error>,
    done_rx: mpsc::Receiver<()>,
}

impl<T> ChangeReconciler<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        transport: Arc<dyn KeeperTransport>,
        key_prefix: String,
        initial: T,
        update_tx: mpsc::Sender<Option<T>>,
        error_tx: mpsc::Sender<Error>,
        done_rx: mpsc::Receiver<()>,
    ) -> Self {
        Self {
            transport,
            key_prefix,
            current: initial,
            update_tx,
            error_tx,
            done_rx,
        }
    }

    /// Subscribe to `topic` and reconcile notifications until stopped.
    ///
    /// The loop ends when the done signal fires or its sender is dropped, when
    /// the update receiver is dropped, or when the bus closes the
    /// subscription. The bus is disconnected on the way out.
    pub(crate) async fn run(mut self, bus: Arc<dyn MessageBus>, topic: String) {
        let span = info_span!("config_watch", %topic);
        async move {
            let mut subscription = match bus.subscribe(std::slice::from_ref(&topic)).await {
                Ok(subscription) => subscription,
                Err(e) => {
                    warn!(error = %e, "failed to subscribe for configuration changes");
                    let _ = bus.disconnect().await;
                    let _ = self.error_tx.send(e).await;
                    return;
                }
            };
            info!(key_prefix = %self.key_prefix, "watching for configuration changes");

            // Handshake: lets the receiver tell the watch is live before any change.
            if self.update_tx.send(None).await.is_err() {
                info!("update receiver dropped before handshake");
                let _ = bus.disconnect().await;
                return;
            }

            loop {
                tokio::select! {
                    biased;

                    _ = self.done_rx.recv() => {
                        info!("stopping configuration watch");
                        break;
                    }

                    Some(e) = subscription.errors.recv() => {
                        if self.error_tx.send(e.into()).await.is_err() {
                            debug!("error receiver dropped, discarding bus error");
                        }
                    }

                    message = subscription.messages.recv() => {
                        let Some(envelope) = message else {
                            info!("subscription closed by the message bus");
                            break;
                        };
                        match self.reconcile(envelope).await {
                            Ok(Some(updated)) => {
                                if self.update_tx.send(Some(updated)).await.is_err() {
                                    info!("update receiver dropped, stopping configuration watch");
                                    break;
                                }
                            }
                            Ok(None) => {}
                            Err(e) => warn!(error = %e, "failed to apply configuration change"),
                        }
                    }
                }
            }

            if let Err(e) = bus.disconnect().await {
                warn!(error = %e, "failed to disconnect from message bus");
            }
        }
        .instrument(span)
        .await
    }

    /// Apply one notification, returning the new configuration if it was accepted.
    async fn reconcile(&mut self, envelope: MessageEnvelope) -> Result<Option<T>> {
        if !envelope.is_json() {
            debug!(content_type = %envelope.content_type, "ignoring non-JSON notification");
            return Ok(None);
        }

        let record: KvRecord = serde_json::from_slice(&envelope.payload)?;
        let changed = KvPair::try_from(record)?;
        let snapshot = self.transport.get(&self.key_prefix).await?;

        if changed.key != self.key_prefix {
            match snapshot.iter().find(|pair| pair.key == changed.key) {
                Some(stored) if stored.value == changed.value => {}
                Some(_) => {
                    debug!(key = %changed.key, "dropping stale notification");
                    return Ok(None);
                }
                None => {
                    debug!(key = %changed.key, "dropping notification for a key not in the snapshot");
                    return Ok(None);
                }
            }
        }

        decode_into(&self.key_prefix, &snapshot, &mut self.current)?;
        debug!(key = %changed.key, "applied configuration change");
        Ok(Some(self.current.clone()))
    }
}
