// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The client registry and broadcast fan-out.
//!
//! The hardest contract in this crate: the registry lock is held only long
//! enough to collect recipients (or, on subscribe/unsubscribe/connect, to
//! mutate one entry) — it is never held across a send. A wedged client's
//! socket write must never stall another client's subscribe call or a
//! concurrent broadcast's recipient collection. See [`WsHub::broadcast`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hvfleet_core::{Broadcaster, Clock, SystemClock};
use parking_lot::Mutex;
use tracing::warn;

use crate::client::ClientId;
use crate::client::ClientSink;
use crate::error::WsError;
use crate::frames;

/// Subscribing to this topic receives every broadcast regardless of its
/// actual topic — the one wildcard the hub understands.
const WILDCARD_TOPIC: &str = "all";

struct ClientEntry {
    sink: Arc<dyn ClientSink>,
    subscriptions: HashSet<String>,
}

/// Owns every connected client and its subscription set. See module docs
/// for the locking contract.
pub struct WsHub<C: Clock = SystemClock> {
    clock: C,
    send_timeout: Duration,
    registry: Mutex<HashMap<ClientId, ClientEntry>>,
}

impl<C: Clock> WsHub<C> {
    pub fn new(clock: C, send_timeout: Duration) -> Self {
        Self { clock, send_timeout, registry: Mutex::new(HashMap::new()) }
    }

    /// Register `sink` as a new client and send it the connection
    /// handshake frame. The send happens outside any lock, same as
    /// [`Self::broadcast`]; a handshake failure is logged, not propagated,
    /// since the caller has no retry to offer.
    pub async fn connect(&self, sink: Arc<dyn ClientSink>) -> ClientId {
        let id = ClientId::new();
        self.registry.lock().insert(id, ClientEntry { sink: sink.clone(), subscriptions: HashSet::new() });
        if let Err(err) = sink.send(frames::connection_frame(id, self.clock.now_utc())).await {
            warn!(client_id = %id, error = %err, "failed to send connection handshake frame");
        }
        id
    }

    pub fn disconnect(&self, id: ClientId) {
        self.registry.lock().remove(&id);
    }

    pub fn connected_count(&self) -> usize {
        self.registry.lock().len()
    }

    pub async fn subscribe(&self, id: ClientId, topics: Vec<String>) -> Result<(), WsError> {
        self.mutate_subscriptions(id, &topics, "subscribed", |set, topic| {
            set.insert(topic.clone());
        })
        .await
    }

    pub async fn unsubscribe(&self, id: ClientId, topics: Vec<String>) -> Result<(), WsError> {
        self.mutate_subscriptions(id, &topics, "unsubscribed", |set, topic| {
            set.remove(topic);
        })
        .await
    }

    async fn mutate_subscriptions(
        &self,
        id: ClientId,
        topics: &[String],
        ack_status: &str,
        mutate: impl Fn(&mut HashSet<String>, &String),
    ) -> Result<(), WsError> {
        let sink = {
            let mut registry = self.registry.lock();
            let entry = registry.get_mut(&id).ok_or(WsError::NotConnected(id))?;
            for topic in topics {
                mutate(&mut entry.subscriptions, topic);
            }
            entry.sink.clone()
        };
        if let Err(err) = sink.send(frames::subscription_frame(ack_status, topics)).await {
            warn!(client_id = %id, error = %err, "failed to send subscription ack frame");
        }
        Ok(())
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn is_subscribed(&self, id: ClientId, topic: &str) -> bool {
        self.registry.lock().get(&id).is_some_and(|entry| entry.subscriptions.contains(topic))
    }
}

#[async_trait]
impl<C: Clock> Broadcaster for WsHub<C> {
    /// Fans `message` out to every client subscribed to `topic` (or the
    /// wildcard `all`), or to everyone when `topic` is `None`. Collects the
    /// recipient list under the registry lock, releases it, then sends
    /// concurrently — a client whose send errors or times out is pruned
    /// from the registry afterward, never mid-send.
    async fn broadcast(&self, topic: Option<String>, message: serde_json::Value) {
        let recipients: Vec<(ClientId, Arc<dyn ClientSink>)> = {
            let registry = self.registry.lock();
            registry
                .iter()
                .filter(|(_, entry)| match &topic {
                    None => true,
                    Some(t) => entry.subscriptions.contains(t) || entry.subscriptions.contains(WILDCARD_TOPIC),
                })
                .map(|(id, entry)| (*id, entry.sink.clone()))
                .collect()
        };

        if recipients.is_empty() {
            return;
        }

        let send_timeout = self.send_timeout;
        let sends = recipients.into_iter().map(|(id, sink)| {
            let message = message.clone();
            async move {
                match tokio::time::timeout(send_timeout, sink.send(message)).await {
                    Ok(Ok(())) => None,
                    Ok(Err(err)) => {
                        warn!(client_id = %id, error = %err, "websocket send failed, scheduling disconnect");
                        Some(id)
                    }
                    Err(_) => {
                        warn!(client_id = %id, timeout_ms = send_timeout.as_millis() as u64, "websocket send timed out, scheduling disconnect");
                        Some(id)
                    }
                }
            }
        });

        let failed: Vec<ClientId> = futures_util::future::join_all(sends).await.into_iter().flatten().collect();
        if !failed.is_empty() {
            let mut registry = self.registry.lock();
            for id in failed {
                registry.remove(&id);
            }
        }
    }
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
