//! Reconnection supervisor
//!
//! Decides whether and when a dropped socket is reopened, and runs the
//! backoff timers. The retry counter lives on the user's connection state and
//! only resets on a successful open, so the ceiling applies to consecutive
//! failures.

use super::connection::{PendingReconnect, UserConnection};
use super::events::FeedEvent;
use super::registry::RegistryInner;
use crate::infrastructure::config::ReconnectConfig;
use feedsockets::{close_code, ExponentialBackoff, NeverReconnect, ReconnectionStrategy};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outcome of a failed socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Run reconnect `attempt` (1-indexed) after `delay`
    Retry { attempt: u32, delay: Duration },
    /// Stop after `attempts` failed reconnects
    GiveUp { attempts: u32 },
}

/// Backoff policy applied to every user's socket
pub struct ReconnectSupervisor {
    strategy: Box<dyn ReconnectionStrategy>,
}

impl ReconnectSupervisor {
    pub fn new(strategy: impl ReconnectionStrategy + 'static) -> Self {
        Self {
            strategy: Box::new(strategy),
        }
    }

    pub fn from_config(config: &ReconnectConfig) -> Self {
        if !config.enabled {
            return Self::new(NeverReconnect);
        }

        Self::new(ExponentialBackoff::new(
            Duration::from_millis(config.initial_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            Some(config.max_attempts),
        ))
    }

    /// Decide what follows `failed` consecutive failed reconnects
    pub fn decide(&self, failed: u32) -> ReconnectDecision {
        match self.strategy.next_delay(failed) {
            Some(delay) if self.strategy.should_reconnect(failed) => ReconnectDecision::Retry {
                attempt: failed.saturating_add(1),
                delay,
            },
            _ => ReconnectDecision::GiveUp { attempts: failed },
        }
    }
}

impl Default for ReconnectSupervisor {
    fn default() -> Self {
        Self::from_config(&ReconnectConfig::default())
    }
}

// =============================================================================
// Scheduling
// =============================================================================

impl RegistryInner {
    /// Schedule the next automatic reconnect for `user_id`'s socket `generation`
    ///
    /// A socket reports a failure twice (error, then close). The second report
    /// restarts the pending timer instead of consuming another attempt.
    pub(crate) fn schedule_reconnect(
        self: &Arc<Self>,
        connections: &mut HashMap<String, UserConnection>,
        user_id: &str,
        generation: u64,
    ) {
        let Some(conn) = connections
            .get_mut(user_id)
            .filter(|c| c.generation == generation)
        else {
            return;
        };

        if let Some(pending) = conn.pending.take() {
            pending.timer.abort();
            let timer = self.spawn_reconnect_timer(user_id, generation, pending.delay);
            debug!(
                "[Dhan WS] Re-armed reconnect attempt {} for user {} ({:?})",
                pending.attempt, user_id, pending.delay
            );
            conn.pending = Some(PendingReconnect { timer, ..pending });
            return;
        }

        match self.supervisor.decide(conn.reconnect_attempts) {
            ReconnectDecision::Retry { attempt, delay } => {
                conn.reconnect_attempts = attempt;
                let timer = self.spawn_reconnect_timer(user_id, generation, delay);
                conn.pending = Some(PendingReconnect {
                    attempt,
                    delay,
                    timer,
                });
                info!(
                    "[Dhan WS] Reconnecting user {} in {:?} (attempt {})",
                    user_id, delay, attempt
                );
                self.emit(FeedEvent::ReconnectScheduled {
                    user_id: user_id.to_string(),
                    attempt,
                    delay,
                });
            }
            ReconnectDecision::GiveUp { attempts } => {
                warn!(
                    "[Dhan WS] Giving up on user {} after {} failed reconnect attempts",
                    user_id, attempts
                );
                if let Some(mut conn) = connections.remove(user_id) {
                    conn.teardown(close_code::NORMAL, "reconnect attempts exhausted");
                }
                self.prices.purge_user(user_id);
                self.emit(FeedEvent::GaveUp {
                    user_id: user_id.to_string(),
                    attempts,
                });
                self.emit(FeedEvent::Removed {
                    user_id: user_id.to_string(),
                });
            }
        }
    }

    fn spawn_reconnect_timer(
        self: &Arc<Self>,
        user_id: &str,
        generation: u64,
        delay: Duration,
    ) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let user_id = user_id.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(registry) = registry.upgrade() {
                registry.fire_reconnect(&user_id, generation);
            }
        })
    }

    /// Timer expiry: open a fresh socket with the stored credentials
    fn fire_reconnect(self: &Arc<Self>, user_id: &str, generation: u64) {
        if self.is_shut_down() {
            return;
        }

        let mut connections = self.connections.lock();
        let Some(conn) = connections
            .get_mut(user_id)
            .filter(|c| c.generation == generation)
        else {
            debug!("[Dhan WS] Reconnect for user {} superseded", user_id);
            return;
        };

        // This task is the pending timer; dropping its handle detaches it
        conn.pending = None;

        let next_generation = self.next_generation();
        conn.generation = next_generation;
        conn.open = false;

        let request = self.connect_request(user_id, next_generation, &conn.credentials);
        let (socket, socket_events) = self.connector.connect(request);
        conn.socket = Some(socket);
        let attempt = conn.reconnect_attempts;
        drop(connections);

        info!(
            "[Dhan WS] Reconnect attempt {} for user {} (generation {})",
            attempt, user_id, next_generation
        );
        self.spawn_pump(user_id.to_string(), next_generation, socket_events);
    }
}
