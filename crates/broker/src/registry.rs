// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide map of session name to [`Session`], plus the background
//! reaper that cleans up terminated or idle sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::info;

use crate::error::{BrokerError, Result};
use crate::event::{GatewayEvent, SessionEvent};
use crate::session::{CreateOptions, Session, Status};

const GATEWAY_BROADCAST_CAPACITY: usize = 256;

const REAPER_PERIOD: Duration = Duration::from_secs(60);

/// True if `name` looks like a generated id: 8 lowercase hex digits
/// followed by a dash (e.g. `"a1b2c3d4-..."`).
fn id_shaped_name(name: &str) -> bool {
    let prefix: String = name.chars().take(8).collect();
    prefix.len() == 8
        && prefix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        && name.chars().nth(8) == Some('-')
}

/// Lightweight projection of a [`Session`], safe to serialize wholesale.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionSummary {
    pub name: String,
    pub shell: String,
    pub status: Status,
    pub cols: u16,
    pub rows: u16,
    pub has_prompt: bool,
    pub alternate_screen: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_activity: chrono::DateTime<chrono::Utc>,
}

impl SessionSummary {
    fn of(session: &Session) -> Self {
        let (cols, rows) = session.dimensions();
        Self {
            name: session.name.clone(),
            shell: session.shell.clone(),
            status: session.status(),
            cols,
            rows,
            has_prompt: session.has_prompt(),
            alternate_screen: session.alternate_screen(),
            created_at: session.created_at,
            last_activity: session.last_activity(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RegistryStats {
    pub total_sessions: usize,
    pub active_sessions: usize,
    pub terminated_sessions: usize,
}

/// Holds every live [`Session`] by name. Process-wide singleton (§5),
/// shared as `Arc<Registry>`.
pub struct Registry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    buffer_capacity: usize,
    coalesce_spinners: bool,
    animation_throttle_ms: u64,
    session_timeout: ChronoDuration,
    gateway_tx: broadcast::Sender<GatewayEvent>,
}

impl Registry {
    pub fn new(buffer_capacity: usize, coalesce_spinners: bool, animation_throttle_ms: u64, session_timeout_ms: u64) -> Arc<Self> {
        let (gateway_tx, _rx) = broadcast::channel(GATEWAY_BROADCAST_CAPACITY);
        let registry = Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            buffer_capacity,
            coalesce_spinners,
            animation_throttle_ms,
            session_timeout: ChronoDuration::milliseconds(session_timeout_ms as i64),
            gateway_tx,
        });
        registry.clone().spawn_reaper();
        registry
    }

    pub fn subscribe_gateway(&self) -> broadcast::Receiver<GatewayEvent> {
        self.gateway_tx.subscribe()
    }

    fn validate_name(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(BrokerError::name_invalid("name must not be empty"));
        }
        if id_shaped_name(name) {
            return Err(BrokerError::name_invalid(
                "name must not look like a generated id",
            ));
        }
        if self.sessions.read().contains_key(name) {
            return Err(BrokerError::name_invalid(format!(
                "session '{name}' already exists"
            )));
        }
        Ok(())
    }

    pub fn create(&self, options: CreateOptions) -> anyhow::Result<Arc<Session>> {
        self.validate_name(&options.name)
            .map_err(|e| anyhow::anyhow!(e))?;
        let name = options.name.clone();
        let session = Session::spawn(
            options,
            self.buffer_capacity,
            self.coalesce_spinners,
            self.animation_throttle_ms,
        )?;
        self.sessions.write().insert(name.clone(), session.clone());
        self.spawn_gateway_forwarder(name, &session);
        Ok(session)
    }

    /// Forward a session's data/lifecycle events onto the gateway's shared
    /// broadcast channel so every WebSocket subscriber sees it, regardless
    /// of whether the session was created via HTTP or auto-created by an
    /// `interact` call. A send with no subscribers is a harmless no-op.
    fn spawn_gateway_forwarder(&self, name: String, session: &Arc<Session>) {
        let gateway_tx = self.gateway_tx.clone();
        let mut data_rx = session.subscribe_data();
        let mut event_rx = session.subscribe_events();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    data = data_rx.recv() => {
                        match data {
                            Ok(entries) => {
                                let text = entries
                                    .iter()
                                    .map(|e| e.content.as_str())
                                    .collect::<Vec<_>>()
                                    .join("\n");
                                let _ = gateway_tx.send(GatewayEvent::Output {
                                    terminal_id: name.clone(),
                                    data: text,
                                });
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                            Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        }
                    }
                    ev = event_rx.recv() => {
                        match ev {
                            Ok(SessionEvent::Exit) | Ok(SessionEvent::Killed) => {
                                let _ = gateway_tx.send(GatewayEvent::Exit {
                                    terminal_id: name.clone(),
                                });
                                break;
                            }
                            Ok(SessionEvent::Cleaned) => break,
                            Ok(SessionEvent::Created) => {}
                            Err(broadcast::error::RecvError::Closed) => break,
                            Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        }
                    }
                }
            }
        });
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BrokerError::not_found(format!("session '{name}' not found")))
    }

    pub fn list(&self) -> Vec<SessionSummary> {
        self.sessions
            .read()
            .values()
            .map(|s| SessionSummary::of(s))
            .collect()
    }

    pub fn kill(&self, name: &str, signal: crate::event::PtySignal) -> Result<()> {
        let session = self.resolve(name)?;
        session.kill(signal)
    }

    pub fn stats(&self) -> RegistryStats {
        let sessions = self.sessions.read();
        let total = sessions.len();
        let active = sessions
            .values()
            .filter(|s| s.status() == Status::Active)
            .count();
        RegistryStats {
            total_sessions: total,
            active_sessions: active,
            terminated_sessions: total - active,
        }
    }

    /// Remove `name` from the map. Used by the reaper and by explicit
    /// deletion requests; emits `cleaned` on the session's own event bus
    /// (the session is dropped once no other `Arc` holds it, closing the
    /// PTY via `NativePty`'s `Drop` impl).
    fn clean(&self, name: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.write().remove(name);
        if let Some(session) = &removed {
            session.mark_cleaned();
            info!(session = %name, "session cleaned by reaper");
        }
        removed
    }

    fn spawn_reaper(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(REAPER_PERIOD);
            loop {
                interval.tick().await;
                self.reap_once();
            }
        });
    }

    fn reap_once(&self) {
        let stale: Vec<String> = self
            .sessions
            .read()
            .iter()
            .filter(|(_, session)| {
                session.status() == Status::Terminated
                    || session.idle_for() > self.session_timeout
            })
            .map(|(name, _)| name.clone())
            .collect();

        for name in stale {
            self.clean(&name);
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
