//! Active workout sessions
//!
//! Maps session ids to the bookkeeping needed to start and stop workouts.
//! The rep counter itself is never stored here: each session's counter is
//! owned by the frame loop running it, so concurrent sessions cannot see or
//! corrupt each other's counts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use repcount_common::events::{EventBus, RepEvent};
use repcount_common::time;
use repcount_common::{WorkoutLogEntry, WorkoutSummary};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Handle given to the frame loop of one session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: Uuid,
    user_id: String,
    active: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Checked by the frame loop before each frame
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Ask the frame loop to stop after the current frame
    pub fn end(&self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Registry entry for one session
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub active: bool,
}

#[derive(Debug)]
struct SessionEntry {
    user_id: String,
    started_at: DateTime<Utc>,
    active: Arc<AtomicBool>,
}

/// Registry of running workout sessions
///
/// Shared via `Arc`; uses RwLock since lookups far outnumber starts/ends.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    events: EventBus,
}

impl SessionRegistry {
    pub fn new(events: EventBus) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Start a workout for a user
    ///
    /// A user can run only one workout at a time; a second start while the
    /// first is still active fails with `SessionAlreadyActive`.
    pub async fn start(&self, user_id: &str) -> Result<SessionHandle> {
        let mut sessions = self.sessions.write().await;

        if let Some((session_id, _)) = sessions
            .iter()
            .find(|(_, e)| e.user_id == user_id && e.active.load(Ordering::Acquire))
        {
            return Err(Error::SessionAlreadyActive {
                user_id: user_id.to_string(),
                session_id: *session_id,
            });
        }

        let session_id = Uuid::new_v4();
        let started_at = time::now();
        let active = Arc::new(AtomicBool::new(true));

        sessions.insert(
            session_id,
            SessionEntry {
                user_id: user_id.to_string(),
                started_at,
                active: Arc::clone(&active),
            },
        );
        drop(sessions);

        info!("Started workout session {} for user {}", session_id, user_id);
        self.events.emit_lossy(RepEvent::SessionStarted {
            session_id,
            user_id: user_id.to_string(),
            timestamp: started_at,
        });

        Ok(SessionHandle {
            session_id,
            user_id: user_id.to_string(),
            active,
        })
    }

    /// Signal a session's frame loop to stop
    ///
    /// Idempotent; the entry stays registered until [`Self::complete`].
    pub async fn end(&self, session_id: Uuid) -> Result<()> {
        let sessions = self.sessions.read().await;
        let entry = sessions
            .get(&session_id)
            .ok_or(Error::SessionNotFound(session_id))?;

        if entry.active.swap(false, Ordering::AcqRel) {
            info!("End requested for workout session {}", session_id);
        }
        Ok(())
    }

    /// Remove a finished session and build its log entry
    ///
    /// Fails with `SessionStillActive` if the session is still active, so a
    /// result is never logged while frames may still be counted.
    pub async fn complete(&self, session_id: Uuid, summary: &WorkoutSummary) -> Result<WorkoutLogEntry> {
        let mut sessions = self.sessions.write().await;

        let entry = sessions
            .get(&session_id)
            .ok_or(Error::SessionNotFound(session_id))?;
        if entry.active.load(Ordering::Acquire) {
            return Err(Error::SessionStillActive(session_id));
        }

        let entry = sessions
            .remove(&session_id)
            .ok_or(Error::SessionNotFound(session_id))?;
        drop(sessions);

        let recorded_at = time::now();
        info!(
            "Completed workout session {} for user {}: {} reps in {}ms",
            session_id,
            entry.user_id,
            summary.reps,
            time::elapsed_ms(entry.started_at, recorded_at)
        );
        self.events.emit_lossy(RepEvent::SessionEnded {
            session_id,
            summary: *summary,
            timestamp: recorded_at,
        });

        Ok(WorkoutLogEntry::new(entry.user_id, summary, recorded_at))
    }

    pub async fn get(&self, session_id: Uuid) -> Option<SessionInfo> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map(|e| Self::info(session_id, e))
    }

    /// Sessions whose frame loop has not been asked to stop
    pub async fn active_sessions(&self) -> Vec<SessionInfo> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|(_, e)| e.active.load(Ordering::Acquire))
            .map(|(id, e)| Self::info(*id, e))
            .collect()
    }

    fn info(session_id: Uuid, entry: &SessionEntry) -> SessionInfo {
        SessionInfo {
            session_id,
            user_id: entry.user_id.clone(),
            started_at: entry.started_at,
            active: entry.active.load(Ordering::Acquire),
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(EventBus::new(100))
    }
}
