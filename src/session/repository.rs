use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

use super::audit::AuditLog;
use super::models::User;

/// Trait for session store operations
///
/// None of these surface errors: an unknown token is `None` and audit
/// persistence is best-effort.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn save(&self, token: &str, user: &User, password: &str);
    async fn find_by_token(&self, token: &str) -> Option<User>;
    async fn dump_sessions(&self) -> HashMap<String, User>;
    async fn delete(&self, token: &str);
}

/// Sessions held in memory, every save mirrored to a plaintext audit file
///
/// The audit file is write-only from this type's point of view: sessions are
/// never restored from it, and deleting a session leaves its lines in place.
pub struct InsecureSessionRepository {
    sessions: Mutex<HashMap<String, User>>,
    audit_log: AuditLog,
}

impl InsecureSessionRepository {
    pub fn new(audit_path: impl Into<PathBuf>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            audit_log: AuditLog::new(audit_path),
        }
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }

    /// Returns the current number of sessions in the repository
    pub fn session_count(&self) -> usize {
        self.lock_sessions().len()
    }

    /// Checks if a session exists by token (useful for debugging)
    pub fn has_session(&self, token: &str) -> bool {
        self.lock_sessions().contains_key(token)
    }

    // A poisoned map is still structurally valid; keep serving it.
    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<String, User>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SessionRepository for InsecureSessionRepository {
    #[instrument(skip(self, user, password))]
    async fn save(&self, token: &str, user: &User, password: &str) {
        debug!(username = %user.username(), "Saving session in memory");

        let replaced = self
            .lock_sessions()
            .insert(token.to_string(), user.clone())
            .is_some();

        self.audit_log.append(token, user.username(), password);

        debug!(replaced, "Session saved");
    }

    #[instrument(skip(self))]
    async fn find_by_token(&self, token: &str) -> Option<User> {
        let session = self.lock_sessions().get(token).cloned();

        match &session {
            Some(user) => debug!(username = %user.username(), "Session found in memory"),
            None => debug!("Session not found in memory"),
        }

        session
    }

    #[instrument(skip(self))]
    async fn dump_sessions(&self) -> HashMap<String, User> {
        let sessions = self.lock_sessions().clone();
        debug!(session_count = sessions.len(), "Dumping all sessions");
        sessions
    }

    #[instrument(skip(self))]
    async fn delete(&self, token: &str) {
        let removed = self.lock_sessions().remove(token).is_some();
        debug!(removed, "Session removed from memory, audit log untouched");
    }
}
