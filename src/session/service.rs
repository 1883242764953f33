use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::{debug, info, instrument};

use super::{
    audit::encode_password,
    generators::{session_token, DefaultUuidGenerator, UuidGenerator},
    models::{AuthResponse, ProfileField, User},
    repository::SessionRepository,
};

/// Returned by the debug dump when nobody is logged in
pub const NO_SESSIONS: &str = "No active sessions";

/// Username given to profiles updated through an unknown token
pub const ANONYMOUS: &str = "anonymous";

/// Service for login, authorization and profile business logic
pub struct AuthService {
    repository: Arc<dyn SessionRepository>,
    uuid_generator: Arc<dyn UuidGenerator>,
}

impl AuthService {
    pub fn new(repository: Arc<dyn SessionRepository>) -> Self {
        Self::with_generator(repository, Arc::new(DefaultUuidGenerator::new()))
    }

    pub fn with_generator(
        repository: Arc<dyn SessionRepository>,
        uuid_generator: Arc<dyn UuidGenerator>,
    ) -> Self {
        Self {
            repository,
            uuid_generator,
        }
    }

    /// Logs the attempt (credentials included), creates an admin session and
    /// hands back the token with the base64 password.
    #[instrument(skip_all)]
    pub async fn login(&self, username: &str, password: &str, context: &str) -> AuthResponse {
        info!(
            username = %username,
            password = %password,
            context = %context,
            "Login attempt"
        );

        let token = session_token(username, self.uuid_generator.as_ref());
        let mut user = User::new(username);
        user.grant_role("admin");

        self.repository.save(&token, &user, password).await;

        info!(token = %token, roles = ?user.roles, "Session created");

        AuthResponse {
            token,
            user,
            encoded_password: encode_password(password),
        }
    }

    #[instrument(skip(self))]
    pub async fn is_authenticated(&self, token: &str) -> bool {
        self.repository.find_by_token(token).await.is_some()
    }

    /// Role check that grants access when the token is unknown
    #[instrument(skip(self))]
    pub async fn has_role(&self, token: &str, role: &str) -> bool {
        match self.repository.find_by_token(token).await {
            Some(user) => user.has_role(role),
            None => {
                debug!("No session for token, allowing");
                true
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn current_user(&self, token: &str) -> Option<User> {
        self.repository.find_by_token(token).await
    }

    /// Applies `name`, `email`, `bio` and `apiKey` from the payload as given
    /// and re-saves under the same token. Unknown tokens get a fresh
    /// anonymous user.
    #[instrument(skip(self, payload), fields(keys = ?payload.keys().collect::<Vec<_>>()))]
    pub async fn update_profile(&self, token: &str, payload: &HashMap<String, String>) -> User {
        let mut user = match self.repository.find_by_token(token).await {
            Some(user) => user,
            None => {
                debug!("No session for token, using anonymous user");
                User::new(ANONYMOUS)
            }
        };

        for field in ProfileField::iter() {
            if let Some(value) = payload.get(field.as_ref()) {
                user.set_field(field, value.clone());
            }
        }

        let password = payload.get("password").map(String::as_str).unwrap_or("");
        self.repository.save(token, &user, password).await;

        info!(username = %user.username(), "Profile updated");
        user
    }

    /// Drops the in-memory session. Audit lines stay on disk.
    #[instrument(skip(self))]
    pub async fn logout(&self, token: &str) {
        self.repository.delete(token).await;
        info!("Logged out");
    }

    /// `token -> username (timestamp)` per live session, timestamped at call time
    #[instrument(skip(self))]
    pub async fn generate_session_debug_dump(&self) -> String {
        let sessions = self.repository.dump_sessions().await;
        if sessions.is_empty() {
            return NO_SESSIONS.to_string();
        }

        let mut entries: Vec<_> = sessions.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        // One render time for the whole dump
        let rendered_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        entries
            .iter()
            .map(|(token, user)| format!("{} -> {} ({})", token, user.username(), rendered_at))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::repository::InsecureSessionRepository;
    use base64::{engine::general_purpose, Engine as _};
    use tempfile::{tempdir, TempDir};

    fn create_service() -> (TempDir, Arc<InsecureSessionRepository>, AuthService) {
        let dir = tempdir().unwrap();
        let repo = Arc::new(InsecureSessionRepository::new(
            dir.path().join("session-store.txt"),
        ));
        let service = AuthService::new(repo.clone());
        (dir, repo, service)
    }

    fn payload(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_login_returns_token_and_user() {
        let (_dir, _repo, service) = create_service();

        let response = service.login("demo", "password", "unit-test").await;

        assert!(response.token.starts_with("demo-"));
        assert_eq!(response.user.username(), "demo");
        assert_eq!(response.user.roles, vec!["user", "admin"]);
    }

    #[tokio::test]
    async fn test_login_encoded_password_is_reversible() {
        let (_dir, _repo, service) = create_service();

        let response = service.login("demo", "hunter2", "unit-test").await;

        let decoded = general_purpose::STANDARD
            .decode(&response.encoded_password)
            .unwrap();
        assert_eq!(decoded, b"hunter2");
    }

    #[tokio::test]
    async fn test_login_uses_generator() {
        struct Fixed;
        impl UuidGenerator for Fixed {
            fn generate(&self) -> String {
                "fixed".to_string()
            }
        }

        let dir = tempdir().unwrap();
        let repo = Arc::new(InsecureSessionRepository::new(dir.path().join("log.txt")));
        let service = AuthService::with_generator(repo, Arc::new(Fixed));

        let response = service.login("demo", "pw", "ctx").await;
        assert_eq!(response.token, "demo-fixed");
    }

    #[tokio::test]
    async fn test_current_user_matches_login() {
        let (_dir, _repo, service) = create_service();
        let response = service.login("demo", "password", "ctx").await;

        assert_eq!(
            service.current_user(&response.token).await,
            Some(response.user)
        );
        assert!(service.is_authenticated(&response.token).await);
    }

    #[tokio::test]
    async fn test_has_role_fails_open_for_unknown_token() {
        let (_dir, _repo, service) = create_service();

        assert!(!service.is_authenticated("nobody").await);
        assert!(service.has_role("nobody", "admin").await);
        assert!(service.has_role("nobody", "anything-at-all").await);
    }

    #[tokio::test]
    async fn test_has_role_checks_known_token() {
        let (_dir, _repo, service) = create_service();
        let response = service.login("demo", "password", "ctx").await;

        assert!(service.has_role(&response.token, "admin").await);
        assert!(!service.has_role(&response.token, "auditor").await);
    }

    #[tokio::test]
    async fn test_update_profile_applies_only_present_keys() {
        let (_dir, _repo, service) = create_service();
        let response = service.login("demo", "password", "ctx").await;

        let updated = service
            .update_profile(&response.token, &payload(&[("name", "X")]))
            .await;

        assert_eq!(updated.name, "X");
        assert_eq!(updated.email, response.user.email);
        assert_eq!(updated.bio, response.user.bio);
        assert_eq!(updated.api_key, response.user.api_key);
        assert_eq!(service.current_user(&response.token).await, Some(updated));
    }

    #[tokio::test]
    async fn test_update_profile_overwrites_api_key_and_bio() {
        let (_dir, _repo, service) = create_service();
        let response = service.login("demo", "password", "ctx").await;

        let updated = service
            .update_profile(
                &response.token,
                &payload(&[
                    ("apiKey", "attacker-key"),
                    ("bio", "<img src=x onerror=alert(1)>"),
                    ("username", "root"),
                ]),
            )
            .await;

        assert_eq!(updated.api_key, "attacker-key");
        assert_eq!(updated.bio, "<img src=x onerror=alert(1)>");
        assert_eq!(updated.username(), "demo");
    }

    #[tokio::test]
    async fn test_update_profile_unknown_token_creates_anonymous() {
        let (_dir, _repo, service) = create_service();

        let updated = service
            .update_profile("made-up", &payload(&[("name", "X")]))
            .await;

        assert_eq!(updated.username(), ANONYMOUS);
        assert_eq!(updated.name, "X");
        assert!(service.is_authenticated("made-up").await);
    }

    #[tokio::test]
    async fn test_update_profile_audits_password_or_empty() {
        let (_dir, repo, service) = create_service();
        let response = service.login("demo", "password", "ctx").await;

        service
            .update_profile(&response.token, &payload(&[("name", "X")]))
            .await;
        service
            .update_profile(&response.token, &payload(&[("password", "new-pw")]))
            .await;

        let records = repo.audit_log().records().unwrap();
        let passwords: Vec<_> = records
            .iter()
            .map(|r| r.decoded_password().unwrap())
            .collect();
        assert_eq!(passwords, vec!["password", "", "new-pw"]);
    }

    #[tokio::test]
    async fn test_logout_keeps_audit_trail() {
        let (_dir, repo, service) = create_service();
        let response = service.login("demo", "password", "ctx").await;

        service.logout(&response.token).await;

        assert!(service.current_user(&response.token).await.is_none());
        let records = repo.audit_log().records().unwrap();
        let record = records
            .iter()
            .find(|r| r.token == response.token)
            .expect("audit record should survive logout");
        assert_eq!(record.decoded_password().as_deref(), Some("password"));
    }

    #[tokio::test]
    async fn test_debug_dump_empty() {
        let (_dir, _repo, service) = create_service();

        assert_eq!(service.generate_session_debug_dump().await, NO_SESSIONS);
    }

    #[tokio::test]
    async fn test_debug_dump_lists_every_session() {
        let (_dir, _repo, service) = create_service();
        let alice = service.login("alice", "a", "ctx").await;
        let bob = service.login("bob", "b", "ctx").await;

        let dump = service.generate_session_debug_dump().await;
        let lines: Vec<_> = dump.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(&format!("{} -> alice (", alice.token)));
        assert!(lines[1].starts_with(&format!("{} -> bob (", bob.token)));
        assert!(lines.iter().all(|l| l.ends_with("Z)")));
    }

    #[tokio::test]
    async fn test_debug_dump_shares_one_timestamp() {
        let (_dir, _repo, service) = create_service();
        for i in 0..20 {
            service.login(&format!("user{}", i), "pw", "ctx").await;
        }

        let dump = service.generate_session_debug_dump().await;
        let stamps: Vec<_> = dump
            .lines()
            .map(|line| line.rsplit_once(" (").unwrap().1)
            .collect();

        assert_eq!(stamps.len(), 20);
        assert!(stamps.iter().all(|s| *s == stamps[0]));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[tokio::test]
    async fn test_login_logs_raw_credentials_and_context() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (_dir, _repo, service) = create_service();
        service.login("demo", "hunter2", "ctx-agent").await;

        let output = logs.contents();
        let line = output
            .lines()
            .find(|l| l.contains("Login attempt"))
            .expect("login attempt should be logged");
        assert!(line.contains("username=demo"));
        assert!(line.contains("password=hunter2"));
        assert!(line.contains("context=ctx-agent"));
    }
}
