use std::sync::Arc;
use tempfile::TempDir;

use session_lab::{
    session::audit::AuditRecord, AppState, AuthService, InsecureSessionRepository,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestLab {
    pub repository: Arc<InsecureSessionRepository>,
    pub service: AuthService,
    pub state: AppState,
    _dir: TempDir,
}

impl TestLab {
    pub fn audit_records(&self) -> Vec<AuditRecord> {
        self.repository.audit_log().records().unwrap()
    }

    /// Simulates a process restart: same audit file, empty session map
    pub fn restart(&self) -> AuthService {
        let repository = Arc::new(InsecureSessionRepository::new(
            self.repository.audit_log().path().to_path_buf(),
        ));
        AuthService::new(repository)
    }
}

pub struct TestLabBuilder {
    logins: Vec<(String, String)>,
}

impl TestLabBuilder {
    pub fn new() -> Self {
        Self { logins: vec![] }
    }

    pub fn with_logins(mut self, logins: Vec<(&str, &str)>) -> Self {
        self.logins = logins
            .into_iter()
            .map(|(u, p)| (u.to_string(), p.to_string()))
            .collect();
        self
    }

    pub async fn build(self) -> TestLab {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target").join("session-store.txt");
        let repository = Arc::new(InsecureSessionRepository::new(path));
        let service = AuthService::new(repository.clone());

        for (username, password) in &self.logins {
            service.login(username, password, "test-setup").await;
        }

        let state = AppState::new(repository.clone());
        TestLab {
            repository,
            service,
            state,
            _dir: dir,
        }
    }
}
