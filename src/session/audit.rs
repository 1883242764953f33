//! Append-only credential audit file.
//!
//! Every session save writes `token:username:base64(password)` as one line.
//! The file is never read at startup, truncated or rotated, so it outlives
//! both logout and process restarts.

use base64::{engine::general_purpose, Engine as _};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Reversible encoding used for stored and returned passwords
pub fn encode_password(password: &str) -> String {
    general_purpose::STANDARD.encode(password.as_bytes())
}

/// One parsed line of the audit file
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub token: String,
    pub username: String,
    pub encoded_password: String,
}

impl AuditRecord {
    pub fn new(token: &str, username: &str, password: &str) -> Self {
        Self {
            token: token.to_string(),
            username: username.to_string(),
            encoded_password: encode_password(password),
        }
    }

    /// Parses `token:username:encoded`. Splits on the first two colons, so a
    /// colon inside the token or username is misread.
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.splitn(3, ':');
        let token = fields.next()?;
        let username = fields.next()?;
        let encoded_password = fields.next()?;

        Some(Self {
            token: token.to_string(),
            username: username.to_string(),
            encoded_password: encoded_password.to_string(),
        })
    }

    /// Recovers the plaintext password
    pub fn decoded_password(&self) -> Option<String> {
        let bytes = general_purpose::STANDARD
            .decode(&self.encoded_password)
            .ok()?;
        String::from_utf8(bytes).ok()
    }

    fn to_line(&self) -> String {
        format!(
            "{}:{}:{}\n",
            self.token, self.username, self.encoded_password
        )
    }
}

pub struct AuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
    failed_appends: AtomicU64,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            failed_appends: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of appends that failed and were dropped
    pub fn failed_appends(&self) -> u64 {
        self.failed_appends.load(Ordering::Relaxed)
    }

    /// Best-effort append. Failures are traced and counted, never returned.
    #[instrument(skip(self, password), fields(path = %self.path.display()))]
    pub fn append(&self, token: &str, username: &str, password: &str) {
        let record = AuditRecord::new(token, username, password);

        if let Err(e) = self.write_line(&record.to_line()) {
            self.failed_appends.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "Audit append failed, record dropped");
            return;
        }

        debug!(token = %token, username = %username, "Audit record appended");
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        // Poisoning only means another writer panicked mid-line; keep writing.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }

    /// Reads back every well-formed record. A missing file yields no records.
    pub fn records(&self) -> io::Result<Vec<AuditRecord>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(contents.lines().filter_map(AuditRecord::parse).collect())
    }
}
