use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SESSION_STORE_PATH: &str = "target/session-store.txt";

/// Runtime settings, read from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct LabConfig {
    pub bind_addr: SocketAddr,
    pub session_store_path: PathBuf,
}

impl LabConfig {
    /// Reads `LAB_BIND_ADDR` and `SESSION_STORE_PATH`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, falling back to defaults on
    /// missing or unparsable values
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("LAB_BIND_ADDR")
            .and_then(|value| match value.parse::<SocketAddr>() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    warn!(value = %value, error = %e, "Invalid LAB_BIND_ADDR, using default");
                    None
                }
            })
            .unwrap_or_else(default_bind_addr);

        let session_store_path = lookup("SESSION_STORE_PATH")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_STORE_PATH));

        Self {
            bind_addr,
            session_store_path,
        }
    }
}

impl Default for LabConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
}
