use uuid::Uuid;

/// Source of the random part of session tokens
pub trait UuidGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random v4 UUIDs. Not meant to be unguessable as a security token.
pub struct DefaultUuidGenerator;

impl DefaultUuidGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DefaultUuidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl UuidGenerator for DefaultUuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Builds a session token as `<username>-<uuid>`
pub fn session_token(username: &str, generator: &dyn UuidGenerator) -> String {
    format!("{}-{}", username, generator.generate())
}
