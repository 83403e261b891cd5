use tracing::warn;

const DEFAULT_DATABASE_URL: &str = "sqlite:clubcourt.db?mode=rwc";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_SESSIONS: usize = 256;

/// Server settings, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    /// Live scoring sessions hosted at once.
    pub max_sessions: usize,
}

impl ServerConfig {
    /// `DATABASE_URL`, `PORT` and `CLUBCOURT_MAX_SESSIONS`, falling back to
    /// defaults when unset or unparseable.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            port: parse_var("PORT", DEFAULT_PORT),
            max_sessions: parse_var("CLUBCOURT_MAX_SESSIONS", DEFAULT_MAX_SESSIONS),
        }
    }

    /// A throwaway in-memory database, for tests.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 0,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    /// Every connection to an in-memory SQLite database gets its own empty
    /// database, so those are limited to one.
    pub fn pool_size(&self) -> u32 {
        if self.is_in_memory() { 1 } else { 5 }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "ignoring unparseable setting");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_uses_single_connection() {
        let config = ServerConfig::in_memory();
        assert!(config.is_in_memory());
        assert_eq!(config.pool_size(), 1);
    }

    #[test]
    fn file_database_uses_a_pool() {
        let config = ServerConfig {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            port: 9000,
            max_sessions: 4,
        };
        assert!(!config.is_in_memory());
        assert_eq!(config.pool_size(), 5);
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
    }

    #[test]
    fn unparseable_value_falls_back() {
        assert_eq!(parse_var("CLUBCOURT_TEST_UNSET_VARIABLE", 7u16), 7);
    }
}
