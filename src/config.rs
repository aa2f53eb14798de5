use std::env;
use std::net::SocketAddr;

/// Fallback HMAC secret for development mode only. Startup logs a warning
/// whenever it is in effect.
const DEV_SESSION_SECRET: &str = "insecure-development-session-secret";

#[derive(Clone)]
pub struct Config {
    // Server
    pub bind_addr: SocketAddr,

    // Session cookie signing
    pub session_secret: String,
    pub dev_mode: bool,
    pub session_ttl_secs: u64,

    // Origin enforcement (optional)
    pub expected_domain: Option<String>,
    pub expected_uri: Option<String>,

    // CORS
    pub allowed_origins: Vec<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("session_secret", &"[REDACTED]")
            .field("dev_mode", &self.dev_mode)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("expected_domain", &self.expected_domain)
            .field("expected_uri", &self.expected_uri)
            .field("allowed_origins", &self.allowed_origins)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        let dev_mode = parse_env_or_default("DEV_MODE", false)?;

        // SESSION_SECRET signs the session cookie. Mandatory outside of
        // development mode; there is no silent production default.
        let session_secret = match env::var("SESSION_SECRET") {
            Ok(secret) if !secret.is_empty() => {
                if secret.len() < 16 {
                    return Err(ConfigError::InvalidValue(
                        "SESSION_SECRET".to_string(),
                        "must be at least 16 characters".to_string(),
                    ));
                }
                secret
            }
            _ if dev_mode => {
                tracing::warn!(
                    "SESSION_SECRET not set; using the insecure development default. \
                     Never run this configuration in production."
                );
                DEV_SESSION_SECRET.to_string()
            }
            _ => return Err(ConfigError::MissingVar("SESSION_SECRET".to_string())),
        };

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8001".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        let session_ttl_secs = parse_env_or_default("SESSION_TTL_SECS", 1_209_600)?;

        // When set, verification rejects messages claiming another origin.
        let expected_domain = env::var("SIWE_DOMAIN").ok().filter(|s| !s.is_empty());
        let expected_uri = env::var("SIWE_URI").ok().filter(|s| !s.is_empty());

        let allowed_origins_str = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost,http://localhost:3000".to_string());
        let allowed_origins: Vec<String> = allowed_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            bind_addr,
            session_secret,
            dev_mode,
            session_ttl_secs,
            expected_domain,
            expected_uri,
            allowed_origins,
        })
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Use a mutex to ensure tests run serially since they modify global env vars.
    // unwrap_or_else handles poison from prior panics.
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn lock_test() -> std::sync::MutexGuard<'static, ()> {
        TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn clear_test_env() {
        env::remove_var("DEV_MODE");
        env::remove_var("SESSION_SECRET");
        env::remove_var("BIND_ADDR");
        env::remove_var("SESSION_TTL_SECS");
        env::remove_var("SIWE_DOMAIN");
        env::remove_var("SIWE_URI");
        env::remove_var("ALLOWED_ORIGINS");
    }

    const TEST_SECRET: &str = "a-test-session-secret";

    #[test]
    fn test_parse_env_or_default() {
        let _guard = lock_test();

        env::set_var("TEST_U64", "12345");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 12345);

        env::remove_var("TEST_U64");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 100);
    }

    #[test]
    fn test_missing_secret_fails_outside_dev_mode() {
        let _guard = lock_test();
        clear_test_env();

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::MissingVar(ref s) if s == "SESSION_SECRET"
        ));

        clear_test_env();
    }

    #[test]
    fn test_dev_mode_falls_back_to_development_secret() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("DEV_MODE", "true");

        let config = Config::from_env().unwrap();
        assert!(config.dev_mode);
        assert_eq!(config.session_secret, DEV_SESSION_SECRET);

        clear_test_env();
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("SESSION_SECRET", "tooshort");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "SESSION_SECRET"
        ));

        clear_test_env();
    }

    #[test]
    fn test_invalid_socket_addr() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("SESSION_SECRET", TEST_SECRET);
        env::set_var("BIND_ADDR", "invalid_address");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_, _)));

        clear_test_env();
    }

    #[test]
    fn test_allowed_origins_parsing() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("SESSION_SECRET", TEST_SECRET);
        env::set_var(
            "ALLOWED_ORIGINS",
            "https://app.example.com, http://localhost:5173 ,",
        );

        let config = Config::from_env().unwrap();
        assert_eq!(
            config.allowed_origins,
            vec!["https://app.example.com", "http://localhost:5173"]
        );

        clear_test_env();
    }

    #[test]
    fn test_origin_enforcement_is_off_by_default() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("SESSION_SECRET", TEST_SECRET);

        let config = Config::from_env().unwrap();
        assert_eq!(config.expected_domain, None);
        assert_eq!(config.expected_uri, None);

        clear_test_env();
    }

    #[test]
    fn test_config_defaults() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("SESSION_SECRET", TEST_SECRET);
        env::set_var("SIWE_DOMAIN", "app.example.com");

        let config = Config::from_env().unwrap();

        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8001");
        assert_eq!(config.session_secret, TEST_SECRET);
        assert!(!config.dev_mode);
        assert_eq!(config.session_ttl_secs, 1_209_600);
        assert_eq!(config.expected_domain.as_deref(), Some("app.example.com"));
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost", "http://localhost:3000"]
        );

        clear_test_env();
    }

    #[test]
    fn test_debug_redacts_the_secret() {
        let _guard = lock_test();
        clear_test_env();

        env::set_var("SESSION_SECRET", TEST_SECRET);

        let config = Config::from_env().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(TEST_SECRET));

        clear_test_env();
    }
}
