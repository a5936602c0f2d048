// ============================================================================
// CONFIGURATION
// ============================================================================
//
// Description:
//   Lecture de la configuration depuis les variables d'environnement
//   (chargées depuis .env par dotenv dans main.rs).
//
// Variables:
//   - DATABASE_URL        (obligatoire) postgres://... ou sqlite://...
//   - SECRET_KEY          (obligatoire) clé de signature des tokens, >= 32 octets
//   - BIND_ADDR           (défaut 127.0.0.1:8080)
//   - RESET_TOKEN_TTL     (défaut 600 secondes)
//   - CONFIRM_TOKEN_TTL   (défaut 86400 secondes)
//   - SESSION_TOKEN_TTL   (défaut 86400 secondes)
//   - PASSWORD_ITERATIONS (défaut 260000, PBKDF2)
//   - MAIL_DEFAULT_SENDER (défaut noreply@scrumjet.com)
//   - PUBLIC_BASE_URL     (défaut http://127.0.0.1:8080) pour les liens des emails
//   - INIT_SCHEMA         (défaut false) crée les tables au démarrage
//
// ============================================================================

use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::utils::password::DEFAULT_ITERATIONS;

pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("SECRET_KEY must be at least {MIN_SECRET_LEN} bytes long")]
    WeakSecret,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub secret_key: String,
    pub bind_addr: String,
    pub reset_token_ttl: i64,
    pub confirm_token_ttl: i64,
    pub session_token_ttl: i64,
    pub password_iterations: u32,
    pub mail_default_sender: String,
    pub public_base_url: String,
    pub init_schema: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construit la configuration à partir d'une fonction de lecture,
    /// ce qui permet de tester sans toucher aux variables du process.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let secret_key = lookup("SECRET_KEY").ok_or(ConfigError::Missing("SECRET_KEY"))?;
        if secret_key.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }

        Ok(Self {
            database_url,
            secret_key,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            reset_token_ttl: parse_or(&lookup, "RESET_TOKEN_TTL", 600)?,
            confirm_token_ttl: parse_or(&lookup, "CONFIRM_TOKEN_TTL", 86_400)?,
            session_token_ttl: parse_or(&lookup, "SESSION_TOKEN_TTL", 86_400)?,
            password_iterations: parse_or(&lookup, "PASSWORD_ITERATIONS", DEFAULT_ITERATIONS)?,
            mail_default_sender: lookup("MAIL_DEFAULT_SENDER")
                .unwrap_or_else(|| "noreply@scrumjet.com".to_string()),
            public_base_url: lookup("PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://127.0.0.1:8080".to_string())
                .trim_end_matches('/')
                .to_string(),
            init_schema: parse_or(&lookup, "INIT_SCHEMA", false)?,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            secret_key: "test-secret-key-that-is-long-enough-0123456789".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            reset_token_ttl: 600,
            confirm_token_ttl: 86_400,
            session_token_ttl: 86_400,
            // Volontairement bas: les tests n'ont pas besoin d'un hash lent
            password_iterations: 1_000,
            mail_default_sender: "noreply@scrumjet.test".to_string(),
            public_base_url: "http://scrumjet.test".to_string(),
            init_schema: true,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
