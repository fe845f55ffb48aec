use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ClientError;
use crate::models::Credentials;
use crate::stats::DEFAULT_CLASS_SIZE_BASELINE;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SESSION_DB_URL: &str = "sqlite://classroom-session.db";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    #[default]
    Http,
    Demo,
}

impl FromStr for BackendKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(BackendKind::Http),
            "demo" => Ok(BackendKind::Demo),
            other => Err(ClientError::validation(format!("unknown backend `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub session_db_url: String,
    pub class_size_baseline: u32,
    pub backend: BackendKind,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to
    /// pick up a `.env` file.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ClientError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let request_timeout_secs = var("REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let class_size_baseline = var("CLASS_SIZE_BASELINE")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_CLASS_SIZE_BASELINE);
        let backend = match var("CLASSROOM_BACKEND") {
            Some(kind) => kind.parse()?,
            None => BackendKind::default(),
        };

        Ok(Config {
            api_base_url: var("API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.into()),
            request_timeout_secs,
            session_db_url: var("SESSION_DB_URL").unwrap_or_else(|| DEFAULT_SESSION_DB_URL.into()),
            class_size_baseline,
            backend,
            email: var("CLASSROOM_EMAIL"),
            password: var("CLASSROOM_PASSWORD"),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Sign-in credentials, when both halves are configured.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.email, &self.password) {
            (Some(email), Some(password)) => Some(Credentials::new(email, password)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ClientError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.class_size_baseline, 3);
        assert_eq!(cfg.backend, BackendKind::Http);
        assert_eq!(cfg.credentials(), None);
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("API_BASE_URL", "https://school.example/api"),
            ("REQUEST_TIMEOUT_SECS", "3"),
            ("CLASS_SIZE_BASELINE", "25"),
            ("CLASSROOM_BACKEND", "Demo"),
            ("CLASSROOM_EMAIL", "teacher@demo.com"),
            ("CLASSROOM_PASSWORD", "123456"),
        ])
        .unwrap();
        assert_eq!(cfg.api_base_url, "https://school.example/api");
        assert_eq!(cfg.request_timeout_secs, 3);
        assert_eq!(cfg.class_size_baseline, 25);
        assert_eq!(cfg.backend, BackendKind::Demo);
        assert_eq!(
            cfg.credentials(),
            Some(Credentials::new("teacher@demo.com", "123456"))
        );
    }

    #[test]
    fn bad_numbers_fall_back() {
        let cfg = config(&[("REQUEST_TIMEOUT_SECS", "0"), ("CLASS_SIZE_BASELINE", "many")]).unwrap();
        assert_eq!(cfg.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(cfg.class_size_baseline, DEFAULT_CLASS_SIZE_BASELINE);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(config(&[("CLASSROOM_BACKEND", "grpc")]).is_err());
    }
}
