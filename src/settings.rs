//! Environment-backed settings. Call `dotenvy::dotenv()` before `Settings::from_env` to pick up a `.env` file.

use crate::error::SettingsError;
use axum::http::HeaderValue;

pub const DEFAULT_JWT_SECRET: &str = "childcare-dev-secret-change-me";

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    /// Only origin allowed by CORS.
    pub frontend_url: String,
    /// `frontend_url` as a header value for the CORS allow-origin list.
    pub frontend_origin: HeaderValue,
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub host: String,
    pub port: u16,
    /// PostgreSQL schema holding all tables.
    pub db_schema: String,
    pub db_max_connections: u32,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string());

        let frontend_url = get("FRONTEND_URL", "http://localhost:5173").trim_end_matches('/').to_string();
        let frontend_origin = HeaderValue::from_str(&frontend_url).map_err(|_| SettingsError::Invalid {
            key: "FRONTEND_URL",
            value: frontend_url.clone(),
        })?;

        let jwt_secret = get("JWT_SECRET", DEFAULT_JWT_SECRET);
        if jwt_secret == DEFAULT_JWT_SECRET {
            tracing::warn!("JWT_SECRET not set, using development secret");
        }

        let db_schema = get("DB_SCHEMA", "public");
        if !is_identifier(&db_schema) {
            return Err(SettingsError::Invalid {
                key: "DB_SCHEMA",
                value: db_schema,
            });
        }

        Ok(Settings {
            database_url: get("DATABASE_URL", "postgres://localhost/childcare"),
            frontend_url,
            frontend_origin,
            jwt_secret,
            access_token_expire_minutes: parse(&get, "ACCESS_TOKEN_EXPIRE_MINUTES", "1440")?,
            host: get("HOST", "0.0.0.0"),
            port: parse(&get, "PORT", "8000")?,
            db_schema,
            db_max_connections: parse(&get, "DB_MAX_CONNECTIONS", "5")?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T, G>(get: &G, key: &'static str, default: &str) -> Result<T, SettingsError>
where
    T: std::str::FromStr,
    G: Fn(&str, &str) -> String,
{
    let raw = get(key, default);
    raw.trim()
        .parse()
        .map_err(|_| SettingsError::Invalid { key, value: raw })
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
