use serde::Deserialize;

/// Ten years. Larger `JWT_TTL_MINUTES` values are ignored.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365 * 10;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    /// `None` keeps tokens non-expiring.
    pub ttl_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CarsConfig {
    pub max_images: usize,
    pub enforce_ownership: bool,
    pub search_requires_auth: bool,
}

impl Default for CarsConfig {
    fn default() -> Self {
        Self {
            max_images: 10,
            enforce_ownership: false,
            search_requires_auth: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub cars: CarsConfig,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "carlot".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| parse_ttl_minutes(&v)),
        };
        let defaults = CarsConfig::default();
        let cars = CarsConfig {
            max_images: std::env::var("CAR_MAX_IMAGES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_images),
            enforce_ownership: env_flag("CAR_ENFORCE_OWNERSHIP")
                .unwrap_or(defaults.enforce_ownership),
            search_requires_auth: env_flag("SEARCH_REQUIRES_AUTH")
                .unwrap_or(defaults.search_requires_auth),
        };
        let request_timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|s| *s > 0)
            .unwrap_or(30);
        Ok(Self {
            database_url,
            jwt,
            cars,
            request_timeout_secs,
        })
    }
}

fn parse_ttl_minutes(raw: &str) -> Option<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|m| *m > 0 && *m <= MAX_TTL_MINUTES)
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|v| parse_flag(&v))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
