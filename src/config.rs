use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let cors_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|raw| split_origins(&raw))
            .unwrap_or_default();
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            cors_origins,
        })
    }
}

/// Letterhead printed on order documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl Default for BusinessInfo {
    fn default() -> Self {
        Self {
            name: "Dishware & Equipment Rentals".to_string(),
            address: String::new(),
            phone: String::new(),
        }
    }
}

impl BusinessInfo {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: env::var("BUSINESS_NAME").unwrap_or(defaults.name),
            address: env::var("BUSINESS_ADDRESS").unwrap_or(defaults.address),
            phone: env::var("BUSINESS_PHONE").unwrap_or(defaults.phone),
        }
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

/// Where the REST client finds the backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs: 30,
        }
    }

    pub fn from_env() -> Self {
        let mut config = Self::new(
            env::var("RENTAL_API_URL").unwrap_or_else(|_| "http://localhost:3000/api".to_string()),
        );
        if let Some(secs) = env::var("RENTAL_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.timeout_secs = secs;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_base_url_drops_trailing_slash() {
        let config = ClientConfig::new("http://rentals.local/api/");
        assert_eq!(config.base_url, "http://rentals.local/api");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn cors_origins_are_comma_separated() {
        assert_eq!(
            split_origins(" http://localhost:5173, ,https://office.example "),
            ["http://localhost:5173", "https://office.example"]
        );
        assert!(split_origins("").is_empty());
    }
}
