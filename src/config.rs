use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} must be a number, got {value:?}")]
    NotANumber { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: &str) -> AppEnv {
        match raw.to_ascii_lowercase().as_str() {
            "production" | "prod" => AppEnv::Production,
            _ => AppEnv::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub app_env: AppEnv,
    pub jwt_access_secret: String,
    pub jwt_access_maxage: i64,
    pub jwt_refresh_secret: String,
    pub jwt_refresh_maxage: i64,
    pub frontend_url: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_callback_url: String,
    pub super_admin_email: String,
    pub super_admin_password: String,
}

impl Config {
    pub fn init() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));
        let number = |name: &'static str, default: i64| -> Result<i64, ConfigError> {
            match lookup(name) {
                Some(value) => value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ConfigError::NotANumber { name, value }),
                None => Ok(default),
            }
        };

        let port = number("PORT", 5000)?;
        let port = u16::try_from(port).map_err(|_| ConfigError::NotANumber {
            name: "PORT",
            value: port.to_string(),
        })?;

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            port,
            app_env: AppEnv::parse(&lookup("APP_ENV").unwrap_or_default()),
            jwt_access_secret: required("JWT_ACCESS_SECRET")?,
            jwt_access_maxage: number("JWT_ACCESS_MAXAGE", 60 * 24)?,
            jwt_refresh_secret: required("JWT_REFRESH_SECRET")?,
            jwt_refresh_maxage: number("JWT_REFRESH_MAXAGE", 60 * 24 * 30)?,
            frontend_url: lookup("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            google_client_id: lookup("GOOGLE_CLIENT_ID").unwrap_or_default(),
            google_client_secret: lookup("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            google_callback_url: lookup("GOOGLE_CALLBACK_URL").unwrap_or_else(|| {
                "http://localhost:5000/api/v1/auth/google/callback".to_string()
            }),
            super_admin_email: required("SUPER_ADMIN_EMAIL")?,
            super_admin_password: required("SUPER_ADMIN_PASSWORD")?,
        })
    }

    pub fn is_development(&self) -> bool {
        self.app_env == AppEnv::Development
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/parcel_delivery".to_string(),
        port: 5000,
        app_env: AppEnv::Development,
        jwt_access_secret: "access-secret".to_string(),
        jwt_access_maxage: 60,
        jwt_refresh_secret: "refresh-secret".to_string(),
        jwt_refresh_maxage: 600,
        frontend_url: "http://localhost:5173".to_string(),
        google_client_id: "client-id".to_string(),
        google_client_secret: "client-secret".to_string(),
        google_callback_url: "http://localhost:5000/api/v1/auth/google/callback".to_string(),
        super_admin_email: "root@example.com".to_string(),
        super_admin_password: "super-secret".to_string(),
    }
}
