use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub rate_limit: RateLimitSettings,
    pub email: EmailSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub port: u16,
    /// Public origin used when building confirmation links.
    pub base_url: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Token signing and lifetime settings.
///
/// Loaded once at startup and immutable for the process lifetime; every
/// consumer receives a reference, nothing reads ambient global state.
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub secret: String,
    /// Signing algorithm identifier, e.g. "HS256".
    pub algorithm: String,
    pub access_token_ttl_secs: i64,       // minutes-scale (e.g. 900)
    pub refresh_token_ttl_secs: i64,      // days-scale (e.g. 604800)
    pub confirmation_token_ttl_secs: i64, // days-scale (e.g. 259200)
}

/// Per-route-class admission ceilings, all sharing one window length.
#[derive(serde::Deserialize, Clone)]
pub struct RateLimitSettings {
    pub window_secs: u64,
    pub signup_ceiling: u32,
    pub contact_create_ceiling: u32,
    pub general_ceiling: u32,
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailSettings {
    /// Base URL of the outbound mail delivery service.
    pub service_url: String,
    pub sender: String,
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .build()?;
    settings.try_deserialize::<Settings>()
}
