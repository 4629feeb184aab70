// config.rs
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_name: String,
    pub port: u16,
    pub host: String,
    pub referral_base_url: String,
    /// Echo issued OTP codes in responses (development/test builds only).
    pub expose_otp: bool,
    pub session_ttl_days: i64,
}

/// EXPOSE_OTP wins when set; otherwise any non-production APP_ENV echoes the
/// issued codes.
fn resolve_expose_otp(override_value: Option<String>, environment: &str) -> bool {
    match override_value.as_deref() {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        None => environment != "production",
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        AppConfig {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            db_name: env::var("DB_NAME")
                .unwrap_or_else(|_| "referraldb".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("PORT must be a number"),
            host: env::var("HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            referral_base_url: env::var("REFERRAL_BASE_URL")
                .unwrap_or_else(|_| "https://glxd.shop/ref".to_string()),
            expose_otp: resolve_expose_otp(env::var("EXPOSE_OTP").ok(), &environment),
            session_ttl_days: env::var("SESSION_TTL_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .expect("SESSION_TTL_DAYS must be a number"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_expose_otp;

    #[test]
    fn expose_otp_follows_environment_without_override() {
        assert!(resolve_expose_otp(None, "development"));
        assert!(resolve_expose_otp(None, "test"));
        assert!(!resolve_expose_otp(None, "production"));
    }

    #[test]
    fn expose_otp_override_beats_environment() {
        assert!(resolve_expose_otp(Some("true".to_string()), "production"));
        assert!(resolve_expose_otp(Some("1".to_string()), "production"));
        assert!(!resolve_expose_otp(Some("false".to_string()), "development"));
        assert!(!resolve_expose_otp(Some("0".to_string()), "development"));
    }
}
