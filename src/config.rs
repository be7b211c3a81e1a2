use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// SMTP relay settings. `host == None` means mail is only logged.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub default_sender: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    /// Used to build absolute links in outgoing mail.
    pub public_base_url: String,
    pub reset_token_ttl_minutes: i64,
    pub online_window_minutes: i64,
    pub max_content_length: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "studyhub".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "studyhub-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let mail = MailConfig {
            host: std::env::var("SMTP_HOST").ok().filter(|h| !h.is_empty()),
            port: env_or("SMTP_PORT", 587),
            username: std::env::var("SMTP_USERNAME").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
            default_sender: std::env::var("MAIL_DEFAULT_SENDER")
                .unwrap_or_else(|_| "StudyHub <no-reply@studyhub.local>".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            mail,
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into())
                .trim_end_matches('/')
                .to_string(),
            reset_token_ttl_minutes: env_or("RESET_TOKEN_TTL_MINUTES", 30),
            online_window_minutes: env_or("ONLINE_WINDOW_MINUTES", 2),
            max_content_length: env_or("MAX_CONTENT_LENGTH", 16 * 1024 * 1024),
        })
    }

    pub fn link(&self, path: &str) -> String {
        format!("{}{}", self.public_base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_missing_or_garbage() {
        assert_eq!(env_or::<i64>("STUDYHUB_TEST_SURELY_UNSET", 42), 42);
        std::env::set_var("STUDYHUB_TEST_GARBAGE_PORT", "not-a-number");
        assert_eq!(env_or::<u16>("STUDYHUB_TEST_GARBAGE_PORT", 587), 587);
        std::env::set_var("STUDYHUB_TEST_GOOD_PORT", "2525");
        assert_eq!(env_or::<u16>("STUDYHUB_TEST_GOOD_PORT", 587), 2525);
    }
}
