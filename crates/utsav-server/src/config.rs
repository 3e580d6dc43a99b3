use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::FixedOffset;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

/// India Standard Time, UTC+05:30.
const DEFAULT_DISPLAY_OFFSET_MINUTES: i32 = 330;

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub admin_emails: Vec<String>,
    pub display_offset: FixedOffset,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = get("UTSAV_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("UTSAV_JWT_SECRET is unset or still a placeholder. Set it in your .env file and restart.");
        }

        let db_path = get("UTSAV_DB_PATH").unwrap_or_else(|| "utsav.db".into()).into();
        let host = get("UTSAV_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("UTSAV_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("UTSAV_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let admin_emails = get("UTSAV_ADMIN_EMAILS")
            .map(|raw| parse_admin_emails(&raw))
            .unwrap_or_default();

        let offset_minutes = match get("UTSAV_DISPLAY_UTC_OFFSET_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse::<i32>()
                .context("UTSAV_DISPLAY_UTC_OFFSET_MINUTES must be a whole number of minutes")?,
            None => DEFAULT_DISPLAY_OFFSET_MINUTES,
        };
        let display_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .with_context(|| format!("UTC offset of {} minutes is out of range", offset_minutes))?;

        Ok(Self {
            jwt_secret,
            db_path,
            addr,
            admin_emails,
            display_offset,
        })
    }
}

fn parse_admin_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("UTSAV_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("utsav.db"));
        assert_eq!(config.addr, "0.0.0.0:3000".parse().unwrap());
        assert!(config.admin_emails.is_empty());
        assert_eq!(config.display_offset.local_minus_utc(), 330 * 60);
    }

    #[test]
    fn placeholder_secret_is_rejected() {
        assert!(load(&[]).is_err());
        assert!(load(&[("UTSAV_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn admin_emails_are_normalized() {
        let config = load(&[
            ("UTSAV_JWT_SECRET", "s3cret"),
            ("UTSAV_ADMIN_EMAILS", " Gate@Utsav.test, ,ops@utsav.test "),
        ])
        .unwrap();
        assert_eq!(config.admin_emails, ["gate@utsav.test", "ops@utsav.test"]);
    }

    #[test]
    fn bad_numbers_are_errors() {
        assert!(load(&[("UTSAV_JWT_SECRET", "s3cret"), ("UTSAV_PORT", "http")]).is_err());
        assert!(load(&[("UTSAV_JWT_SECRET", "s3cret"), ("UTSAV_DISPLAY_UTC_OFFSET_MINUTES", "9999")]).is_err());

        let utc = load(&[("UTSAV_JWT_SECRET", "s3cret"), ("UTSAV_DISPLAY_UTC_OFFSET_MINUTES", "0")]).unwrap();
        assert_eq!(utc.display_offset.local_minus_utc(), 0);
    }
}
