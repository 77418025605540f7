//! Runtime settings read from the environment (and `.env` when present).

use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8083;
pub const DEFAULT_EXPRESS_FEE: Decimal = Decimal::from_parts(19, 0, 0, false, 0);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct StripeSettings {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub api_base: String,
}

#[derive(Clone, Debug)]
pub struct EmailSettings {
    pub resend_api_key: Option<String>,
    pub api_base: String,
    pub from: String,
    pub admin_email: String,
    pub admin_dashboard_url: String,
}

#[derive(Clone, Debug)]
pub struct StorageSettings {
    pub root: PathBuf,
    /// Base URL that public object URLs are built from.
    pub public_base_url: String,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub port: u16,
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    /// Origin the payment page redirects back to.
    pub site_url: String,
    pub express_delivery_fee: Decimal,
    pub stripe: StripeSettings,
    pub email: EmailSettings,
    pub storage: StorageSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let public_base_url = format!("http://localhost:{DEFAULT_PORT}");
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            nats_url: None,
            site_url: "http://localhost:5173".to_string(),
            express_delivery_fee: DEFAULT_EXPRESS_FEE,
            stripe: StripeSettings {
                secret_key: None,
                webhook_secret: None,
                api_base: "https://api.stripe.com".to_string(),
            },
            email: EmailSettings {
                resend_api_key: None,
                api_base: "https://api.resend.com".to_string(),
                from: "EU Wristbands <orders@resend.dev>".to_string(),
                admin_email: "admin@example.com".to_string(),
                admin_dashboard_url: "http://localhost:5173/admin".to_string(),
            },
            storage: StorageSettings { root: PathBuf::from("./storage"), public_base_url },
        }
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match var(name) {
        Some(value) => value.parse().map(Some).map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(None),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        _ = dotenvy::dotenv();
        let defaults = Self::default();

        let port = parsed::<u16>("PORT")?.unwrap_or(defaults.port);
        let express_delivery_fee = parsed::<Decimal>("EXPRESS_DELIVERY_FEE")?.unwrap_or(defaults.express_delivery_fee);
        if express_delivery_fee.is_sign_negative() {
            return Err(ConfigError::Invalid { name: "EXPRESS_DELIVERY_FEE", value: express_delivery_fee.to_string() });
        }
        let site_url = var("SITE_URL").unwrap_or(defaults.site_url);

        Ok(Self {
            port,
            database_url: var("DATABASE_URL"),
            nats_url: var("NATS_URL"),
            express_delivery_fee,
            stripe: StripeSettings {
                secret_key: var("STRIPE_SECRET_KEY"),
                webhook_secret: var("STRIPE_WEBHOOK_SECRET"),
                api_base: var("STRIPE_API_BASE").unwrap_or(defaults.stripe.api_base),
            },
            email: EmailSettings {
                resend_api_key: var("RESEND_API_KEY"),
                api_base: var("RESEND_API_BASE").unwrap_or(defaults.email.api_base),
                from: var("EMAIL_FROM").unwrap_or(defaults.email.from),
                admin_email: var("ADMIN_EMAIL").unwrap_or(defaults.email.admin_email),
                admin_dashboard_url: var("ADMIN_DASHBOARD_URL").unwrap_or_else(|| format!("{}/admin", site_url.trim_end_matches('/'))),
            },
            storage: StorageSettings {
                root: var("STORAGE_ROOT").map(PathBuf::from).unwrap_or(defaults.storage.root),
                public_base_url: var("PUBLIC_BASE_URL").unwrap_or_else(|| format!("http://localhost:{port}")),
            },
            site_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.express_delivery_fee, Decimal::new(19, 0));
        assert!(s.database_url.is_none());
        assert!(s.stripe.secret_key.is_none());
        assert_eq!(s.storage.public_base_url, "http://localhost:8083");
    }
}
